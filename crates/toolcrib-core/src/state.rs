//! # Tool State Machine Rules
//!
//! Pure transition rules for [`ToolStatus`]. Persistence and history live in
//! the ledger crate; this module only answers "what happens if".
//!
//! ## Transitions
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │              checkout                                                   │
//! │   Available ───────────► Borrowed                                       │
//! │       ▲  ◄───────────────   │                                           │
//! │       │      return         │                                           │
//! │       │                     │ reported broken while out                 │
//! │ repair│  mark broken        ▼                                           │
//! │       └──────────────── Defective ◄── (Available)                       │
//! │                                                                         │
//! │  Defective → Borrowed is not part of the machine. An admin may still    │
//! │  force it through `transition`, which records it as an override.        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};

use crate::error::ValidationError;
use crate::types::{LoanMismatch, LoanMismatchKind, ToolLoanCount, ToolStatus};

impl ToolStatus {
    /// All statuses, in display order.
    pub const ALL: [ToolStatus; 3] = [
        ToolStatus::Available,
        ToolStatus::Borrowed,
        ToolStatus::Defective,
    ];

    /// Stored/serialized name.
    pub fn as_str(&self) -> &'static str {
        match self {
            ToolStatus::Available => "available",
            ToolStatus::Borrowed => "borrowed",
            ToolStatus::Defective => "defective",
        }
    }

    /// Whether `self → next` is an edge of the normal state machine.
    pub fn can_transition_to(self, next: ToolStatus) -> bool {
        use ToolStatus::*;
        matches!(
            (self, next),
            (Available, Borrowed)
                | (Borrowed, Available)
                | (Available, Defective)
                | (Defective, Available)
                | (Borrowed, Defective)
        )
    }

    /// Only available tools can be checked out.
    #[inline]
    pub fn is_lendable(self) -> bool {
        self == ToolStatus::Available
    }

    /// Status a tool should take when its loan is closed.
    ///
    /// `None` means "leave it": a defective tool stays defective, and an
    /// available tool (out of sync with its loan) needs no change.
    pub fn after_return(self) -> Option<ToolStatus> {
        match self {
            ToolStatus::Borrowed => Some(ToolStatus::Available),
            ToolStatus::Available | ToolStatus::Defective => None,
        }
    }
}

impl std::fmt::Display for ToolStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ToolStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "available" => Ok(ToolStatus::Available),
            "borrowed" => Ok(ToolStatus::Borrowed),
            "defective" => Ok(ToolStatus::Defective),
            _ => Err(ValidationError::NotAllowed {
                field: "status".to_string(),
                allowed: ToolStatus::ALL.iter().map(|s| s.to_string()).collect(),
            }),
        }
    }
}

// =============================================================================
// Transition Plan
// =============================================================================

/// A status change that has to be written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransitionPlan {
    pub from: ToolStatus,
    pub to: ToolStatus,
    /// New value for `defect_timestamp`: stamped on entering `Defective`,
    /// cleared otherwise.
    pub defect_timestamp: Option<DateTime<Utc>>,
    /// True when the edge is outside the normal machine.
    pub is_override: bool,
}

/// Plans the change from `current` to `requested`.
///
/// Returns `None` when nothing changes (no history row is written then).
///
/// ## Example
/// ```rust
/// use chrono::Utc;
/// use toolcrib_core::state::plan_transition;
/// use toolcrib_core::ToolStatus;
///
/// let now = Utc::now();
/// let plan = plan_transition(ToolStatus::Available, ToolStatus::Defective, now).unwrap();
/// assert_eq!(plan.defect_timestamp, Some(now));
/// assert!(plan_transition(ToolStatus::Borrowed, ToolStatus::Borrowed, now).is_none());
/// ```
pub fn plan_transition(
    current: ToolStatus,
    requested: ToolStatus,
    now: DateTime<Utc>,
) -> Option<TransitionPlan> {
    if current == requested {
        return None;
    }

    Some(TransitionPlan {
        from: current,
        to: requested,
        defect_timestamp: (requested == ToolStatus::Defective).then_some(now),
        is_override: !current.can_transition_to(requested),
    })
}

// =============================================================================
// Loan Consistency
// =============================================================================

/// Checks one tool against "Borrowed iff exactly one open loan".
///
/// Returns `None` when the tool and its loans agree.
pub fn check_loan_consistency(count: &ToolLoanCount) -> Option<LoanMismatch> {
    let kind = match (count.tool_status, count.open_loans) {
        (None, n) if n > 0 => LoanMismatchKind::LoanForMissingTool,
        (None, _) => return None,
        (Some(_), n) if n > 1 => LoanMismatchKind::MultipleOpenLoans,
        (Some(ToolStatus::Borrowed), 1) => return None,
        (Some(ToolStatus::Borrowed), _) => LoanMismatchKind::BorrowedWithoutLoan,
        (Some(_), 1) => LoanMismatchKind::LoanButNotBorrowed,
        (Some(_), _) => return None,
    };

    Some(LoanMismatch {
        tool_barcode: count.tool_barcode.clone(),
        tool_status: count.tool_status,
        open_loans: count.open_loans,
        kind,
    })
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use ToolStatus::*;

    #[test]
    fn test_machine_edges() {
        assert!(Available.can_transition_to(Borrowed));
        assert!(Borrowed.can_transition_to(Available));
        assert!(Available.can_transition_to(Defective));
        assert!(Defective.can_transition_to(Available));
        assert!(Borrowed.can_transition_to(Defective));

        assert!(!Defective.can_transition_to(Borrowed));
        assert!(!Available.can_transition_to(Available));
    }

    #[test]
    fn test_same_status_is_noop() {
        for status in ToolStatus::ALL {
            assert!(plan_transition(status, status, Utc::now()).is_none());
        }
    }

    #[test]
    fn test_defect_timestamp_set_and_cleared() {
        let now = Utc::now();

        let broken = plan_transition(Borrowed, Defective, now).unwrap();
        assert_eq!(broken.defect_timestamp, Some(now));
        assert!(!broken.is_override);

        let repaired = plan_transition(Defective, Available, now).unwrap();
        assert_eq!(repaired.defect_timestamp, None);
    }

    #[test]
    fn test_override_edge_is_flagged() {
        let plan = plan_transition(Defective, Borrowed, Utc::now()).unwrap();
        assert!(plan.is_override);
    }

    #[test]
    fn test_after_return() {
        assert_eq!(Borrowed.after_return(), Some(Available));
        assert_eq!(Defective.after_return(), None);
        assert_eq!(Available.after_return(), None);
    }

    #[test]
    fn test_parse_status() {
        assert_eq!("Borrowed".parse::<ToolStatus>().unwrap(), Borrowed);
        assert_eq!(" defective ".parse::<ToolStatus>().unwrap(), Defective);
        assert!("lost".parse::<ToolStatus>().is_err());
    }

    fn count(status: Option<ToolStatus>, open_loans: i64) -> ToolLoanCount {
        ToolLoanCount {
            tool_barcode: "T-1".to_string(),
            tool_status: status,
            open_loans,
        }
    }

    #[test]
    fn test_loan_consistency() {
        assert!(check_loan_consistency(&count(Some(Borrowed), 1)).is_none());
        assert!(check_loan_consistency(&count(Some(Available), 0)).is_none());
        assert!(check_loan_consistency(&count(Some(Defective), 0)).is_none());

        let kind = |status, n| check_loan_consistency(&count(status, n)).map(|m| m.kind);
        assert_eq!(kind(Some(Borrowed), 0), Some(LoanMismatchKind::BorrowedWithoutLoan));
        assert_eq!(kind(Some(Available), 1), Some(LoanMismatchKind::LoanButNotBorrowed));
        assert_eq!(kind(Some(Defective), 1), Some(LoanMismatchKind::LoanButNotBorrowed));
        assert_eq!(kind(Some(Borrowed), 2), Some(LoanMismatchKind::MultipleOpenLoans));
        assert_eq!(kind(None, 1), Some(LoanMismatchKind::LoanForMissingTool));
    }

    #[test]
    fn test_only_available_is_lendable() {
        assert!(Available.is_lendable());
        assert!(!Borrowed.is_lendable());
        assert!(!Defective.is_lendable());
    }
}
