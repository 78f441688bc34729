//! # Error Types
//!
//! Domain-specific error types for toolcrib-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  toolcrib-core errors (this file)                                       │
//! │  ├── CoreError        - Domain rule violations                          │
//! │  ├── ValidationError  - Input validation failures                       │
//! │  └── PartialFailure   - Saga step 2 failed after step 1 committed       │
//! │                                                                         │
//! │  toolcrib-db errors (separate crate)                                    │
//! │  └── DbError          - Storage failures                                │
//! │                                                                         │
//! │  toolcrib-ledger errors                                                 │
//! │  └── LedgerError      - What callers see, with a stable ErrorCode       │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError ┐                                    │
//! │                         DbError ───┴→ LedgerError → presentation layer  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;
use ts_rs::TS;

use crate::types::{EntityKind, ToolStatus};

// =============================================================================
// Core Error
// =============================================================================

/// Domain errors of the inventory and lending ledger.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Entity with this barcode (or trash id) does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// Amount or delta is zero, negative, or absurdly large.
    #[error("Invalid amount: {amount}")]
    InvalidAmount { amount: i64 },

    /// Not enough stock for a consumption or a negative adjustment.
    ///
    /// ## User Workflow
    /// ```text
    /// Consume 10 × SCREW-4
    ///      │
    ///      ▼
    /// Conditional update: current_stock + (-10) >= 0 ? ── no
    ///      │
    ///      ▼
    /// InsufficientStock { barcode: "SCREW-4", available: 5, requested: 10 }
    ///      │
    ///      ▼
    /// UI shows: "Only 5 SCREW-4 in stock"
    /// ```
    #[error("Insufficient stock for {barcode}: available {available}, requested {requested}")]
    InsufficientStock {
        barcode: String,
        available: i64,
        requested: i64,
    },

    /// Tool cannot be checked out in its current status.
    #[error("Tool {barcode} is not available (status: {status})")]
    NotAvailable { barcode: String, status: ToolStatus },

    /// Return of a tool that has no open loan.
    #[error("No active lending for tool {barcode}")]
    NoActiveLending { barcode: String },

    /// Delete blocked by open loans.
    #[error("{kind} {barcode} has {count} active lending(s)")]
    HasActiveLendings {
        kind: EntityKind,
        barcode: String,
        count: i64,
    },

    /// Restore target barcode is already taken by a live record.
    #[error("A {kind} with barcode {barcode} already exists")]
    BarcodeConflict { kind: EntityKind, barcode: String },

    /// Create with a barcode that is already in use.
    #[error("{kind} barcode '{barcode}' already exists")]
    Duplicate { kind: EntityKind, barcode: String },

    /// Caller lacks the admin role.
    #[error("{actor} is not allowed to perform this operation")]
    Forbidden { actor: String },

    /// A cross-partition operation stopped half way. See [`PartialFailure`].
    #[error("{0}")]
    PartialFailure(Box<PartialFailure>),

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl CoreError {
    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        CoreError::NotFound {
            entity,
            id: id.into(),
        }
    }
}

impl From<PartialFailure> for CoreError {
    fn from(failure: PartialFailure) -> Self {
        CoreError::PartialFailure(Box::new(failure))
    }
}

// =============================================================================
// Partial Failure
// =============================================================================

/// Report of a two-step operation whose second step failed.
///
/// ```text
///   step 1 (committed) ──► step 2 (failed) ──► compensation of step 1
///                                                  │
///                                  ok ─────────────┴──────────── failed
///                              compensated: true            compensated: false
///                              (state as before)            (needs a human:
///                                                            see before/after)
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PartialFailure {
    /// Operation name, e.g. "checkout".
    pub operation: String,
    /// Barcode of the item or record the operation targeted.
    pub barcode: String,
    /// Step that committed.
    pub completed: String,
    /// Step that failed.
    pub failed: String,
    /// Error of the failed step.
    pub cause: String,
    /// Whether the completed step was undone.
    pub compensated: bool,
    /// Snapshot before step 1.
    #[ts(type = "unknown")]
    pub before: serde_json::Value,
    /// Snapshot after step 1, before compensation.
    #[ts(type = "unknown")]
    pub after: serde_json::Value,
}

impl std::fmt::Display for PartialFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} of {} partially failed: {} succeeded, {} failed ({}); {}",
            self.operation,
            self.barcode,
            self.completed,
            self.failed,
            self.cause,
            if self.compensated {
                "compensated"
            } else {
                "NOT compensated, manual reconciliation required"
            }
        )
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These errors occur when user input doesn't meet requirements.
/// Used for early validation before any partition is touched.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Invalid format (e.g., barcode with spaces, malformed email).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Value is not in allowed set.
    #[error("{field} must be one of: {allowed:?}")]
    NotAllowed { field: String, allowed: Vec<String> },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================
