//! # Tool State Machine
//!
//! Status transitions of tools and their audit trail.
//!
//! ## Compare-and-Set Loop
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  attempt 1..=cas_retries                                                │
//! │     │                                                                   │
//! │     ├── read status ───────────── missing ──► NotFound                  │
//! │     ├── plan_transition(current, requested)                             │
//! │     │        └── same status ──► no-op, no history row                  │
//! │     └── UPDATE ... WHERE status = current  (+ history row, one tx)      │
//! │              ├── 1 row  ──► done                                        │
//! │              └── 0 rows ──► someone else moved it, read again           │
//! │                                                                         │
//! │  retries exhausted ──► DbError::Conflict                                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Manual transitions are admin overrides: any edge is accepted, and edges
//! outside the normal machine are logged at `warn`. The Borrowed ⟺ open loan
//! invariant is the lending engine's business, not this module's.

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::error::LedgerResult;
use toolcrib_core::{
    plan_transition, Actor, AdminCapability, CoreError, Tool, ToolStatus, ToolStatusChange,
    TransitionPlan,
};
use toolcrib_db::{Database, DbError};

/// Owns tool status changes.
#[derive(Debug, Clone)]
pub struct ToolStateMachine {
    db: Database,
    cas_retries: u32,
}

impl ToolStateMachine {
    pub fn new(db: Database, cas_retries: u32) -> Self {
        ToolStateMachine {
            db,
            cas_retries: cas_retries.max(1),
        }
    }

    /// Moves a tool to `new_status` on an admin's request.
    ///
    /// Requesting the current status is a no-op. Returns the tool as it is
    /// afterwards.
    pub async fn transition(
        &self,
        barcode: &str,
        new_status: ToolStatus,
        comment: Option<&str>,
        admin: &AdminCapability,
    ) -> LedgerResult<Tool> {
        match self.apply(barcode, new_status, comment, admin.name()).await? {
            Some(plan) if plan.is_override => warn!(
                barcode = %barcode,
                from = %plan.from,
                to = %plan.to,
                by = %admin.name(),
                "Tool status override outside the normal lifecycle"
            ),
            Some(plan) => info!(
                barcode = %barcode,
                from = %plan.from,
                to = %plan.to,
                by = %admin.name(),
                "Tool status changed"
            ),
            None => debug!(barcode = %barcode, status = %new_status, "Tool already in requested status"),
        }

        self.db
            .tools()
            .get(barcode)
            .await?
            .ok_or_else(|| CoreError::not_found("tool", barcode).into())
    }

    /// Single conditional move from `expected` to `new_status`.
    ///
    /// Fails `NotAvailable` (carrying the actual status) when the tool is not
    /// in `expected`, and `NotFound` when there is no such tool.
    pub async fn transition_from(
        &self,
        barcode: &str,
        expected: ToolStatus,
        new_status: ToolStatus,
        comment: Option<&str>,
        actor: &Actor,
    ) -> LedgerResult<TransitionPlan> {
        let plan = TransitionPlan {
            from: expected,
            to: new_status,
            defect_timestamp: (new_status == ToolStatus::Defective).then(Utc::now),
            is_override: !expected.can_transition_to(new_status),
        };

        let moved = self
            .db
            .tools()
            .compare_and_set_status(barcode, &plan, comment, &actor.name)
            .await?;
        if moved {
            return Ok(plan);
        }

        match self.db.tools().status(barcode).await? {
            None => Err(CoreError::not_found("tool", barcode).into()),
            Some(status) => Err(CoreError::NotAvailable {
                barcode: barcode.to_string(),
                status,
            }
            .into()),
        }
    }

    /// Puts a returned tool back on the shelf.
    ///
    /// `Borrowed` becomes `Available`; `Defective` stays `Defective`.
    /// Returns the status the tool ends up in, or `None` when the tool row
    /// is gone.
    pub async fn release(&self, barcode: &str, actor: &Actor) -> LedgerResult<Option<ToolStatus>> {
        for attempt in 1..=self.cas_retries {
            let Some(current) = self.db.tools().status(barcode).await? else {
                return Ok(None);
            };
            let Some(next) = current.after_return() else {
                return Ok(Some(current));
            };

            let plan = TransitionPlan {
                from: current,
                to: next,
                defect_timestamp: None,
                is_override: false,
            };
            if self
                .db
                .tools()
                .compare_and_set_status(barcode, &plan, Some("returned"), &actor.name)
                .await?
            {
                return Ok(Some(next));
            }

            debug!(barcode = %barcode, attempt, "Tool status changed during return, retrying");
        }

        Err(self.conflict(barcode).into())
    }

    /// Status history, newest first.
    pub async fn status_history(&self, barcode: &str) -> LedgerResult<Vec<ToolStatusChange>> {
        Ok(self.db.tools().status_history(barcode).await?)
    }

    async fn apply(
        &self,
        barcode: &str,
        requested: ToolStatus,
        comment: Option<&str>,
        changed_by: &str,
    ) -> LedgerResult<Option<TransitionPlan>> {
        for attempt in 1..=self.cas_retries {
            let current = self
                .db
                .tools()
                .status(barcode)
                .await?
                .ok_or_else(|| CoreError::not_found("tool", barcode))?;

            let Some(plan) = plan_transition(current, requested, Utc::now()) else {
                return Ok(None);
            };

            if self
                .db
                .tools()
                .compare_and_set_status(barcode, &plan, comment, changed_by)
                .await?
            {
                return Ok(Some(plan));
            }

            debug!(barcode = %barcode, attempt, "Tool status changed underneath, retrying");
        }

        Err(self.conflict(barcode).into())
    }

    fn conflict(&self, barcode: &str) -> DbError {
        DbError::Conflict {
            entity: "Tool".to_string(),
            id: barcode.to_string(),
            attempts: self.cas_retries,
        }
    }
}
