//! # Lending Engine
//!
//! The cross-partition coordinator. Tool loans touch `tools.db` and
//! `lendings.db`, which share no transaction, so each operation is an
//! ordered two-step saga with a compensating step.
//!
//! ## Checkout
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  worker exists?  tool exists?  tool Available?    (reads)               │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  1. tools.db     Available ──► Borrowed   (compare-and-set)             │
//! │       │              └── lost the race ──► NotAvailable                 │
//! │       ▼                                                                 │
//! │  2. lendings.db  INSERT open loan                                       │
//! │       │              └── failed ──► Borrowed ──► Available              │
//! │       ▼                              └──► PartialFailure                │
//! │  Lending                                                                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Return
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  open loan?  ── none ──► NoActiveLending                                │
//! │       │                                                                 │
//! │  1. lendings.db  return_time = now  WHERE return_time IS NULL           │
//! │       │              └── lost the race ──► NoActiveLending              │
//! │       ▼                                                                 │
//! │  2. tools.db     Borrowed ──► Available   (Defective stays Defective)   │
//! │       │              └── failed ──► re-open loan ──► PartialFailure     │
//! │       ▼                                                                 │
//! │  Lending (closed)                                                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use serde_json::json;
use tracing::{info, warn};

use crate::error::{report_partial_failure, LedgerResult};
use crate::stock::StockLedger;
use crate::tool_state::ToolStateMachine;
use toolcrib_core::state::check_loan_consistency;
use toolcrib_core::{
    Actor, CoreError, Lending, LoanMismatch, PartialFailure, StockChange, ToolStatus,
    TransitionPlan,
};
use toolcrib_db::Database;

/// Checkout, return and consumption of items by workers.
#[derive(Debug, Clone)]
pub struct LendingEngine {
    db: Database,
    tools: ToolStateMachine,
    stock: StockLedger,
}

impl LendingEngine {
    pub fn new(db: Database, tools: ToolStateMachine, stock: StockLedger) -> Self {
        LendingEngine { db, tools, stock }
    }

    /// Lends an `Available` tool to a worker.
    ///
    /// Of two concurrent checkouts of one tool exactly one succeeds; the
    /// other gets `NotAvailable`.
    pub async fn checkout(
        &self,
        tool_barcode: &str,
        worker_barcode: &str,
        actor: &Actor,
    ) -> LedgerResult<Lending> {
        if !self.db.workers().exists(worker_barcode).await? {
            return Err(CoreError::not_found("worker", worker_barcode).into());
        }

        let tool = self
            .db
            .tools()
            .get(tool_barcode)
            .await?
            .ok_or_else(|| CoreError::not_found("tool", tool_barcode))?;

        if !tool.status.is_lendable() {
            return Err(CoreError::NotAvailable {
                barcode: tool.barcode,
                status: tool.status,
            }
            .into());
        }

        let plan = self
            .tools
            .transition_from(
                tool_barcode,
                ToolStatus::Available,
                ToolStatus::Borrowed,
                Some("checkout"),
                actor,
            )
            .await?;

        let opened = self
            .db
            .lendings()
            .insert_loan(worker_barcode, tool_barcode, Utc::now())
            .await;

        match opened {
            Ok(lending) => {
                info!(
                    tool = %tool_barcode,
                    worker = %worker_barcode,
                    lending_id = %lending.id,
                    by = %actor.name,
                    "Tool checked out"
                );
                Ok(lending)
            }
            Err(cause) => {
                let compensated = self.undo_borrow(tool_barcode, &plan, actor).await;

                let failure = PartialFailure {
                    operation: "checkout".to_string(),
                    barcode: tool_barcode.to_string(),
                    completed: "tool status available -> borrowed".to_string(),
                    failed: "lending insert".to_string(),
                    cause: cause.to_string(),
                    compensated,
                    before: json!({ "tool": tool }),
                    after: json!({
                        "status": ToolStatus::Borrowed,
                        "worker_barcode": worker_barcode,
                    }),
                };
                Err(report_partial_failure(failure))
            }
        }
    }

    /// Takes a lent tool back. A tool that went `Defective` while lent stays
    /// `Defective`.
    pub async fn return_tool(&self, tool_barcode: &str, actor: &Actor) -> LedgerResult<Lending> {
        let no_loan = || CoreError::NoActiveLending {
            barcode: tool_barcode.to_string(),
        };

        let mut loan = self
            .db
            .lendings()
            .find_open_loan(tool_barcode)
            .await?
            .ok_or_else(no_loan)?;

        let returned_at = Utc::now();
        if !self.db.lendings().close_loan(&loan.id, returned_at).await? {
            return Err(no_loan().into());
        }

        match self.tools.release(tool_barcode, actor).await {
            Ok(status) => {
                if status.is_none() {
                    warn!(tool = %tool_barcode, lending_id = %loan.id, "Closed loan of a tool that no longer exists");
                }
                info!(
                    tool = %tool_barcode,
                    worker = %loan.worker_barcode,
                    lending_id = %loan.id,
                    status = ?status,
                    by = %actor.name,
                    "Tool returned"
                );
                loan.return_time = Some(returned_at);
                Ok(loan)
            }
            Err(cause) => {
                let compensated = matches!(self.db.lendings().reopen_loan(&loan.id).await, Ok(true));

                let failure = PartialFailure {
                    operation: "return".to_string(),
                    barcode: tool_barcode.to_string(),
                    completed: "lending closed".to_string(),
                    failed: "tool status borrowed -> available".to_string(),
                    cause: cause.to_string(),
                    compensated,
                    before: json!({ "lending": loan }),
                    after: json!({ "lending_id": loan.id, "return_time": returned_at }),
                };
                Err(report_partial_failure(failure))
            }
        }
    }

    /// Records a worker drawing consumable stock. See [`StockLedger::consume`].
    pub async fn consume(
        &self,
        consumable_barcode: &str,
        amount: i64,
        worker_barcode: &str,
        actor: &Actor,
    ) -> LedgerResult<StockChange> {
        self.stock
            .consume(consumable_barcode, amount, worker_barcode, actor)
            .await
    }

    /// Every violation of "Borrowed exactly when one open loan exists".
    ///
    /// Read-only; fixing what it finds is an admin decision.
    pub async fn reconcile(&self) -> LedgerResult<Vec<LoanMismatch>> {
        let mismatches: Vec<LoanMismatch> = self
            .db
            .reports()
            .tool_loan_counts()
            .await?
            .iter()
            .filter_map(check_loan_consistency)
            .collect();

        if !mismatches.is_empty() {
            warn!(count = mismatches.len(), "Tool/lending inconsistencies found");
        }
        Ok(mismatches)
    }

    async fn undo_borrow(&self, tool_barcode: &str, plan: &TransitionPlan, actor: &Actor) -> bool {
        self.tools
            .transition_from(
                tool_barcode,
                plan.to,
                plan.from,
                Some("checkout compensation"),
                actor,
            )
            .await
            .is_ok()
    }
}
