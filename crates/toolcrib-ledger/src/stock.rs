//! # Consumable Stock Ledger
//!
//! Every stock change is one conditional update plus one history row in
//! `consumables.db`. Consumption additionally writes a lending row in
//! `lendings.db`, which makes it a two-step saga:
//!
//! ```text
//!   consume(C-1, 3, W-1)
//!        │
//!        ├── 1. stock -3            (consumables.db, conditional)
//!        │        └── no row ──► NotFound / InsufficientStock
//!        │
//!        └── 2. consumption row     (lendings.db)
//!                 └── failed ──► stock +3 as `compensation`
//!                                 └──► PartialFailure { compensated }
//! ```

use chrono::Utc;
use serde_json::json;
use tracing::info;

use crate::error::{report_partial_failure, LedgerError, LedgerResult};
use toolcrib_core::stock::apply_delta;
use toolcrib_core::validation::{validate_amount, validate_delta};
use toolcrib_core::{
    Actor, AdminCapability, Consumable, ConsumableStatus, CoreError, PartialFailure, StockAction,
    StockChange, StockMovement,
};
use toolcrib_db::{Database, DbError, StockEntry};

/// Owns consumable stock levels.
#[derive(Debug, Clone)]
pub struct StockLedger {
    db: Database,
}

impl StockLedger {
    pub fn new(db: Database) -> Self {
        StockLedger { db }
    }

    /// Admin correction of the stock level by `delta`. Returns the new stock.
    ///
    /// ## Errors
    /// * `InvalidAmount` - `delta` is zero or out of range
    /// * `InsufficientStock` - the result would be negative
    /// * `NotFound` - unknown barcode
    pub async fn adjust(
        &self,
        barcode: &str,
        delta: i64,
        admin: &AdminCapability,
        comment: Option<&str>,
    ) -> LedgerResult<i64> {
        validate_delta(delta)?;

        let entry = StockEntry {
            action: StockAction::Adjustment,
            worker_barcode: None,
            comment,
            changed_by: admin.name(),
        };

        let Some(change) = self.db.consumables().adjust(barcode, delta, entry).await? else {
            return Err(self.rejected(barcode, delta).await);
        };

        info!(
            barcode = %barcode,
            delta = delta,
            old_stock = change.old_stock,
            new_stock = change.new_stock,
            by = %admin.name(),
            "Stock adjusted"
        );
        Ok(change.new_stock)
    }

    /// A worker draws `amount` units.
    ///
    /// ## Errors
    /// * `InvalidAmount` - `amount < 1`
    /// * `NotFound` - unknown worker or consumable
    /// * `InsufficientStock` - less than `amount` in stock
    /// * `PartialFailure` - stock was taken but the consumption row could
    ///   not be written
    pub async fn consume(
        &self,
        barcode: &str,
        amount: i64,
        worker_barcode: &str,
        actor: &Actor,
    ) -> LedgerResult<StockChange> {
        validate_amount(amount)?;

        if !self.db.workers().exists(worker_barcode).await? {
            return Err(CoreError::not_found("worker", worker_barcode).into());
        }

        let entry = StockEntry {
            action: StockAction::Consumption,
            worker_barcode: Some(worker_barcode),
            comment: None,
            changed_by: &actor.name,
        };
        let Some(change) = self.db.consumables().adjust(barcode, -amount, entry).await? else {
            return Err(self.rejected(barcode, -amount).await);
        };

        let recorded = self
            .db
            .lendings()
            .insert_consumption(worker_barcode, barcode, amount, change, Utc::now())
            .await;

        match recorded {
            Ok(lending) => {
                info!(
                    barcode = %barcode,
                    worker = %worker_barcode,
                    amount = amount,
                    new_stock = change.new_stock,
                    lending_id = %lending.id,
                    "Consumption recorded"
                );
                Ok(change)
            }
            Err(cause) => {
                let refund = StockEntry {
                    action: StockAction::Compensation,
                    worker_barcode: Some(worker_barcode),
                    comment: Some("consumption row could not be written"),
                    changed_by: &actor.name,
                };
                let compensated = matches!(
                    self.db.consumables().adjust(barcode, amount, refund).await,
                    Ok(Some(_))
                );

                let failure = PartialFailure {
                    operation: "consume".to_string(),
                    barcode: barcode.to_string(),
                    completed: "stock decrement".to_string(),
                    failed: "consumption lending insert".to_string(),
                    cause: cause.to_string(),
                    compensated,
                    before: json!({ "current_stock": change.old_stock }),
                    after: json!({
                        "current_stock": change.new_stock,
                        "worker_barcode": worker_barcode,
                        "amount": amount,
                    }),
                };
                Err(report_partial_failure(failure))
            }
        }
    }

    /// Derived status. The cached status column is never consulted.
    #[inline]
    pub fn status_of(consumable: &Consumable) -> ConsumableStatus {
        consumable.status()
    }

    /// Derived status of one consumable by barcode.
    pub async fn status(&self, barcode: &str) -> LedgerResult<ConsumableStatus> {
        let consumable = self
            .db
            .consumables()
            .get(barcode)
            .await?
            .ok_or_else(|| CoreError::not_found("consumable", barcode))?;

        Ok(Self::status_of(&consumable))
    }

    /// Stock history, newest first.
    pub async fn stock_history(&self, barcode: &str) -> LedgerResult<Vec<StockMovement>> {
        Ok(self.db.consumables().stock_history(barcode).await?)
    }

    /// Consumables at or below their minimum, emptiest first.
    pub async fn reorder_list(&self) -> LedgerResult<Vec<Consumable>> {
        let mut low: Vec<Consumable> = self
            .db
            .consumables()
            .list(None, None)
            .await?
            .into_iter()
            .filter(|c| Self::status_of(c).needs_reorder())
            .collect();

        low.sort_by_key(|c| c.current_stock - c.minimum_stock);
        Ok(low)
    }

    /// Tells an unknown barcode apart from a stock shortfall after a
    /// conditional update matched no row.
    async fn rejected(&self, barcode: &str, delta: i64) -> LedgerError {
        let available = match self.db.consumables().current_stock(barcode).await {
            Ok(Some(available)) => available,
            Ok(None) => return CoreError::not_found("consumable", barcode).into(),
            Err(e) => return e.into(),
        };

        match apply_delta(barcode, available, delta) {
            Err(shortfall) => shortfall.into(),
            // Stock moved between the update and this read
            Ok(_) => DbError::Conflict {
                entity: "consumable".to_string(),
                id: barcode.to_string(),
                attempts: 1,
            }
            .into(),
        }
    }
}
