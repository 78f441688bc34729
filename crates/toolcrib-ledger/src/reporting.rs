//! # Reporting
//!
//! Read-only joined views over the lending partition with worker and item
//! names resolved from their partitions. Never cached: every call reads the
//! partition files.

use toolcrib_core::LendingView;
use toolcrib_db::{Database, LendingScope};

use crate::config::LedgerSettings;
use crate::error::LedgerResult;

/// Query façade for the presentation layer.
#[derive(Debug, Clone)]
pub struct Reports {
    db: Database,
    settings: LedgerSettings,
}

impl Reports {
    pub fn new(db: Database, settings: LedgerSettings) -> Self {
        Reports { db, settings }
    }

    /// Every open tool loan.
    pub async fn active_loans(&self) -> LedgerResult<Vec<LendingView>> {
        self.view(LendingScope::ActiveLoans, None).await
    }

    /// Open tool loans of one worker.
    pub async fn active_loans_for_worker(&self, worker_barcode: &str) -> LedgerResult<Vec<LendingView>> {
        self.view(LendingScope::ActiveLoansOf(worker_barcode), None).await
    }

    /// Loans and consumptions of one tool or consumable.
    pub async fn item_history(&self, item_barcode: &str) -> LedgerResult<Vec<LendingView>> {
        self.view(LendingScope::Item(item_barcode), None).await
    }

    /// Loans and consumptions of one worker.
    pub async fn worker_history(&self, worker_barcode: &str) -> LedgerResult<Vec<LendingView>> {
        self.view(LendingScope::Worker(worker_barcode), None).await
    }

    /// A worker's latest consumptions, `recent_consumptions_limit` rows.
    pub async fn recent_consumptions(&self, worker_barcode: &str) -> LedgerResult<Vec<LendingView>> {
        self.view(
            LendingScope::ConsumptionsOf(worker_barcode),
            Some(self.settings.recent_consumptions_limit),
        )
        .await
    }

    /// Latest loans and consumptions of everyone, `recent_activity_limit` rows.
    pub async fn recent_activity(&self) -> LedgerResult<Vec<LendingView>> {
        self.view(LendingScope::All, Some(self.settings.recent_activity_limit))
            .await
    }

    async fn view(&self, scope: LendingScope<'_>, limit: Option<i64>) -> LedgerResult<Vec<LendingView>> {
        Ok(self.db.reports().lendings(scope, limit).await?)
    }
}
