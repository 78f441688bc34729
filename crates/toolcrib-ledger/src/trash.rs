//! # Trash Manager
//!
//! Soft delete moves a record's snapshot into `trash.db` and removes the live
//! row; restore goes the other way. The two files share no transaction, so
//! both directions write the destination first and undo it if removing the
//! source fails.
//!
//! ```text
//!   soft_delete                         restore
//!   ───────────                         ───────
//!   open loans? ──► HasActiveLendings   snapshot? ──► NotFound
//!   1. INSERT snapshot (trash.db)       1. INSERT live row
//!   2. DELETE live row                       └── barcode taken ──► BarcodeConflict
//!        └── failed ──► DELETE snapshot 2. DELETE snapshot (trash.db)
//!                       PartialFailure       └── failed ──► DELETE live row
//!                                                           PartialFailure
//! ```
//!
//! Restoring into a barcode that is live again is always rejected with
//! `BarcodeConflict`, for every kind.

use chrono::Utc;
use serde_json::json;
use tracing::{info, warn};

use crate::error::{report_partial_failure, LedgerError, LedgerResult};
use toolcrib_core::{
    AdminCapability, CoreError, DeletedConsumable, DeletedTool, DeletedWorker, EntityKind,
    PartialFailure, RestoredRecord, TrashedRecord,
};
use toolcrib_db::{new_record_id, Database, DbResult};

/// Soft delete, restore and purge of workers, tools and consumables.
#[derive(Debug, Clone)]
pub struct TrashManager {
    db: Database,
}

impl TrashManager {
    pub fn new(db: Database) -> Self {
        TrashManager { db }
    }

    /// Moves a live record into the trash. Returns the trash id.
    ///
    /// ## Errors
    /// * `NotFound` - no live record with this barcode
    /// * `HasActiveLendings` - a worker or tool with open loans
    /// * `PartialFailure` - the live row could not be removed
    pub async fn soft_delete(
        &self,
        kind: EntityKind,
        barcode: &str,
        admin: &AdminCapability,
    ) -> LedgerResult<String> {
        let snapshot = self.snapshot(kind, barcode, admin).await?;

        self.insert_snapshot(&snapshot).await?;

        if let Err(cause) = self.delete_live(kind, barcode).await {
            let compensated = matches!(self.db.trash().delete(kind, snapshot.id()).await, Ok(true));

            let failure = PartialFailure {
                operation: "soft_delete".to_string(),
                barcode: barcode.to_string(),
                completed: "trash snapshot insert".to_string(),
                failed: format!("{} delete", kind),
                cause: cause.to_string(),
                compensated,
                before: json!({ "live": snapshot }),
                after: json!({ "trash_id": snapshot.id() }),
            };
            return Err(report_partial_failure(failure));
        }

        info!(kind = %kind, barcode = %barcode, trash_id = %snapshot.id(), by = %admin.name(), "Record moved to trash");
        Ok(snapshot.id().to_string())
    }

    /// Brings a trashed record back under its barcode.
    ///
    /// Tools come back `Available` without a defect timestamp; consumables
    /// come back with their last known stock.
    pub async fn restore(
        &self,
        kind: EntityKind,
        trash_id: &str,
        admin: &AdminCapability,
    ) -> LedgerResult<RestoredRecord> {
        let snapshot = self
            .get(kind, trash_id)
            .await?
            .ok_or_else(|| CoreError::not_found("trash record", trash_id))?;
        let barcode = snapshot.barcode().to_string();

        match self.insert_live(&snapshot).await {
            Ok(()) => {}
            Err(e) if e.is_unique_violation() => {
                return Err(CoreError::BarcodeConflict { kind, barcode }.into());
            }
            Err(e) => return Err(e.into()),
        }

        match self.db.trash().delete(kind, trash_id).await {
            Ok(true) => {}
            Ok(false) => {
                warn!(kind = %kind, trash_id = %trash_id, "Trash row vanished during restore");
            }
            Err(cause) => {
                let compensated = self.delete_live(kind, &barcode).await.is_ok();

                let failure = PartialFailure {
                    operation: "restore".to_string(),
                    barcode,
                    completed: format!("{} insert", kind),
                    failed: "trash snapshot delete".to_string(),
                    cause: cause.to_string(),
                    compensated,
                    before: json!({ "trash": snapshot }),
                    after: json!({ "restored": true }),
                };
                return Err(report_partial_failure(failure));
            }
        }

        info!(kind = %kind, barcode = %barcode, trash_id = %trash_id, by = %admin.name(), "Record restored");
        Ok(RestoredRecord { kind, barcode })
    }

    /// Purges the trash of all three kinds. Returns the number of rows removed.
    pub async fn empty_trash(&self, admin: &AdminCapability) -> LedgerResult<u64> {
        let removed = self.db.trash().empty().await?;
        info!(removed = removed, by = %admin.name(), "Trash emptied");
        Ok(removed)
    }

    /// Purges one trash row.
    pub async fn permanently_delete(
        &self,
        kind: EntityKind,
        trash_id: &str,
        admin: &AdminCapability,
    ) -> LedgerResult<()> {
        if !self.db.trash().delete(kind, trash_id).await? {
            return Err(CoreError::not_found("trash record", trash_id).into());
        }

        info!(kind = %kind, trash_id = %trash_id, by = %admin.name(), "Trash record purged");
        Ok(())
    }

    /// Trash rows of one kind, newest first.
    pub async fn list(&self, kind: EntityKind) -> LedgerResult<Vec<TrashedRecord>> {
        let trash = self.db.trash();
        let records = match kind {
            EntityKind::Worker => trash
                .list_workers()
                .await?
                .into_iter()
                .map(TrashedRecord::Worker)
                .collect(),
            EntityKind::Tool => trash
                .list_tools()
                .await?
                .into_iter()
                .map(TrashedRecord::Tool)
                .collect(),
            EntityKind::Consumable => trash
                .list_consumables()
                .await?
                .into_iter()
                .map(TrashedRecord::Consumable)
                .collect(),
        };
        Ok(records)
    }

    /// One trash row by id.
    pub async fn get(&self, kind: EntityKind, trash_id: &str) -> LedgerResult<Option<TrashedRecord>> {
        let trash = self.db.trash();
        let record = match kind {
            EntityKind::Worker => trash.get_worker(trash_id).await?.map(TrashedRecord::Worker),
            EntityKind::Tool => trash.get_tool(trash_id).await?.map(TrashedRecord::Tool),
            EntityKind::Consumable => trash
                .get_consumable(trash_id)
                .await?
                .map(TrashedRecord::Consumable),
        };
        Ok(record)
    }

    /// Reads the live record and checks it may be deleted.
    async fn snapshot(
        &self,
        kind: EntityKind,
        barcode: &str,
        admin: &AdminCapability,
    ) -> LedgerResult<TrashedRecord> {
        let id = new_record_id();
        let deleted_at = Utc::now();
        let deleted_by = admin.name().to_string();

        let record = match kind {
            EntityKind::Worker => {
                let worker = self
                    .db
                    .workers()
                    .get(barcode)
                    .await?
                    .ok_or_else(|| CoreError::not_found("worker", barcode))?;

                let open = self.db.lendings().count_open_for_worker(barcode).await?;
                if open > 0 {
                    return Err(has_active_lendings(kind, barcode, open));
                }

                TrashedRecord::Worker(DeletedWorker {
                    id,
                    barcode: worker.barcode,
                    name: worker.name,
                    lastname: worker.lastname,
                    department: worker.department,
                    email: worker.email,
                    deleted_at,
                    deleted_by,
                })
            }
            EntityKind::Tool => {
                let tool = self
                    .db
                    .tools()
                    .get(barcode)
                    .await?
                    .ok_or_else(|| CoreError::not_found("tool", barcode))?;

                let open = self.db.lendings().count_open_for_tool(barcode).await?;
                if open > 0 {
                    return Err(has_active_lendings(kind, barcode, open));
                }

                TrashedRecord::Tool(DeletedTool {
                    id,
                    barcode: tool.barcode,
                    description: tool.description,
                    location: tool.location,
                    category: tool.category,
                    status: tool.status,
                    image_ref: tool.image_ref,
                    deleted_at,
                    deleted_by,
                })
            }
            EntityKind::Consumable => {
                let consumable = self
                    .db
                    .consumables()
                    .get(barcode)
                    .await?
                    .ok_or_else(|| CoreError::not_found("consumable", barcode))?;

                TrashedRecord::Consumable(DeletedConsumable {
                    id,
                    barcode: consumable.barcode,
                    description: consumable.description,
                    location: consumable.location,
                    category: consumable.category,
                    unit: consumable.unit,
                    minimum_stock: consumable.minimum_stock,
                    last_stock: consumable.current_stock,
                    deleted_at,
                    deleted_by,
                })
            }
        };
        Ok(record)
    }

    async fn insert_snapshot(&self, snapshot: &TrashedRecord) -> DbResult<()> {
        let trash = self.db.trash();
        match snapshot {
            TrashedRecord::Worker(w) => trash.insert_worker(w).await,
            TrashedRecord::Tool(t) => trash.insert_tool(t).await,
            TrashedRecord::Consumable(c) => trash.insert_consumable(c).await,
        }
    }

    async fn insert_live(&self, snapshot: &TrashedRecord) -> DbResult<()> {
        match snapshot {
            TrashedRecord::Worker(w) => self.db.workers().insert_restored(w).await.map(drop),
            TrashedRecord::Tool(t) => self.db.tools().insert_restored(t).await.map(drop),
            TrashedRecord::Consumable(c) => self.db.consumables().insert_restored(c).await.map(drop),
        }
    }

    async fn delete_live(&self, kind: EntityKind, barcode: &str) -> DbResult<()> {
        match kind {
            EntityKind::Worker => self.db.workers().delete(barcode).await,
            EntityKind::Tool => self.db.tools().delete(barcode).await,
            EntityKind::Consumable => self.db.consumables().delete(barcode).await,
        }
    }
}

fn has_active_lendings(kind: EntityKind, barcode: &str, count: i64) -> LedgerError {
    CoreError::HasActiveLendings {
        kind,
        barcode: barcode.to_string(),
        count,
    }
    .into()
}
