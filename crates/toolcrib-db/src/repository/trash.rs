//! # Trash Repository
//!
//! Database operations for `trash.db`: snapshots of soft-deleted workers,
//! tools and consumables, one table per kind.

use sqlx::SqlitePool;
use tracing::debug;

use crate::error::DbResult;
use toolcrib_core::{DeletedConsumable, DeletedTool, DeletedWorker, EntityKind};

fn table(kind: EntityKind) -> &'static str {
    match kind {
        EntityKind::Worker => "deleted_workers",
        EntityKind::Tool => "deleted_tools",
        EntityKind::Consumable => "deleted_consumables",
    }
}

/// Repository for trash database operations.
#[derive(Debug, Clone)]
pub struct TrashRepository {
    pool: SqlitePool,
}

impl TrashRepository {
    /// Creates a new TrashRepository.
    pub fn new(pool: SqlitePool) -> Self {
        TrashRepository { pool }
    }

    pub async fn insert_worker(&self, snapshot: &DeletedWorker) -> DbResult<()> {
        debug!(id = %snapshot.id, barcode = %snapshot.barcode, "Trashing worker");

        sqlx::query(
            r#"
            INSERT INTO deleted_workers (
                id, barcode, name, lastname, department, email, deleted_at, deleted_by
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(&snapshot.id)
        .bind(&snapshot.barcode)
        .bind(&snapshot.name)
        .bind(&snapshot.lastname)
        .bind(&snapshot.department)
        .bind(&snapshot.email)
        .bind(snapshot.deleted_at)
        .bind(&snapshot.deleted_by)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn insert_tool(&self, snapshot: &DeletedTool) -> DbResult<()> {
        debug!(id = %snapshot.id, barcode = %snapshot.barcode, "Trashing tool");

        sqlx::query(
            r#"
            INSERT INTO deleted_tools (
                id, barcode, description, location, category, status,
                image_ref, deleted_at, deleted_by
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
        )
        .bind(&snapshot.id)
        .bind(&snapshot.barcode)
        .bind(&snapshot.description)
        .bind(&snapshot.location)
        .bind(&snapshot.category)
        .bind(snapshot.status)
        .bind(&snapshot.image_ref)
        .bind(snapshot.deleted_at)
        .bind(&snapshot.deleted_by)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn insert_consumable(&self, snapshot: &DeletedConsumable) -> DbResult<()> {
        debug!(id = %snapshot.id, barcode = %snapshot.barcode, "Trashing consumable");

        sqlx::query(
            r#"
            INSERT INTO deleted_consumables (
                id, barcode, description, location, category, unit,
                minimum_stock, last_stock, deleted_at, deleted_by
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
        )
        .bind(&snapshot.id)
        .bind(&snapshot.barcode)
        .bind(&snapshot.description)
        .bind(&snapshot.location)
        .bind(&snapshot.category)
        .bind(&snapshot.unit)
        .bind(snapshot.minimum_stock)
        .bind(snapshot.last_stock)
        .bind(snapshot.deleted_at)
        .bind(&snapshot.deleted_by)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn get_worker(&self, id: &str) -> DbResult<Option<DeletedWorker>> {
        let row = sqlx::query_as::<_, DeletedWorker>("SELECT * FROM deleted_workers WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row)
    }

    pub async fn get_tool(&self, id: &str) -> DbResult<Option<DeletedTool>> {
        let row = sqlx::query_as::<_, DeletedTool>("SELECT * FROM deleted_tools WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row)
    }

    pub async fn get_consumable(&self, id: &str) -> DbResult<Option<DeletedConsumable>> {
        let row = sqlx::query_as::<_, DeletedConsumable>(
            "SELECT * FROM deleted_consumables WHERE id = ?1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    /// Deleted workers, newest first.
    pub async fn list_workers(&self) -> DbResult<Vec<DeletedWorker>> {
        let rows = sqlx::query_as::<_, DeletedWorker>(
            "SELECT * FROM deleted_workers ORDER BY deleted_at DESC",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// Deleted tools, newest first.
    pub async fn list_tools(&self) -> DbResult<Vec<DeletedTool>> {
        let rows = sqlx::query_as::<_, DeletedTool>(
            "SELECT * FROM deleted_tools ORDER BY deleted_at DESC",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// Deleted consumables, newest first.
    pub async fn list_consumables(&self) -> DbResult<Vec<DeletedConsumable>> {
        let rows = sqlx::query_as::<_, DeletedConsumable>(
            "SELECT * FROM deleted_consumables ORDER BY deleted_at DESC",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// Deletes one snapshot. Returns whether a row was removed.
    pub async fn delete(&self, kind: EntityKind, id: &str) -> DbResult<bool> {
        debug!(kind = %kind, id = %id, "Deleting trash row");

        // Table names come from a closed enum.
        let sql = format!("DELETE FROM {} WHERE id = ?1", table(kind));
        let result = sqlx::query(&sql).bind(id).execute(&self.pool).await?;

        Ok(result.rows_affected() == 1)
    }

    /// Deletes every snapshot of every kind in one transaction.
    pub async fn empty(&self) -> DbResult<u64> {
        let mut tx = self.pool.begin().await?;
        let mut removed = 0;

        for kind in EntityKind::ALL {
            let sql = format!("DELETE FROM {}", table(kind));
            removed += sqlx::query(&sql).execute(&mut *tx).await?.rows_affected();
        }

        tx.commit().await?;
        debug!(removed = removed, "Emptied trash");
        Ok(removed)
    }

    /// Whether any snapshot of this kind still carries the barcode.
    pub async fn holds_barcode(&self, kind: EntityKind, barcode: &str) -> DbResult<bool> {
        let sql = format!("SELECT EXISTS(SELECT 1 FROM {} WHERE barcode = ?1)", table(kind));
        let held: bool = sqlx::query_scalar(&sql).bind(barcode).fetch_one(&self.pool).await?;

        Ok(held)
    }

    /// Number of snapshots of one kind.
    pub async fn count(&self, kind: EntityKind) -> DbResult<i64> {
        let sql = format!("SELECT COUNT(*) FROM {}", table(kind));
        let count: i64 = sqlx::query_scalar(&sql).fetch_one(&self.pool).await?;

        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use crate::pool::{Database, DbConfig};
    use crate::repository::new_record_id;
    use toolcrib_core::{DeletedWorker, EntityKind};

    fn snapshot(barcode: &str) -> DeletedWorker {
        DeletedWorker {
            id: new_record_id(),
            barcode: barcode.to_string(),
            name: "Grace".to_string(),
            lastname: "Hopper".to_string(),
            department: None,
            email: None,
            deleted_at: Utc::now(),
            deleted_by: "admin".to_string(),
        }
    }

    #[tokio::test]
    async fn test_same_barcode_can_be_trashed_twice() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::new(DbConfig::new(dir.path())).await.unwrap();
        let repo = db.trash();

        repo.insert_worker(&snapshot("W-1")).await.unwrap();
        repo.insert_worker(&snapshot("W-1")).await.unwrap();
        assert_eq!(repo.count(EntityKind::Worker).await.unwrap(), 2);

        assert!(repo.holds_barcode(EntityKind::Worker, "W-1").await.unwrap());
        assert!(!repo.holds_barcode(EntityKind::Tool, "W-1").await.unwrap());

        assert_eq!(repo.empty().await.unwrap(), 2);
        assert!(!repo.holds_barcode(EntityKind::Worker, "W-1").await.unwrap());
        assert!(repo.list_workers().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete_reports_missing_row() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::new(DbConfig::new(dir.path())).await.unwrap();

        let row = snapshot("W-2");
        db.trash().insert_worker(&row).await.unwrap();
        assert!(db.trash().delete(EntityKind::Worker, &row.id).await.unwrap());
        assert!(!db.trash().delete(EntityKind::Worker, &row.id).await.unwrap());
    }
}
