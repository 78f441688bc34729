//! # Consumable Repository
//!
//! Database operations for `consumables.db`: consumables and their stock
//! history.
//!
//! ## Conditional Stock Update
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  BEGIN                                                                  │
//! │    UPDATE consumables                                                   │
//! │       SET current_stock = current_stock + Δ                             │
//! │     WHERE barcode = ? AND current_stock + Δ >= 0                        │
//! │    RETURNING current_stock, minimum_stock                               │
//! │    no row? ── rollback (unknown barcode or not enough stock)            │
//! │    UPDATE consumables SET status = <derived>     (display cache)        │
//! │    INSERT INTO stock_history (Δ, old, new, ...)                         │
//! │  COMMIT                                                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//! There is no read before the write, so no lost update between a check
//! and a decrement.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::{DbError, DbResult};
use toolcrib_core::{
    Consumable, ConsumableStatus, ConsumableUpdate, DeletedConsumable, NewConsumable,
    StockAction, StockChange, StockMovement,
};

/// Audit data written alongside a stock change.
#[derive(Debug, Clone, Copy)]
pub struct StockEntry<'a> {
    pub action: StockAction,
    pub worker_barcode: Option<&'a str>,
    pub comment: Option<&'a str>,
    pub changed_by: &'a str,
}

/// Repository for consumable database operations.
#[derive(Debug, Clone)]
pub struct ConsumableRepository {
    pool: SqlitePool,
}

impl ConsumableRepository {
    /// Creates a new ConsumableRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ConsumableRepository { pool }
    }

    /// Gets a consumable by barcode.
    pub async fn get(&self, barcode: &str) -> DbResult<Option<Consumable>> {
        let consumable = sqlx::query_as::<_, Consumable>(
            r#"
            SELECT barcode, description, location, category, unit,
                   minimum_stock, current_stock, created_at, updated_at
            FROM consumables
            WHERE barcode = ?1
            "#,
        )
        .bind(barcode)
        .fetch_optional(&self.pool)
        .await?;

        Ok(consumable)
    }

    /// Current stock only.
    pub async fn current_stock(&self, barcode: &str) -> DbResult<Option<i64>> {
        let stock = sqlx::query_scalar("SELECT current_stock FROM consumables WHERE barcode = ?1")
            .bind(barcode)
            .fetch_optional(&self.pool)
            .await?;

        Ok(stock)
    }

    /// Lists consumables, optionally restricted to a location and category.
    ///
    /// Status filtering happens on the derived status, in the caller.
    pub async fn list(
        &self,
        location: Option<&str>,
        category: Option<&str>,
    ) -> DbResult<Vec<Consumable>> {
        debug!(?location, ?category, "Listing consumables");

        let rows = sqlx::query_as::<_, Consumable>(
            r#"
            SELECT barcode, description, location, category, unit,
                   minimum_stock, current_stock, created_at, updated_at
            FROM consumables
            WHERE (?1 IS NULL OR location = ?1)
              AND (?2 IS NULL OR category = ?2)
            ORDER BY description COLLATE NOCASE, barcode
            "#,
        )
        .bind(location)
        .bind(category)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// Inserts a consumable with its initial stock.
    ///
    /// The initial stock is a starting point, not a movement: no history row.
    pub async fn insert(
        &self,
        consumable: &NewConsumable,
        location: &str,
        unit: &str,
    ) -> DbResult<Consumable> {
        debug!(barcode = %consumable.barcode, "Inserting consumable");

        let status = ConsumableStatus::derive(consumable.initial_stock, consumable.minimum_stock);

        let created = sqlx::query_as::<_, Consumable>(
            r#"
            INSERT INTO consumables (
                barcode, description, location, category, unit,
                minimum_stock, current_stock, status, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?9)
            RETURNING barcode, description, location, category, unit,
                      minimum_stock, current_stock, created_at, updated_at
            "#,
        )
        .bind(&consumable.barcode)
        .bind(&consumable.description)
        .bind(location)
        .bind(&consumable.category)
        .bind(unit)
        .bind(consumable.minimum_stock)
        .bind(consumable.initial_stock)
        .bind(status)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;

        Ok(created)
    }

    /// Updates catalog fields. Stock is untouched; the status cache follows
    /// the new minimum.
    pub async fn update(&self, barcode: &str, update: &ConsumableUpdate) -> DbResult<Consumable> {
        debug!(barcode = %barcode, "Updating consumable");

        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query_as::<_, Consumable>(
            r#"
            UPDATE consumables SET
                description = ?2,
                location = ?3,
                category = ?4,
                unit = ?5,
                minimum_stock = ?6,
                updated_at = ?7
            WHERE barcode = ?1
            RETURNING barcode, description, location, category, unit,
                      minimum_stock, current_stock, created_at, updated_at
            "#,
        )
        .bind(barcode)
        .bind(&update.description)
        .bind(&update.location)
        .bind(&update.category)
        .bind(&update.unit)
        .bind(update.minimum_stock)
        .bind(Utc::now())
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| DbError::not_found("Consumable", barcode))?;

        sqlx::query("UPDATE consumables SET status = ?2 WHERE barcode = ?1")
            .bind(barcode)
            .bind(updated.status())
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(updated)
    }

    /// Applies `delta` if the result stays non-negative, with a history row.
    ///
    /// ## Returns
    /// * `Ok(Some(change))` - Stock moved
    /// * `Ok(None)` - Unknown barcode, or the stock would go negative;
    ///   nothing was written
    pub async fn adjust(
        &self,
        barcode: &str,
        delta: i64,
        entry: StockEntry<'_>,
    ) -> DbResult<Option<StockChange>> {
        debug!(barcode = %barcode, delta = delta, action = ?entry.action, "Adjusting stock");

        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        let row: Option<(i64, i64)> = sqlx::query_as(
            r#"
            UPDATE consumables SET
                current_stock = current_stock + ?2,
                updated_at = ?3
            WHERE barcode = ?1 AND current_stock + ?2 >= 0
            RETURNING current_stock, minimum_stock
            "#,
        )
        .bind(barcode)
        .bind(delta)
        .bind(now)
        .fetch_optional(&mut *tx)
        .await?;

        let Some((new_stock, minimum_stock)) = row else {
            tx.rollback().await?;
            return Ok(None);
        };

        let change = StockChange {
            old_stock: new_stock - delta,
            new_stock,
        };

        sqlx::query("UPDATE consumables SET status = ?2 WHERE barcode = ?1")
            .bind(barcode)
            .bind(ConsumableStatus::derive(new_stock, minimum_stock))
            .execute(&mut *tx)
            .await?;

        sqlx::query(
            r#"
            INSERT INTO stock_history (
                consumable_barcode, worker_barcode, action, amount,
                old_stock, new_stock, comment, changed_by, timestamp
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
        )
        .bind(barcode)
        .bind(entry.worker_barcode)
        .bind(entry.action)
        .bind(delta)
        .bind(change.old_stock)
        .bind(change.new_stock)
        .bind(entry.comment)
        .bind(entry.changed_by)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(Some(change))
    }

    /// Re-inserts a consumable from its trash snapshot with its last stock.
    ///
    /// ## Returns
    /// * `Err(DbError::UniqueViolation)` - Barcode is live again
    pub async fn insert_restored(&self, snapshot: &DeletedConsumable) -> DbResult<Consumable> {
        debug!(barcode = %snapshot.barcode, "Restoring consumable");

        let status = ConsumableStatus::derive(snapshot.last_stock, snapshot.minimum_stock);

        let consumable = sqlx::query_as::<_, Consumable>(
            r#"
            INSERT INTO consumables (
                barcode, description, location, category, unit,
                minimum_stock, current_stock, status, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?9)
            RETURNING barcode, description, location, category, unit,
                      minimum_stock, current_stock, created_at, updated_at
            "#,
        )
        .bind(&snapshot.barcode)
        .bind(&snapshot.description)
        .bind(&snapshot.location)
        .bind(&snapshot.category)
        .bind(&snapshot.unit)
        .bind(snapshot.minimum_stock)
        .bind(snapshot.last_stock)
        .bind(status)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;

        Ok(consumable)
    }

    /// Deletes a consumable row. Stock history stays.
    pub async fn delete(&self, barcode: &str) -> DbResult<()> {
        debug!(barcode = %barcode, "Deleting consumable");

        let result = sqlx::query("DELETE FROM consumables WHERE barcode = ?1")
            .bind(barcode)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Consumable", barcode));
        }

        Ok(())
    }

    /// Stock history, newest first.
    pub async fn stock_history(&self, barcode: &str) -> DbResult<Vec<StockMovement>> {
        let rows = sqlx::query_as::<_, StockMovement>(
            "SELECT * FROM stock_history WHERE consumable_barcode = ?1 ORDER BY id DESC",
        )
        .bind(barcode)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// Sum of all recorded deltas for one consumable.
    pub async fn recorded_delta(&self, barcode: &str) -> DbResult<i64> {
        let sum: i64 = sqlx::query_scalar(
            "SELECT COALESCE(SUM(amount), 0) FROM stock_history WHERE consumable_barcode = ?1",
        )
        .bind(barcode)
        .fetch_one(&self.pool)
        .await?;

        Ok(sum)
    }

    /// Counts consumables (for diagnostics).
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM consumables")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};

    fn gloves(initial_stock: i64) -> NewConsumable {
        NewConsumable {
            barcode: "C-1".to_string(),
            description: "Work gloves".to_string(),
            location: None,
            category: None,
            unit: None,
            minimum_stock: 10,
            initial_stock,
        }
    }

    fn entry() -> StockEntry<'static> {
        StockEntry {
            action: StockAction::Adjustment,
            worker_barcode: None,
            comment: None,
            changed_by: "admin",
        }
    }

    #[tokio::test]
    async fn test_adjust_refuses_negative_stock() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::new(DbConfig::new(dir.path())).await.unwrap();
        let repo = db.consumables();
        repo.insert(&gloves(5), "Storage", "pair").await.unwrap();

        assert_eq!(repo.adjust("C-1", -10, entry()).await.unwrap(), None);
        assert_eq!(repo.current_stock("C-1").await.unwrap(), Some(5));
        assert!(repo.stock_history("C-1").await.unwrap().is_empty());

        let change = repo.adjust("C-1", -5, entry()).await.unwrap().unwrap();
        assert_eq!(change, StockChange { old_stock: 5, new_stock: 0 });
    }

    #[tokio::test]
    async fn test_adjust_unknown_barcode() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::new(DbConfig::new(dir.path())).await.unwrap();

        assert_eq!(db.consumables().adjust("nope", 3, entry()).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_status_cache_follows_stock() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::new(DbConfig::new(dir.path())).await.unwrap();
        let repo = db.consumables();
        repo.insert(&gloves(20), "Storage", "pair").await.unwrap();
        repo.adjust("C-1", -15, entry()).await.unwrap();

        let cached: ConsumableStatus =
            sqlx::query_scalar("SELECT status FROM consumables WHERE barcode = 'C-1'")
                .fetch_one(db.partition(crate::pool::Partition::Consumables))
                .await
                .unwrap();
        assert_eq!(cached, ConsumableStatus::Reorder);
        assert_eq!(repo.recorded_delta("C-1").await.unwrap(), -15);
    }
}
