//! # Lending Repository
//!
//! Database operations for `lendings.db`.
//!
//! Tool loans and consumptions share the `lendings` table:
//! ```text
//! item_type   return_time        meaning
//! ─────────   ────────────────   ─────────────────────────────────────
//! tool        NULL               open loan (at most one per tool)
//! tool        set                returned loan
//! consumable  = checkout_time    consumption, closed at creation
//! ```
//! The partial unique index `idx_lendings_open_tool` rejects a second open
//! loan for the same tool.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::DbResult;
use crate::repository::new_record_id;
use toolcrib_core::{ItemType, Lending, StockChange};

/// Repository for lending database operations.
#[derive(Debug, Clone)]
pub struct LendingRepository {
    pool: SqlitePool,
}

impl LendingRepository {
    /// Creates a new LendingRepository.
    pub fn new(pool: SqlitePool) -> Self {
        LendingRepository { pool }
    }

    /// Gets a lending row by id.
    pub async fn get(&self, id: &str) -> DbResult<Option<Lending>> {
        let lending = sqlx::query_as::<_, Lending>("SELECT * FROM lendings WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(lending)
    }

    /// Opens a tool loan.
    ///
    /// ## Returns
    /// * `Err(DbError::UniqueViolation)` - The tool already has an open loan
    pub async fn insert_loan(
        &self,
        worker_barcode: &str,
        tool_barcode: &str,
        checkout_time: DateTime<Utc>,
    ) -> DbResult<Lending> {
        debug!(worker = %worker_barcode, tool = %tool_barcode, "Opening tool loan");

        let lending = sqlx::query_as::<_, Lending>(
            r#"
            INSERT INTO lendings (
                id, worker_barcode, item_barcode, item_type,
                checkout_time, return_time, amount, old_stock, new_stock
            ) VALUES (?1, ?2, ?3, ?4, ?5, NULL, 1, NULL, NULL)
            RETURNING *
            "#,
        )
        .bind(new_record_id())
        .bind(worker_barcode)
        .bind(tool_barcode)
        .bind(ItemType::Tool)
        .bind(checkout_time)
        .fetch_one(&self.pool)
        .await?;

        Ok(lending)
    }

    /// Records a consumption, closed at creation.
    pub async fn insert_consumption(
        &self,
        worker_barcode: &str,
        consumable_barcode: &str,
        amount: i64,
        change: StockChange,
        at: DateTime<Utc>,
    ) -> DbResult<Lending> {
        debug!(
            worker = %worker_barcode,
            consumable = %consumable_barcode,
            amount = amount,
            "Recording consumption"
        );

        let lending = sqlx::query_as::<_, Lending>(
            r#"
            INSERT INTO lendings (
                id, worker_barcode, item_barcode, item_type,
                checkout_time, return_time, amount, old_stock, new_stock
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?5, ?6, ?7, ?8)
            RETURNING *
            "#,
        )
        .bind(new_record_id())
        .bind(worker_barcode)
        .bind(consumable_barcode)
        .bind(ItemType::Consumable)
        .bind(at)
        .bind(amount)
        .bind(change.old_stock)
        .bind(change.new_stock)
        .fetch_one(&self.pool)
        .await?;

        Ok(lending)
    }

    /// The open loan of a tool, if any.
    pub async fn find_open_loan(&self, tool_barcode: &str) -> DbResult<Option<Lending>> {
        let lending = sqlx::query_as::<_, Lending>(
            r#"
            SELECT * FROM lendings
            WHERE item_barcode = ?1 AND item_type = 'tool' AND return_time IS NULL
            "#,
        )
        .bind(tool_barcode)
        .fetch_optional(&self.pool)
        .await?;

        Ok(lending)
    }

    /// Stamps `return_time` if the loan is still open.
    ///
    /// Returns `false` when another caller closed it first.
    pub async fn close_loan(&self, id: &str, return_time: DateTime<Utc>) -> DbResult<bool> {
        debug!(id = %id, "Closing tool loan");

        let result = sqlx::query(
            "UPDATE lendings SET return_time = ?2 WHERE id = ?1 AND return_time IS NULL",
        )
        .bind(id)
        .bind(return_time)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Clears `return_time` again. Compensation for a return whose tool
    /// update failed.
    pub async fn reopen_loan(&self, id: &str) -> DbResult<bool> {
        debug!(id = %id, "Reopening tool loan");

        let result = sqlx::query(
            "UPDATE lendings SET return_time = NULL WHERE id = ?1 AND item_type = 'tool'",
        )
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Open tool loans held by a worker.
    pub async fn count_open_for_worker(&self, worker_barcode: &str) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM lendings
            WHERE worker_barcode = ?1 AND item_type = 'tool' AND return_time IS NULL
            "#,
        )
        .bind(worker_barcode)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }

    /// Open loans of one tool (0 or 1 while the index holds).
    pub async fn count_open_for_tool(&self, tool_barcode: &str) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM lendings
            WHERE item_barcode = ?1 AND item_type = 'tool' AND return_time IS NULL
            "#,
        )
        .bind(tool_barcode)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }

    /// All rows for one item, newest first.
    pub async fn for_item(&self, item_barcode: &str) -> DbResult<Vec<Lending>> {
        let rows = sqlx::query_as::<_, Lending>(
            "SELECT * FROM lendings WHERE item_barcode = ?1 ORDER BY checkout_time DESC",
        )
        .bind(item_barcode)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// Counts lending rows (for diagnostics).
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM lendings")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}
