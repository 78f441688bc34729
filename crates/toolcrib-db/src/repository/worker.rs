//! # Worker Repository
//!
//! Database operations for `workers.db`: the worker table and its change
//! history. Every create and update writes its history row in the same
//! transaction.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::{DbError, DbResult};
use toolcrib_core::{ChangeAction, ChangeRecord, DeletedWorker, NewWorker, Worker, WorkerUpdate};

/// Repository for worker database operations.
#[derive(Debug, Clone)]
pub struct WorkerRepository {
    pool: SqlitePool,
}

impl WorkerRepository {
    /// Creates a new WorkerRepository.
    pub fn new(pool: SqlitePool) -> Self {
        WorkerRepository { pool }
    }

    /// Gets a worker by barcode.
    pub async fn get(&self, barcode: &str) -> DbResult<Option<Worker>> {
        let worker = sqlx::query_as::<_, Worker>("SELECT * FROM workers WHERE barcode = ?1")
            .bind(barcode)
            .fetch_optional(&self.pool)
            .await?;

        Ok(worker)
    }

    pub async fn exists(&self, barcode: &str) -> DbResult<bool> {
        let found: Option<i64> = sqlx::query_scalar("SELECT 1 FROM workers WHERE barcode = ?1")
            .bind(barcode)
            .fetch_optional(&self.pool)
            .await?;

        Ok(found.is_some())
    }

    /// Lists all workers sorted by last name.
    pub async fn list(&self) -> DbResult<Vec<Worker>> {
        let workers = sqlx::query_as::<_, Worker>(
            "SELECT * FROM workers ORDER BY lastname COLLATE NOCASE, name COLLATE NOCASE",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(workers)
    }

    /// Inserts a worker and its `create` history row.
    ///
    /// ## Returns
    /// * `Err(DbError::UniqueViolation)` - Barcode already exists
    pub async fn insert(&self, worker: &NewWorker, changed_by: &str) -> DbResult<Worker> {
        debug!(barcode = %worker.barcode, "Inserting worker");

        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        let created = sqlx::query_as::<_, Worker>(
            r#"
            INSERT INTO workers (barcode, name, lastname, department, email, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)
            RETURNING *
            "#,
        )
        .bind(&worker.barcode)
        .bind(&worker.name)
        .bind(&worker.lastname)
        .bind(&worker.department)
        .bind(&worker.email)
        .bind(now)
        .fetch_one(&mut *tx)
        .await?;

        let fields = serde_json::to_value(worker)?;
        insert_history(&mut tx, &created.barcode, ChangeAction::Create, &fields, changed_by).await?;

        tx.commit().await?;
        Ok(created)
    }

    /// Updates a worker's editable fields and records `changed_fields`.
    ///
    /// ## Returns
    /// * `Err(DbError::NotFound)` - Worker doesn't exist
    pub async fn update(
        &self,
        barcode: &str,
        update: &WorkerUpdate,
        changed_fields: &serde_json::Value,
        changed_by: &str,
    ) -> DbResult<Worker> {
        debug!(barcode = %barcode, "Updating worker");

        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query_as::<_, Worker>(
            r#"
            UPDATE workers SET
                name = ?2,
                lastname = ?3,
                department = ?4,
                email = ?5,
                updated_at = ?6
            WHERE barcode = ?1
            RETURNING *
            "#,
        )
        .bind(barcode)
        .bind(&update.name)
        .bind(&update.lastname)
        .bind(&update.department)
        .bind(&update.email)
        .bind(Utc::now())
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| DbError::not_found("Worker", barcode))?;

        insert_history(&mut tx, barcode, ChangeAction::Update, changed_fields, changed_by).await?;

        tx.commit().await?;
        Ok(updated)
    }

    /// Re-inserts a worker from its trash snapshot.
    ///
    /// ## Returns
    /// * `Err(DbError::UniqueViolation)` - Barcode is live again
    pub async fn insert_restored(&self, snapshot: &DeletedWorker) -> DbResult<Worker> {
        debug!(barcode = %snapshot.barcode, "Restoring worker");

        let worker = sqlx::query_as::<_, Worker>(
            r#"
            INSERT INTO workers (barcode, name, lastname, department, email, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)
            RETURNING *
            "#,
        )
        .bind(&snapshot.barcode)
        .bind(&snapshot.name)
        .bind(&snapshot.lastname)
        .bind(&snapshot.department)
        .bind(&snapshot.email)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;

        Ok(worker)
    }

    /// Deletes a worker row. History rows stay.
    pub async fn delete(&self, barcode: &str) -> DbResult<()> {
        debug!(barcode = %barcode, "Deleting worker");

        let result = sqlx::query("DELETE FROM workers WHERE barcode = ?1")
            .bind(barcode)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Worker", barcode));
        }

        Ok(())
    }

    /// Change history, newest first.
    pub async fn history(&self, barcode: &str) -> DbResult<Vec<ChangeRecord>> {
        let rows = sqlx::query_as::<_, ChangeRecord>(
            "SELECT * FROM worker_history WHERE barcode = ?1 ORDER BY id DESC",
        )
        .bind(barcode)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// Counts workers (for diagnostics).
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM workers")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

async fn insert_history(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    barcode: &str,
    action: ChangeAction,
    changed_fields: &serde_json::Value,
    changed_by: &str,
) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO worker_history (barcode, action, changed_fields, changed_by, timestamp)
        VALUES (?1, ?2, ?3, ?4, ?5)
        "#,
    )
    .bind(barcode)
    .bind(action)
    .bind(changed_fields.to_string())
    .bind(changed_by)
    .bind(Utc::now())
    .execute(&mut **tx)
    .await?;

    Ok(())
}
