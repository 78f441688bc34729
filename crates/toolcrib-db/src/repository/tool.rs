//! # Tool Repository
//!
//! Database operations for `tools.db`: tools, their status history and
//! their change history.
//!
//! ## Status Compare-and-Set
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  BEGIN                                                                  │
//! │    UPDATE tools SET status = 'borrowed', ...                            │
//! │     WHERE barcode = 'T-1' AND status = 'available'   ← first statement  │
//! │    0 rows? ── rollback, report "lost the race"                          │
//! │    INSERT INTO tool_status_history (...)                                │
//! │  COMMIT                                                                 │
//! │                                                                         │
//! │  Two concurrent checkouts: SQLite serializes the writers, the second    │
//! │  UPDATE sees 'borrowed' and matches 0 rows.                             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use toolcrib_core::{
    ChangeAction, ChangeRecord, DeletedTool, NewTool, Tool, ToolFilter, ToolStatus,
    ToolStatusChange, ToolUpdate, TransitionPlan,
};

/// Repository for tool database operations.
#[derive(Debug, Clone)]
pub struct ToolRepository {
    pool: SqlitePool,
}

impl ToolRepository {
    /// Creates a new ToolRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ToolRepository { pool }
    }

    /// Gets a tool by barcode.
    pub async fn get(&self, barcode: &str) -> DbResult<Option<Tool>> {
        let tool = sqlx::query_as::<_, Tool>("SELECT * FROM tools WHERE barcode = ?1")
            .bind(barcode)
            .fetch_optional(&self.pool)
            .await?;

        Ok(tool)
    }

    /// Current status only.
    pub async fn status(&self, barcode: &str) -> DbResult<Option<ToolStatus>> {
        let status = sqlx::query_scalar::<_, ToolStatus>("SELECT status FROM tools WHERE barcode = ?1")
            .bind(barcode)
            .fetch_optional(&self.pool)
            .await?;

        Ok(status)
    }

    /// Lists tools matching `filter`, sorted by description.
    pub async fn list(&self, filter: &ToolFilter) -> DbResult<Vec<Tool>> {
        debug!(?filter, "Listing tools");

        let mut qb = QueryBuilder::<Sqlite>::new("SELECT * FROM tools WHERE 1 = 1");
        if let Some(status) = filter.status {
            qb.push(" AND status = ").push_bind(status);
        }
        if let Some(location) = &filter.location {
            qb.push(" AND location = ").push_bind(location.clone());
        }
        if let Some(category) = &filter.category {
            qb.push(" AND category = ").push_bind(category.clone());
        }
        qb.push(" ORDER BY description COLLATE NOCASE, barcode");

        let tools = qb.build_query_as::<Tool>().fetch_all(&self.pool).await?;
        Ok(tools)
    }

    /// Distinct non-empty locations, for filter widgets.
    pub async fn locations(&self) -> DbResult<Vec<String>> {
        let rows = sqlx::query_scalar(
            "SELECT DISTINCT location FROM tools WHERE location <> '' ORDER BY location",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// Distinct categories, for filter widgets.
    pub async fn categories(&self) -> DbResult<Vec<String>> {
        let rows = sqlx::query_scalar(
            "SELECT DISTINCT category FROM tools WHERE category IS NOT NULL AND category <> '' ORDER BY category",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// Inserts an `Available` tool and its `create` history row.
    ///
    /// `location` is the resolved location; `tool.location` is ignored.
    ///
    /// ## Returns
    /// * `Err(DbError::UniqueViolation)` - Barcode already exists
    pub async fn insert(
        &self,
        tool: &NewTool,
        location: &str,
        changed_by: &str,
    ) -> DbResult<Tool> {
        debug!(barcode = %tool.barcode, "Inserting tool");

        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        let created = sqlx::query_as::<_, Tool>(
            r#"
            INSERT INTO tools (
                barcode, description, location, category, status,
                defect_timestamp, image_ref, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, NULL, ?6, ?7, ?7)
            RETURNING *
            "#,
        )
        .bind(&tool.barcode)
        .bind(&tool.description)
        .bind(location)
        .bind(&tool.category)
        .bind(ToolStatus::Available)
        .bind(&tool.image_ref)
        .bind(now)
        .fetch_one(&mut *tx)
        .await?;

        let fields = serde_json::json!({
            "description": created.description,
            "location": created.location,
            "category": created.category,
            "image_ref": created.image_ref,
        });
        insert_history(&mut tx, &created.barcode, ChangeAction::Create, &fields, changed_by).await?;

        tx.commit().await?;
        Ok(created)
    }

    /// Updates a tool's catalog fields and records `changed_fields`.
    ///
    /// Status is untouched. `image_ref: None` keeps the current picture.
    pub async fn update(
        &self,
        barcode: &str,
        update: &ToolUpdate,
        changed_fields: &serde_json::Value,
        changed_by: &str,
    ) -> DbResult<Tool> {
        debug!(barcode = %barcode, "Updating tool");

        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query_as::<_, Tool>(
            r#"
            UPDATE tools SET
                description = ?2,
                location = ?3,
                category = ?4,
                image_ref = COALESCE(?5, image_ref),
                updated_at = ?6
            WHERE barcode = ?1
            RETURNING *
            "#,
        )
        .bind(barcode)
        .bind(&update.description)
        .bind(&update.location)
        .bind(&update.category)
        .bind(&update.image_ref)
        .bind(Utc::now())
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| DbError::not_found("Tool", barcode))?;

        insert_history(&mut tx, barcode, ChangeAction::Update, changed_fields, changed_by).await?;

        tx.commit().await?;
        Ok(updated)
    }

    /// Moves the tool from `plan.from` to `plan.to` if its status is still
    /// `plan.from`, appending a status history row in the same transaction.
    ///
    /// ## Returns
    /// * `Ok(true)` - Status changed, history written
    /// * `Ok(false)` - Status was no longer `plan.from` (or the tool is gone)
    pub async fn compare_and_set_status(
        &self,
        barcode: &str,
        plan: &TransitionPlan,
        comment: Option<&str>,
        changed_by: &str,
    ) -> DbResult<bool> {
        debug!(
            barcode = %barcode,
            from = %plan.from,
            to = %plan.to,
            "Compare-and-set tool status"
        );

        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            r#"
            UPDATE tools SET
                status = ?2,
                defect_timestamp = ?3,
                updated_at = ?4
            WHERE barcode = ?1 AND status = ?5
            "#,
        )
        .bind(barcode)
        .bind(plan.to)
        .bind(plan.defect_timestamp)
        .bind(now)
        .bind(plan.from)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(false);
        }

        sqlx::query(
            r#"
            INSERT INTO tool_status_history (
                tool_barcode, old_status, new_status, comment, changed_by, timestamp
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(barcode)
        .bind(plan.from)
        .bind(plan.to)
        .bind(comment)
        .bind(changed_by)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(true)
    }

    /// Re-inserts a tool from its trash snapshot as `Available`.
    ///
    /// ## Returns
    /// * `Err(DbError::UniqueViolation)` - Barcode is live again
    pub async fn insert_restored(&self, snapshot: &DeletedTool) -> DbResult<Tool> {
        debug!(barcode = %snapshot.barcode, "Restoring tool");

        let tool = sqlx::query_as::<_, Tool>(
            r#"
            INSERT INTO tools (
                barcode, description, location, category, status,
                defect_timestamp, image_ref, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, NULL, ?6, ?7, ?7)
            RETURNING *
            "#,
        )
        .bind(&snapshot.barcode)
        .bind(&snapshot.description)
        .bind(&snapshot.location)
        .bind(&snapshot.category)
        .bind(ToolStatus::Available)
        .bind(&snapshot.image_ref)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;

        Ok(tool)
    }

    /// Deletes a tool row. History rows stay.
    pub async fn delete(&self, barcode: &str) -> DbResult<()> {
        debug!(barcode = %barcode, "Deleting tool");

        let result = sqlx::query("DELETE FROM tools WHERE barcode = ?1")
            .bind(barcode)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Tool", barcode));
        }

        Ok(())
    }

    /// Status history, newest first.
    pub async fn status_history(&self, barcode: &str) -> DbResult<Vec<ToolStatusChange>> {
        let rows = sqlx::query_as::<_, ToolStatusChange>(
            "SELECT * FROM tool_status_history WHERE tool_barcode = ?1 ORDER BY id DESC",
        )
        .bind(barcode)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// Change history, newest first.
    pub async fn history(&self, barcode: &str) -> DbResult<Vec<ChangeRecord>> {
        let rows = sqlx::query_as::<_, ChangeRecord>(
            "SELECT * FROM tool_history WHERE barcode = ?1 ORDER BY id DESC",
        )
        .bind(barcode)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// Counts tools (for diagnostics).
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM tools")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

async fn insert_history(
    tx: &mut sqlx::Transaction<'_, Sqlite>,
    barcode: &str,
    action: ChangeAction,
    changed_fields: &serde_json::Value,
    changed_by: &str,
) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO tool_history (barcode, action, changed_fields, changed_by, timestamp)
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
