//! # Partition Store Errors
//!
//! ```text
//!   sqlx::Error / MigrateError / serde_json::Error
//!        │
//!        ▼
//!   DbError ──► LedgerError::Storage (toolcrib-ledger, stable ErrorCode)
//! ```
//!
//! Constraint failures are split out of the generic query error because the
//! ledger branches on them: a unique violation on `barcode` is a duplicate or
//! a restore conflict, one on the open-loan index is a lost checkout race.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DbError {
    /// No row for this barcode, lending id or trash id.
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// `UNIQUE constraint failed: <table>.<column>`.
    #[error("Unique constraint failed on {table}.{column}")]
    UniqueViolation { table: String, column: String },

    /// A CHECK constraint rejected the row (negative stock, amount < 1).
    #[error("Check constraint failed: {0}")]
    CheckViolation(String),

    /// A compare-and-set kept losing to concurrent writers.
    #[error("Concurrent update conflict on {entity} {id} after {attempts} attempts")]
    Conflict {
        entity: String,
        id: String,
        attempts: u32,
    },

    /// A partition file could not be opened, attached or reached.
    #[error("Partition unavailable: {0}")]
    PartitionUnavailable(String),

    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    /// JSON payload of a history row could not be built.
    #[error("Serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Query failed: {0}")]
    QueryFailed(String),
}

impl DbError {
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        DbError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    #[inline]
    pub fn is_unique_violation(&self) -> bool {
        matches!(self, DbError::UniqueViolation { .. })
    }
}

/// Splits SQLite's `table.column` (first column for composite keys).
fn unique_target(detail: &str) -> (String, String) {
    let first = detail.split(',').next().unwrap_or(detail).trim();
    match first.split_once('.') {
        Some((table, column)) => (table.to_string(), column.to_string()),
        None => (first.to_string(), String::new()),
    }
}

impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => DbError::not_found("row", "unknown"),

            sqlx::Error::Database(db_err) => {
                let msg = db_err.message();

                if let Some(detail) = msg.strip_prefix("UNIQUE constraint failed: ") {
                    let (table, column) = unique_target(detail);
                    DbError::UniqueViolation { table, column }
                } else if db_err.is_unique_violation() {
                    DbError::UniqueViolation {
                        table: String::new(),
                        column: String::new(),
                    }
                } else if let Some(detail) = msg.strip_prefix("CHECK constraint failed: ") {
                    DbError::CheckViolation(detail.to_string())
                } else {
                    DbError::QueryFailed(msg.to_string())
                }
            }

            sqlx::Error::PoolTimedOut => {
                DbError::PartitionUnavailable("timed out waiting for a connection".to_string())
            }
            sqlx::Error::PoolClosed => DbError::PartitionUnavailable("pool is closed".to_string()),

            other => DbError::QueryFailed(other.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for DbError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        DbError::MigrationFailed(err.to_string())
    }
}

pub type DbResult<T> = Result<T, DbError>;
