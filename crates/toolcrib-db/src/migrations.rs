//! # Partition Migrations
//!
//! Embedded SQL migrations, one migrator per partition file.
//!
//! ## How Migrations Work
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Migration Process                                  │
//! │                                                                         │
//! │  Database::new                                                          │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  for each partition:                                                    │
//! │       │                                                                 │
//! │       ├── workers.db      ← migrations/workers/*.sql                    │
//! │       ├── tools.db        ← migrations/tools/*.sql                      │
//! │       ├── consumables.db  ← migrations/consumables/*.sql                │
//! │       ├── lendings.db     ← migrations/lendings/*.sql                   │
//! │       └── trash.db        ← migrations/trash/*.sql                      │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Each file keeps its own _sqlx_migrations table                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Adding New Migrations
//!
//! 1. Create a file in `migrations/<partition>/` with the next sequence number
//! 2. Name format: `NNN_description.sql` (e.g., `002_tool_serials.sql`)
//! 3. **NEVER** modify existing migrations - always add new ones

use sqlx::migrate::Migrator;
use sqlx::SqlitePool;
use tracing::info;

use crate::error::DbResult;
use crate::pool::Partition;

static WORKERS: Migrator = sqlx::migrate!("../../migrations/workers");
static TOOLS: Migrator = sqlx::migrate!("../../migrations/tools");
static CONSUMABLES: Migrator = sqlx::migrate!("../../migrations/consumables");
static LENDINGS: Migrator = sqlx::migrate!("../../migrations/lendings");
static TRASH: Migrator = sqlx::migrate!("../../migrations/trash");

/// Embedded migrator of one partition.
pub fn migrator(partition: Partition) -> &'static Migrator {
    match partition {
        Partition::Workers => &WORKERS,
        Partition::Tools => &TOOLS,
        Partition::Consumables => &CONSUMABLES,
        Partition::Lendings => &LENDINGS,
        Partition::Trash => &TRASH,
    }
}

/// Runs pending migrations of one partition.
///
/// Idempotent: safe to run on every startup.
pub async fn run_migrations(partition: Partition, pool: &SqlitePool) -> DbResult<()> {
    info!(partition = %partition, "Checking for pending migrations");

    migrator(partition).run(pool).await?;

    Ok(())
}

/// Returns `(total, applied)` migration counts of one partition.
///
/// For diagnostics and health checks.
pub async fn migration_status(partition: Partition, pool: &SqlitePool) -> DbResult<(usize, usize)> {
    let total = migrator(partition).migrations.len();

    let applied: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM _sqlx_migrations")
        .fetch_one(pool)
        .await?;

    Ok((total, usize::try_from(applied).unwrap_or(0)))
}
