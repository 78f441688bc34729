//! # Partition Pool Management
//!
//! Connection pools for the five partition files.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Partition Store                                    │
//! │                                                                         │
//! │  DbConfig::new(data_dir) ← Configure pool settings                      │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Database::new(config).await ← One pool per file + migrations           │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌───────────┐ ┌───────────┐ ┌──────────────┐ ┌────────────┐ ┌───────┐  │
//! │  │workers.db │ │ tools.db  │ │consumables.db│ │lendings.db │ │trash. │  │
//! │  │SqlitePool │ │SqlitePool │ │ SqlitePool   │ │ SqlitePool │ │  db   │  │
//! │  └───────────┘ └───────────┘ └──────────────┘ └────────────┘ └───────┘  │
//! │                                                                         │
//! │  Writes: always one partition, one transaction.                         │
//! │  Joined reads: Database::open_joined() opens a dedicated connection     │
//! │  on one file and ATTACHes the others for the length of a query.         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## WAL Mode
//! Every partition runs in WAL mode with NORMAL synchronous. Writers
//! serialize on SQLite's lock and wait up to `busy_timeout` for it.

use sqlx::sqlite::{
    SqliteConnectOptions, SqliteConnection, SqliteJournalMode, SqlitePoolOptions,
    SqliteSynchronous,
};
use sqlx::{ConnectOptions, Connection, SqlitePool};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::error::{DbError, DbResult};
use crate::migrations;
use crate::repository::consumable::ConsumableRepository;
use crate::repository::lending::LendingRepository;
use crate::repository::report::ReportRepository;
use crate::repository::tool::ToolRepository;
use crate::repository::trash::TrashRepository;
use crate::repository::worker::WorkerRepository;

// =============================================================================
// Partition
// =============================================================================

/// One independently stored entity family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Partition {
    Workers,
    Tools,
    Consumables,
    Lendings,
    Trash,
}

impl Partition {
    pub const ALL: [Partition; 5] = [
        Partition::Workers,
        Partition::Tools,
        Partition::Consumables,
        Partition::Lendings,
        Partition::Trash,
    ];

    /// File name inside the data directory.
    pub fn file_name(&self) -> &'static str {
        match self {
            Partition::Workers => "workers.db",
            Partition::Tools => "tools.db",
            Partition::Consumables => "consumables.db",
            Partition::Lendings => "lendings.db",
            Partition::Trash => "trash.db",
        }
    }

    /// Schema name used when the partition is ATTACHed to another one.
    pub fn schema(&self) -> &'static str {
        match self {
            Partition::Workers => "workers_db",
            Partition::Tools => "tools_db",
            Partition::Consumables => "consumables_db",
            Partition::Lendings => "lendings_db",
            Partition::Trash => "trash_db",
        }
    }
}

impl std::fmt::Display for Partition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.file_name())
    }
}

// =============================================================================
// Configuration
// =============================================================================

/// Partition store configuration.
///
/// ## Example
/// ```rust,ignore
/// let config = DbConfig::new("./data")
///     .max_connections(5)
///     .busy_timeout(Duration::from_secs(5));
/// ```
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// Directory holding the partition files. Created if missing.
    pub data_dir: PathBuf,

    /// Maximum number of connections per partition pool.
    /// Default: 5
    pub max_connections: u32,

    /// Minimum number of connections to keep alive per pool.
    /// Default: 1
    pub min_connections: u32,

    /// Pool acquire timeout.
    /// Default: 30 seconds
    pub connect_timeout: Duration,

    /// How long a writer waits for SQLite's lock before failing.
    /// Default: 5 seconds
    pub busy_timeout: Duration,

    /// Idle timeout before closing a connection.
    /// Default: 10 minutes
    pub idle_timeout: Duration,

    /// Whether to run migrations on connect.
    /// Default: true
    pub run_migrations: bool,
}

impl DbConfig {
    /// Creates a configuration for the partitions under `data_dir`.
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        DbConfig {
            data_dir: data_dir.into(),
            max_connections: 5,
            min_connections: 1,
            connect_timeout: Duration::from_secs(30),
            busy_timeout: Duration::from_secs(5),
            idle_timeout: Duration::from_secs(600),
            run_migrations: true,
        }
    }

    /// Sets the maximum number of connections.
    pub fn max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    /// Sets the minimum number of connections.
    pub fn min_connections(mut self, min: u32) -> Self {
        self.min_connections = min;
        self
    }

    /// Sets the connection timeout.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Sets the SQLite busy timeout.
    pub fn busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout = timeout;
        self
    }

    /// Sets whether to run migrations on connect.
    pub fn run_migrations(mut self, run: bool) -> Self {
        self.run_migrations = run;
        self
    }

    /// Path of one partition file.
    pub fn partition_path(&self, partition: Partition) -> PathBuf {
        self.data_dir.join(partition.file_name())
    }

    fn connect_options(&self, partition: Partition) -> SqliteConnectOptions {
        SqliteConnectOptions::new()
            .filename(self.partition_path(partition))
            // Readers don't block the writer and vice versa
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .foreign_keys(true)
            .busy_timeout(self.busy_timeout)
            .create_if_missing(true)
    }
}

// =============================================================================
// Database
// =============================================================================

/// Handle owning one pool per partition.
///
/// Cheap to clone: `SqlitePool` is itself a shared handle. There is no
/// process-wide instance; callers create one and pass it around.
#[derive(Debug, Clone)]
pub struct Database {
    config: DbConfig,
    workers: SqlitePool,
    tools: SqlitePool,
    consumables: SqlitePool,
    lendings: SqlitePool,
    trash: SqlitePool,
}

impl Database {
    /// Opens (creating if needed) all five partitions.
    ///
    /// ## What This Does
    /// 1. Creates the data directory
    /// 2. Opens one pool per partition file (WAL, NORMAL, busy timeout)
    /// 3. Runs each partition's migrations (if enabled)
    pub async fn new(config: DbConfig) -> DbResult<Self> {
        info!(
            data_dir = %config.data_dir.display(),
            "Initializing partition store"
        );

        tokio::fs::create_dir_all(&config.data_dir)
            .await
            .map_err(|e| {
                DbError::PartitionUnavailable(format!("{}: {}", config.data_dir.display(), e))
            })?;

        let db = Database {
            workers: Self::open_pool(&config, Partition::Workers).await?,
            tools: Self::open_pool(&config, Partition::Tools).await?,
            consumables: Self::open_pool(&config, Partition::Consumables).await?,
            lendings: Self::open_pool(&config, Partition::Lendings).await?,
            trash: Self::open_pool(&config, Partition::Trash).await?,
            config,
        };

        if db.config.run_migrations {
            db.run_migrations().await?;
        }

        Ok(db)
    }

    async fn open_pool(config: &DbConfig, partition: Partition) -> DbResult<SqlitePool> {
        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(config.connect_timeout)
            .idle_timeout(Some(config.idle_timeout))
            .connect_with(config.connect_options(partition))
            .await
            .map_err(|e| DbError::PartitionUnavailable(format!("{}: {}", partition, e)))?;

        debug!(
            partition = %partition,
            max_connections = config.max_connections,
            "Partition pool created"
        );
        Ok(pool)
    }

    /// Runs every partition's pending migrations.
    pub async fn run_migrations(&self) -> DbResult<()> {
        info!("Running partition migrations");
        for partition in Partition::ALL {
            migrations::run_migrations(partition, self.partition(partition)).await?;
        }
        info!("Migrations complete");
        Ok(())
    }

    /// Pool of one partition.
    ///
    /// For queries not covered by repositories. Prefer the repositories.
    pub fn partition(&self, partition: Partition) -> &SqlitePool {
        match partition {
            Partition::Workers => &self.workers,
            Partition::Tools => &self.tools,
            Partition::Consumables => &self.consumables,
            Partition::Lendings => &self.lendings,
            Partition::Trash => &self.trash,
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.config.data_dir
    }

    pub fn workers(&self) -> WorkerRepository {
        WorkerRepository::new(self.workers.clone())
    }

    pub fn tools(&self) -> ToolRepository {
        ToolRepository::new(self.tools.clone())
    }

    pub fn consumables(&self) -> ConsumableRepository {
        ConsumableRepository::new(self.consumables.clone())
    }

    pub fn lendings(&self) -> LendingRepository {
        LendingRepository::new(self.lendings.clone())
    }

    pub fn trash(&self) -> TrashRepository {
        TrashRepository::new(self.trash.clone())
    }

    /// Read-only views joining several partitions.
    pub fn reports(&self) -> ReportRepository {
        ReportRepository::new(self.clone())
    }

    /// Opens a dedicated connection on `base` with `attach` ATTACHed under
    /// their [`Partition::schema`] names.
    ///
    /// The connection is not pooled, so ATTACH state never leaks into other
    /// callers. Close it with [`JoinedConnection::close`] when done.
    pub async fn open_joined(
        &self,
        base: Partition,
        attach: &[Partition],
    ) -> DbResult<JoinedConnection> {
        let mut conn = self
            .config
            .connect_options(base)
            .connect()
            .await
            .map_err(|e| DbError::PartitionUnavailable(format!("{}: {}", base, e)))?;

        for partition in attach {
            let path = self.config.partition_path(*partition);
            // Schema names come from a closed enum; only the path is bound.
            let sql = format!("ATTACH DATABASE ?1 AS {}", partition.schema());
            sqlx::query(&sql)
                .bind(path.to_string_lossy().into_owned())
                .execute(&mut conn)
                .await?;
        }

        debug!(base = %base, attached = attach.len(), "Opened joined connection");
        Ok(JoinedConnection { conn })
    }

    /// Closes every partition pool.
    ///
    /// After calling close, all repository operations will fail.
    pub async fn close(&self) {
        info!("Closing partition pools");
        for partition in Partition::ALL {
            self.partition(partition).close().await;
        }
    }

    /// True when every partition answers a trivial query.
    pub async fn health_check(&self) -> bool {
        for partition in Partition::ALL {
            if sqlx::query("SELECT 1")
                .execute(self.partition(partition))
                .await
                .is_err()
            {
                warn!(partition = %partition, "Partition health check failed");
                return false;
            }
        }
        true
    }
}

/// A short-lived connection with other partitions ATTACHed.
#[derive(Debug)]
pub struct JoinedConnection {
    conn: SqliteConnection,
}

impl JoinedConnection {
    pub fn conn(&mut self) -> &mut SqliteConnection {
        &mut self.conn
    }

    pub async fn close(self) -> DbResult<()> {
        self.conn.close().await?;
        Ok(())
    }

    /// Closes the connection and returns the result of the query run on it.
    /// A close failure is only logged, so it never masks the query's outcome.
    pub async fn finish<T>(self, result: Result<T, sqlx::Error>) -> DbResult<T> {
        if let Err(e) = self.conn.close().await {
            warn!(error = %e, "Closing joined connection failed");
        }
        Ok(result?)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
