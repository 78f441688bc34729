//! # toolcrib-db: Partition Store for Toolcrib
//!
//! Every entity family lives in its own SQLite file with its own pool.
//! This crate owns the SQL; it never coordinates writes across files.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Toolcrib Data Flow                               │
//! │                                                                         │
//! │  toolcrib-ledger (LendingEngine::checkout)                              │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐    │
//! │  │                 toolcrib-db (THIS CRATE)                        │    │
//! │  │                                                                 │    │
//! │  │   ┌───────────────┐    ┌────────────────┐    ┌──────────────┐   │    │
//! │  │   │   Database    │    │  Repositories  │    │  Migrations  │   │    │
//! │  │   │   (pool.rs)   │    │                │    │  (embedded)  │   │    │
//! │  │   │               │    │ WorkerRepo     │    │ workers/     │   │    │
//! │  │   │ 5 × SqlitePool│◄───│ ToolRepo       │    │ tools/       │   │    │
//! │  │   │ open_joined() │    │ ConsumableRepo │    │ consumables/ │   │    │
//! │  │   │               │    │ LendingRepo    │    │ lendings/    │   │    │
//! │  │   │               │    │ TrashRepo      │    │ trash/       │   │    │
//! │  │   │               │    │ ReportRepo     │    │              │   │    │
//! │  │   └───────────────┘    └────────────────┘    └──────────────┘   │    │
//! │  └─────────────────────────────────────────────────────────────────┘    │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  data_dir/{workers,tools,consumables,lendings,trash}.db                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Partition pools and joined read connections
//! - [`migrations`] - Embedded migrations, one set per partition
//! - [`error`] - Database error types
//! - [`repository`] - Repository implementations
//!
//! ## Usage
//!
//! ```rust,ignore
//! use toolcrib_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("./data")).await?;
//! let tool = db.tools().get("T-0001").await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig, JoinedConnection, Partition};

// Repository re-exports for convenience
pub use repository::consumable::{ConsumableRepository, StockEntry};
pub use repository::lending::LendingRepository;
pub use repository::report::{LendingScope, ReportRepository};
pub use repository::tool::ToolRepository;
pub use repository::trash::TrashRepository;
pub use repository::worker::WorkerRepository;
pub use repository::new_record_id;
