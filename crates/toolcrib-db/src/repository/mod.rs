//! # Repository Module
//!
//! One repository per partition. Each owns the SQL of its file and nothing
//! else; sagas that touch two partitions live in toolcrib-ledger.
//!
//! ## Repository Layout
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  toolcrib-ledger service                                                │
//! │       │                                                                 │
//! │       │  db.tools().compare_and_set_status(..)                          │
//! │       ▼                                                                 │
//! │  ToolRepository ──────► tools.db                                        │
//! │  ├── get / list / insert / update / delete                              │
//! │  ├── compare_and_set_status (+ status history, one transaction)         │
//! │  └── history / status_history                                           │
//! │                                                                         │
//! │  ReportRepository ────► lendings.db + ATTACH workers/tools/consumables  │
//! │  (read-only)                                                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`WorkerRepository`](worker::WorkerRepository) - Workers + change history
//! - [`ToolRepository`](tool::ToolRepository) - Tools, status and change history
//! - [`ConsumableRepository`](consumable::ConsumableRepository) - Stock + stock history
//! - [`LendingRepository`](lending::LendingRepository) - Loans and consumptions
//! - [`TrashRepository`](trash::TrashRepository) - Deleted record snapshots
//! - [`ReportRepository`](report::ReportRepository) - Joined read-only views

use uuid::Uuid;

pub mod consumable;
pub mod lending;
pub mod report;
pub mod tool;
pub mod trash;
pub mod worker;

/// Generates an id for a lending row or trash snapshot.
pub fn new_record_id() -> String {
    Uuid::new_v4().to_string()
}
