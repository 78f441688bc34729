//! # toolcrib-ledger: Cross-Partition Inventory and Lending Ledger
//!
//! The services the presentation layer calls. They hold no state of their
//! own; everything lives in the partition files behind a [`Database`].
//!
//! ## Service Map
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                              Ledger                                     │
//! │                                                                         │
//! │  catalog()   Catalog           create / edit / list / get               │
//! │  tools()     ToolStateMachine  transition, status history               │
//! │  stock()     StockLedger       adjust, consume, reorder list            │
//! │  lending()   LendingEngine     checkout, return, consume, reconcile     │
//! │  trash()     TrashManager      soft delete, restore, purge              │
//! │  reports()   Reports           joined read-only views                   │
//! │                                                                         │
//! │  All of them share one Database: five pools, one per partition.        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Authorization
//! Admin operations take an [`AdminCapability`](toolcrib_core::AdminCapability),
//! which only [`Actor::require_admin`](toolcrib_core::Actor::require_admin)
//! hands out. Checkout, return and consume accept any
//! [`Actor`](toolcrib_core::Actor).
//!
//! ## Usage
//! ```rust,ignore
//! use toolcrib_core::Actor;
//! use toolcrib_ledger::{Ledger, ToolcribConfig};
//!
//! let ledger = Ledger::open(&ToolcribConfig::load(None)?).await?;
//! let clerk = Actor::worker("front-desk");
//!
//! let loan = ledger.lending().checkout("T-0001", "W-0001", &clerk).await?;
//! ledger.lending().return_tool("T-0001", &clerk).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod catalog;
pub mod config;
pub mod error;
pub mod lending;
pub mod reporting;
pub mod stock;
pub mod tool_state;
pub mod trash;

// =============================================================================
// Re-exports
// =============================================================================

pub use catalog::Catalog;
pub use config::{LedgerSettings, StoreSettings, ToolcribConfig};
pub use error::{ErrorCode, ErrorReport, LedgerError, LedgerResult};
pub use lending::LendingEngine;
pub use reporting::Reports;
pub use stock::StockLedger;
pub use tool_state::ToolStateMachine;
pub use trash::TrashManager;

use toolcrib_db::Database;
use tracing::info;

/// Entry point bundling the ledger services over one [`Database`].
///
/// Cheap to clone; services are built on demand and share the pools.
#[derive(Debug, Clone)]
pub struct Ledger {
    db: Database,
    settings: LedgerSettings,
}

impl Ledger {
    /// Opens (and migrates) the partition files named by `config`.
    pub async fn open(config: &ToolcribConfig) -> LedgerResult<Self> {
        let db = Database::new(config.to_db_config()).await?;
        info!(data_dir = ?config.store.data_dir, "Ledger opened");
        Ok(Self::new(db, config.ledger))
    }

    /// Wraps an already open database.
    pub fn new(db: Database, settings: LedgerSettings) -> Self {
        Ledger { db, settings }
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    pub fn settings(&self) -> &LedgerSettings {
        &self.settings
    }

    pub fn catalog(&self) -> Catalog {
        Catalog::new(self.db.clone())
    }

    pub fn tools(&self) -> ToolStateMachine {
        ToolStateMachine::new(self.db.clone(), self.settings.cas_retries)
    }

    pub fn stock(&self) -> StockLedger {
        StockLedger::new(self.db.clone())
    }

    pub fn lending(&self) -> LendingEngine {
        LendingEngine::new(self.db.clone(), self.tools(), self.stock())
    }

    pub fn trash(&self) -> TrashManager {
        TrashManager::new(self.db.clone())
    }

    pub fn reports(&self) -> Reports {
        Reports::new(self.db.clone(), self.settings)
    }

    /// Closes every partition pool.
    pub async fn close(&self) {
        self.db.close().await;
    }
}
