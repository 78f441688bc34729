//! # toolcrib-core: Pure Domain Logic for Toolcrib
//!
//! This crate holds the rules of the tool crib: what a tool may do next,
//! what a consumable's status is, who may call admin operations, and which
//! inputs are acceptable. No I/O happens here.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Toolcrib Architecture                            │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐    │
//! │  │               Presentation layer (out of scope)                 │    │
//! │  │      pages, admin login, CSV export, barcode images             │    │
//! │  └─────────────────────────────┬───────────────────────────────────┘    │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐    │
//! │  │                    toolcrib-ledger                              │    │
//! │  │   Catalog • ToolStateMachine • StockLedger • LendingEngine      │    │
//! │  │   TrashManager • Reporting                                      │    │
//! │  └─────────────────────────────┬───────────────────────────────────┘    │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐    │
//! │  │               ★ toolcrib-core (THIS CRATE) ★                    │    │
//! │  │                                                                 │    │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐    │    │
//! │  │   │   types   │  │   state   │  │   stock   │  │ validation│    │    │
//! │  │   │  Worker   │  │ ToolStatus│  │ Consumable│  │   rules   │    │    │
//! │  │   │  Tool ... │  │   edges   │  │  Status   │  │  checks   │    │    │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘    │    │
//! │  │                                                                 │    │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS            │    │
//! │  └─────────────────────────────────────────────────────────────────┘    │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐    │
//! │  │                  toolcrib-db (Partition Store)                  │    │
//! │  │     workers.db • tools.db • consumables.db • lendings.db        │    │
//! │  │     trash.db                                                    │    │
//! │  └─────────────────────────────────────────────────────────────────┘    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Worker, Tool, Consumable, Lending, trash snapshots)
//! - [`state`] - Tool status transition rules
//! - [`stock`] - Derived consumable status and stock arithmetic
//! - [`actor`] - Caller identity and the admin capability
//! - [`error`] - Domain error types
//! - [`validation`] - Input validation
//!
//! ## Example Usage
//!
//! ```rust
//! use toolcrib_core::{ConsumableStatus, ToolStatus};
//!
//! // Stock 20, minimum 10, consume 15
//! let change = toolcrib_core::stock::apply_delta("GLOVES-L", 20, -15).unwrap();
//! assert_eq!(ConsumableStatus::derive(change.new_stock, 10), ConsumableStatus::Reorder);
//!
//! // A defective tool never goes straight back out
//! assert!(!ToolStatus::Defective.can_transition_to(ToolStatus::Borrowed));
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod actor;
pub mod error;
pub mod state;
pub mod stock;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use actor::{Actor, AdminCapability, Role};
pub use error::{CoreError, CoreResult, PartialFailure, ValidationError};
pub use state::{plan_transition, TransitionPlan};
pub use stock::ConsumableStatus;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Location used when a tool or consumable is created without one.
pub const DEFAULT_LOCATION: &str = "Storage";

/// Unit used when a consumable is created without one.
pub const DEFAULT_UNIT: &str = "piece";

/// Longest barcode accepted.
pub const MAX_BARCODE_LEN: usize = 64;

/// Longest free-text field accepted (names, descriptions, comments).
pub const MAX_TEXT_LEN: usize = 200;

/// Largest single consumption, adjustment or stock level.
///
/// Catches typos such as scanning a barcode into the amount field.
pub const MAX_AMOUNT: i64 = 100_000;
