//! # Domain Types
//!
//! Core domain types used throughout Toolcrib.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐        │
//! │  │     Worker      │   │      Tool       │   │   Consumable    │        │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │        │
//! │  │  barcode        │   │  barcode        │   │  barcode        │        │
//! │  │  name/lastname  │   │  status         │   │  current_stock  │        │
//! │  │  department     │   │  defect_ts      │   │  minimum_stock  │        │
//! │  └────────┬────────┘   └────────┬────────┘   └────────┬────────┘        │
//! │           │                     │                     │                 │
//! │           └──────────┬──────────┴──────────┬──────────┘                 │
//! │                      ▼                     ▼                            │
//! │            ┌─────────────────┐   ┌───────────────────┐                  │
//! │            │     Lending     │   │  Trash snapshots  │                  │
//! │            │  Loan (tool)    │   │  DeletedWorker    │                  │
//! │            │  Consumption    │   │  DeletedTool      │                  │
//! │            └─────────────────┘   │  DeletedConsumable│                  │
//! │                                  └───────────────────┘                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Identity
//! Workers, tools and consumables are identified by their barcode. Lending
//! rows and trash snapshots carry a UUID v4 `id`. History rows use the
//! partition's integer rowid.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::stock::ConsumableStatus;

// =============================================================================
// Entity Kind
// =============================================================================

/// The three entity families that can be soft-deleted and restored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Worker,
    Tool,
    Consumable,
}

impl EntityKind {
    /// All kinds, in the order the trash view lists them.
    pub const ALL: [EntityKind; 3] = [EntityKind::Worker, EntityKind::Tool, EntityKind::Consumable];

    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Worker => "worker",
            EntityKind::Tool => "tool",
            EntityKind::Consumable => "consumable",
        }
    }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Worker
// =============================================================================

/// A person who can borrow tools and draw consumables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Worker {
    /// Badge barcode. Immutable identity.
    pub barcode: String,
    pub name: String,
    pub lastname: String,
    pub department: Option<String>,
    pub email: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Worker {
    /// "Name Lastname", as shown on loan lists.
    pub fn full_name(&self) -> String {
        format!("{} {}", self.name, self.lastname)
    }
}

/// Input for creating a worker.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewWorker {
    pub barcode: String,
    pub name: String,
    pub lastname: String,
    pub department: Option<String>,
    pub email: Option<String>,
}

/// Editable worker fields. The barcode never changes.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct WorkerUpdate {
    pub name: String,
    pub lastname: String,
    pub department: Option<String>,
    pub email: Option<String>,
}

// =============================================================================
// Tool
// =============================================================================

/// The status of a tool.
///
/// Transition rules live in [`crate::state`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum ToolStatus {
    /// On the shelf, can be checked out.
    Available,
    /// Out with a worker. Backed by exactly one open lending row.
    Borrowed,
    /// Reported broken. Cannot be checked out.
    Defective,
}

impl Default for ToolStatus {
    fn default() -> Self {
        ToolStatus::Available
    }
}

/// A lendable tool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Tool {
    pub barcode: String,
    pub description: String,
    pub location: String,
    pub category: Option<String>,
    pub status: ToolStatus,
    /// Set when the tool became defective, cleared on recovery.
    #[ts(as = "Option<String>")]
    pub defect_timestamp: Option<DateTime<Utc>>,
    /// Reference to an uploaded picture, owned by the presentation layer.
    pub image_ref: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a tool. New tools always start `Available`.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewTool {
    pub barcode: String,
    pub description: String,
    /// Empty falls back to [`crate::DEFAULT_LOCATION`].
    pub location: Option<String>,
    pub category: Option<String>,
    pub image_ref: Option<String>,
}

/// Editable tool fields.
///
/// Status is not editable here; use the tool state machine.
/// `image_ref: None` keeps the current picture.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ToolUpdate {
    pub description: String,
    pub location: String,
    pub category: Option<String>,
    pub image_ref: Option<String>,
}

/// Filters for the tool list. `None` means "any".
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ToolFilter {
    pub status: Option<ToolStatus>,
    pub location: Option<String>,
    pub category: Option<String>,
}

// =============================================================================
// Consumable
// =============================================================================

/// A stocked material that is drawn down, never returned.
///
/// Has no stored status: see [`Consumable::status`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Consumable {
    pub barcode: String,
    pub description: String,
    pub location: String,
    pub category: Option<String>,
    /// Unit of measure ("piece", "box", "m").
    pub unit: String,
    pub minimum_stock: i64,
    pub current_stock: i64,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Consumable {
    /// Status derived from the stock figures on this row.
    #[inline]
    pub fn status(&self) -> ConsumableStatus {
        ConsumableStatus::derive(self.current_stock, self.minimum_stock)
    }
}

/// Input for creating a consumable.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewConsumable {
    pub barcode: String,
    pub description: String,
    pub location: Option<String>,
    pub category: Option<String>,
    /// Empty falls back to [`crate::DEFAULT_UNIT`].
    pub unit: Option<String>,
    pub minimum_stock: i64,
    pub initial_stock: i64,
}

/// Editable consumable fields. Stock only moves through the stock ledger.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ConsumableUpdate {
    pub description: String,
    pub location: String,
    pub category: Option<String>,
    pub unit: String,
    pub minimum_stock: i64,
}

/// Filters for the consumable list. `None` means "any".
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ConsumableFilter {
    /// Matched against the derived status, not the cached column.
    pub status: Option<ConsumableStatus>,
    pub location: Option<String>,
    pub category: Option<String>,
}

// =============================================================================
// Lending
// =============================================================================

/// What kind of item a lending row refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum ItemType {
    Tool,
    Consumable,
}

/// A row of the lending ledger.
///
/// Tool loans and consumptions share this table but have different
/// lifecycles, see [`Lending::event`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Lending {
    pub id: String,
    pub worker_barcode: String,
    pub item_barcode: String,
    pub item_type: ItemType,
    #[ts(as = "String")]
    pub checkout_time: DateTime<Utc>,
    /// `None` while a tool is out. Consumptions are closed at creation.
    #[ts(as = "Option<String>")]
    pub return_time: Option<DateTime<Utc>>,
    pub amount: i64,
    /// Stock snapshot before a consumption.
    pub old_stock: Option<i64>,
    /// Stock snapshot after a consumption.
    pub new_stock: Option<i64>,
}

/// The event a lending row represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LendingEvent {
    /// A tool checkout. `open` until the tool comes back.
    Loan { open: bool },
    /// A consumable draw-down. Never open.
    Consumption { amount: i64, old_stock: i64, new_stock: i64 },
}

impl Lending {
    /// Interprets the row as either a loan or a consumption.
    pub fn event(&self) -> LendingEvent {
        match self.item_type {
            ItemType::Tool => LendingEvent::Loan {
                open: self.return_time.is_none(),
            },
            ItemType::Consumable => LendingEvent::Consumption {
                amount: self.amount,
                old_stock: self.old_stock.unwrap_or(0),
                new_stock: self.new_stock.unwrap_or(0),
            },
        }
    }

    /// True for a tool loan that has not been returned.
    #[inline]
    pub fn is_open_loan(&self) -> bool {
        matches!(self.event(), LendingEvent::Loan { open: true })
    }
}

/// Stock figures before and after a consumption or adjustment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct StockChange {
    pub old_stock: i64,
    pub new_stock: i64,
}

impl StockChange {
    /// Signed change applied to the stock.
    #[inline]
    pub fn delta(&self) -> i64 {
        self.new_stock - self.old_stock
    }
}

// =============================================================================
// History
// =============================================================================

/// One row of a tool's status history. Append-only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct ToolStatusChange {
    pub id: i64,
    pub tool_barcode: String,
    pub old_status: ToolStatus,
    pub new_status: ToolStatus,
    pub comment: Option<String>,
    pub changed_by: String,
    #[ts(as = "String")]
    pub timestamp: DateTime<Utc>,
}

/// Why a consumable's stock moved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum StockAction {
    /// Drawn by a worker.
    Consumption,
    /// Manual correction or restock by an admin.
    Adjustment,
    /// Undo of a consumption whose lending row could not be written.
    Compensation,
}

/// One row of a consumable's stock history. Append-only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct StockMovement {
    pub id: i64,
    pub consumable_barcode: String,
    pub worker_barcode: Option<String>,
    pub action: StockAction,
    /// Signed delta applied (`new_stock - old_stock`).
    pub amount: i64,
    pub old_stock: i64,
    pub new_stock: i64,
    pub comment: Option<String>,
    pub changed_by: String,
    #[ts(as = "String")]
    pub timestamp: DateTime<Utc>,
}

/// Kind of catalog change recorded in the change history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum ChangeAction {
    Create,
    Update,
}

/// One row of a worker's or tool's change history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct ChangeRecord {
    pub id: i64,
    pub barcode: String,
    pub action: ChangeAction,
    /// JSON object of field name to new value.
    pub changed_fields: String,
    pub changed_by: String,
    #[ts(as = "String")]
    pub timestamp: DateTime<Utc>,
}

// =============================================================================
// Views
// =============================================================================

/// A lending row joined with the worker's name and the item's description.
///
/// Either side may be missing (`None`) when the worker or item has since
/// been moved to the trash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct LendingView {
    pub id: String,
    pub worker_barcode: String,
    pub worker_name: Option<String>,
    pub item_barcode: String,
    pub item_type: ItemType,
    pub item_description: Option<String>,
    #[ts(as = "String")]
    pub checkout_time: DateTime<Utc>,
    #[ts(as = "Option<String>")]
    pub return_time: Option<DateTime<Utc>>,
    pub amount: i64,
    pub old_stock: Option<i64>,
    pub new_stock: Option<i64>,
}

/// Raw per-tool count used by the loan reconciliation scan.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct ToolLoanCount {
    pub tool_barcode: String,
    /// `None` when the tool row no longer exists.
    pub tool_status: Option<ToolStatus>,
    pub open_loans: i64,
}

/// How a tool and its loans disagree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum LoanMismatchKind {
    /// Status is Borrowed but no loan is open.
    BorrowedWithoutLoan,
    /// A loan is open but the tool is not Borrowed.
    LoanButNotBorrowed,
    /// A loan is open for a tool that no longer exists.
    LoanForMissingTool,
    /// More than one loan is open for the same tool.
    MultipleOpenLoans,
}

/// One violation of "Borrowed iff exactly one open loan".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct LoanMismatch {
    pub tool_barcode: String,
    pub tool_status: Option<ToolStatus>,
    pub open_loans: i64,
    pub kind: LoanMismatchKind,
}

// =============================================================================
// Trash
// =============================================================================

/// Snapshot of a soft-deleted worker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct DeletedWorker {
    pub id: String,
    pub barcode: String,
    pub name: String,
    pub lastname: String,
    pub department: Option<String>,
    pub email: Option<String>,
    #[ts(as = "String")]
    pub deleted_at: DateTime<Utc>,
    pub deleted_by: String,
}

/// Snapshot of a soft-deleted tool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct DeletedTool {
    pub id: String,
    pub barcode: String,
    pub description: String,
    pub location: String,
    pub category: Option<String>,
    /// Status at deletion time. Informational only; restore resets it.
    pub status: ToolStatus,
    pub image_ref: Option<String>,
    #[ts(as = "String")]
    pub deleted_at: DateTime<Utc>,
    pub deleted_by: String,
}

/// Snapshot of a soft-deleted consumable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct DeletedConsumable {
    pub id: String,
    pub barcode: String,
    pub description: String,
    pub location: String,
    pub category: Option<String>,
    pub unit: String,
    pub minimum_stock: i64,
    /// Stock at deletion time; restored as-is.
    pub last_stock: i64,
    #[ts(as = "String")]
    pub deleted_at: DateTime<Utc>,
    pub deleted_by: String,
}

/// A trash row of any kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TrashedRecord {
    Worker(DeletedWorker),
    Tool(DeletedTool),
    Consumable(DeletedConsumable),
}

impl TrashedRecord {
    pub fn kind(&self) -> EntityKind {
        match self {
            TrashedRecord::Worker(_) => EntityKind::Worker,
            TrashedRecord::Tool(_) => EntityKind::Tool,
            TrashedRecord::Consumable(_) => EntityKind::Consumable,
        }
    }

    /// Trash id.
    pub fn id(&self) -> &str {
        match self {
            TrashedRecord::Worker(w) => &w.id,
            TrashedRecord::Tool(t) => &t.id,
            TrashedRecord::Consumable(c) => &c.id,
        }
    }

    pub fn barcode(&self) -> &str {
        match self {
            TrashedRecord::Worker(w) => &w.barcode,
            TrashedRecord::Tool(t) => &t.barcode,
            TrashedRecord::Consumable(c) => &c.barcode,
        }
    }

    pub fn deleted_at(&self) -> DateTime<Utc> {
        match self {
            TrashedRecord::Worker(w) => w.deleted_at,
            TrashedRecord::Tool(t) => t.deleted_at,
            TrashedRecord::Consumable(c) => c.deleted_at,
        }
    }
}

/// Outcome of a restore: which record came back, under which barcode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct RestoredRecord {
    pub kind: EntityKind,
    pub barcode: String,
}

// =============================================================================
// Unit Tests
// =============================================================================
