//! # Stock Rules
//!
//! Derived consumable status and stock arithmetic.
//!
//! ## Derived Status
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   current_stock == 0                  → Empty                           │
//! │   0 < current_stock <= minimum_stock  → Reorder                         │
//! │   current_stock >  minimum_stock      → Available                       │
//! │                                                                         │
//! │  The consumables table keeps a `status` column for display. It is a     │
//! │  cache: every decision recomputes the status from the two numbers.      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};
use crate::types::StockChange;

/// Status of a consumable, always derived from its stock figures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum ConsumableStatus {
    Available,
    /// At or below the minimum, still some left.
    Reorder,
    /// Nothing left.
    Empty,
}

impl ConsumableStatus {
    /// Computes the status from the stock figures.
    ///
    /// ## Example
    /// ```rust
    /// use toolcrib_core::ConsumableStatus;
    ///
    /// assert_eq!(ConsumableStatus::derive(5, 10), ConsumableStatus::Reorder);
    /// assert_eq!(ConsumableStatus::derive(0, 10), ConsumableStatus::Empty);
    /// assert_eq!(ConsumableStatus::derive(11, 10), ConsumableStatus::Available);
    /// ```
    pub fn derive(current_stock: i64, minimum_stock: i64) -> Self {
        if current_stock <= 0 {
            ConsumableStatus::Empty
        } else if current_stock <= minimum_stock {
            ConsumableStatus::Reorder
        } else {
            ConsumableStatus::Available
        }
    }

    /// Stored name, matches the display cache column.
    pub fn as_str(&self) -> &'static str {
        match self {
            ConsumableStatus::Available => "available",
            ConsumableStatus::Reorder => "reorder",
            ConsumableStatus::Empty => "empty",
        }
    }

    /// True when someone should order more.
    #[inline]
    pub fn needs_reorder(&self) -> bool {
        !matches!(self, ConsumableStatus::Available)
    }
}

impl std::fmt::Display for ConsumableStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Applies `delta` to `current`, refusing to go below zero.
///
/// The store performs the same check inside its conditional update. After a
/// refused update the ledger replays it here against the stock it reads back.
///
/// ## Example
/// ```rust
/// use toolcrib_core::stock::apply_delta;
///
/// let change = apply_delta("SCREW-4", 20, -15).unwrap();
/// assert_eq!(change.new_stock, 5);
/// assert!(apply_delta("SCREW-4", 5, -10).is_err());
/// ```
pub fn apply_delta(barcode: &str, current: i64, delta: i64) -> CoreResult<StockChange> {
    if delta == 0 {
        return Err(CoreError::InvalidAmount { amount: 0 });
    }

    match current.checked_add(delta) {
        Some(new_stock) if new_stock >= 0 => Ok(StockChange {
            old_stock: current,
            new_stock,
        }),
        _ => Err(CoreError::InsufficientStock {
            barcode: barcode.to_string(),
            available: current,
            requested: delta.saturating_neg(),
        }),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
