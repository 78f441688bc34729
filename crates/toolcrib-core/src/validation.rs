//! # Validation Module
//!
//! Input validation utilities for Toolcrib.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Presentation layer                                            │
//! │  └── Form checks, immediate user feedback                               │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: Catalog / Ledger (Rust)                                       │
//! │  └── THIS MODULE: field rules before any partition is touched           │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Partition store (SQLite)                                      │
//! │  ├── NOT NULL / CHECK (current_stock >= 0, amount >= 1)                 │
//! │  ├── PRIMARY KEY on barcode                                             │
//! │  └── Partial UNIQUE index on open tool loans                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust,no_run
//! use toolcrib_core::validation::{validate_barcode, validate_amount};
//!
//! validate_barcode("T-1001").unwrap();
//! validate_amount(5).unwrap();
//! ```

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::{MAX_AMOUNT, MAX_BARCODE_LEN, MAX_TEXT_LEN};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// String Validators
// =============================================================================

/// Validates a barcode (workers, tools and consumables alike).
///
/// ## Rules
/// - Must not be empty
/// - At most [`MAX_BARCODE_LEN`] characters
/// - Letters, digits, hyphens, underscores and dots only
///
/// Returns the trimmed value; scanners often append a newline.
///
/// ## Example
/// ```rust
/// use toolcrib_core::validation::validate_barcode;
///
/// assert_eq!(validate_barcode("T-1001\n").unwrap(), "T-1001");
/// assert!(validate_barcode("").is_err());
/// assert!(validate_barcode("has space").is_err());
/// ```
pub fn validate_barcode(barcode: &str) -> ValidationResult<String> {
    let barcode = barcode.trim();

    if barcode.is_empty() {
        return Err(ValidationError::Required {
            field: "barcode".to_string(),
        });
    }

    if barcode.chars().count() > MAX_BARCODE_LEN {
        return Err(ValidationError::TooLong {
            field: "barcode".to_string(),
            max: MAX_BARCODE_LEN,
        });
    }

    if !barcode
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-' || c == '_' || c == '.')
    {
        return Err(ValidationError::InvalidFormat {
            field: "barcode".to_string(),
            reason: "must contain only letters, numbers, hyphens, underscores and dots"
                .to_string(),
        });
    }

    Ok(barcode.to_string())
}

/// Validates a required text field (names, descriptions, locations).
///
/// Returns the trimmed value.
pub fn validate_required_text(field: &str, value: &str) -> ValidationResult<String> {
    let value = value.trim();

    if value.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    if value.chars().count() > MAX_TEXT_LEN {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max: MAX_TEXT_LEN,
        });
    }

    Ok(value.to_string())
}

/// Validates an optional text field. Blank collapses to `None`.
pub fn validate_optional_text(field: &str, value: Option<&str>) -> ValidationResult<Option<String>> {
    match value.map(str::trim) {
        None | Some("") => Ok(None),
        Some(v) => validate_required_text(field, v).map(Some),
    }
}

/// Validates an optional email address.
///
/// Only a shape check: one `@` with something on both sides and a dot in
/// the domain.
///
/// ## Example
/// ```rust
/// use toolcrib_core::validation::validate_email;
///
/// assert_eq!(validate_email(Some(" a@b.io ")).unwrap(), Some("a@b.io".to_string()));
/// assert_eq!(validate_email(Some("")).unwrap(), None);
/// assert!(validate_email(Some("nope")).is_err());
/// ```
pub fn validate_email(value: Option<&str>) -> ValidationResult<Option<String>> {
    let Some(email) = validate_optional_text("email", value)? else {
        return Ok(None);
    };

    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
        }
        None => false,
    };

    if !valid || email.contains(char::is_whitespace) {
        return Err(ValidationError::InvalidFormat {
            field: "email".to_string(),
            reason: "must look like name@domain.tld".to_string(),
        });
    }

    Ok(Some(email))
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a consumption amount.
///
/// ## Rules
/// - Must be at least 1
/// - Must not exceed [`MAX_AMOUNT`]
///
/// Fails with `InvalidAmount` rather than a validation error, since callers
/// branch on it.
pub fn validate_amount(amount: i64) -> CoreResult<()> {
    if !(1..=MAX_AMOUNT).contains(&amount) {
        return Err(CoreError::InvalidAmount { amount });
    }
    Ok(())
}

/// Validates a stock adjustment delta: non-zero, bounded.
pub fn validate_delta(delta: i64) -> CoreResult<()> {
    if delta == 0 || delta.unsigned_abs() > MAX_AMOUNT as u64 {
        return Err(CoreError::InvalidAmount { amount: delta });
    }
    Ok(())
}

/// Validates a stock level (minimum or initial).
pub fn validate_stock_level(field: &str, value: i64) -> ValidationResult<()> {
    if !(0..=MAX_AMOUNT).contains(&value) {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0,
            max: MAX_AMOUNT,
        });
    }
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
