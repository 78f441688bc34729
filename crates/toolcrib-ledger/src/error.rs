//! # Ledger Error Type
//!
//! What callers of the ledger see.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  Presentation layer                  toolcrib-ledger                    │
//! │  ──────────────────                  ───────────────                    │
//! │                                                                         │
//! │  lending.checkout("T-1", "W-1")                                         │
//! │         │                                                               │
//! │         ▼                                                               │
//! │  ┌──────────────────────────────────────────────────────────────────┐   │
//! │  │  Rule broken?   ─── CoreError::NotAvailable ──┐                  │   │
//! │  │  Storage error? ─── DbError::QueryFailed ─────┼─► LedgerError    │   │
//! │  │  Saga stopped?  ─── CoreError::PartialFailure ┘                  │   │
//! │  └──────────────────────────────────────────────────────────────────┘   │
//! │         │                                                               │
//! │         ▼                                                               │
//! │  err.code() == ErrorCode::PartialFailure  → show reconciliation hint    │
//! │  err.report() → { code, message, partial }  (serializable)              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::Serialize;
use thiserror::Error;
use tracing::{error, warn};
use toolcrib_core::{CoreError, PartialFailure, ValidationError};
use toolcrib_db::DbError;

/// Result type for ledger operations.
pub type LedgerResult<T> = Result<T, LedgerError>;

/// Errors returned by the ledger services.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// A domain rule rejected the operation, or a saga partially failed.
    #[error(transparent)]
    Domain(#[from] CoreError),

    /// The partition store failed.
    #[error(transparent)]
    Storage(#[from] DbError),

    /// toolcrib.toml or an environment override is unusable.
    #[error("Invalid configuration: {0}")]
    Config(String),
}

/// Stable machine-readable error codes.
///
/// ## Usage in Frontend
/// ```typescript
/// switch (e.code) {
///   case 'NOT_AVAILABLE':
///     showNotification('Tool is already lent out');
///     break;
///   case 'PARTIAL_FAILURE':
///     showReconciliationDialog(e.partial);
///     break;
/// }
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    NotFound,
    InvalidAmount,
    InsufficientStock,
    NotAvailable,
    NoActiveLending,
    HasActiveLendings,
    BarcodeConflict,
    Duplicate,
    Forbidden,
    PartialFailure,
    Validation,
    /// Compare-and-set retries exhausted.
    Conflict,
    Storage,
    Config,
}

/// Serializable form of a [`LedgerError`].
#[derive(Debug, Clone, Serialize)]
pub struct ErrorReport {
    pub code: ErrorCode,
    pub message: String,
    /// Set for [`ErrorCode::PartialFailure`] only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub partial: Option<PartialFailure>,
}

impl LedgerError {
    pub fn code(&self) -> ErrorCode {
        match self {
            LedgerError::Domain(err) => match err {
                CoreError::NotFound { .. } => ErrorCode::NotFound,
                CoreError::InvalidAmount { .. } => ErrorCode::InvalidAmount,
                CoreError::InsufficientStock { .. } => ErrorCode::InsufficientStock,
                CoreError::NotAvailable { .. } => ErrorCode::NotAvailable,
                CoreError::NoActiveLending { .. } => ErrorCode::NoActiveLending,
                CoreError::HasActiveLendings { .. } => ErrorCode::HasActiveLendings,
                CoreError::BarcodeConflict { .. } => ErrorCode::BarcodeConflict,
                CoreError::Duplicate { .. } => ErrorCode::Duplicate,
                CoreError::Forbidden { .. } => ErrorCode::Forbidden,
                CoreError::PartialFailure(_) => ErrorCode::PartialFailure,
                CoreError::Validation(_) => ErrorCode::Validation,
            },
            LedgerError::Storage(err) => match err {
                DbError::NotFound { .. } => ErrorCode::NotFound,
                DbError::Conflict { .. } => ErrorCode::Conflict,
                _ => ErrorCode::Storage,
            },
            LedgerError::Config(_) => ErrorCode::Config,
        }
    }

    /// The partial failure report, if this is one.
    pub fn partial_failure(&self) -> Option<&PartialFailure> {
        match self {
            LedgerError::Domain(CoreError::PartialFailure(failure)) => Some(failure),
            _ => None,
        }
    }

    pub fn report(&self) -> ErrorReport {
        ErrorReport {
            code: self.code(),
            message: self.to_string(),
            partial: self.partial_failure().cloned(),
        }
    }
}

impl From<ValidationError> for LedgerError {
    fn from(err: ValidationError) -> Self {
        LedgerError::Domain(CoreError::Validation(err))
    }
}

impl From<PartialFailure> for LedgerError {
    fn from(failure: PartialFailure) -> Self {
        LedgerError::Domain(failure.into())
    }
}

impl From<std::io::Error> for LedgerError {
    fn from(err: std::io::Error) -> Self {
        LedgerError::Config(err.to_string())
    }
}

impl From<toml::de::Error> for LedgerError {
    fn from(err: toml::de::Error) -> Self {
        LedgerError::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for LedgerError {
    fn from(err: toml::ser::Error) -> Self {
        LedgerError::Config(err.to_string())
    }
}

/// Logs a partial failure with its snapshots and turns it into an error.
pub(crate) fn report_partial_failure(failure: PartialFailure) -> LedgerError {
    if failure.compensated {
        warn!(
            operation = %failure.operation,
            barcode = %failure.barcode,
            failed = %failure.failed,
            cause = %failure.cause,
            before = %failure.before,
            after = %failure.after,
            "Partial failure, compensated"
        );
    } else {
        error!(
            operation = %failure.operation,
            barcode = %failure.barcode,
            completed = %failure.completed,
            failed = %failure.failed,
            cause = %failure.cause,
            before = %failure.before,
            after = %failure.after,
            "Partial failure, compensation failed; manual reconciliation required"
        );
    }
    failure.into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use toolcrib_core::ToolStatus;

    #[test]
    fn test_codes_for_domain_errors() {
        let err: LedgerError = CoreError::NotAvailable {
            barcode: "T-1".into(),
            status: ToolStatus::Borrowed,
        }
        .into();
        assert_eq!(err.code(), ErrorCode::NotAvailable);

        let err: LedgerError = ValidationError::Required {
            field: "barcode".into(),
        }
        .into();
        assert_eq!(err.code(), ErrorCode::Validation);
    }

    #[test]
    fn test_codes_for_storage_errors() {
        let err: LedgerError = DbError::Conflict {
            entity: "Tool".into(),
            id: "T-1".into(),
            attempts: 3,
        }
        .into();
        assert_eq!(err.code(), ErrorCode::Conflict);

        let err: LedgerError = DbError::PartitionUnavailable("pool is closed".into()).into();
        assert_eq!(err.code(), ErrorCode::Storage);
    }

    #[test]
    fn test_partial_failure_report_serializes() {
        let failure = PartialFailure {
            operation: "checkout".into(),
            barcode: "T-1".into(),
            completed: "tool status".into(),
            failed: "lending insert".into(),
            cause: "pool closed".into(),
            compensated: true,
            before: serde_json::json!({"status": "available"}),
            after: serde_json::json!({"status": "borrowed"}),
        };
        let err: LedgerError = failure.into();

        let json = serde_json::to_value(err.report()).unwrap();
        assert_eq!(json["code"], "PARTIAL_FAILURE");
        assert_eq!(json["partial"]["compensated"], true);
    }

    #[test]
    fn test_clean_failure_has_no_partial() {
        let err: LedgerError = CoreError::NoActiveLending {
            barcode: "T-1".into(),
        }
        .into();
        let json = serde_json::to_value(err.report()).unwrap();
        assert_eq!(json["code"], "NO_ACTIVE_LENDING");
        assert!(json.get("partial").is_none());
    }
}
