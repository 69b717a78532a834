//! # API Error Type
//!
//! Unified error type for state-manager operations and CLI commands.
//!
//! ## Error Handling Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Flow in QuoteKit                               │
//! │                                                                         │
//! │  CoreError ── Validation / IncompleteQuote ───► VALIDATION_ERROR       │
//! │           ── InsufficientStock ───────────────► INSUFFICIENT_STOCK     │
//! │           ── ReapprovalNotConfirmed ──────────► CONFIRMATION_REQUIRED  │
//! │           ── *NotFound ───────────────────────► NOT_FOUND              │
//! │                                                                         │
//! │  DbError  ── StorageUnavailable ──────────────► STORAGE_UNAVAILABLE    │
//! │           ── other ───────────────────────────► DATABASE_ERROR         │
//! │                                                                         │
//! │  SyncError ── MalformedImport / Version ──────► MALFORMED_IMPORT       │
//! │            ── Storage(DbError) ───────────────► (as DbError)           │
//! │            ── other ──────────────────────────► SYNC_FAILURE           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Validation and stock errors block the action that raised them. Storage
//! errors arrive after the in-memory edit was applied; the edit is kept
//! and can be flushed later with `retry_persist`.

use serde::Serialize;

use quotekit_core::CoreError;
use quotekit_db::DbError;
use quotekit_sync::SyncError;

/// Result alias used by every state-manager operation.
pub type ApiResult<T> = Result<T, ApiError>;

/// API error returned from commands.
///
/// ## Serialization
/// ```json
/// {
///   "code": "INSUFFICIENT_STOCK",
///   "message": "Insufficient stock: Scissor Lift (inv-004): available 2, requested 3"
/// }
/// ```
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiError {
    /// Machine-readable error code for programmatic handling
    pub code: ErrorCode,

    /// Human-readable error message for display
    pub message: String,
}

/// Error codes for API responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Resource not found
    NotFound,

    /// Input validation failed; nothing was written
    ValidationError,

    /// The Document Store refused a write; the edit is kept in memory
    StorageUnavailable,

    /// Any other Document Store failure
    DatabaseError,

    /// External mirror read/write failed
    SyncFailure,

    /// Approval blocked by stock levels
    InsufficientStock,

    /// Import file rejected
    MalformedImport,

    /// Action needs an explicit confirmation flag
    ConfirmationRequired,

    /// Internal error
    Internal,
}

impl ApiError {
    /// Creates a new API error.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        ApiError {
            code,
            message: message.into(),
        }
    }

    /// Creates a not found error.
    pub fn not_found(resource: &str, id: &str) -> Self {
        ApiError::new(ErrorCode::NotFound, format!("{} not found: {}", resource, id))
    }

    /// Creates a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::ValidationError, message)
    }

    /// Creates an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::Internal, message)
    }

    /// Creates a storage error carrying retry guidance.
    pub fn storage_unavailable(reason: impl std::fmt::Display) -> Self {
        ApiError::new(
            ErrorCode::StorageUnavailable,
            format!(
                "{}. Your change is kept in memory; free up space or fix permissions, then retry saving.",
                reason
            ),
        )
    }

    pub fn is(&self, code: ErrorCode) -> bool {
        self.code == code
    }
}

/// Converts database errors to API errors.
impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => ApiError::not_found(&entity, &id),
            err @ DbError::StorageUnavailable { .. } => ApiError::storage_unavailable(err),
            DbError::InvalidDocument { key, message } => {
                tracing::error!(%key, %message, "Stored document is invalid");
                ApiError::new(
                    ErrorCode::DatabaseError,
                    format!("Stored document '{}' could not be read", key),
                )
            }
            DbError::ConnectionFailed(_) => {
                ApiError::new(ErrorCode::DatabaseError, "Database connection failed")
            }
            DbError::MigrationFailed(_) => {
                ApiError::new(ErrorCode::DatabaseError, "Database migration failed")
            }
            DbError::QueryFailed(e) => {
                tracing::error!("Database query failed: {}", e);
                ApiError::new(ErrorCode::DatabaseError, "Database operation failed")
            }
            DbError::TransactionFailed(e) => {
                tracing::error!("Transaction failed: {}", e);
                ApiError::new(ErrorCode::DatabaseError, "Database transaction failed")
            }
            DbError::PoolExhausted => {
                ApiError::new(ErrorCode::DatabaseError, "Database pool exhausted")
            }
            DbError::Internal(e) => {
                tracing::error!("Internal database error: {}", e);
                ApiError::new(ErrorCode::DatabaseError, "Database operation failed")
            }
        }
    }
}

/// Converts core errors to API errors.
impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        let message = err.to_string();
        match err {
            CoreError::QuoteNotFound(number) => ApiError::not_found("Quote", &number),
            CoreError::InventoryItemNotFound(id) => ApiError::not_found("Inventory item", &id),
            CoreError::CategoryNotFound(name) => ApiError::not_found("Category", &name),
            CoreError::NoRevisions(_)
            | CoreError::RevisionNotFound { .. }
            | CoreError::TemplateNotFound { .. } => ApiError::new(ErrorCode::NotFound, message),
            CoreError::InsufficientStock { .. } => {
                ApiError::new(ErrorCode::InsufficientStock, message)
            }
            CoreError::ReapprovalNotConfirmed { .. } => {
                ApiError::new(ErrorCode::ConfirmationRequired, message)
            }
            CoreError::IncompleteQuote { .. } | CoreError::Validation(_) => {
                ApiError::validation(message)
            }
        }
    }
}

/// Converts sync errors to API errors.
impl From<SyncError> for ApiError {
    fn from(err: SyncError) -> Self {
        match err {
            SyncError::Storage(db) => db.into(),
            err if err.is_import_error() => ApiError::new(ErrorCode::MalformedImport, err.to_string()),
            err if err.is_config_error() => ApiError::validation(err.to_string()),
            err => ApiError::new(ErrorCode::SyncFailure, err.to_string()),
        }
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{:?}] {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_serialize_screaming_snake_case() {
        let err = ApiError::new(ErrorCode::ConfirmationRequired, "confirm");
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["code"], "CONFIRMATION_REQUIRED");
        assert_eq!(json["message"], "confirm");
    }

    #[test]
    fn test_core_error_mapping() {
        let err: ApiError = CoreError::ReapprovalNotConfirmed {
            quote_number: "QT-20250101-001".into(),
            revision: 1,
        }
        .into();
        assert!(err.is(ErrorCode::ConfirmationRequired));

        let err: ApiError = CoreError::QuoteNotFound("QT-20250101-009".into()).into();
        assert!(err.is(ErrorCode::NotFound));

        let err: ApiError = CoreError::IncompleteQuote { issues: vec![] }.into();
        assert!(err.is(ErrorCode::ValidationError));
    }

    #[test]
    fn test_storage_unavailable_carries_retry_guidance() {
        let err: ApiError = DbError::unavailable("savedQuotes", "disk full").into();
        assert!(err.is(ErrorCode::StorageUnavailable));
        assert!(err.message.contains("retry"));

        let err: ApiError = SyncError::Storage(DbError::unavailable("inventory", "closed")).into();
        assert!(err.is(ErrorCode::StorageUnavailable));
    }

    #[test]
    fn test_sync_error_mapping() {
        let err: ApiError = SyncError::MalformedImport("missing inventory".into()).into();
        assert!(err.is(ErrorCode::MalformedImport));

        let err: ApiError = SyncError::MirrorUnavailable("no folder".into()).into();
        assert!(err.is(ErrorCode::SyncFailure));
    }
}
