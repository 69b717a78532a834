//! # Database Error Types
//!
//! Error types for Document Store operations.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Propagation                                    │
//! │                                                                         │
//! │  SQLite Error (sqlx::Error)                                            │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  DbError (this module) ← Adds context and categorization               │
//! │       │                                                                 │
//! │       ├── StorageUnavailable → edit kept in memory, key marked dirty   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ApiError (app) ← code + message shown to the user                     │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

/// Document Store errors.
#[derive(Debug, Error)]
pub enum DbError {
    /// Unknown document key.
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// The medium refused a write: quota exceeded, read-only or closed.
    ///
    /// ## When This Occurs
    /// - Document larger than `max_document_bytes`
    /// - Store opened read-only
    /// - Pool closed, disk full, file not writable
    ///
    /// Callers keep their in-memory edit and may retry later.
    #[error("Storage unavailable for '{key}': {reason}")]
    StorageUnavailable { key: String, reason: String },

    /// A stored document could not be encoded or decoded.
    #[error("Document '{key}' is not valid: {message}")]
    InvalidDocument { key: String, message: String },

    /// Database connection failed.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Migration failed.
    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    /// Query execution failed.
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Transaction failed.
    #[error("Transaction failed: {0}")]
    TransactionFailed(String),

    /// Pool exhausted (all connections in use).
    #[error("Connection pool exhausted")]
    PoolExhausted,

    /// Internal database error.
    #[error("Internal database error: {0}")]
    Internal(String),
}

impl DbError {
    /// Creates a NotFound error for a given entity type and ID.
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        DbError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    /// Creates a StorageUnavailable error.
    pub fn unavailable(key: impl Into<String>, reason: impl Into<String>) -> Self {
        DbError::StorageUnavailable {
            key: key.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn invalid_document(key: impl Into<String>, err: serde_json::Error) -> Self {
        DbError::InvalidDocument {
            key: key.into(),
            message: err.to_string(),
        }
    }

    /// Returns true if the write can succeed later without any change to
    /// the data (free space, reopen, leave read-only mode).
    pub fn is_storage_unavailable(&self) -> bool {
        matches!(
            self,
            DbError::StorageUnavailable { .. } | DbError::PoolExhausted
        )
    }

    /// Attaches the document key to a storage failure raised below it.
    pub(crate) fn for_key(self, key: &str) -> Self {
        match self {
            DbError::StorageUnavailable { reason, .. } => DbError::StorageUnavailable {
                key: key.to_string(),
                reason,
            },
            other => other,
        }
    }
}

/// Convert sqlx errors to DbError.
///
/// ## Error Mapping
/// ```text
/// sqlx::Error::Database "readonly" / "full"  → DbError::StorageUnavailable
/// sqlx::Error::PoolClosed                    → DbError::StorageUnavailable
/// sqlx::Error::PoolTimedOut                  → DbError::PoolExhausted
/// sqlx::Error::Database (other)              → DbError::QueryFailed
/// Other                                      → DbError::Internal
/// ```
impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => DbError::not_found("Record", "unknown"),

            sqlx::Error::Database(db_err) => {
                let msg = db_err.message();
                // SQLITE_READONLY: "attempt to write a readonly database"
                // SQLITE_FULL: "database or disk is full"
                if msg.contains("readonly") || msg.contains("is full") {
                    DbError::unavailable("*", msg)
                } else {
                    DbError::QueryFailed(msg.to_string())
                }
            }

            sqlx::Error::PoolTimedOut => DbError::PoolExhausted,

            sqlx::Error::PoolClosed => DbError::unavailable("*", "database is closed"),

            sqlx::Error::Io(io) => DbError::unavailable("*", io.to_string()),

            _ => DbError::Internal(err.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for DbError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        DbError::MigrationFailed(err.to_string())
    }
}

/// Result type for database operations.
pub type DbResult<T> = Result<T, DbError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pool_closed_is_storage_unavailable() {
        let err: DbError = sqlx::Error::PoolClosed.into();
        assert!(err.is_storage_unavailable());
        assert_eq!(
            err.for_key("inventory").to_string(),
            "Storage unavailable for 'inventory': database is closed"
        );
    }

    #[test]
    fn test_query_failure_is_not_storage_unavailable() {
        assert!(!DbError::QueryFailed("syntax".to_string()).is_storage_unavailable());
    }
}
