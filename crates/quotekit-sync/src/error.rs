//! # Sync Error Types
//!
//! Error types for External Mirror operations.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Sync Error Categories                             │
//! │                                                                         │
//! │  ┌─────────────────┐  ┌─────────────────┐  ┌─────────────────────────┐ │
//! │  │  Configuration  │  │   Mirror I/O    │  │     Import              │ │
//! │  │                 │  │                 │  │                         │ │
//! │  │  InvalidConfig  │  │  Unavailable    │  │  MalformedImport        │ │
//! │  │  ConfigLoad/    │  │  Io             │  │  UnsupportedVersion     │ │
//! │  │  ConfigSave     │  │  RetriesExhaust │  │  SerializationFailed    │ │
//! │  └─────────────────┘  └─────────────────┘  └─────────────────────────┘ │
//! │                                                                         │
//! │  ┌─────────────────┐  ┌─────────────────┐                              │
//! │  │    Storage      │  │    Worker       │                              │
//! │  │                 │  │                 │                              │
//! │  │  DbError        │  │  ShuttingDown   │                              │
//! │  │                 │  │  ChannelError   │                              │
//! │  └─────────────────┘  └─────────────────┘                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A sync failure never undoes a local write: the Document Store commit has
//! already happened by the time any of these is raised.

use std::path::Path;

use thiserror::Error;

use quotekit_db::DbError;

/// Result type alias for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Sync error type covering all External Mirror failures.
#[derive(Debug, Error)]
pub enum SyncError {
    // =========================================================================
    // Configuration Errors
    // =========================================================================
    /// Invalid sync configuration.
    #[error("Invalid sync configuration: {0}")]
    InvalidConfig(String),

    /// Failed to load config file.
    #[error("Failed to load config: {0}")]
    ConfigLoadFailed(String),

    /// Failed to save config file.
    #[error("Failed to save config: {0}")]
    ConfigSaveFailed(String),

    // =========================================================================
    // Mirror Errors
    // =========================================================================
    /// No shared folder has been granted, or it holds no sync file.
    #[error("Mirror unavailable: {0}")]
    MirrorUnavailable(String),

    /// Reading or writing a mirror/export file failed.
    #[error("I/O error on {path}: {message}")]
    Io { path: String, message: String },

    /// The auto-sync queue gave up on an export.
    #[error("Export failed after {attempts} attempts: {last_error}")]
    RetriesExhausted { attempts: u32, last_error: String },

    // =========================================================================
    // Import Errors
    // =========================================================================
    /// The file is not a recognizable export; nothing was applied.
    #[error("Malformed import: {0}")]
    MalformedImport(String),

    /// The file carries a format version this build does not read.
    #[error("Unsupported export version: {0}")]
    UnsupportedVersion(String),

    /// Failed to encode a snapshot.
    #[error("Serialization failed: {0}")]
    SerializationFailed(String),

    // =========================================================================
    // Storage Errors
    // =========================================================================
    /// The Document Store refused a read or write.
    #[error(transparent)]
    Storage(#[from] DbError),

    // =========================================================================
    // Internal Errors
    // =========================================================================
    /// The auto-sync worker is shutting down.
    #[error("Auto-sync is shutting down")]
    ShuttingDown,

    /// Channel send/receive failed.
    #[error("Channel error: {0}")]
    ChannelError(String),
}

// =============================================================================
// Error Conversions
// =============================================================================

impl SyncError {
    /// Wraps an I/O error with the path it happened on.
    pub fn io(path: &Path, err: std::io::Error) -> Self {
        SyncError::Io {
            path: path.display().to_string(),
            message: err.to_string(),
        }
    }
}

impl From<toml::de::Error> for SyncError {
    fn from(err: toml::de::Error) -> Self {
        SyncError::ConfigLoadFailed(err.to_string())
    }
}

impl From<toml::ser::Error> for SyncError {
    fn from(err: toml::ser::Error) -> Self {
        SyncError::ConfigSaveFailed(err.to_string())
    }
}

// =============================================================================
// Error Categorization (for retry logic)
// =============================================================================

impl SyncError {
    /// Returns true if the auto-sync queue should try the export again.
    ///
    /// ## Retryable Errors
    /// - File system failures on the shared folder (network share offline)
    /// - Document Store temporarily refusing reads
    ///
    /// ## Non-Retryable Errors
    /// - No folder granted
    /// - Configuration and import format problems
    pub fn is_retryable(&self) -> bool {
        match self {
            SyncError::Io { .. } => true,
            SyncError::Storage(err) => err.is_storage_unavailable(),
            _ => false,
        }
    }

    /// Returns true if this error indicates a configuration problem.
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            SyncError::InvalidConfig(_)
                | SyncError::ConfigLoadFailed(_)
                | SyncError::ConfigSaveFailed(_)
        )
    }

    /// Returns true if an imported file was rejected.
    pub fn is_import_error(&self) -> bool {
        matches!(
            self,
            SyncError::MalformedImport(_) | SyncError::UnsupportedVersion(_)
        )
    }
}
