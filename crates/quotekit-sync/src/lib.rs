//! # quotekit-sync: External Mirror for QuoteKit
//!
//! Best-effort copy of the Document Store to and from a shared folder, so
//! several machines can share inventory, templates and quote history
//! without a server.
//!
//! ## Architecture Overview
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        External Mirror                                  │
//! │                                                                         │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │                  AutoSync (background queue)                     │  │
//! │  │                                                                  │  │
//! │  │  Fed by the state manager after each committed write            │  │
//! │  │  Coalesces bursts, retries with backoff, publishes status       │  │
//! │  └────────────────────────────┬─────────────────────────────────────┘  │
//! │                               │                                         │
//! │                               ▼                                         │
//! │  ┌────────────────┐  ┌────────────────┐  ┌────────────────────────┐    │
//! │  │    Mirror      │  │   Snapshot     │  │       Merge            │    │
//! │  │                │  │                │  │                        │    │
//! │  │ Direct write   │─►│ Full / inv /   │─►│ LWW for catalog and    │    │
//! │  │ Manual fallback│  │ quotes files   │  │ config, lossless quote │    │
//! │  │ Pull + import  │  │ Detect + check │  │ merge, one transaction │    │
//! │  └────────────────┘  └────────────────┘  └────────────────────────┘    │
//! │                                                                         │
//! │  The mirror never owns data: every import lands in the Document Store. │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//! - [`autosync`] - Background export queue with observable status
//! - [`config`] - Mirror folder, file name, retry tuning (TOML + env)
//! - [`error`] - Sync error types
//! - [`merge`] - Import merge policy
//! - [`mirror`] - Direct/manual export, pull, file import
//! - [`snapshot`] - Export file schema and import detection
//!
//! ## Usage
//!
//! ```rust,ignore
//! use quotekit_sync::{AutoSync, Mirror, SyncConfig};
//!
//! let config = SyncConfig::load_or_default(None);
//! let mirror = Mirror::new(db.documents(), config.clone());
//!
//! // One-off export with fallback
//! let outcome = mirror.push(chrono::Utc::now()).await?;
//!
//! // Background queue
//! let auto_sync = AutoSync::new(mirror, config.auto_sync.clone()).start();
//! auto_sync.request()?;
//! println!("{:?}", auto_sync.status().state);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod autosync;
pub mod config;
pub mod error;
pub mod merge;
pub mod mirror;
pub mod snapshot;

// =============================================================================
// Re-exports
// =============================================================================

pub use autosync::{AutoSync, AutoSyncHandle, AutoSyncState, AutoSyncStatus};
pub use config::{AutoSyncSettings, ExportSettings, MirrorSettings, SyncConfig};
pub use error::{SyncError, SyncResult};
pub use merge::{apply_import, ImportSummary};
pub use mirror::{ExportOutcome, Mirror};
pub use snapshot::{ExportSnapshot, ImportFile, ImportKind, QuotesBackup, MIRROR_FILE_NAME};
