//! # quotekit-db: Document Store for QuoteKit
//!
//! Durable key-value persistence of the named JSON documents (inventory,
//! quotes, templates, config) in a local SQLite file.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        QuoteKit Data Flow                               │
//! │                                                                         │
//! │  AppState (approve, save revision, edit inventory ...)                 │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    quotekit-db (THIS CRATE)                     │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌────────────────────┐  ┌─────────────┐ │   │
//! │  │   │   Database    │    │ DocumentRepository │  │ Migrations  │ │   │
//! │  │   │   (pool.rs)   │◄───│   get / put /      │  │ (embedded)  │ │   │
//! │  │   │  SqlitePool   │    │   put_many         │  │ 001_docs    │ │   │
//! │  │   └───────────────┘    └────────────────────┘  └─────────────┘ │   │
//! │  │                                                                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │   SQLite: <data dir>/quotekit.db   table `documents`            │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use quotekit_db::{Database, DbConfig, DocumentKey};
//!
//! let db = Database::new(DbConfig::new("quotekit.db")).await?;
//! let categories: Vec<String> = db.documents().load(DocumentKey::InventoryCategories).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod keys;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use keys::DocumentKey;
pub use pool::{Database, DbConfig};
pub use repository::document::{DocumentInfo, DocumentRepository, WritePolicy};
