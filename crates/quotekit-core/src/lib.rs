//! # quotekit-core: Pure Business Logic for QuoteKit
//!
//! Quotes, inventory, templates and pricing for small service contractors,
//! as plain data plus deterministic functions. No I/O happens here.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        QuoteKit Architecture                            │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │               quotekit CLI (apps/quotekit)                      │   │
//! │  │    AppState ──► commands ──► ApiError                          │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ quotekit-core (THIS CRATE) ★                    │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   calc    │  │   quote   │  │ inventory │  │ template  │  │   │
//! │  │   │  totals   │  │ revisions │  │   stock   │  │   keys    │  │   │
//! │  │   │  Money    │  │ approval  │  │ categories│  │  presets  │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO CLOCK • PURE FUNCTIONS             │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │       quotekit-db (Document Store) / quotekit-sync (Mirror)     │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`money`] - Money in integer cents
//! - [`types`] - Percent, Multiplier, Hours, AppConfig, StorageSettings
//! - [`calc`] - Line totals and quote totals
//! - [`inventory`] - Rental catalog, categories, stock deduction
//! - [`quote`] - Revisions, approval, merge
//! - [`template`] - Scope/notes/exclusions and quote-format presets
//! - [`parts`] - Parts library and document finalization
//! - [`defaults`] - Seed documents
//! - [`validation`] - Field validators, template keys, quote numbers
//! - [`error`] - Domain error types
//!
//! ## Design Principles
//!
//! 1. **Integer Money**: every amount is cents; each line is rounded once
//! 2. **Caller-supplied time**: operations take `now` instead of reading a clock
//! 3. **Validate first**: a failed validation never leaves a half-applied change

// =============================================================================
// Module Declarations
// =============================================================================

pub mod calc;
pub mod defaults;
pub mod error;
pub mod inventory;
pub mod money;
pub mod parts;
pub mod quote;
pub mod template;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use calc::{EquipmentLine, LaborLine, PartLine, QuoteTotals};
pub use error::{CoreError, CoreResult, ValidationError};
pub use inventory::{Inventory, InventoryItem, InventoryItemInput, GENERAL_CATEGORY};
pub use money::Money;
pub use parts::{LibraryPart, PartsLibrary};
pub use quote::{ApprovalReport, Quote, QuoteBook, QuoteSnapshot, Revision};
pub use template::{QuoteFormatLibrary, QuoteFormatTemplate, TemplateClass, TextTemplates};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Version tag written into every full export.
pub const EXPORT_FORMAT_VERSION: &str = "1.0";
