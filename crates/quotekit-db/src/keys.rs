//! # Document Keys
//!
//! The well-known keys of the Document Store and the seed value each one
//! returns before it is first written.
//!
//! ```text
//! ┌──────────────────────────┬──────────────────────────────────────────────┐
//! │ Key                      │ Default                                      │
//! ├──────────────────────────┼──────────────────────────────────────────────┤
//! │ appConfig                │ unconfigured AppConfig                       │
//! │ inventory                │ 8 starter items (inv-001 .. inv-008)         │
//! │ inventoryCategories      │ 6 starter categories incl. "General"         │
//! │ savedQuotes              │ []                                           │
//! │ scopeTemplates           │ stock scope texts                            │
//! │ notesTemplates           │ stock notes texts (+ custom)                 │
//! │ exclusionsTemplates      │ stock exclusions texts (+ custom)            │
//! │ storageSettings          │ mirror off                                   │
//! │ partsLibrary             │ []                                           │
//! │ quoteDraft               │ null                                         │
//! │ quoteFormatTemplates     │ {}                                           │
//! └──────────────────────────┴──────────────────────────────────────────────┘
//! ```

use serde::Serialize;
use serde_json::{json, Value};
use std::fmt;
use std::str::FromStr;

use quotekit_core::defaults;
use quotekit_core::template::TemplateClass;
use quotekit_core::{AppConfig, StorageSettings};

use crate::error::DbError;

/// A Document Store key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DocumentKey {
    AppConfig,
    Inventory,
    InventoryCategories,
    SavedQuotes,
    ScopeTemplates,
    NotesTemplates,
    ExclusionsTemplates,
    StorageSettings,
    PartsLibrary,
    QuoteDraft,
    QuoteFormatTemplates,
}

impl DocumentKey {
    pub const ALL: [DocumentKey; 11] = [
        DocumentKey::AppConfig,
        DocumentKey::Inventory,
        DocumentKey::InventoryCategories,
        DocumentKey::SavedQuotes,
        DocumentKey::ScopeTemplates,
        DocumentKey::NotesTemplates,
        DocumentKey::ExclusionsTemplates,
        DocumentKey::StorageSettings,
        DocumentKey::PartsLibrary,
        DocumentKey::QuoteDraft,
        DocumentKey::QuoteFormatTemplates,
    ];

    pub const fn as_str(&self) -> &'static str {
        match self {
            DocumentKey::AppConfig => "appConfig",
            DocumentKey::Inventory => "inventory",
            DocumentKey::InventoryCategories => "inventoryCategories",
            DocumentKey::SavedQuotes => "savedQuotes",
            DocumentKey::ScopeTemplates => "scopeTemplates",
            DocumentKey::NotesTemplates => "notesTemplates",
            DocumentKey::ExclusionsTemplates => "exclusionsTemplates",
            DocumentKey::StorageSettings => "storageSettings",
            DocumentKey::PartsLibrary => "partsLibrary",
            DocumentKey::QuoteDraft => "quoteDraft",
            DocumentKey::QuoteFormatTemplates => "quoteFormatTemplates",
        }
    }

    /// Key holding the templates of a text class.
    pub const fn templates(class: TemplateClass) -> DocumentKey {
        match class {
            TemplateClass::Scope => DocumentKey::ScopeTemplates,
            TemplateClass::Notes => DocumentKey::NotesTemplates,
            TemplateClass::Exclusions => DocumentKey::ExclusionsTemplates,
        }
    }

    /// The value returned for a key that was never written.
    pub fn default_value(&self) -> Value {
        match self {
            DocumentKey::AppConfig => to_value(&AppConfig::default()),
            DocumentKey::Inventory => to_value(&defaults::inventory_items()),
            DocumentKey::InventoryCategories => to_value(&defaults::inventory_categories()),
            DocumentKey::SavedQuotes | DocumentKey::PartsLibrary => json!([]),
            DocumentKey::ScopeTemplates => to_value(&defaults::templates(TemplateClass::Scope)),
            DocumentKey::NotesTemplates => to_value(&defaults::templates(TemplateClass::Notes)),
            DocumentKey::ExclusionsTemplates => {
                to_value(&defaults::templates(TemplateClass::Exclusions))
            }
            DocumentKey::StorageSettings => to_value(&StorageSettings::default()),
            DocumentKey::QuoteDraft => Value::Null,
            DocumentKey::QuoteFormatTemplates => json!({}),
        }
    }
}

// Seed types are plain structs and maps with string keys.
fn to_value<T: Serialize>(value: &T) -> Value {
    serde_json::to_value(value).unwrap_or(Value::Null)
}

impl fmt::Display for DocumentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DocumentKey {
    type Err = DbError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DocumentKey::ALL
            .into_iter()
            .find(|key| key.as_str() == s)
            .ok_or_else(|| DbError::not_found("Document key", s))
    }
}
