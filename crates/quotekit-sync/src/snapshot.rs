//! # Export Snapshots
//!
//! The JSON files written by export and read by import.
//!
//! ## File Kinds
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Full snapshot        proposal-data-sync.json (mirror)                  │
//! │                       proposal-data-backup-YYYY-MM-DD.json (manual)     │
//! │    { inventory, inventoryCategories, savedQuotes, scopeTemplates,       │
//! │      notesTemplates, exclusionsTemplates, appConfig,                    │
//! │      lastSynced | exportDate, version: "1.0" }                          │
//! │                                                                         │
//! │  Inventory only       { inventory: [...] }                              │
//! │                                                                         │
//! │  Quotes backup        quotes-backup-YYYY-MM-DD.json                     │
//! │    { quotes: [...], exportDate, version: "1.0" }                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Detection follows the key set: `inventory` together with `scopeTemplates`
//! marks a full snapshot, a lone `inventory` array an inventory file, and a
//! `quotes` array a quotes backup. Anything else is rejected before a single
//! document is touched.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use quotekit_core::{AppConfig, InventoryItem, Quote, TemplateClass, EXPORT_FORMAT_VERSION};
use quotekit_db::{DocumentKey, DocumentRepository};

use crate::error::{SyncError, SyncResult};

/// Name of the file kept in the shared folder.
pub const MIRROR_FILE_NAME: &str = "proposal-data-sync.json";

/// Keys a full snapshot must carry besides the two detection keys.
const FULL_SNAPSHOT_KEYS: [&str; 5] = [
    "inventoryCategories",
    "savedQuotes",
    "notesTemplates",
    "exclusionsTemplates",
    "version",
];

/// `proposal-data-backup-2025-01-31.json`
pub fn backup_file_name(date: NaiveDate) -> String {
    format!("proposal-data-backup-{}.json", date.format("%Y-%m-%d"))
}

/// `quotes-backup-2025-01-31.json`
pub fn quotes_backup_file_name(date: NaiveDate) -> String {
    format!("quotes-backup-{}.json", date.format("%Y-%m-%d"))
}

// =============================================================================
// Full Snapshot
// =============================================================================

/// Everything the mirror carries, in the document schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportSnapshot {
    pub inventory: Vec<InventoryItem>,
    pub inventory_categories: Vec<String>,
    pub saved_quotes: Vec<Quote>,
    pub scope_templates: BTreeMap<String, String>,
    pub notes_templates: BTreeMap<String, String>,
    pub exclusions_templates: BTreeMap<String, String>,
    /// `null` in the file keeps the importer's local config.
    #[serde(default)]
    pub app_config: Option<AppConfig>,
    /// Set on mirror writes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_synced: Option<DateTime<Utc>>,
    /// Set on manual exports.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub export_date: Option<DateTime<Utc>>,
    pub version: String,
}

impl ExportSnapshot {
    /// Reads the exported documents from the store.
    pub async fn collect(docs: &DocumentRepository) -> SyncResult<Self> {
        Ok(ExportSnapshot {
            inventory: docs.load(DocumentKey::Inventory).await?,
            inventory_categories: docs.load(DocumentKey::InventoryCategories).await?,
            saved_quotes: docs.load(DocumentKey::SavedQuotes).await?,
            scope_templates: docs.load(DocumentKey::templates(TemplateClass::Scope)).await?,
            notes_templates: docs.load(DocumentKey::templates(TemplateClass::Notes)).await?,
            exclusions_templates: docs
                .load(DocumentKey::templates(TemplateClass::Exclusions))
                .await?,
            app_config: Some(docs.load(DocumentKey::AppConfig).await?),
            last_synced: None,
            export_date: None,
            version: EXPORT_FORMAT_VERSION.to_string(),
        })
    }

    /// Stamps a mirror write.
    pub fn synced_at(mut self, now: DateTime<Utc>) -> Self {
        self.last_synced = Some(now);
        self
    }

    /// Stamps a manual export.
    pub fn exported_at(mut self, now: DateTime<Utc>) -> Self {
        self.export_date = Some(now);
        self
    }

    /// Pretty-printed JSON, as written to disk.
    pub fn to_json(&self) -> SyncResult<String> {
        to_pretty_json(self)
    }

    /// Template map of one class.
    pub fn templates(&self, class: TemplateClass) -> &BTreeMap<String, String> {
        match class {
            TemplateClass::Scope => &self.scope_templates,
            TemplateClass::Notes => &self.notes_templates,
            TemplateClass::Exclusions => &self.exclusions_templates,
        }
    }
}

// =============================================================================
// Quotes Backup
// =============================================================================

/// The quotes-only backup file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuotesBackup {
    pub quotes: Vec<Quote>,
    pub export_date: DateTime<Utc>,
    pub version: String,
}

impl QuotesBackup {
    pub async fn collect(docs: &DocumentRepository, now: DateTime<Utc>) -> SyncResult<Self> {
        Ok(QuotesBackup {
            quotes: docs.load(DocumentKey::SavedQuotes).await?,
            export_date: now,
            version: EXPORT_FORMAT_VERSION.to_string(),
        })
    }

    pub fn to_json(&self) -> SyncResult<String> {
        to_pretty_json(self)
    }
}

fn to_pretty_json<T: Serialize>(value: &T) -> SyncResult<String> {
    serde_json::to_string_pretty(value).map_err(|e| SyncError::SerializationFailed(e.to_string()))
}

// =============================================================================
// Import Detection
// =============================================================================

/// A parsed, validated import file.
#[derive(Debug, Clone, PartialEq)]
pub enum ImportFile {
    Full(Box<ExportSnapshot>),
    InventoryOnly(Vec<InventoryItem>),
    QuotesOnly(Vec<Quote>),
}

/// Which kind of file was imported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ImportKind {
    Full,
    InventoryOnly,
    QuotesOnly,
}

impl fmt::Display for ImportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImportKind::Full => write!(f, "full"),
            ImportKind::InventoryOnly => write!(f, "inventory-only"),
            ImportKind::QuotesOnly => write!(f, "quotes-only"),
        }
    }
}

impl ImportFile {
    /// Parses and validates file contents.
    ///
    /// ## Returns
    /// * `Err(MalformedImport)` - not JSON, unknown shape, missing keys,
    ///   wrong field types, or a quote whose revisions are inconsistent
    /// * `Err(UnsupportedVersion)` - `version` other than "1.0"
    pub fn parse(text: &str) -> SyncResult<Self> {
        let value: Value = serde_json::from_str(text)
            .map_err(|e| SyncError::MalformedImport(format!("not valid JSON: {}", e)))?;
        let Value::Object(map) = value else {
            return Err(SyncError::MalformedImport(
                "expected a JSON object at the top level".into(),
            ));
        };

        if is_present(&map, "inventory") && is_present(&map, "scopeTemplates") {
            if let Some(missing) = FULL_SNAPSHOT_KEYS.iter().find(|k| !map.contains_key(**k)) {
                return Err(SyncError::MalformedImport(format!(
                    "full snapshot is missing '{}'",
                    missing
                )));
            }
            check_version(map.get("version"))?;
            let snapshot: ExportSnapshot = decode(Value::Object(map), "full snapshot")?;
            check_quotes(&snapshot.saved_quotes)?;
            return Ok(ImportFile::Full(Box::new(snapshot)));
        }

        if let Some(items) = map.get("inventory").filter(|v| v.is_array()) {
            let items: Vec<InventoryItem> = decode(items.clone(), "inventory")?;
            return Ok(ImportFile::InventoryOnly(items));
        }

        if let Some(quotes) = map.get("quotes").filter(|v| v.is_array()) {
            if map.contains_key("version") {
                check_version(map.get("version"))?;
            }
            let quotes: Vec<Quote> = decode(quotes.clone(), "quotes")?;
            check_quotes(&quotes)?;
            return Ok(ImportFile::QuotesOnly(quotes));
        }

        Err(SyncError::MalformedImport(
            "unrecognized file: expected 'inventory' and 'scopeTemplates', 'inventory', or 'quotes'"
                .into(),
        ))
    }

    pub fn kind(&self) -> ImportKind {
        match self {
            ImportFile::Full(_) => ImportKind::Full,
            ImportFile::InventoryOnly(_) => ImportKind::InventoryOnly,
            ImportFile::QuotesOnly(_) => ImportKind::QuotesOnly,
        }
    }
}

fn is_present(map: &Map<String, Value>, key: &str) -> bool {
    map.get(key).is_some_and(|v| !v.is_null())
}

fn check_version(version: Option<&Value>) -> SyncResult<()> {
    match version {
        Some(Value::String(v)) if v == EXPORT_FORMAT_VERSION => Ok(()),
        Some(Value::String(v)) => Err(SyncError::UnsupportedVersion(v.clone())),
        Some(other) => Err(SyncError::UnsupportedVersion(other.to_string())),
        None => Err(SyncError::MalformedImport("missing 'version'".into())),
    }
}

fn decode<T: DeserializeOwned>(value: Value, what: &str) -> SyncResult<T> {
    serde_json::from_value(value)
        .map_err(|e| SyncError::MalformedImport(format!("{}: {}", what, e)))
}

fn check_quotes(quotes: &[Quote]) -> SyncResult<()> {
    quotes
        .iter()
        .try_for_each(Quote::check_invariants)
        .map_err(|e| SyncError::MalformedImport(e.to_string()))
}

// =============================================================================
// Unit Tests
// =============================================================================
