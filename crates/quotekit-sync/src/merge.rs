//! # Import Merge
//!
//! Applies a parsed import file to the Document Store.
//!
//! ## Merge Policy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Document                      Policy                                   │
//! │  ────────────────────────────  ───────────────────────────────────────  │
//! │  inventory                     last write wins (imported replaces)      │
//! │  inventoryCategories           last write wins, "General" re-added      │
//! │  scope/notes/exclusions        last write wins                          │
//! │  appConfig                     last write wins, null keeps local        │
//! │  savedQuotes                   merged: quotes added, revisions appended │
//! │                                by savedAt, never removed                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every affected document is written in one `put_many` transaction, so a
//! refused write leaves the store exactly as it was.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

use quotekit_core::{Inventory, InventoryItem, Quote, QuoteBook, TemplateClass};
use quotekit_db::{DocumentKey, DocumentRepository};

use crate::error::{SyncError, SyncResult};
use crate::snapshot::{ExportSnapshot, ImportFile, ImportKind};

/// What an import changed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportSummary {
    pub kind: ImportKind,
    /// Items in the inventory after the import (0 when untouched).
    pub inventory_items: usize,
    /// Imported items moved to "General" because their category was unknown.
    pub items_recategorized: usize,
    pub quotes_added: usize,
    pub revisions_added: usize,
    pub templates_replaced: bool,
    pub config_replaced: bool,
}

impl ImportSummary {
    fn new(kind: ImportKind) -> Self {
        ImportSummary {
            kind,
            inventory_items: 0,
            items_recategorized: 0,
            quotes_added: 0,
            revisions_added: 0,
            templates_replaced: false,
            config_replaced: false,
        }
    }
}

/// Writes an import into the store.
///
/// ## Arguments
/// * `docs` - Document Store
/// * `file` - Output of [`ImportFile::parse`]
///
/// ## Returns
/// * `Ok(ImportSummary)` - All documents written
/// * `Err(SyncError::Storage)` - The store refused the write; nothing changed
pub async fn apply_import(docs: &DocumentRepository, file: ImportFile) -> SyncResult<ImportSummary> {
    let kind = file.kind();
    let (writes, summary) = match file {
        ImportFile::Full(snapshot) => plan_full(docs, *snapshot).await?,
        ImportFile::InventoryOnly(items) => plan_inventory(docs, items).await?,
        ImportFile::QuotesOnly(quotes) => plan_quotes(docs, quotes).await?,
    };

    docs.put_many(&writes).await?;

    info!(
        kind = %kind,
        documents = writes.len(),
        quotes_added = summary.quotes_added,
        revisions_added = summary.revisions_added,
        "Import applied"
    );
    Ok(summary)
}

type Plan = (Vec<(DocumentKey, Value)>, ImportSummary);

async fn plan_full(docs: &DocumentRepository, snapshot: ExportSnapshot) -> SyncResult<Plan> {
    let mut summary = ImportSummary::new(ImportKind::Full);
    let mut writes = Vec::with_capacity(7);

    let recategorized = count_unknown_categories(&snapshot.inventory, &snapshot.inventory_categories);
    let inventory = Inventory::new(snapshot.inventory.clone(), snapshot.inventory_categories.clone());
    summary.inventory_items = inventory.len();
    summary.items_recategorized = recategorized;
    let (items, categories) = inventory.into_parts();
    writes.push((DocumentKey::Inventory, encode(&items)?));
    writes.push((DocumentKey::InventoryCategories, encode(&categories)?));

    for class in TemplateClass::ALL {
        writes.push((DocumentKey::templates(class), encode(snapshot.templates(class))?));
    }
    summary.templates_replaced = true;

    if let Some(config) = &snapshot.app_config {
        writes.push((DocumentKey::AppConfig, encode(config)?));
        summary.config_replaced = true;
    }

    let (quotes_write, added, revisions) = merge_quotes(docs, snapshot.saved_quotes).await?;
    writes.push(quotes_write);
    summary.quotes_added = added;
    summary.revisions_added = revisions;

    Ok((writes, summary))
}

async fn plan_inventory(docs: &DocumentRepository, items: Vec<InventoryItem>) -> SyncResult<Plan> {
    let mut summary = ImportSummary::new(ImportKind::InventoryOnly);

    let categories: Vec<String> = docs.load(DocumentKey::InventoryCategories).await?;
    summary.items_recategorized = count_unknown_categories(&items, &categories);

    let inventory = Inventory::new(items, categories);
    summary.inventory_items = inventory.len();
    let (items, categories) = inventory.into_parts();

    let writes = vec![
        (DocumentKey::Inventory, encode(&items)?),
        (DocumentKey::InventoryCategories, encode(&categories)?),
    ];
    Ok((writes, summary))
}

async fn plan_quotes(docs: &DocumentRepository, quotes: Vec<Quote>) -> SyncResult<Plan> {
    let mut summary = ImportSummary::new(ImportKind::QuotesOnly);
    let (write, added, revisions) = merge_quotes(docs, quotes).await?;
    summary.quotes_added = added;
    summary.revisions_added = revisions;
    Ok((vec![write], summary))
}

async fn merge_quotes(
    docs: &DocumentRepository,
    imported: Vec<Quote>,
) -> SyncResult<((DocumentKey, Value), usize, usize)> {
    let local: Vec<Quote> = docs.load(DocumentKey::SavedQuotes).await?;
    let mut book = QuoteBook::new(local);
    let stats = book.merge(imported);
    let write = (DocumentKey::SavedQuotes, encode(book.quotes())?);
    Ok((write, stats.quotes_added, stats.revisions_added))
}

fn count_unknown_categories(items: &[InventoryItem], categories: &[String]) -> usize {
    items
        .iter()
        .filter(|item| !categories.iter().any(|c| *c == item.category))
        .count()
}

fn encode<T: Serialize + ?Sized>(value: &T) -> SyncResult<Value> {
    serde_json::to_value(value).map_err(|e| SyncError::SerializationFailed(e.to_string()))
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use quotekit_core::GENERAL_CATEGORY;
    use quotekit_db::{Database, DbConfig};
    use serde_json::json;

    async fn store() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    fn quote(number: &str, saved: &[(u32, &str)]) -> Value {
        let revisions: Vec<Value> = saved
            .iter()
            .map(|(n, at)| {
                json!({
                    "revisionNumber": n,
                    "savedAt": at,
                    "notes": "",
                    "data": {
                        "quoteNumber": number,
                        "quoteDate": "2025-01-01",
                        "validUntil": "2025-01-31",
                        "customerName": "Jane Smith",
                        "taxRate": 8.0
                    }
                })
            })
            .collect();
        json!({
            "quoteNumber": number,
            "createdAt": "2025-01-01T09:00:00Z",
            "lastModified": "2025-01-01T09:00:00Z",
            "revisions": revisions
        })
    }

    #[tokio::test]
    async fn test_inventory_only_import_replaces_and_repairs_categories() {
        let db = store().await;
        let docs = db.documents();

        let text = json!({"inventory": [
            {"id": "a", "name": "Lift", "model": "L1", "price": 100.0, "stock": 1, "category": "Access Equipment"},
            {"id": "b", "name": "Drone", "model": "D1", "price": 900.0, "stock": 1, "category": "Aerial"}
        ]})
        .to_string();
        let summary = apply_import(&docs, ImportFile::parse(&text).unwrap()).await.unwrap();

        assert_eq!(summary.inventory_items, 2);
        assert_eq!(summary.items_recategorized, 1);
        let items: Vec<InventoryItem> = docs.load(DocumentKey::Inventory).await.unwrap();
        assert_eq!(items[0].category, "Access Equipment");
        assert_eq!(items[1].category, GENERAL_CATEGORY);
    }

    #[tokio::test]
    async fn test_quotes_import_appends_unseen_revisions() {
        let db = store().await;
        let docs = db.documents();
        docs.put(
            DocumentKey::SavedQuotes,
            &json!([quote("QT-20250101-001", &[(1, "2025-01-01T10:00:00Z")])]),
        )
        .await
        .unwrap();

        let text = json!({"quotes": [
            quote("QT-20250101-001", &[(1, "2025-01-01T10:00:00Z"), (2, "2025-01-02T10:00:00Z")]),
            quote("QT-20250101-002", &[(1, "2025-01-01T11:00:00Z")])
        ]})
        .to_string();
        let summary = apply_import(&docs, ImportFile::parse(&text).unwrap()).await.unwrap();

        assert_eq!(summary.quotes_added, 1);
        assert_eq!(summary.revisions_added, 2);
        let quotes: Vec<Quote> = docs.load(DocumentKey::SavedQuotes).await.unwrap();
        assert_eq!(quotes.len(), 2);
        let numbers: Vec<u32> = quotes[0].revisions.iter().map(|r| r.revision_number).collect();
        assert_eq!(numbers, vec![1, 2]);
    }

    #[tokio::test]
    async fn test_full_import_with_null_config_keeps_local_config() {
        let db = store().await;
        let docs = db.documents();
        docs.put(DocumentKey::AppConfig, &json!({"companyName": "Local Co"}))
            .await
            .unwrap();

        let text = json!({
            "inventory": [],
            "inventoryCategories": ["Tools"],
            "savedQuotes": [],
            "scopeTemplates": {"service": "Service call"},
            "notesTemplates": {"custom": ""},
            "exclusionsTemplates": {"custom": ""},
            "appConfig": null,
            "version": "1.0"
        })
        .to_string();
        let summary = apply_import(&docs, ImportFile::parse(&text).unwrap()).await.unwrap();

        assert!(!summary.config_replaced);
        assert!(summary.templates_replaced);
        let config: quotekit_core::AppConfig = docs.load(DocumentKey::AppConfig).await.unwrap();
        assert_eq!(config.company_name, "Local Co");
        let categories: Vec<String> = docs.load(DocumentKey::InventoryCategories).await.unwrap();
        assert_eq!(categories, vec!["Tools".to_string(), GENERAL_CATEGORY.to_string()]);
        let scope = docs.get(DocumentKey::ScopeTemplates).await.unwrap();
        assert_eq!(scope, json!({"service": "Service call"}));
    }

    #[tokio::test]
    async fn test_refused_write_changes_nothing() {
        let db = Database::new(DbConfig::in_memory().max_document_bytes(Some(64)))
            .await
            .unwrap();
        let docs = db.documents();

        let text = json!({"quotes": [quote("QT-20250101-001", &[(1, "2025-01-01T10:00:00Z")])]})
            .to_string();
        let err = apply_import(&docs, ImportFile::parse(&text).unwrap())
            .await
            .unwrap_err();
        assert!(matches!(err, SyncError::Storage(ref e) if e.is_storage_unavailable()));
        assert!(docs.fetch(DocumentKey::SavedQuotes).await.unwrap().is_none());
    }
}
