//! Export-then-import between two Document Stores sharing a folder.

use chrono::{DateTime, NaiveDate, Utc};
use quotekit_core::{
    AppConfig, Hours, LaborLine, Money, Percent, Quote, QuoteBook, QuoteSnapshot, StorageSettings,
};
use quotekit_db::{Database, DbConfig, DocumentKey};
use quotekit_sync::{ImportKind, Mirror, SyncConfig};
use serde_json::json;
use tempfile::TempDir;

fn at(text: &str) -> DateTime<Utc> {
    text.parse().unwrap()
}

fn company() -> AppConfig {
    AppConfig {
        company_name: "Acme Electric".to_string(),
        configured: true,
        ..AppConfig::default()
    }
}

fn snapshot(customer: &str) -> QuoteSnapshot {
    let date = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
    let mut snapshot = QuoteSnapshot::blank(date, Percent::from_whole(8));
    snapshot.customer_name = customer.to_string();
    snapshot.scope_summary = "Panel replacement".to_string();
    snapshot
        .labor_items
        .push(LaborLine::new("Install", Hours::whole(8), Money::from_dollars(75)));
    snapshot
}

async fn station(dir: &TempDir, name: &str) -> (Database, Mirror) {
    let db = Database::new(DbConfig::new(dir.path().join(name).join("quotekit.db")))
        .await
        .unwrap();
    let settings = StorageSettings {
        shared_storage_path: dir.path().join("shared").display().to_string(),
        auto_sync_enabled: true,
        has_directory_handle: true,
        ..StorageSettings::default()
    };
    db.documents()
        .save(DocumentKey::StorageSettings, &settings)
        .await
        .unwrap();

    let mut config = SyncConfig::default();
    config.export.dir = Some(dir.path().join(name).join("downloads"));
    let mirror = Mirror::new(db.documents(), config);
    (db, mirror)
}

async fn save_quotes(db: &Database, revisions: &[(&str, &str, &str)]) {
    let docs = db.documents();
    let mut book = QuoteBook::new(docs.load(DocumentKey::SavedQuotes).await.unwrap());
    for (number, customer, when) in revisions {
        book.create_or_append_revision(number, snapshot(customer), "", &company(), at(when))
            .unwrap();
    }
    docs.save(DocumentKey::SavedQuotes, book.quotes()).await.unwrap();
}

#[tokio::test]
async fn export_then_import_reproduces_catalog_and_keeps_every_revision() {
    let dir = TempDir::new().unwrap();
    let (office, office_mirror) = station(&dir, "office").await;
    let (truck, truck_mirror) = station(&dir, "truck").await;

    // Office curates the catalog and owns two revisions of quote 001.
    let docs = office.documents();
    docs.put(
        DocumentKey::Inventory,
        &json!([{
            "id": "inv-900", "name": "Trencher", "model": "TR-2", "description": "",
            "price": 310.0, "discount": 5.0, "multiplier": 1.1, "stock": 2,
            "category": "Power Equipment"
        }]),
    )
    .await
    .unwrap();
    docs.put(DocumentKey::InventoryCategories, &json!(["Power Equipment", "General"]))
        .await
        .unwrap();
    docs.put(DocumentKey::ScopeTemplates, &json!({"trenching": "Trench and backfill"}))
        .await
        .unwrap();
    docs.save(DocumentKey::AppConfig, &company()).await.unwrap();
    save_quotes(
        &office,
        &[
            ("QT-20250101-001", "Jane Smith", "2025-01-01T10:00:00Z"),
            ("QT-20250101-001", "Jane Smith", "2025-01-02T10:00:00Z"),
        ],
    )
    .await;

    // The truck has its own revision history.
    save_quotes(
        &truck,
        &[
            ("QT-20250101-001", "Jane Smith", "2025-01-01T10:00:00Z"),
            ("QT-20250101-002", "Bob Jones", "2025-01-01T12:00:00Z"),
        ],
    )
    .await;

    assert!(office_mirror.push(Utc::now()).await.unwrap().is_direct());
    let summary = truck_mirror.pull().await.unwrap();
    assert_eq!(summary.kind, ImportKind::Full);
    assert_eq!(summary.quotes_added, 0);
    assert_eq!(summary.revisions_added, 1);

    for key in [
        DocumentKey::Inventory,
        DocumentKey::InventoryCategories,
        DocumentKey::ScopeTemplates,
        DocumentKey::NotesTemplates,
        DocumentKey::ExclusionsTemplates,
        DocumentKey::AppConfig,
    ] {
        assert_eq!(
            truck.documents().get(key).await.unwrap(),
            office.documents().get(key).await.unwrap(),
            "{} differs after import",
            key
        );
    }

    let quotes: Vec<Quote> = truck.documents().load(DocumentKey::SavedQuotes).await.unwrap();
    assert_eq!(quotes.len(), 2);
    let merged = quotes
        .iter()
        .find(|q| q.quote_number == "QT-20250101-001")
        .unwrap();
    assert_eq!(merged.revisions.len(), 2);

    // Back the other way: the office gains quote 002 and loses nothing.
    truck_mirror.push(Utc::now()).await.unwrap();
    office_mirror.pull().await.unwrap();
    let quotes: Vec<Quote> = office.documents().load(DocumentKey::SavedQuotes).await.unwrap();
    assert_eq!(quotes.len(), 2);
    let total_revisions: usize = quotes.iter().map(|q| q.revisions.len()).sum();
    assert_eq!(total_revisions, 3);
}

#[tokio::test]
async fn quotes_backup_imports_into_an_empty_store() {
    let dir = TempDir::new().unwrap();
    let (office, office_mirror) = station(&dir, "office").await;
    let (fresh, fresh_mirror) = station(&dir, "fresh").await;

    save_quotes(&office, &[("QT-20250101-001", "Jane Smith", "2025-01-01T10:00:00Z")]).await;
    let path = office_mirror
        .export_quotes(at("2025-01-31T08:00:00Z"))
        .await
        .unwrap();
    assert!(path.ends_with("quotes-backup-2025-01-31.json"));

    let summary = fresh_mirror.import_file(&path).await.unwrap();
    assert_eq!(summary.kind, ImportKind::QuotesOnly);
    assert_eq!(summary.quotes_added, 1);

    let inventory_before = fresh.documents().get(DocumentKey::Inventory).await.unwrap();
    assert_eq!(inventory_before, DocumentKey::Inventory.default_value());
}

#[tokio::test]
async fn malformed_file_changes_nothing() {
    let dir = TempDir::new().unwrap();
    let (db, mirror) = station(&dir, "office").await;
    let path = dir.path().join("bad.json");
    std::fs::write(&path, r#"{"inventory": [{"id": 1}], "scopeTemplates": {}}"#).unwrap();

    let err = mirror.import_file(&path).await.unwrap_err();
    assert!(err.is_import_error());
    assert!(db.documents().fetch(DocumentKey::Inventory).await.unwrap().is_none());
}
