//! State manager behavior against real Document Stores.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use quotekit_app::error::ErrorCode;
use quotekit_app::state::{AppState, DraftDebouncer};
use quotekit_core::inventory::InventoryQuery;
use quotekit_core::{
    AppConfig, EquipmentLine, Hours, InventoryItemInput, LaborLine, Money, Multiplier, Percent,
    QuoteSnapshot, StorageSettings,
};
use quotekit_db::{Database, DbConfig, DocumentKey};
use quotekit_sync::{AutoSyncState, SyncConfig};
use tempfile::TempDir;

fn date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 1, 1).unwrap()
}

fn company() -> AppConfig {
    AppConfig {
        company_name: "Acme Electric".to_string(),
        ..AppConfig::default()
    }
}

fn sync_config(dir: &Path) -> SyncConfig {
    let mut config = SyncConfig::default();
    config.export.dir = Some(dir.join("downloads"));
    config.auto_sync.coalesce_window_ms = 20;
    config.auto_sync.initial_backoff_ms = 5;
    config
}

fn snapshot(customer: &str, generators: i64) -> QuoteSnapshot {
    let mut snapshot = QuoteSnapshot::blank(date(), Percent::zero());
    snapshot.customer_name = customer.to_string();
    snapshot.scope_summary = "Temporary power".to_string();
    snapshot
        .labor_items
        .push(LaborLine::new("Setup", Hours::whole(8), Money::from_dollars(75)));
    snapshot.equipment_items.push(
        EquipmentLine::new("Generator", generators, Money::from_dollars(250), Percent::zero())
            .linked_to("inv-001"),
    );
    snapshot
}

fn trencher() -> InventoryItemInput {
    InventoryItemInput {
        name: "Trencher".to_string(),
        model: "TR-2".to_string(),
        description: "Walk-behind trencher".to_string(),
        price: Money::from_dollars(310),
        discount: Percent::zero(),
        multiplier: Multiplier::default(),
        stock: 2,
        category: "Power Equipment".to_string(),
    }
}

async fn open(dir: &TempDir, config: DbConfig) -> AppState {
    let db = Database::new(config).await.unwrap();
    AppState::open(db, sync_config(dir.path())).await.unwrap()
}

async fn stock_of(state: &AppState, id: &str) -> i64 {
    state
        .list_inventory(&InventoryQuery::default())
        .await
        .into_iter()
        .find(|item| item.id == id)
        .map(|item| item.stock)
        .unwrap()
}

#[tokio::test]
async fn refused_write_keeps_edit_and_flushes_once_storage_recovers() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("quotekit.db");
    let seed_size = serde_json::to_string(&DocumentKey::Inventory.default_value())
        .unwrap()
        .len();
    let state = open(
        &dir,
        DbConfig::new(&path).max_document_bytes(Some(seed_size + 16)),
    )
    .await;

    // Nine items no longer fit.
    let err = state.add_item(trencher()).await.unwrap_err();
    assert_eq!(err.code, ErrorCode::StorageUnavailable);
    assert!(err.message.contains("retry"), "{}", err.message);

    let items = state.list_inventory(&InventoryQuery::default()).await;
    assert_eq!(items.len(), 9);
    let trencher_id = items
        .iter()
        .find(|item| item.name == "Trencher")
        .map(|item| item.id.clone())
        .unwrap();
    assert_eq!(state.dirty_keys().await, vec![DocumentKey::Inventory]);

    let err = state.retry_persist().await.unwrap_err();
    assert_eq!(err.code, ErrorCode::StorageUnavailable);

    // The category list is its own document and still goes through.
    state.add_category("Trenching").await.unwrap();
    assert_eq!(state.dirty_keys().await, vec![DocumentKey::Inventory]);

    // The mirror refuses to read a stale inventory.
    let err = state.sync_push().await.unwrap_err();
    assert_eq!(err.code, ErrorCode::StorageUnavailable);

    // Shrinking the inventory flushes it.
    state.delete_item(&trencher_id).await.unwrap();
    assert!(state.dirty_keys().await.is_empty());
    assert!(state.retry_persist().await.unwrap().is_empty());
    state.shutdown().await;

    let reopened = open(&dir, DbConfig::new(&path)).await;
    assert!(reopened.categories().await.contains(&"Trenching".to_string()));
    assert_eq!(
        reopened.list_inventory(&InventoryQuery::default()).await.len(),
        8
    );
    reopened.shutdown().await;
}

#[tokio::test]
async fn oversized_draft_does_not_hold_back_other_writes_or_sync() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("quotekit.db");
    let state = open(&dir, DbConfig::new(&path).max_document_bytes(Some(4096))).await;
    state
        .save_storage_settings(StorageSettings {
            shared_storage_path: dir.path().join("shared").display().to_string(),
            has_directory_handle: true,
            ..StorageSettings::default()
        })
        .await
        .unwrap();

    let mut form = QuoteSnapshot::blank(date(), Percent::zero());
    form.notes = "x".repeat(10_000);
    let err = state.save_draft(form).await.unwrap_err();
    assert_eq!(err.code, ErrorCode::StorageUnavailable);
    assert_eq!(state.dirty_keys().await, vec![DocumentKey::QuoteDraft]);

    state.add_category("Lighting").await.unwrap();
    assert_eq!(state.dirty_keys().await, vec![DocumentKey::QuoteDraft]);

    assert!(state.sync_push().await.unwrap().is_direct());
    state.sync_pull().await.unwrap();

    // The refused draft survives the reload after the pull.
    let draft = state.draft().await.unwrap();
    assert_eq!(draft.notes.len(), 10_000);
    assert_eq!(state.dirty_keys().await, vec![DocumentKey::QuoteDraft]);
    let err = state.retry_persist().await.unwrap_err();
    assert_eq!(err.code, ErrorCode::StorageUnavailable);
    state.shutdown().await;

    let reopened = open(&dir, DbConfig::new(&path)).await;
    assert!(reopened.categories().await.contains(&"Lighting".to_string()));
    assert!(reopened.draft().await.is_none());
    reopened.shutdown().await;
}

#[tokio::test]
async fn approval_deducts_stock_and_survives_restart() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("quotekit.db");
    let state = open(&dir, DbConfig::new(&path)).await;
    state.save_config(company()).await.unwrap();

    let number = state.next_quote_number(date()).await.unwrap();
    assert_eq!(number, "QT-20250101-001");
    assert_eq!(state.save_revision(&number, snapshot("Jane Smith", 2), "").await.unwrap(), 1);

    let report = state.approve_quote(&number, false).await.unwrap();
    assert_eq!(report.revision_number, 1);
    assert_eq!(report.deductions.len(), 1);
    assert_eq!(report.deductions[0].remaining, 2);
    assert!(!report.reapproval);
    state.shutdown().await;

    let state = open(&dir, DbConfig::new(&path)).await;
    assert_eq!(stock_of(&state, "inv-001").await, 2);
    let quotes = state.list_quotes().await;
    assert_eq!(quotes.len(), 1);
    assert!(quotes[0].approved);

    // Re-approval needs confirmation and leaves stock alone without it.
    let err = state.approve_quote(&number, false).await.unwrap_err();
    assert_eq!(err.code, ErrorCode::ConfirmationRequired);
    assert_eq!(stock_of(&state, "inv-001").await, 2);

    let report = state.approve_quote(&number, true).await.unwrap();
    assert!(report.reapproval);
    assert_eq!(stock_of(&state, "inv-001").await, 0);

    let err = state.approve_quote(&number, true).await.unwrap_err();
    assert_eq!(err.code, ErrorCode::InsufficientStock);
    assert_eq!(stock_of(&state, "inv-001").await, 0);
    state.shutdown().await;
}

#[tokio::test]
async fn revisions_load_by_index_and_invalid_quotes_write_nothing() {
    let dir = TempDir::new().unwrap();
    let state = open(&dir, DbConfig::in_memory()).await;

    // No company settings yet.
    let err = state
        .save_revision("QT-20250101-001", snapshot("Jane Smith", 1), "")
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::ValidationError);
    assert!(state.list_quotes().await.is_empty());
    assert!(state.dirty_keys().await.is_empty());

    state.save_config(company()).await.unwrap();
    state
        .save_revision("QT-20250101-001", snapshot("Jane Smith", 1), "first")
        .await
        .unwrap();
    state
        .save_revision("QT-20250101-001", snapshot("Jane Smith-Jones", 1), "second")
        .await
        .unwrap();

    let first = state.load_revision("QT-20250101-001", 0).await.unwrap();
    assert_eq!(first.revision_number, 1);
    assert_eq!(first.data.customer_name, "Jane Smith");
    let latest = state.load_latest("QT-20250101-001").await.unwrap();
    assert_eq!(latest.data.customer_name, "Jane Smith-Jones");

    let err = state.load_revision("QT-20250101-001", 5).await.unwrap_err();
    assert_eq!(err.code, ErrorCode::NotFound);

    let report = state.finalize_document("QT-20250101-001").await.unwrap();
    assert_eq!(report.file_name, "Quote_QT-20250101-001_01-01-2025.pdf");
    state.shutdown().await;
}

#[tokio::test]
async fn rapid_draft_edits_collapse_into_one_recalculation() {
    let dir = TempDir::new().unwrap();
    let state = Arc::new(open(&dir, DbConfig::in_memory()).await);
    let drafts = DraftDebouncer::new(state.clone(), Duration::from_millis(100)).start();

    for hours in [2, 4, 8] {
        let mut form = QuoteSnapshot::blank(date(), Percent::zero());
        form.labor_items
            .push(LaborLine::new("Setup", Hours::whole(hours), Money::from_dollars(75)));
        assert!(drafts.update(form).await);
    }

    let mut rx = drafts.subscribe();
    let status = tokio::time::timeout(
        Duration::from_secs(5),
        rx.wait_for(|s| s.recalculations > 0),
    )
    .await
    .expect("draft was never recalculated")
    .unwrap()
    .clone();

    assert_eq!(status.recalculations, 1);
    assert_eq!(status.superseded, 2);
    assert_eq!(status.grand_total, Some(Money::from_dollars(600)));

    let draft = state.draft().await.unwrap();
    assert_eq!(draft.labor_subtotal, Money::from_dollars(600));
    assert_eq!(draft.grand_total, Money::from_dollars(600));
}

#[tokio::test]
async fn mirrored_writes_trigger_auto_sync() {
    let dir = TempDir::new().unwrap();
    let shared = dir.path().join("shared");
    let state = open(&dir, DbConfig::in_memory()).await;

    state
        .save_storage_settings(StorageSettings {
            shared_storage_path: shared.display().to_string(),
            auto_sync_enabled: true,
            has_directory_handle: true,
            ..StorageSettings::default()
        })
        .await
        .unwrap();
    assert_eq!(state.auto_sync_status().state, AutoSyncState::Idle);

    state.add_category("Trenching").await.unwrap();

    let mut rx = state.subscribe_auto_sync();
    let status = tokio::time::timeout(
        Duration::from_secs(5),
        rx.wait_for(|s| matches!(s.state, AutoSyncState::Succeeded { .. } | AutoSyncState::Failed { .. })),
    )
    .await
    .expect("auto-sync did not settle")
    .unwrap()
    .clone();
    assert_eq!(status.completed, 1);

    let mirror = std::fs::read_to_string(shared.join("proposal-data-sync.json")).unwrap();
    assert!(mirror.contains("Trenching"));
    state.shutdown().await;
}

#[tokio::test]
async fn pull_merges_the_shared_file_into_the_workspace() {
    let dir = TempDir::new().unwrap();
    let settings = StorageSettings {
        shared_storage_path: dir.path().join("shared").display().to_string(),
        has_directory_handle: true,
        ..StorageSettings::default()
    };

    let office = open(&dir, DbConfig::in_memory()).await;
    office.save_storage_settings(settings.clone()).await.unwrap();
    office.save_config(company()).await.unwrap();
    office
        .save_revision("QT-20250101-001", snapshot("Jane Smith", 1), "")
        .await
        .unwrap();
    assert!(office.sync_push().await.unwrap().is_direct());

    let truck = open(&dir, DbConfig::in_memory()).await;
    let err = truck.sync_pull().await.unwrap_err();
    assert_eq!(err.code, ErrorCode::SyncFailure);

    truck.save_storage_settings(settings).await.unwrap();
    let summary = truck.sync_pull().await.unwrap();
    assert_eq!(summary.quotes_added, 1);
    assert_eq!(truck.list_quotes().await.len(), 1);
    assert_eq!(truck.config().await.company_name, "Acme Electric");

    office.shutdown().await;
    truck.shutdown().await;
}
