//! # State Manager
//!
//! `AppState` owns the workspace and routes every mutation through one
//! method per operation.
//!
//! ## Write Path
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Mutation Flow                                      │
//! │                                                                         │
//! │  command ──► lock workspace ──► aggregate method (validates first)      │
//! │                                      │                                  │
//! │                    ValidationError ◄─┤ nothing changed, nothing written │
//! │                                      ▼                                  │
//! │                          in-memory edit applied                         │
//! │                                      │                                  │
//! │                                      ▼                                  │
//! │                        put_many(touched keys)                           │
//! │                     │                         │                         │
//! │                    ok                  StorageUnavailable               │
//! │                     │                         │                         │
//! │          clear dirty, retry each       keys stay dirty, edit kept,      │
//! │          earlier dirty key alone,      error carries retry guidance     │
//! │          request auto-sync if mirrored                                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The workspace sits behind a tokio `Mutex` held across the write, so two
//! commands never interleave their edits and persists.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{NaiveDate, Utc};
use tokio::sync::{watch, Mutex};
use tracing::{debug, info, warn};

use quotekit_core::inventory::InventoryQuery;
use quotekit_core::parts::{FinalizeReport, Upserted};
use quotekit_core::quote::QuoteSummary;
use quotekit_core::{
    AppConfig, ApprovalReport, CoreError, InventoryItem, InventoryItemInput, LibraryPart,
    QuoteFormatTemplate, QuoteSnapshot, Revision, StorageSettings, TemplateClass,
};
use quotekit_db::{Database, DocumentKey, DocumentRepository};
use quotekit_sync::{
    AutoSync, AutoSyncHandle, AutoSyncStatus, ExportOutcome, ImportSummary, Mirror, SyncConfig,
};

use crate::error::{ApiError, ApiResult};
use crate::state::workspace::{Workspace, MIRRORED_KEYS};

pub struct AppState {
    db: Database,
    docs: DocumentRepository,
    mirror: Mirror,
    auto_sync: AutoSyncHandle,
    workspace: Mutex<Workspace>,
}

/// Outcome of writing dirty keys one by one.
#[derive(Debug, Default)]
struct Flushed {
    written: Vec<DocumentKey>,
    refused: Vec<(DocumentKey, ApiError)>,
}

impl AppState {
    /// Opens the state manager over an open database.
    ///
    /// ## Startup
    /// 1. Start the auto-sync worker
    /// 2. If `syncOnStartup` is set, pull and merge the mirror file (a
    ///    failed pull is logged and startup continues)
    /// 3. Load every document into the workspace
    pub async fn open(db: Database, sync_config: SyncConfig) -> ApiResult<Self> {
        let docs = db.documents();
        let mirror = Mirror::new(docs.clone(), sync_config.clone());
        let auto_sync = AutoSync::new(mirror.clone(), sync_config.auto_sync.clone()).start();

        let storage: StorageSettings = docs.load(DocumentKey::StorageSettings).await?;
        if storage.sync_on_startup {
            match mirror.pull().await {
                Ok(summary) => info!(
                    kind = %summary.kind,
                    quotes_added = summary.quotes_added,
                    revisions_added = summary.revisions_added,
                    "Merged mirror file on startup"
                ),
                Err(err) => warn!(error = %err, "Startup sync skipped"),
            }
        }

        let workspace = Workspace::load(&docs).await?;
        info!(
            items = workspace.inventory.len(),
            quotes = workspace.quotes.len(),
            "Workspace loaded"
        );

        Ok(AppState {
            db,
            docs,
            mirror,
            auto_sync,
            workspace: Mutex::new(workspace),
        })
    }

    /// Stops the auto-sync worker (flushing a pending export) and closes
    /// the database.
    pub async fn shutdown(&self) {
        if let Err(err) = self.auto_sync.shutdown().await {
            debug!(error = %err, "Auto-sync worker already stopped");
        }
        self.db.close().await;
    }

    // =========================================================================
    // Persistence
    // =========================================================================

    /// Writes the keys an operation touched in one transaction, then retries
    /// every key left dirty by an earlier failure on its own.
    ///
    /// ## Returns
    /// * `Ok(written)` - the touched keys plus any earlier key that went
    ///   through; a key that is still refused stays dirty
    /// * `Err(StorageUnavailable)` - a touched key was refused; the edit
    ///   stays in memory and its keys stay dirty
    async fn persist(&self, ws: &mut Workspace, keys: &[DocumentKey]) -> ApiResult<Vec<DocumentKey>> {
        ws.mark_dirty(keys);
        let batch = ws.batch(keys)?;
        let mut written: Vec<DocumentKey> = batch.iter().map(|(key, _)| *key).collect();

        if !batch.is_empty() {
            if let Err(err) = self.docs.put_many(&batch).await {
                warn!(error = %err, keys = ?written, "Write refused, keeping edit in memory");
                return Err(err.into());
            }
            ws.clear_dirty(&written);
        }

        let flushed = self.flush_dirty(ws, &written).await;
        written.extend(flushed.written);
        debug!(keys = ?written, still_dirty = ?ws.dirty_keys(), "Workspace persisted");

        if written.iter().any(|key| MIRRORED_KEYS.contains(key)) {
            self.request_auto_sync(ws);
        }
        Ok(written)
    }

    /// Writes each dirty key outside `skip` in its own put.
    async fn flush_dirty(&self, ws: &mut Workspace, skip: &[DocumentKey]) -> Flushed {
        let mut flushed = Flushed::default();
        for key in ws.dirty_except(skip) {
            let result = match ws.encode(key) {
                Ok(document) => self.docs.put(key, &document).await.map_err(ApiError::from),
                Err(err) => Err(err),
            };
            match result {
                Ok(()) => {
                    ws.clear_dirty(&[key]);
                    flushed.written.push(key);
                }
                Err(err) => {
                    warn!(key = %key, error = %err.message, "Dirty key still refused");
                    flushed.refused.push((key, err));
                }
            }
        }
        flushed
    }

    fn request_auto_sync(&self, ws: &Workspace) {
        if !ws.storage.auto_sync_enabled {
            return;
        }
        if let Err(err) = self.auto_sync.request() {
            warn!(error = %err, "Auto-sync request dropped");
        }
    }

    /// Retries every dirty key.
    ///
    /// ## Returns
    /// The keys written; empty when nothing was pending. Fails with the
    /// first refusal when any key is still refused, after writing the
    /// others.
    pub async fn retry_persist(&self) -> ApiResult<Vec<DocumentKey>> {
        let mut ws = self.workspace.lock().await;
        let flushed = self.flush_dirty(&mut ws, &[]).await;
        if flushed.written.iter().any(|key| MIRRORED_KEYS.contains(key)) {
            self.request_auto_sync(&ws);
        }
        match flushed.refused.into_iter().next() {
            Some((_, err)) => Err(err),
            None => Ok(flushed.written),
        }
    }

    /// Keys whose latest edit has not been stored yet.
    pub async fn dirty_keys(&self) -> Vec<DocumentKey> {
        self.workspace.lock().await.dirty_keys()
    }

    /// Flushes pending edits before the mirror reads or replaces the
    /// Document Store.
    ///
    /// Only a refused mirrored key fails the sync, since the mirror would
    /// read or overwrite a stale copy of it. Other refused keys stay dirty
    /// and the sync goes ahead.
    async fn flush_before_sync(&self, ws: &mut Workspace) -> ApiResult<()> {
        if !ws.has_unsaved_changes() {
            return Ok(());
        }
        let flushed = self.flush_dirty(ws, &[]).await;
        if flushed.written.iter().any(|key| MIRRORED_KEYS.contains(key)) {
            self.request_auto_sync(ws);
        }

        let mut blocking = Vec::new();
        for (key, err) in flushed.refused {
            if MIRRORED_KEYS.contains(&key) {
                blocking.push(err);
            } else {
                debug!(key = %key, "Unsynced key stays dirty");
            }
        }
        match blocking.into_iter().next() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    // =========================================================================
    // Configuration
    // =========================================================================

    pub async fn config(&self) -> AppConfig {
        self.workspace.lock().await.config.clone()
    }

    /// Saves company settings and marks setup complete.
    pub async fn save_config(&self, mut config: AppConfig) -> ApiResult<AppConfig> {
        config.validate().map_err(CoreError::from)?;
        config.configured = true;

        let mut ws = self.workspace.lock().await;
        ws.config = config.clone();
        self.persist(&mut ws, &[DocumentKey::AppConfig]).await?;
        info!(company = %config.company_name, "Company settings saved");
        Ok(config)
    }

    pub async fn storage_settings(&self) -> StorageSettings {
        self.workspace.lock().await.storage.clone()
    }

    pub async fn save_storage_settings(&self, settings: StorageSettings) -> ApiResult<StorageSettings> {
        let mut ws = self.workspace.lock().await;
        ws.storage = settings.clone();
        self.persist(&mut ws, &[DocumentKey::StorageSettings]).await?;
        Ok(settings)
    }

    // =========================================================================
    // Inventory
    // =========================================================================

    pub async fn list_inventory(&self, query: &InventoryQuery) -> Vec<InventoryItem> {
        let ws = self.workspace.lock().await;
        ws.inventory.list(query).into_iter().cloned().collect()
    }

    pub async fn add_item(&self, input: InventoryItemInput) -> ApiResult<InventoryItem> {
        let mut ws = self.workspace.lock().await;
        let item = ws.inventory.add(input)?.clone();
        info!(id = %item.id, name = %item.name, "Inventory item added");
        self.persist(&mut ws, &[DocumentKey::Inventory]).await?;
        Ok(item)
    }

    pub async fn edit_item(&self, id: &str, input: InventoryItemInput) -> ApiResult<InventoryItem> {
        let mut ws = self.workspace.lock().await;
        let item = ws.inventory.edit(id, input)?.clone();
        self.persist(&mut ws, &[DocumentKey::Inventory]).await?;
        Ok(item)
    }

    pub async fn delete_item(&self, id: &str) -> ApiResult<InventoryItem> {
        let mut ws = self.workspace.lock().await;
        let item = ws.inventory.delete(id)?;
        info!(id = %item.id, "Inventory item deleted");
        self.persist(&mut ws, &[DocumentKey::Inventory]).await?;
        Ok(item)
    }

    pub async fn categories(&self) -> Vec<String> {
        self.workspace.lock().await.inventory.categories().to_vec()
    }

    pub async fn add_category(&self, name: &str) -> ApiResult<String> {
        let mut ws = self.workspace.lock().await;
        let name = ws.inventory.add_category(name)?;
        self.persist(&mut ws, &[DocumentKey::InventoryCategories]).await?;
        Ok(name)
    }

    /// Renames a category and re-labels its items.
    ///
    /// ## Returns
    /// Number of items moved.
    pub async fn rename_category(&self, old: &str, new: &str) -> ApiResult<usize> {
        let mut ws = self.workspace.lock().await;
        let moved = ws.inventory.rename_category(old, new)?;
        self.persist(
            &mut ws,
            &[DocumentKey::Inventory, DocumentKey::InventoryCategories],
        )
        .await?;
        Ok(moved)
    }

    /// Removes a category, reassigning its items to "General".
    pub async fn remove_category(&self, name: &str) -> ApiResult<usize> {
        let mut ws = self.workspace.lock().await;
        let moved = ws.inventory.remove_category(name)?;
        info!(category = name, reassigned = moved, "Category removed");
        self.persist(
            &mut ws,
            &[DocumentKey::Inventory, DocumentKey::InventoryCategories],
        )
        .await?;
        Ok(moved)
    }

    // =========================================================================
    // Quotes
    // =========================================================================

    pub async fn next_quote_number(&self, date: NaiveDate) -> ApiResult<String> {
        let ws = self.workspace.lock().await;
        Ok(ws.quotes.next_quote_number(date)?)
    }

    /// Saves a new revision, creating the quote on first save.
    ///
    /// ## Returns
    /// The new revision number.
    pub async fn save_revision(
        &self,
        quote_number: &str,
        snapshot: QuoteSnapshot,
        note: &str,
    ) -> ApiResult<u32> {
        let mut guard = self.workspace.lock().await;
        let ws = &mut *guard;
        let revision = ws
            .quotes
            .create_or_append_revision(quote_number, snapshot, note, &ws.config, Utc::now())?;
        info!(quote_number, revision, "Quote revision saved");
        self.persist(ws, &[DocumentKey::SavedQuotes]).await?;
        Ok(revision)
    }

    /// Approves the latest revision and deducts linked stock.
    ///
    /// The quote and the inventory are written in one transaction.
    pub async fn approve_quote(&self, quote_number: &str, confirm: bool) -> ApiResult<ApprovalReport> {
        let mut guard = self.workspace.lock().await;
        let ws = &mut *guard;
        let report = ws
            .quotes
            .approve(quote_number, &mut ws.inventory, confirm, Utc::now())?;

        info!(
            quote_number,
            revision = report.revision_number,
            deductions = report.deductions.len(),
            skipped = report.skipped.len(),
            reapproval = report.reapproval,
            "Quote approved"
        );
        self.persist(ws, &[DocumentKey::SavedQuotes, DocumentKey::Inventory])
            .await?;
        Ok(report)
    }

    /// Deletes a quote with all revisions. Deducted stock is not restored.
    pub async fn delete_quote(&self, quote_number: &str) -> ApiResult<()> {
        let mut ws = self.workspace.lock().await;
        let removed = ws.quotes.delete(quote_number)?;
        info!(quote_number, revisions = removed.revisions.len(), "Quote deleted");
        self.persist(&mut ws, &[DocumentKey::SavedQuotes]).await?;
        Ok(())
    }

    /// Saved quotes, most recently modified first.
    pub async fn list_quotes(&self) -> Vec<QuoteSummary> {
        self.workspace.lock().await.quotes.list()
    }

    /// Loads a revision by 0-based index.
    pub async fn load_revision(&self, quote_number: &str, index: usize) -> ApiResult<Revision> {
        let ws = self.workspace.lock().await;
        Ok(ws.quotes.revision(quote_number, index)?.clone())
    }

    pub async fn load_latest(&self, quote_number: &str) -> ApiResult<Revision> {
        let ws = self.workspace.lock().await;
        Ok(ws.quotes.latest(quote_number)?.clone())
    }

    // =========================================================================
    // Templates
    // =========================================================================

    pub async fn templates(&self, class: TemplateClass) -> BTreeMap<String, String> {
        let ws = self.workspace.lock().await;
        ws.templates(class).entries().clone()
    }

    /// Adds a text template under the key sanitized from `name`.
    pub async fn add_template(&self, class: TemplateClass, name: &str, text: &str) -> ApiResult<String> {
        let mut ws = self.workspace.lock().await;
        let key = ws.templates_mut(class).add(name, text)?;
        self.persist(&mut ws, &[DocumentKey::templates(class)]).await?;
        Ok(key)
    }

    pub async fn update_template(&self, class: TemplateClass, key: &str, text: &str) -> ApiResult<()> {
        let mut ws = self.workspace.lock().await;
        ws.templates_mut(class).update(key, text)?;
        self.persist(&mut ws, &[DocumentKey::templates(class)]).await?;
        Ok(())
    }

    pub async fn remove_template(&self, class: TemplateClass, key: &str) -> ApiResult<String> {
        let mut ws = self.workspace.lock().await;
        let text = ws.templates_mut(class).remove(key)?;
        self.persist(&mut ws, &[DocumentKey::templates(class)]).await?;
        Ok(text)
    }

    pub async fn reset_templates(&self, class: TemplateClass) -> ApiResult<()> {
        let mut ws = self.workspace.lock().await;
        ws.templates_mut(class).reset();
        info!(class = %class, "Templates reset to defaults");
        self.persist(&mut ws, &[DocumentKey::templates(class)]).await?;
        Ok(())
    }

    pub async fn format_templates(&self) -> BTreeMap<String, QuoteFormatTemplate> {
        self.workspace.lock().await.formats.entries().clone()
    }

    pub async fn save_format_template(&self, template: QuoteFormatTemplate) -> ApiResult<String> {
        let mut ws = self.workspace.lock().await;
        let key = ws.formats.save(template, Utc::now())?;
        self.persist(&mut ws, &[DocumentKey::QuoteFormatTemplates])
            .await?;
        Ok(key)
    }

    pub async fn remove_format_template(&self, key: &str) -> ApiResult<QuoteFormatTemplate> {
        let mut ws = self.workspace.lock().await;
        let removed = ws.formats.remove(key)?;
        self.persist(&mut ws, &[DocumentKey::QuoteFormatTemplates])
            .await?;
        Ok(removed)
    }

    // =========================================================================
    // Parts Library
    // =========================================================================

    pub async fn parts(&self) -> Vec<LibraryPart> {
        self.workspace.lock().await.parts.parts().to_vec()
    }

    pub async fn upsert_part(&self, part: LibraryPart) -> ApiResult<Upserted> {
        let mut ws = self.workspace.lock().await;
        let outcome = ws.parts.upsert(part)?;
        self.persist(&mut ws, &[DocumentKey::PartsLibrary]).await?;
        Ok(outcome)
    }

    pub async fn set_part_inventory(&self, part_number: &str, count: Option<i64>) -> ApiResult<()> {
        let mut ws = self.workspace.lock().await;
        ws.parts.set_inventory(part_number, count)?;
        self.persist(&mut ws, &[DocumentKey::PartsLibrary]).await?;
        Ok(())
    }

    pub async fn remove_part(&self, part_number: &str) -> ApiResult<LibraryPart> {
        let mut ws = self.workspace.lock().await;
        let removed = ws.parts.remove(part_number)?;
        self.persist(&mut ws, &[DocumentKey::PartsLibrary]).await?;
        Ok(removed)
    }

    /// Records the latest revision's parts in the library and decrements
    /// counted parts.
    ///
    /// ## Returns
    /// The PDF file name and counter movements. Shortages are warnings.
    pub async fn finalize_document(&self, quote_number: &str) -> ApiResult<FinalizeReport> {
        let mut guard = self.workspace.lock().await;
        let ws = &mut *guard;
        let snapshot = &ws.quotes.latest(quote_number)?.data;
        let report = ws.parts.finalize(snapshot);

        for shortage in &report.warnings {
            warn!(
                part_number = %shortage.part_number,
                available = shortage.available,
                requested = shortage.requested,
                "Part counter ran short"
            );
        }
        info!(file = %report.file_name, parts = report.parts_recorded, "Quote document finalized");
        self.persist(ws, &[DocumentKey::PartsLibrary]).await?;
        Ok(report)
    }

    // =========================================================================
    // Draft
    // =========================================================================

    pub async fn draft(&self) -> Option<QuoteSnapshot> {
        self.workspace.lock().await.draft.clone()
    }

    /// Recalculates and stores the in-progress form.
    pub async fn save_draft(&self, mut snapshot: QuoteSnapshot) -> ApiResult<QuoteSnapshot> {
        snapshot.recalculate();
        let mut ws = self.workspace.lock().await;
        ws.draft = Some(snapshot.clone());
        self.persist(&mut ws, &[DocumentKey::QuoteDraft]).await?;
        Ok(snapshot)
    }

    pub async fn clear_draft(&self) -> ApiResult<()> {
        let mut ws = self.workspace.lock().await;
        ws.draft = None;
        self.persist(&mut ws, &[DocumentKey::QuoteDraft]).await?;
        Ok(())
    }

    // =========================================================================
    // External Mirror
    // =========================================================================

    /// Writes the mirror file, falling back to a manual export file.
    pub async fn sync_push(&self) -> ApiResult<ExportOutcome> {
        let mut ws = self.workspace.lock().await;
        self.flush_before_sync(&mut ws).await?;
        let outcome = self.mirror.push(Utc::now()).await?;
        info!(path = %outcome.path().display(), direct = outcome.is_direct(), "Sync push complete");
        Ok(outcome)
    }

    /// Merges the mirror file into the store and reloads the workspace.
    pub async fn sync_pull(&self) -> ApiResult<ImportSummary> {
        let mut ws = self.workspace.lock().await;
        self.flush_before_sync(&mut ws).await?;
        let summary = self.mirror.pull().await?;
        self.reload(&mut ws).await?;
        Ok(summary)
    }

    /// Imports a user-picked file (full, inventory-only or quotes-only).
    pub async fn import_file(&self, path: &Path) -> ApiResult<ImportSummary> {
        let mut ws = self.workspace.lock().await;
        self.flush_before_sync(&mut ws).await?;
        let summary = self.mirror.import_file(path).await?;
        info!(
            path = %path.display(),
            kind = %summary.kind,
            items = summary.inventory_items,
            quotes_added = summary.quotes_added,
            revisions_added = summary.revisions_added,
            "Import applied"
        );
        self.reload(&mut ws).await?;
        Ok(summary)
    }

    async fn reload(&self, ws: &mut Workspace) -> ApiResult<()> {
        let fresh = Workspace::load(&self.docs).await?;
        let previous = std::mem::replace(ws, fresh);
        ws.keep_unsaved(previous);
        self.request_auto_sync(ws);
        Ok(())
    }

    /// Writes a dated full backup to the export directory.
    pub async fn export_backup(&self) -> ApiResult<PathBuf> {
        let mut ws = self.workspace.lock().await;
        self.flush_before_sync(&mut ws).await?;
        Ok(self.mirror.export_backup(Utc::now()).await?)
    }

    /// Writes a quotes-only backup to the export directory.
    pub async fn export_quotes(&self) -> ApiResult<PathBuf> {
        let mut ws = self.workspace.lock().await;
        self.flush_before_sync(&mut ws).await?;
        Ok(self.mirror.export_quotes(Utc::now()).await?)
    }

    pub fn auto_sync_status(&self) -> AutoSyncStatus {
        self.auto_sync.status()
    }

    pub fn subscribe_auto_sync(&self) -> watch::Receiver<AutoSyncStatus> {
        self.auto_sync.subscribe()
    }
}
