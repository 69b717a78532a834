//! # Workspace
//!
//! The in-memory copy of every aggregate, plus the set of document keys
//! whose latest edit has not reached the Document Store yet.
//!
//! The workspace is always the source of truth for reads. A refused write
//! leaves the edit here and marks its key dirty. Later persists retry each
//! dirty key on its own, so one refused document never holds back another.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;
use serde_json::Value;

use quotekit_core::{
    AppConfig, Inventory, PartsLibrary, QuoteBook, QuoteFormatLibrary, QuoteSnapshot,
    StorageSettings, TemplateClass, TextTemplates,
};
use quotekit_db::{DbResult, DocumentKey, DocumentRepository};

use crate::error::{ApiError, ApiResult};

/// Keys copied into the mirror file. A write to any other key does not
/// trigger auto-sync.
pub const MIRRORED_KEYS: [DocumentKey; 7] = [
    DocumentKey::AppConfig,
    DocumentKey::Inventory,
    DocumentKey::InventoryCategories,
    DocumentKey::SavedQuotes,
    DocumentKey::ScopeTemplates,
    DocumentKey::NotesTemplates,
    DocumentKey::ExclusionsTemplates,
];

#[derive(Debug, Clone)]
pub struct Workspace {
    pub config: AppConfig,
    pub storage: StorageSettings,
    pub inventory: Inventory,
    pub quotes: QuoteBook,
    pub scope: TextTemplates,
    pub notes: TextTemplates,
    pub exclusions: TextTemplates,
    pub formats: QuoteFormatLibrary,
    pub parts: PartsLibrary,
    pub draft: Option<QuoteSnapshot>,
    dirty: BTreeSet<DocumentKey>,
}

impl Workspace {
    /// Reads every document, falling back to seed values for keys that
    /// were never written.
    pub async fn load(docs: &DocumentRepository) -> DbResult<Self> {
        let inventory = Inventory::new(
            docs.load(DocumentKey::Inventory).await?,
            docs.load(DocumentKey::InventoryCategories).await?,
        );

        Ok(Workspace {
            config: docs.load(DocumentKey::AppConfig).await?,
            storage: docs.load(DocumentKey::StorageSettings).await?,
            inventory,
            quotes: QuoteBook::new(docs.load(DocumentKey::SavedQuotes).await?),
            scope: load_templates(docs, TemplateClass::Scope).await?,
            notes: load_templates(docs, TemplateClass::Notes).await?,
            exclusions: load_templates(docs, TemplateClass::Exclusions).await?,
            formats: QuoteFormatLibrary::new(docs.load(DocumentKey::QuoteFormatTemplates).await?),
            parts: PartsLibrary::new(docs.load(DocumentKey::PartsLibrary).await?),
            draft: docs.load(DocumentKey::QuoteDraft).await?,
            dirty: BTreeSet::new(),
        })
    }

    pub fn templates(&self, class: TemplateClass) -> &TextTemplates {
        match class {
            TemplateClass::Scope => &self.scope,
            TemplateClass::Notes => &self.notes,
            TemplateClass::Exclusions => &self.exclusions,
        }
    }

    pub fn templates_mut(&mut self, class: TemplateClass) -> &mut TextTemplates {
        match class {
            TemplateClass::Scope => &mut self.scope,
            TemplateClass::Notes => &mut self.notes,
            TemplateClass::Exclusions => &mut self.exclusions,
        }
    }

    /// Serializes the document stored under `key`.
    pub fn encode(&self, key: DocumentKey) -> ApiResult<Value> {
        match key {
            DocumentKey::AppConfig => to_document(key, &self.config),
            DocumentKey::StorageSettings => to_document(key, &self.storage),
            DocumentKey::Inventory => to_document(key, self.inventory.items()),
            DocumentKey::InventoryCategories => to_document(key, self.inventory.categories()),
            DocumentKey::SavedQuotes => to_document(key, self.quotes.quotes()),
            DocumentKey::ScopeTemplates => to_document(key, self.scope.entries()),
            DocumentKey::NotesTemplates => to_document(key, self.notes.entries()),
            DocumentKey::ExclusionsTemplates => to_document(key, self.exclusions.entries()),
            DocumentKey::QuoteFormatTemplates => to_document(key, self.formats.entries()),
            DocumentKey::PartsLibrary => to_document(key, self.parts.parts()),
            DocumentKey::QuoteDraft => to_document(key, &self.draft),
        }
    }

    // =========================================================================
    // Dirty Tracking
    // =========================================================================

    pub fn mark_dirty(&mut self, keys: &[DocumentKey]) {
        self.dirty.extend(keys.iter().copied());
    }

    pub fn dirty_keys(&self) -> Vec<DocumentKey> {
        self.dirty.iter().copied().collect()
    }

    pub fn has_unsaved_changes(&self) -> bool {
        !self.dirty.is_empty()
    }

    /// Forgets the keys that were just written.
    pub fn clear_dirty(&mut self, keys: &[DocumentKey]) {
        for key in keys {
            self.dirty.remove(key);
        }
    }

    /// Dirty keys outside `written`, in key order.
    pub fn dirty_except(&self, written: &[DocumentKey]) -> Vec<DocumentKey> {
        self.dirty
            .iter()
            .filter(|key| !written.contains(key))
            .copied()
            .collect()
    }

    /// Encodes `keys` for one batched write.
    pub fn batch(&self, keys: &[DocumentKey]) -> ApiResult<Vec<(DocumentKey, Value)>> {
        let unique: BTreeSet<DocumentKey> = keys.iter().copied().collect();
        unique
            .into_iter()
            .map(|key| Ok((key, self.encode(key)?)))
            .collect()
    }

    /// Carries the unsaved edits of `previous` over a freshly loaded
    /// workspace, so a reload never drops an edit the store refused.
    pub fn keep_unsaved(&mut self, previous: Workspace) {
        let Workspace {
            config,
            storage,
            inventory,
            quotes,
            scope,
            notes,
            exclusions,
            formats,
            parts,
            draft,
            dirty,
        } = previous;

        for key in &dirty {
            match key {
                DocumentKey::AppConfig => self.config = config.clone(),
                DocumentKey::StorageSettings => self.storage = storage.clone(),
                DocumentKey::Inventory | DocumentKey::InventoryCategories => {
                    self.inventory = inventory.clone()
                }
                DocumentKey::SavedQuotes => self.quotes = quotes.clone(),
                DocumentKey::ScopeTemplates => self.scope = scope.clone(),
                DocumentKey::NotesTemplates => self.notes = notes.clone(),
                DocumentKey::ExclusionsTemplates => self.exclusions = exclusions.clone(),
                DocumentKey::QuoteFormatTemplates => self.formats = formats.clone(),
                DocumentKey::PartsLibrary => self.parts = parts.clone(),
                DocumentKey::QuoteDraft => self.draft = draft.clone(),
            }
        }
        self.dirty.extend(dirty);
    }
}

async fn load_templates(docs: &DocumentRepository, class: TemplateClass) -> DbResult<TextTemplates> {
    let entries: BTreeMap<String, String> = docs.load(DocumentKey::templates(class)).await?;
    Ok(TextTemplates::new(class, entries))
}

fn to_document<T: Serialize + ?Sized>(key: DocumentKey, value: &T) -> ApiResult<Value> {
    serde_json::to_value(value)
        .map_err(|e| ApiError::internal(format!("Failed to encode {}: {}", key, e)))
}
