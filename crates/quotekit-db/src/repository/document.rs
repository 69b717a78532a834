//! # Document Repository
//!
//! Whole-document get/put over the `documents` table.
//!
//! ## Semantics
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  get(key)   ──► row exists?  ── yes ──► stored JSON                    │
//! │                     │                                                   │
//! │                     └── no ───► DocumentKey::default_value()           │
//! │                                                                         │
//! │  put(key, doc)                                                         │
//! │     1. refuse if read-only or doc > max_document_bytes                 │
//! │     2. INSERT ... ON CONFLICT(key) DO UPDATE   (last write wins)       │
//! │                                                                         │
//! │  put_many([(k1, d1), (k2, d2)])                                        │
//! │     same checks for every doc, then ONE transaction                    │
//! │     (approval writes inventory + savedQuotes together)                 │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use sqlx::{Row, SqlitePool};
use tracing::{debug, warn};

use crate::error::{DbError, DbResult};
use crate::keys::DocumentKey;

/// Write limits applied before anything reaches SQLite.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WritePolicy {
    /// Largest serialized document accepted, in bytes.
    pub max_document_bytes: Option<usize>,
    /// Refuse every write.
    pub read_only: bool,
}

/// Metadata of a stored document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentInfo {
    pub key: DocumentKey,
    pub size_bytes: i64,
    pub updated_at: DateTime<Utc>,
}

/// Repository for the named JSON documents.
#[derive(Debug, Clone)]
pub struct DocumentRepository {
    pool: SqlitePool,
    policy: WritePolicy,
}

impl DocumentRepository {
    /// Creates a new DocumentRepository.
    pub fn new(pool: SqlitePool, policy: WritePolicy) -> Self {
        DocumentRepository { pool, policy }
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Returns the stored document, or `None` when the key was never written.
    pub async fn fetch(&self, key: DocumentKey) -> DbResult<Option<Value>> {
        let raw: Option<String> = sqlx::query_scalar("SELECT value FROM documents WHERE key = ?1")
            .bind(key.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| DbError::from(e).for_key(key.as_str()))?;

        raw.map(|text| {
            serde_json::from_str(&text).map_err(|e| DbError::invalid_document(key.as_str(), e))
        })
        .transpose()
    }

    /// Returns the last-written document, or the key's seed default.
    pub async fn get(&self, key: DocumentKey) -> DbResult<Value> {
        Ok(self
            .fetch(key)
            .await?
            .unwrap_or_else(|| key.default_value()))
    }

    /// Reads a document into a typed value (seed default when unwritten).
    pub async fn load<T: DeserializeOwned>(&self, key: DocumentKey) -> DbResult<T> {
        let value = self.get(key).await?;
        serde_json::from_value(value).map_err(|e| DbError::invalid_document(key.as_str(), e))
    }

    /// Lists the keys that have been written, with their sizes.
    pub async fn list(&self) -> DbResult<Vec<DocumentInfo>> {
        let rows = sqlx::query("SELECT key, size_bytes, updated_at FROM documents ORDER BY key")
            .fetch_all(&self.pool)
            .await?;

        let mut infos = Vec::with_capacity(rows.len());
        for row in rows {
            let name: String = row.try_get("key")?;
            // Rows written under keys this build does not know are ignored.
            let Ok(key) = name.parse::<DocumentKey>() else {
                warn!(key = %name, "Ignoring unknown document key");
                continue;
            };
            let updated_at: String = row.try_get("updated_at")?;
            let updated_at = DateTime::parse_from_rfc3339(&updated_at)
                .map_err(|e| DbError::Internal(format!("bad timestamp for {}: {}", name, e)))?
                .with_timezone(&Utc);
            infos.push(DocumentInfo {
                key,
                size_bytes: row.try_get("size_bytes")?,
                updated_at,
            });
        }
        Ok(infos)
    }

    // =========================================================================
    // Writes
    // =========================================================================

    /// Overwrites the document for `key`.
    ///
    /// ## Errors
    /// `StorageUnavailable` when the write is refused; the stored value is
    /// unchanged in that case.
    pub async fn put(&self, key: DocumentKey, document: &Value) -> DbResult<()> {
        let text = self.encode(key, document)?;

        sqlx::query(
            r#"
            INSERT INTO documents (key, value, size_bytes, updated_at)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                size_bytes = excluded.size_bytes,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(key.as_str())
        .bind(&text)
        .bind(text.len() as i64)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| DbError::from(e).for_key(key.as_str()))?;

        debug!(key = %key, bytes = text.len(), "Document written");
        Ok(())
    }

    /// Serializes and writes a typed value.
    pub async fn save<T: Serialize + ?Sized>(&self, key: DocumentKey, value: &T) -> DbResult<()> {
        let document =
            serde_json::to_value(value).map_err(|e| DbError::invalid_document(key.as_str(), e))?;
        self.put(key, &document).await
    }

    /// Writes several documents in one transaction: either all of them are
    /// stored or none is.
    pub async fn put_many(&self, documents: &[(DocumentKey, Value)]) -> DbResult<()> {
        let mut encoded = Vec::with_capacity(documents.len());
        for (key, document) in documents {
            encoded.push((*key, self.encode(*key, document)?));
        }

        let keys: Vec<&str> = encoded.iter().map(|(k, _)| k.as_str()).collect();
        let joined = keys.join(",");

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| DbError::from(e).for_key(&joined))?;
        let now = Utc::now().to_rfc3339();

        for (key, text) in &encoded {
            sqlx::query(
                r#"
                INSERT INTO documents (key, value, size_bytes, updated_at)
                VALUES (?1, ?2, ?3, ?4)
                ON CONFLICT(key) DO UPDATE SET
                    value = excluded.value,
                    size_bytes = excluded.size_bytes,
                    updated_at = excluded.updated_at
                "#,
            )
            .bind(key.as_str())
            .bind(text)
            .bind(text.len() as i64)
            .bind(&now)
            .execute(&mut *tx)
            .await
            .map_err(|e| DbError::from(e).for_key(key.as_str()))?;
        }

        tx.commit().await.map_err(|e| match DbError::from(e) {
            err @ DbError::StorageUnavailable { .. } => err.for_key(&joined),
            other => DbError::TransactionFailed(other.to_string()),
        })?;

        debug!(keys = %joined, "Documents written atomically");
        Ok(())
    }

    /// Deletes a stored document so the key reads as its default again.
    pub async fn remove(&self, key: DocumentKey) -> DbResult<bool> {
        self.check_writable(key)?;
        let result = sqlx::query("DELETE FROM documents WHERE key = ?1")
            .bind(key.as_str())
            .execute(&self.pool)
            .await
            .map_err(|e| DbError::from(e).for_key(key.as_str()))?;
        Ok(result.rows_affected() > 0)
    }

    // =========================================================================
    // Policy
    // =========================================================================

    fn check_writable(&self, key: DocumentKey) -> DbResult<()> {
        if self.policy.read_only {
            return Err(DbError::unavailable(key.as_str(), "store is read-only"));
        }
        Ok(())
    }

    fn encode(&self, key: DocumentKey, document: &Value) -> DbResult<String> {
        self.check_writable(key)?;
        let text = serde_json::to_string(document)
            .map_err(|e| DbError::invalid_document(key.as_str(), e))?;
        if let Some(limit) = self.policy.max_document_bytes {
            if text.len() > limit {
                warn!(key = %key, bytes = text.len(), limit, "Document exceeds storage quota");
                return Err(DbError::unavailable(
                    key.as_str(),
                    format!("quota exceeded ({} bytes, limit {})", text.len(), limit),
                ));
            }
        }
        Ok(text)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use serde_json::json;

    async fn repo(policy: WritePolicy) -> DocumentRepository {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        DocumentRepository::new(db.pool().clone(), policy)
    }

    #[tokio::test]
    async fn test_unwritten_key_returns_default() {
        let repo = repo(WritePolicy::default()).await;
        assert!(repo.fetch(DocumentKey::Inventory).await.unwrap().is_none());
        let inventory = repo.get(DocumentKey::Inventory).await.unwrap();
        assert_eq!(inventory.as_array().unwrap().len(), 8);
    }

    #[tokio::test]
    async fn test_put_then_get_last_write_wins() {
        let repo = repo(WritePolicy::default()).await;
        repo.put(DocumentKey::InventoryCategories, &json!(["General"]))
            .await
            .unwrap();
        repo.put(DocumentKey::InventoryCategories, &json!(["General", "Tools"]))
            .await
            .unwrap();
        assert_eq!(
            repo.get(DocumentKey::InventoryCategories).await.unwrap(),
            json!(["General", "Tools"])
        );
        let listed = repo.list().await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].key, DocumentKey::InventoryCategories);
    }

    #[tokio::test]
    async fn test_quota_refuses_write_and_keeps_old_value() {
        let repo = repo(WritePolicy {
            max_document_bytes: Some(32),
            read_only: false,
        })
        .await;
        repo.put(DocumentKey::QuoteDraft, &json!({"a": 1})).await.unwrap();

        let big = json!({"notes": "x".repeat(100)});
        let err = repo.put(DocumentKey::QuoteDraft, &big).await.unwrap_err();
        assert!(err.is_storage_unavailable());
        assert_eq!(repo.get(DocumentKey::QuoteDraft).await.unwrap(), json!({"a": 1}));
    }

    #[tokio::test]
    async fn test_read_only_refuses_every_write() {
        let repo = repo(WritePolicy {
            max_document_bytes: None,
            read_only: true,
        })
        .await;
        let err = repo.put(DocumentKey::SavedQuotes, &json!([])).await.unwrap_err();
        assert!(matches!(err, DbError::StorageUnavailable { ref key, .. } if key == "savedQuotes"));
        assert!(repo.remove(DocumentKey::SavedQuotes).await.is_err());
    }

    #[tokio::test]
    async fn test_put_many_is_all_or_nothing() {
        let repo = repo(WritePolicy {
            max_document_bytes: Some(64),
            read_only: false,
        })
        .await;
        let result = repo
            .put_many(&[
                (DocumentKey::Inventory, json!([])),
                (DocumentKey::SavedQuotes, json!(["y".repeat(100)])),
            ])
            .await;
        assert!(result.is_err());
        assert!(repo.fetch(DocumentKey::Inventory).await.unwrap().is_none());

        repo.put_many(&[
            (DocumentKey::Inventory, json!([])),
            (DocumentKey::SavedQuotes, json!([])),
        ])
        .await
        .unwrap();
        assert_eq!(repo.get(DocumentKey::Inventory).await.unwrap(), json!([]));
    }

    #[tokio::test]
    async fn test_save_accepts_slices() {
        let repo = repo(WritePolicy::default()).await;
        let categories = vec!["General".to_string(), "Lighting".to_string()];
        repo.save(DocumentKey::InventoryCategories, categories.as_slice())
            .await
            .unwrap();

        assert_eq!(
            repo.get(DocumentKey::InventoryCategories).await.unwrap(),
            json!(["General", "Lighting"])
        );
    }

    #[tokio::test]
    async fn test_remove_restores_default() {
        let repo = repo(WritePolicy::default()).await;
        repo.put(DocumentKey::PartsLibrary, &json!([{"partNumber": "QO120"}]))
            .await
            .unwrap();
        assert!(repo.remove(DocumentKey::PartsLibrary).await.unwrap());
        assert_eq!(repo.get(DocumentKey::PartsLibrary).await.unwrap(), json!([]));
    }
}
