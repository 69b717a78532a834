//! # External Mirror
//!
//! Copies the Document Store to and from the shared folder.
//!
//! ## Export Modes
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Mirror Export                                   │
//! │                                                                         │
//! │  collect snapshot from Document Store                                  │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  shared folder granted? ──no──────────────────────┐                    │
//! │       │ yes                                        │                    │
//! │       ▼                                            ▼                    │
//! │  DIRECT: <folder>/proposal-data-sync.json    MANUAL: <export dir>/...   │
//! │       │                                            ▲                    │
//! │       └──── write failed (logged) ─────────────────┘                    │
//! │                                                                         │
//! │  Files are written to a .tmp sibling and renamed into place, so a      │
//! │  reader never sees half a snapshot.                                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use quotekit_core::StorageSettings;
use quotekit_db::{DocumentKey, DocumentRepository};

use crate::config::SyncConfig;
use crate::error::{SyncError, SyncResult};
use crate::merge::{apply_import, ImportSummary};
use crate::snapshot::{
    backup_file_name, quotes_backup_file_name, ExportSnapshot, ImportFile, QuotesBackup,
    MIRROR_FILE_NAME,
};

// =============================================================================
// Export Outcome
// =============================================================================

/// Where an export ended up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "camelCase")]
pub enum ExportOutcome {
    /// Written straight into the shared folder.
    Direct { path: PathBuf },
    /// Written to the export directory for the user to place by hand.
    Manual {
        path: PathBuf,
        /// Shared folder the file is meant for, if one is recorded.
        target: Option<PathBuf>,
    },
}

impl ExportOutcome {
    pub fn path(&self) -> &Path {
        match self {
            ExportOutcome::Direct { path } | ExportOutcome::Manual { path, .. } => path,
        }
    }

    pub fn is_direct(&self) -> bool {
        matches!(self, ExportOutcome::Direct { .. })
    }
}

// =============================================================================
// Mirror
// =============================================================================

/// Reads and writes snapshots between the Document Store and the file system.
#[derive(Debug, Clone)]
pub struct Mirror {
    docs: DocumentRepository,
    config: Arc<SyncConfig>,
}

impl Mirror {
    pub fn new(docs: DocumentRepository, config: SyncConfig) -> Self {
        Mirror {
            docs,
            config: Arc::new(config),
        }
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    async fn storage_settings(&self) -> SyncResult<StorageSettings> {
        Ok(self.docs.load(DocumentKey::StorageSettings).await?)
    }

    /// The mirror file path, if a shared folder is granted.
    pub async fn mirror_path(&self) -> SyncResult<Option<PathBuf>> {
        let settings = self.storage_settings().await?;
        Ok(self
            .config
            .mirror_folder(&settings)
            .map(|folder| self.config.mirror_file(&folder)))
    }

    // =========================================================================
    // Export
    // =========================================================================

    /// Writes the snapshot into the shared folder.
    ///
    /// ## Returns
    /// * `Ok(path)` - File written
    /// * `Err(MirrorUnavailable)` - No folder granted
    /// * `Err(Io)` - The folder refused the write
    pub async fn push_direct(&self, now: DateTime<Utc>) -> SyncResult<PathBuf> {
        let path = self.mirror_path().await?.ok_or_else(|| {
            SyncError::MirrorUnavailable("no shared folder has been selected".into())
        })?;

        let json = ExportSnapshot::collect(&self.docs).await?.synced_at(now).to_json()?;
        write_atomic(&path, json.as_bytes()).await?;

        info!(path = %path.display(), bytes = json.len(), "Snapshot written to shared folder");
        Ok(path)
    }

    /// Exports to the shared folder, falling back to a manual file.
    ///
    /// A failed direct write is logged and never returned; only a failure of
    /// the manual fallback is an error.
    pub async fn push(&self, now: DateTime<Utc>) -> SyncResult<ExportOutcome> {
        match self.push_direct(now).await {
            Ok(path) => return Ok(ExportOutcome::Direct { path }),
            Err(SyncError::MirrorUnavailable(reason)) => {
                debug!(%reason, "Direct mode unavailable, writing manual export");
            }
            Err(err @ SyncError::Storage(_)) => return Err(err),
            Err(err) => {
                warn!(error = %err, "Direct write failed, falling back to manual export");
            }
        }

        // A path recorded without granted access is still reported as the target.
        let settings = self.storage_settings().await?;
        let target = self.config.mirror_folder(&settings).or_else(|| {
            let typed = settings.shared_storage_path.trim();
            (!typed.is_empty()).then(|| PathBuf::from(typed))
        });
        let json = ExportSnapshot::collect(&self.docs).await?.synced_at(now).to_json()?;
        let path = self.config.export_dir().join(self.config.mirror.file_name.trim());
        write_atomic(&path, json.as_bytes()).await?;

        info!(path = %path.display(), "Mirror snapshot written for manual placement");
        Ok(ExportOutcome::Manual { path, target })
    }

    /// Writes a manual full export into the export directory.
    ///
    /// Named after the mirror file when a shared folder is recorded, so it
    /// can be dropped straight in; otherwise a dated backup name.
    pub async fn export_backup(&self, now: DateTime<Utc>) -> SyncResult<PathBuf> {
        let settings = self.storage_settings().await?;
        let file_name = if settings.shared_storage_path.trim().is_empty() {
            backup_file_name(now.date_naive())
        } else {
            MIRROR_FILE_NAME.to_string()
        };

        let json = ExportSnapshot::collect(&self.docs).await?.exported_at(now).to_json()?;
        let path = self.config.export_dir().join(file_name);
        write_atomic(&path, json.as_bytes()).await?;

        info!(path = %path.display(), "Full export written");
        Ok(path)
    }

    /// Writes the quotes backup into the export directory.
    pub async fn export_quotes(&self, now: DateTime<Utc>) -> SyncResult<PathBuf> {
        let backup = QuotesBackup::collect(&self.docs, now).await?;
        let path = self
            .config
            .export_dir()
            .join(quotes_backup_file_name(now.date_naive()));
        write_atomic(&path, backup.to_json()?.as_bytes()).await?;

        info!(path = %path.display(), quotes = backup.quotes.len(), "Quotes backup written");
        Ok(path)
    }

    // =========================================================================
    // Import
    // =========================================================================

    /// Reads the mirror file from the shared folder and merges it.
    pub async fn pull(&self) -> SyncResult<ImportSummary> {
        let path = self.mirror_path().await?.ok_or_else(|| {
            SyncError::MirrorUnavailable("no shared folder has been selected".into())
        })?;

        let text = match tokio::fs::read_to_string(&path).await {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(SyncError::MirrorUnavailable(format!(
                    "no sync file found at {}",
                    path.display()
                )));
            }
            Err(e) => return Err(SyncError::io(&path, e)),
        };

        info!(path = %path.display(), "Pulling snapshot from shared folder");
        apply_import(&self.docs, ImportFile::parse(&text)?).await
    }

    /// Imports a file picked by the user.
    pub async fn import_file(&self, path: &Path) -> SyncResult<ImportSummary> {
        let text = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| SyncError::io(path, e))?;
        let file = ImportFile::parse(&text)?;
        info!(path = %path.display(), kind = %file.kind(), "Importing file");
        apply_import(&self.docs, file).await
    }
}

/// Writes `bytes` to a temporary sibling and renames it over `path`.
async fn write_atomic(path: &Path, bytes: &[u8]) -> SyncResult<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| SyncError::io(parent, e))?;
        }
    }

    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    tokio::fs::write(&tmp, bytes)
        .await
        .map_err(|e| SyncError::io(&tmp, e))?;
    tokio::fs::rename(&tmp, path)
        .await
        .map_err(|e| SyncError::io(path, e))
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use quotekit_db::{Database, DbConfig};
    use tempfile::TempDir;

    async fn mirror_with(dir: &TempDir, shared: Option<&Path>) -> (Database, Mirror) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        if let Some(folder) = shared {
            let settings = StorageSettings {
                shared_storage_path: folder.display().to_string(),
                has_directory_handle: true,
                ..StorageSettings::default()
            };
            db.documents()
                .save(DocumentKey::StorageSettings, &settings)
                .await
                .unwrap();
        }
        let mut config = SyncConfig::default();
        config.export.dir = Some(dir.path().join("downloads"));
        let mirror = Mirror::new(db.documents(), config);
        (db, mirror)
    }

    #[tokio::test]
    async fn test_push_without_folder_is_manual() {
        let dir = TempDir::new().unwrap();
        let (_db, mirror) = mirror_with(&dir, None).await;

        let outcome = mirror.push(Utc::now()).await.unwrap();
        assert!(!outcome.is_direct());
        assert_eq!(
            outcome.path(),
            dir.path().join("downloads").join("proposal-data-sync.json")
        );
        assert!(outcome.path().exists());
    }

    #[tokio::test]
    async fn test_push_direct_writes_mirror_file() {
        let dir = TempDir::new().unwrap();
        let shared = dir.path().join("shared");
        let (_db, mirror) = mirror_with(&dir, Some(&shared)).await;

        let outcome = mirror.push(Utc::now()).await.unwrap();
        assert!(outcome.is_direct());

        let text = std::fs::read_to_string(shared.join("proposal-data-sync.json")).unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["version"], "1.0");
        assert!(value["lastSynced"].is_string());
        assert!(value.get("exportDate").is_none());
        assert!(!shared.join("proposal-data-sync.json.tmp").exists());
    }

    #[tokio::test]
    async fn test_unwritable_folder_falls_back_to_manual() {
        let dir = TempDir::new().unwrap();
        // a regular file where the folder should be
        let blocker = dir.path().join("not-a-folder");
        std::fs::write(&blocker, b"x").unwrap();
        let (_db, mirror) = mirror_with(&dir, Some(&blocker)).await;

        let outcome = mirror.push(Utc::now()).await.unwrap();
        assert_eq!(
            outcome,
            ExportOutcome::Manual {
                path: dir.path().join("downloads").join("proposal-data-sync.json"),
                target: Some(blocker),
            }
        );
    }

    #[tokio::test]
    async fn test_pull_reports_missing_file() {
        let dir = TempDir::new().unwrap();
        let shared = dir.path().join("shared");
        std::fs::create_dir_all(&shared).unwrap();
        let (_db, mirror) = mirror_with(&dir, Some(&shared)).await;

        let err = mirror.pull().await.unwrap_err();
        assert!(matches!(err, SyncError::MirrorUnavailable(ref m) if m.contains("no sync file")));
    }

    #[tokio::test]
    async fn test_backup_names() {
        let dir = TempDir::new().unwrap();
        let (_db, mirror) = mirror_with(&dir, None).await;
        let now = "2025-01-31T15:00:00Z".parse::<DateTime<Utc>>().unwrap();

        let full = mirror.export_backup(now).await.unwrap();
        assert!(full.ends_with("proposal-data-backup-2025-01-31.json"));
        let text = std::fs::read_to_string(&full).unwrap();
        assert!(text.contains("\"exportDate\""));

        let quotes = mirror.export_quotes(now).await.unwrap();
        assert!(quotes.ends_with("quotes-backup-2025-01-31.json"));
    }
}
