//! # Sync Configuration
//!
//! Configuration management for the External Mirror.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     QUOTEKIT_MIRROR_DIR=/mnt/share/quotes                              │
//! │     QUOTEKIT_EXPORT_DIR=~/Desktop                                      │
//! │                                                                         │
//! │  2. Document Store (storageSettings document)                          │
//! │     Shared folder chosen in the app                                    │
//! │                                                                         │
//! │  3. TOML Config File                                                   │
//! │     ~/.config/quotekit/sync.toml (Linux)                               │
//! │     ~/Library/Application Support/com.quotekit.quotekit/sync.toml      │
//! │                                                                         │
//! │  4. Default Values (lowest priority)                                   │
//! │     proposal-data-sync.json, 250 ms coalesce window, downloads dir     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! # sync.toml
//! [mirror]
//! folder = "/mnt/share/quotes"   # overrides storageSettings
//! file_name = "proposal-data-sync.json"
//!
//! [auto_sync]
//! coalesce_window_ms = 250
//! max_retries = 3
//! initial_backoff_ms = 500
//! max_backoff_secs = 30
//!
//! [export]
//! dir = "/home/me/Downloads"
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

use quotekit_core::StorageSettings;

use crate::error::{SyncError, SyncResult};
use crate::snapshot::MIRROR_FILE_NAME;

/// Longest coalesce window accepted (one minute).
const MAX_COALESCE_WINDOW_MS: u64 = 60_000;

// =============================================================================
// Mirror Settings
// =============================================================================

/// Where the mirror file lives.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MirrorSettings {
    /// Shared folder used instead of the one stored in `storageSettings`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub folder: Option<PathBuf>,

    /// Name of the mirror file inside the folder.
    #[serde(default = "default_file_name")]
    pub file_name: String,
}

fn default_file_name() -> String {
    MIRROR_FILE_NAME.to_string()
}

impl Default for MirrorSettings {
    fn default() -> Self {
        MirrorSettings {
            folder: None,
            file_name: default_file_name(),
        }
    }
}

// =============================================================================
// Auto-Sync Settings
// =============================================================================

/// Background export queue tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AutoSyncSettings {
    /// Requests arriving within this window collapse into one export.
    #[serde(default = "default_coalesce_window")]
    pub coalesce_window_ms: u64,

    /// Retries after the first failed attempt. 0 disables retrying.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Initial backoff duration (milliseconds).
    #[serde(default = "default_initial_backoff")]
    pub initial_backoff_ms: u64,

    /// Maximum backoff duration (seconds).
    #[serde(default = "default_max_backoff")]
    pub max_backoff_secs: u64,
}

fn default_coalesce_window() -> u64 {
    250
}
fn default_max_retries() -> u32 {
    3
}
fn default_initial_backoff() -> u64 {
    500
}
fn default_max_backoff() -> u64 {
    30
}

impl Default for AutoSyncSettings {
    fn default() -> Self {
        AutoSyncSettings {
            coalesce_window_ms: default_coalesce_window(),
            max_retries: default_max_retries(),
            initial_backoff_ms: default_initial_backoff(),
            max_backoff_secs: default_max_backoff(),
        }
    }
}

impl AutoSyncSettings {
    pub fn coalesce_window(&self) -> Duration {
        Duration::from_millis(self.coalesce_window_ms)
    }

    pub fn initial_backoff(&self) -> Duration {
        Duration::from_millis(self.initial_backoff_ms)
    }

    pub fn max_backoff(&self) -> Duration {
        Duration::from_secs(self.max_backoff_secs)
    }
}

// =============================================================================
// Export Settings
// =============================================================================

/// Manual-mode output location.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExportSettings {
    /// Directory receiving manual exports and backups.
    /// Default: the user's download directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dir: Option<PathBuf>,
}

// =============================================================================
// Main Sync Configuration
// =============================================================================

/// Complete sync configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SyncConfig {
    #[serde(default)]
    pub mirror: MirrorSettings,

    #[serde(default)]
    pub auto_sync: AutoSyncSettings,

    #[serde(default)]
    pub export: ExportSettings,
}

impl SyncConfig {
    /// Creates a new config with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (sync.toml)
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> SyncResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading sync config from file");
                let contents = std::fs::read_to_string(&path)
                    .map_err(|e| SyncError::ConfigLoadFailed(e.to_string()))?;
                config = toml::from_str(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Loads config or returns default if load fails.
    pub fn load_or_default(config_path: Option<PathBuf>) -> Self {
        Self::load(config_path).unwrap_or_else(|e| {
            warn!("Failed to load sync config: {}. Using defaults.", e);
            Self::default()
        })
    }

    /// Saves configuration to file.
    pub fn save(&self, config_path: Option<PathBuf>) -> SyncResult<()> {
        let path = config_path
            .or_else(Self::default_config_path)
            .ok_or_else(|| SyncError::ConfigSaveFailed("No config path available".into()))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| SyncError::ConfigSaveFailed(e.to_string()))?;
        }

        let contents = toml::to_string_pretty(self)?;
        std::fs::write(&path, contents).map_err(|e| SyncError::ConfigSaveFailed(e.to_string()))?;

        info!(?path, "Sync config saved");
        Ok(())
    }

    /// Validates the configuration.
    pub fn validate(&self) -> SyncResult<()> {
        let name = self.mirror.file_name.trim();
        if name.is_empty() {
            return Err(SyncError::InvalidConfig("mirror.file_name is empty".into()));
        }
        if name.contains('/') || name.contains('\\') {
            return Err(SyncError::InvalidConfig(format!(
                "mirror.file_name must be a bare file name, got: {}",
                name
            )));
        }
        if !name.ends_with(".json") {
            return Err(SyncError::InvalidConfig(format!(
                "mirror.file_name must end in .json, got: {}",
                name
            )));
        }

        if self.auto_sync.coalesce_window_ms > MAX_COALESCE_WINDOW_MS {
            return Err(SyncError::InvalidConfig(format!(
                "auto_sync.coalesce_window_ms must be at most {}",
                MAX_COALESCE_WINDOW_MS
            )));
        }
        if self.auto_sync.initial_backoff_ms == 0 || self.auto_sync.max_backoff_secs == 0 {
            return Err(SyncError::InvalidConfig(
                "auto_sync backoff durations must be greater than 0".into(),
            ));
        }

        Ok(())
    }

    /// Applies environment variable overrides.
    fn apply_env_overrides(&mut self) {
        if let Ok(dir) = std::env::var("QUOTEKIT_MIRROR_DIR") {
            debug!(dir = %dir, "Overriding mirror folder from environment");
            self.mirror.folder = Some(PathBuf::from(dir));
        }

        if let Ok(name) = std::env::var("QUOTEKIT_MIRROR_FILE") {
            self.mirror.file_name = name;
        }

        if let Ok(dir) = std::env::var("QUOTEKIT_EXPORT_DIR") {
            debug!(dir = %dir, "Overriding export directory from environment");
            self.export.dir = Some(PathBuf::from(dir));
        }

        if let Ok(window) = std::env::var("QUOTEKIT_SYNC_COALESCE_MS") {
            match window.parse::<u64>() {
                Ok(ms) => self.auto_sync.coalesce_window_ms = ms,
                Err(_) => warn!(value = %window, "Ignoring invalid QUOTEKIT_SYNC_COALESCE_MS"),
            }
        }

        if let Ok(retries) = std::env::var("QUOTEKIT_SYNC_MAX_RETRIES") {
            if let Ok(r) = retries.parse::<u32>() {
                self.auto_sync.max_retries = r;
            }
        }
    }

    /// Returns the default config file path.
    fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "quotekit", "quotekit")
            .map(|dirs| dirs.config_dir().join("sync.toml"))
    }

    // =========================================================================
    // Convenience Methods
    // =========================================================================

    /// Folder the mirror file is written to, if any.
    ///
    /// The config override wins over the folder stored in `storageSettings`.
    pub fn mirror_folder(&self, settings: &StorageSettings) -> Option<PathBuf> {
        self.mirror
            .folder
            .clone()
            .or_else(|| settings.shared_folder().map(PathBuf::from))
    }

    /// Full path of the mirror file inside `folder`.
    pub fn mirror_file(&self, folder: &Path) -> PathBuf {
        folder.join(self.mirror.file_name.trim())
    }

    /// Directory receiving manual exports.
    pub fn export_dir(&self) -> PathBuf {
        self.export
            .dir
            .clone()
            .or_else(|| {
                directories::UserDirs::new()
                    .and_then(|dirs| dirs.download_dir().map(Path::to_path_buf))
            })
            .unwrap_or_else(|| PathBuf::from("."))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = SyncConfig::default();
        assert_eq!(config.mirror.file_name, "proposal-data-sync.json");
        assert_eq!(config.auto_sync.coalesce_window(), Duration::from_millis(250));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut config = SyncConfig::default();

        config.mirror.file_name = "../escape.json".to_string();
        assert!(config.validate().unwrap_err().is_config_error());

        config.mirror.file_name = "sync.txt".to_string();
        assert!(config.validate().is_err());

        config.mirror.file_name = "team-sync.json".to_string();
        assert!(config.validate().is_ok());

        config.auto_sync.coalesce_window_ms = 120_000;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_mirror_folder_precedence() {
        let settings = StorageSettings {
            shared_storage_path: "/mnt/share".to_string(),
            has_directory_handle: true,
            ..StorageSettings::default()
        };
        let mut config = SyncConfig::default();
        assert_eq!(config.mirror_folder(&settings), Some(PathBuf::from("/mnt/share")));

        config.mirror.folder = Some(PathBuf::from("/srv/quotes"));
        assert_eq!(config.mirror_folder(&settings), Some(PathBuf::from("/srv/quotes")));

        config.mirror.folder = None;
        assert_eq!(config.mirror_folder(&StorageSettings::default()), None);
    }

    #[test]
    fn test_toml_round_trip() {
        let toml_str = r#"
            [mirror]
            folder = "/srv/quotes"

            [auto_sync]
            max_retries = 0
        "#;
        let config: SyncConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.mirror.folder, Some(PathBuf::from("/srv/quotes")));
        assert_eq!(config.mirror.file_name, "proposal-data-sync.json");
        assert_eq!(config.auto_sync.max_retries, 0);
        assert_eq!(config.auto_sync.initial_backoff_ms, 500);

        let written = toml::to_string_pretty(&config).unwrap();
        assert!(written.contains("[mirror]"));
        assert!(written.contains("[auto_sync]"));
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("sync.toml");

        let mut config = SyncConfig::default();
        config.export.dir = Some(dir.path().to_path_buf());
        config.auto_sync.coalesce_window_ms = 40;
        config.save(Some(path.clone())).unwrap();

        let loaded = SyncConfig::load(Some(path)).unwrap();
        assert_eq!(loaded.auto_sync.coalesce_window_ms, 40);
        assert_eq!(loaded.export_dir(), dir.path());
    }
}
