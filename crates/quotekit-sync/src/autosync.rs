//! # Auto-Sync Queue
//!
//! Background task that mirrors the Document Store after local writes.
//!
//! ## Queue Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         AutoSync Worker                                 │
//! │                                                                         │
//! │   put(key) ──► handle.request() ──► mpsc ──┐                            │
//! │   put(key) ──► handle.request() ──► mpsc ──┤                            │
//! │                                            ▼                            │
//! │   Idle ──request──► Pending ── coalesce window (further requests        │
//! │                        │       collapse into this run)                  │
//! │                        ▼                                                │
//! │                  mirror.push_direct()                                   │
//! │                   │            │                                        │
//! │                  ok        retryable error ── backoff ── try again      │
//! │                   │            │ (max_retries reached / not retryable)  │
//! │                   ▼            ▼                                        │
//! │          Succeeded{at}    Failed{at, error}                             │
//! │                                                                         │
//! │   Status is published on a watch channel. The local write that         │
//! │   triggered the request is never rolled back.                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use backoff::backoff::Backoff;
use backoff::ExponentialBackoff;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, watch};
use tracing::{debug, error, info, warn};

use crate::config::AutoSyncSettings;
use crate::error::{SyncError, SyncResult};
use crate::mirror::Mirror;

/// Command channel capacity; a full channel already holds a pending request.
const COMMAND_BUFFER: usize = 32;

// =============================================================================
// Status
// =============================================================================

/// State of the most recent auto-sync run.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "camelCase")]
pub enum AutoSyncState {
    #[default]
    Idle,
    Pending,
    Succeeded { at: DateTime<Utc> },
    Failed { at: DateTime<Utc>, error: String },
}

/// Observable auto-sync status.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AutoSyncStatus {
    pub state: AutoSyncState,
    /// Runs that wrote the mirror file.
    pub completed: u64,
    /// Runs that gave up.
    pub failed: u64,
    /// Requests absorbed into an already pending run.
    pub coalesced: u64,
}

impl AutoSyncStatus {
    pub fn is_pending(&self) -> bool {
        self.state == AutoSyncState::Pending
    }
}

// =============================================================================
// Handle
// =============================================================================

#[derive(Debug)]
enum AutoSyncCommand {
    Request,
    Shutdown,
}

/// Handle for queueing exports and watching their outcome.
#[derive(Debug, Clone)]
pub struct AutoSyncHandle {
    cmd_tx: mpsc::Sender<AutoSyncCommand>,
    status_rx: watch::Receiver<AutoSyncStatus>,
}

impl AutoSyncHandle {
    /// Queues an export. Never waits.
    ///
    /// ## Returns
    /// * `Ok(())` - Queued, or folded into a run that is already queued
    /// * `Err(ShuttingDown)` - The worker has stopped
    pub fn request(&self) -> SyncResult<()> {
        match self.cmd_tx.try_send(AutoSyncCommand::Request) {
            Ok(()) | Err(mpsc::error::TrySendError::Full(_)) => Ok(()),
            Err(mpsc::error::TrySendError::Closed(_)) => Err(SyncError::ShuttingDown),
        }
    }

    /// Returns the current status.
    pub fn status(&self) -> AutoSyncStatus {
        self.status_rx.borrow().clone()
    }

    /// Subscribes to status changes.
    pub fn subscribe(&self) -> watch::Receiver<AutoSyncStatus> {
        self.status_rx.clone()
    }

    /// Stops the worker after it finishes any pending export.
    pub async fn shutdown(&self) -> SyncResult<()> {
        self.cmd_tx
            .send(AutoSyncCommand::Shutdown)
            .await
            .map_err(|_| SyncError::ChannelError("Auto-sync command channel closed".into()))?;

        // The worker drops its sender when it exits.
        let mut rx = self.status_rx.clone();
        while rx.changed().await.is_ok() {}
        Ok(())
    }
}

// =============================================================================
// Worker
// =============================================================================

/// The auto-sync background worker.
pub struct AutoSync {
    mirror: Mirror,
    settings: AutoSyncSettings,
    status_tx: watch::Sender<AutoSyncStatus>,
}

impl AutoSync {
    pub fn new(mirror: Mirror, settings: AutoSyncSettings) -> Self {
        let (status_tx, _) = watch::channel(AutoSyncStatus::default());
        AutoSync {
            mirror,
            settings,
            status_tx,
        }
    }

    /// Spawns the worker and returns its handle.
    pub fn start(self) -> AutoSyncHandle {
        let (cmd_tx, cmd_rx) = mpsc::channel(COMMAND_BUFFER);
        let status_rx = self.status_tx.subscribe();

        tokio::spawn(self.run(cmd_rx));

        AutoSyncHandle { cmd_tx, status_rx }
    }

    async fn run(self, mut cmd_rx: mpsc::Receiver<AutoSyncCommand>) {
        info!(
            window_ms = self.settings.coalesce_window_ms,
            max_retries = self.settings.max_retries,
            "Auto-sync worker started"
        );

        while let Some(cmd) = cmd_rx.recv().await {
            if matches!(cmd, AutoSyncCommand::Shutdown) {
                break;
            }

            self.status_tx
                .send_modify(|s| s.state = AutoSyncState::Pending);

            let stop = self.coalesce(&mut cmd_rx).await;
            self.export_with_retry().await;

            if stop {
                break;
            }
        }

        info!("Auto-sync worker stopped");
    }

    /// Absorbs requests until the window closes. Returns true on shutdown.
    async fn coalesce(&self, cmd_rx: &mut mpsc::Receiver<AutoSyncCommand>) -> bool {
        let window = tokio::time::sleep(self.settings.coalesce_window());
        tokio::pin!(window);

        loop {
            tokio::select! {
                _ = &mut window => return false,
                cmd = cmd_rx.recv() => match cmd {
                    Some(AutoSyncCommand::Request) => {
                        self.status_tx.send_modify(|s| s.coalesced += 1);
                    }
                    Some(AutoSyncCommand::Shutdown) | None => {
                        debug!("Shutdown during coalesce window, flushing");
                        return true;
                    }
                },
            }
        }
    }

    async fn export_with_retry(&self) {
        let mut backoff = self.create_backoff();
        let mut attempt = 0u32;

        loop {
            attempt += 1;
            let err = match self.mirror.push_direct(Utc::now()).await {
                Ok(path) => {
                    debug!(path = %path.display(), attempt, "Auto-sync export succeeded");
                    self.status_tx.send_modify(|s| {
                        s.state = AutoSyncState::Succeeded { at: Utc::now() };
                        s.completed += 1;
                    });
                    return;
                }
                Err(err) => err,
            };

            let retries_left = attempt <= self.settings.max_retries;
            let delay = if err.is_retryable() && retries_left {
                backoff.next_backoff()
            } else {
                None
            };

            match delay {
                Some(duration) => {
                    warn!(error = %err, attempt, ?duration, "Auto-sync export failed, retrying");
                    tokio::time::sleep(duration).await;
                }
                None => {
                    let reported = if err.is_retryable() {
                        SyncError::RetriesExhausted {
                            attempts: attempt,
                            last_error: err.to_string(),
                        }
                    } else {
                        err
                    };
                    error!(error = %reported, "Auto-sync export failed");
                    self.status_tx.send_modify(|s| {
                        s.state = AutoSyncState::Failed {
                            at: Utc::now(),
                            error: reported.to_string(),
                        };
                        s.failed += 1;
                    });
                    return;
                }
            }
        }
    }

    /// Creates the exponential backoff configuration.
    fn create_backoff(&self) -> ExponentialBackoff {
        ExponentialBackoff {
            initial_interval: self.settings.initial_backoff(),
            max_interval: self.settings.max_backoff(),
            multiplier: 2.0,
            max_elapsed_time: None,
            ..Default::default()
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SyncConfig;
    use quotekit_core::StorageSettings;
    use quotekit_db::{Database, DbConfig, DocumentKey};
    use std::path::Path;
    use std::time::Duration;
    use tempfile::TempDir;

    fn fast_settings(max_retries: u32) -> AutoSyncSettings {
        AutoSyncSettings {
            coalesce_window_ms: 50,
            max_retries,
            initial_backoff_ms: 5,
            max_backoff_secs: 1,
        }
    }

    async fn worker(folder: &Path, settings: AutoSyncSettings) -> (Database, AutoSyncHandle) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let storage = StorageSettings {
            shared_storage_path: folder.display().to_string(),
            auto_sync_enabled: true,
            has_directory_handle: true,
            ..StorageSettings::default()
        };
        db.documents()
            .save(DocumentKey::StorageSettings, &storage)
            .await
            .unwrap();
        let mirror = Mirror::new(db.documents(), SyncConfig::default());
        (db, AutoSync::new(mirror, settings).start())
    }

    async fn settled(handle: &AutoSyncHandle) -> AutoSyncStatus {
        let mut rx = handle.subscribe();
        let status = tokio::time::timeout(
            Duration::from_secs(5),
            rx.wait_for(|s| matches!(s.state, AutoSyncState::Succeeded { .. } | AutoSyncState::Failed { .. })),
        )
        .await
        .expect("auto-sync did not settle")
        .unwrap()
        .clone();
        status
    }

    #[tokio::test]
    async fn test_burst_of_requests_is_one_export() {
        let dir = TempDir::new().unwrap();
        let (_db, handle) = worker(dir.path(), fast_settings(0)).await;
        assert_eq!(handle.status().state, AutoSyncState::Idle);

        for _ in 0..3 {
            handle.request().unwrap();
        }

        let status = settled(&handle).await;
        assert_eq!(status.completed, 1);
        assert_eq!(status.coalesced, 2);
        assert!(dir.path().join("proposal-data-sync.json").exists());
    }

    #[tokio::test]
    async fn test_failed_export_is_retried_then_reported() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("file-not-folder");
        std::fs::write(&blocker, b"x").unwrap();
        let (_db, handle) = worker(&blocker, fast_settings(2)).await;

        handle.request().unwrap();
        let status = settled(&handle).await;

        assert_eq!(status.failed, 1);
        assert_eq!(status.completed, 0);
        let AutoSyncState::Failed { error, .. } = status.state else {
            panic!("expected failure");
        };
        assert!(error.contains("after 3 attempts"), "{}", error);
    }

    #[tokio::test]
    async fn test_shutdown_flushes_pending_request() {
        let dir = TempDir::new().unwrap();
        let mut settings = fast_settings(0);
        settings.coalesce_window_ms = 10_000;
        let (_db, handle) = worker(dir.path(), settings).await;

        handle.request().unwrap();
        handle.shutdown().await.unwrap();

        assert_eq!(handle.status().completed, 1);
        assert!(matches!(handle.request(), Err(SyncError::ShuttingDown)));
    }

    #[test]
    fn test_status_json_shape() {
        let status = AutoSyncStatus {
            state: AutoSyncState::Failed {
                at: "2025-01-01T00:00:00Z".parse().unwrap(),
                error: "disk full".into(),
            },
            completed: 2,
            failed: 1,
            coalesced: 0,
        };
        let value = serde_json::to_value(&status).unwrap();
        assert_eq!(value["state"]["state"], "failed");
        assert_eq!(value["state"]["error"], "disk full");
        assert_eq!(value["completed"], 2);
    }
}
