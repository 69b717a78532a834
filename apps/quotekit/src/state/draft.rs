//! # Draft Debouncer
//!
//! Collapses rapid form edits into one recalculation after a quiet period.
//!
//! ```text
//!   edit ─┐   edit ─┐   edit ─┐
//!         ▼         ▼         ▼
//!   ──────●─────────●─────────●──────── quiet period ───► save_draft(latest)
//!         └ superseded ┘ superseded      (recalculate + persist quoteDraft)
//! ```
//!
//! Recalculation is idempotent, so an extra run is harmless; the debounce
//! only saves work.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::{mpsc, watch};
use tracing::{debug, warn};

use quotekit_core::{Money, QuoteSnapshot};

use crate::state::AppState;

/// Default quiet period before a draft is recalculated.
pub const DEFAULT_QUIET_PERIOD: Duration = Duration::from_millis(300);

const EDIT_BUFFER: usize = 64;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftStatus {
    /// Recalculations that ran.
    pub recalculations: u64,
    /// Edits replaced by a later edit before the quiet period ended.
    pub superseded: u64,
    /// Grand total of the last saved draft.
    pub grand_total: Option<Money>,
    pub last_error: Option<String>,
}

/// Sender side of the debouncer.
#[derive(Debug, Clone)]
pub struct DraftHandle {
    edit_tx: mpsc::Sender<QuoteSnapshot>,
    status_rx: watch::Receiver<DraftStatus>,
}

impl DraftHandle {
    /// Submits the current form content.
    pub async fn update(&self, snapshot: QuoteSnapshot) -> bool {
        self.edit_tx.send(snapshot).await.is_ok()
    }

    pub fn status(&self) -> DraftStatus {
        self.status_rx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<DraftStatus> {
        self.status_rx.clone()
    }
}

pub struct DraftDebouncer {
    state: Arc<AppState>,
    quiet: Duration,
    status_tx: watch::Sender<DraftStatus>,
}

impl DraftDebouncer {
    pub fn new(state: Arc<AppState>, quiet: Duration) -> Self {
        let (status_tx, _) = watch::channel(DraftStatus::default());
        DraftDebouncer {
            state,
            quiet,
            status_tx,
        }
    }

    /// Spawns the debouncer. It stops when every handle is dropped, after
    /// saving the last pending edit.
    pub fn start(self) -> DraftHandle {
        let (edit_tx, edit_rx) = mpsc::channel(EDIT_BUFFER);
        let status_rx = self.status_tx.subscribe();
        tokio::spawn(self.run(edit_rx));
        DraftHandle { edit_tx, status_rx }
    }

    async fn run(self, mut edit_rx: mpsc::Receiver<QuoteSnapshot>) {
        while let Some(mut latest) = edit_rx.recv().await {
            loop {
                match tokio::time::timeout(self.quiet, edit_rx.recv()).await {
                    Ok(Some(newer)) => {
                        latest = newer;
                        self.status_tx.send_modify(|s| s.superseded += 1);
                    }
                    // Quiet period elapsed, or the last handle is gone.
                    Err(_) | Ok(None) => break,
                }
            }

            match self.state.save_draft(latest).await {
                Ok(saved) => {
                    debug!(grand_total = %saved.grand_total, "Draft recalculated");
                    self.status_tx.send_modify(|s| {
                        s.recalculations += 1;
                        s.grand_total = Some(saved.grand_total);
                        s.last_error = None;
                    });
                }
                Err(err) => {
                    // The edit stays in memory as a dirty key.
                    warn!(error = %err, "Draft recalculated but not stored");
                    self.status_tx.send_modify(|s| {
                        s.recalculations += 1;
                        s.last_error = Some(err.message.clone());
                    });
                }
            }
        }
    }
}
