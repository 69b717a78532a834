//! # Sync Commands
//!
//! Manual export/import and shared-folder mirroring.

use std::path::{Path, PathBuf};

use tracing::info;

use quotekit_sync::{ExportOutcome, ImportSummary};

use crate::error::ApiResult;
use crate::state::AppState;

pub async fn export_backup(state: &AppState) -> ApiResult<PathBuf> {
    let path = state.export_backup().await?;
    info!(path = %path.display(), "Backup written");
    Ok(path)
}

pub async fn backup_quotes(state: &AppState) -> ApiResult<PathBuf> {
    let path = state.export_quotes().await?;
    info!(path = %path.display(), "Quotes backup written");
    Ok(path)
}

pub async fn import_file(state: &AppState, path: &Path) -> ApiResult<ImportSummary> {
    state.import_file(path).await
}

/// Writes the mirror file. A manual outcome means the shared folder was
/// not writable and the file must be copied there by hand.
pub async fn sync_push(state: &AppState) -> ApiResult<ExportOutcome> {
    let outcome = state.sync_push().await?;
    if let ExportOutcome::Manual { path, target } = &outcome {
        match target {
            Some(target) => info!(
                path = %path.display(),
                target = %target.display(),
                "Shared folder unavailable, copy the file manually"
            ),
            None => info!(path = %path.display(), "No shared folder set, file exported"),
        }
    }
    Ok(outcome)
}

pub async fn sync_pull(state: &AppState) -> ApiResult<ImportSummary> {
    state.sync_pull().await
}
