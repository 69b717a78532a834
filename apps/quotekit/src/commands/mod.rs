//! # CLI Commands
//!
//! Every subcommand is a thin handler over [`AppState`]: parse arguments,
//! call one state-manager method, return a serializable result.
//!
//! ## Command Organization
//! ```text
//! commands/
//! ├── mod.rs        ◄─── You are here (argument parsing, dispatch)
//! ├── inventory.rs  ◄─── Inventory listing
//! ├── quotes.rs     ◄─── Quote listing and approval
//! └── sync.rs       ◄─── Export, import, mirror push/pull, backups
//! ```
//!
//! ## Command Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  $ quotekit approve QT-20250101-001 --confirm                           │
//! │         │                                                               │
//! │         ▼                                                               │
//! │  Cli::parse() ──► Command::Approve { quote_number, confirm: true }      │
//! │         │                                                               │
//! │         ▼                                                               │
//! │  quotes::approve(&state, ..) -> ApiResult<ApprovalReport>               │
//! │         │                                                               │
//! │         ▼                                                               │
//! │  stdout: JSON result        stderr: {"code": "...", "message": "..."}   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

pub mod inventory;
pub mod quotes;
pub mod sync;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use serde::Serialize;
use serde_json::Value;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

#[derive(Debug, Parser)]
#[command(name = "quotekit")]
#[command(about = "Quotes, inventory and shared-folder sync for contractors")]
#[command(version)]
pub struct Cli {
    /// Database file (default: QUOTEKIT_DB_PATH, then the platform data dir)
    #[arg(long, global = true)]
    pub database: Option<PathBuf>,

    /// Sync settings file (default: sync.toml in the platform config dir)
    #[arg(long, global = true)]
    pub sync_config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum Command {
    /// Write a full backup file to the export directory
    Export,

    /// Merge a backup, inventory or quotes file
    Import {
        /// File to import
        file: PathBuf,
    },

    /// Write the shared-folder mirror file
    SyncPush,

    /// Merge the shared-folder mirror file
    SyncPull,

    /// List saved quotes
    Quotes,

    /// Approve the latest revision and deduct stock
    Approve {
        /// Quote number (e.g., "QT-20250101-001")
        quote_number: String,

        /// Approve again even though the revision was already approved
        #[arg(long)]
        confirm: bool,
    },

    /// List inventory items
    Inventory {
        /// Matches name, model or description
        search: Option<String>,
    },

    /// Write a quotes-only backup file
    BackupQuotes,
}

impl Command {
    /// Runs the command and returns its JSON result.
    pub async fn execute(self, state: &AppState) -> ApiResult<Value> {
        match self {
            Command::Export => to_json(sync::export_backup(state).await?),
            Command::Import { file } => to_json(sync::import_file(state, &file).await?),
            Command::SyncPush => to_json(sync::sync_push(state).await?),
            Command::SyncPull => to_json(sync::sync_pull(state).await?),
            Command::Quotes => to_json(quotes::list_quotes(state).await),
            Command::Approve {
                quote_number,
                confirm,
            } => to_json(quotes::approve(state, &quote_number, confirm).await?),
            Command::Inventory { search } => {
                let search = search.unwrap_or_default();
                to_json(inventory::list_inventory(state, &search).await)
            }
            Command::BackupQuotes => to_json(sync::backup_quotes(state).await?),
        }
    }
}

fn to_json<T: Serialize>(value: T) -> ApiResult<Value> {
    serde_json::to_value(value).map_err(|e| ApiError::internal(e.to_string()))
}
