//! # QuoteKit App Library
//!
//! State manager, API error mapping and command handlers behind the
//! `quotekit` binary.
//!
//! ## Module Organization
//! ```text
//! quotekit_app/
//! ├── lib.rs            ◄─── You are here (startup & run)
//! ├── state/
//! │   ├── mod.rs        ◄─── State exports
//! │   ├── workspace.rs  ◄─── In-memory aggregates + dirty keys
//! │   ├── manager.rs    ◄─── AppState: every mutation goes through here
//! │   └── draft.rs      ◄─── Debounced draft recalculation
//! ├── commands/
//! │   ├── mod.rs        ◄─── clap CLI & dispatch
//! │   ├── inventory.rs  ◄─── Inventory listing
//! │   ├── quotes.rs     ◄─── Quote listing & approval
//! │   └── sync.rs       ◄─── Export/import & mirror
//! └── error.rs          ◄─── API error type
//! ```

pub mod commands;
pub mod error;
pub mod state;

use std::path::PathBuf;
use std::process::ExitCode;

use directories::ProjectDirs;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

pub use commands::Cli;
use error::{ApiError, ApiResult};
use quotekit_db::{Database, DbConfig};
use quotekit_sync::SyncConfig;
use state::AppState;

/// Runs one CLI command.
///
/// ## Startup Sequence
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │                       Application Startup                               │
/// │                                                                         │
/// │  1. Initialize Logging ───────────────────────────────────────────────► │
/// │     • tracing-subscriber with env filter (stderr)                       │
/// │     • Default: info, quotekit=debug, sqlx=warn                          │
/// │                                                                         │
/// │  2. Determine Database Path ──────────────────────────────────────────► │
/// │     • --database, QUOTEKIT_DB_PATH, else the platform data dir          │
/// │                                                                         │
/// │  3. Connect to Database & Load Sync Config ───────────────────────────► │
/// │     • SQLite with WAL mode, pending migrations applied                  │
/// │     • --sync-config or sync.toml (or defaults), QUOTEKIT_* overrides    │
/// │                                                                         │
/// │  4. Open AppState ────────────────────────────────────────────────────► │
/// │     • Optional startup pull, workspace load, auto-sync worker           │
/// │                                                                         │
/// │  5. Execute, print JSON, shut down (flushes pending auto-sync)          │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
pub async fn run(cli: Cli) -> ExitCode {
    init_tracing();

    match execute(cli).await {
        Ok(output) => {
            println!("{}", output);
            ExitCode::SUCCESS
        }
        Err(err) => {
            error!(code = ?err.code, "{}", err.message);
            match serde_json::to_string_pretty(&err) {
                Ok(json) => eprintln!("{}", json),
                Err(_) => eprintln!("{}", err),
            }
            ExitCode::FAILURE
        }
    }
}

async fn execute(cli: Cli) -> ApiResult<String> {
    let db_path = match cli.database {
        Some(path) => path,
        None => get_database_path()?,
    };
    info!(?db_path, "Database path determined");

    let db = Database::new(DbConfig::new(db_path)).await?;
    let sync_config = SyncConfig::load_or_default(cli.sync_config);
    let state = AppState::open(db, sync_config).await?;

    let result = cli.command.execute(&state).await;
    state.shutdown().await;

    let value = result?;
    serde_json::to_string_pretty(&value).map_err(|e| ApiError::internal(e.to_string()))
}

/// Initializes the tracing subscriber for structured logging.
///
/// ## Log Levels
/// - `RUST_LOG=debug` - Show debug messages
/// - `RUST_LOG=quotekit_sync=trace` - Trace the mirror only
/// - Default: `info,quotekit=debug,sqlx=warn`
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,quotekit=debug,sqlx=warn"));

    // Logs go to stderr so stdout stays machine-readable.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Determines the database file path based on the platform.
///
/// ## Platform-Specific Paths
/// - **macOS**: `~/Library/Application Support/com.quotekit.quotekit/quotekit.db`
/// - **Windows**: `%APPDATA%\quotekit\quotekit\data\quotekit.db`
/// - **Linux**: `~/.local/share/quotekit/quotekit.db`
///
/// ## Override
/// Set `QUOTEKIT_DB_PATH` to use a custom path.
pub fn get_database_path() -> ApiResult<PathBuf> {
    if let Ok(path) = std::env::var("QUOTEKIT_DB_PATH") {
        return Ok(PathBuf::from(path));
    }

    let proj_dirs = ProjectDirs::from("com", "quotekit", "quotekit")
        .ok_or_else(|| ApiError::internal("Could not determine app data directory"))?;

    let data_dir = proj_dirs.data_dir();
    std::fs::create_dir_all(data_dir).map_err(|e| {
        ApiError::internal(format!("Could not create {}: {}", data_dir.display(), e))
    })?;

    Ok(data_dir.join("quotekit.db"))
}
