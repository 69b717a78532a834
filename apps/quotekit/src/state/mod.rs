//! # State Module
//!
//! One state manager (`AppState`) holds the in-memory aggregates; every
//! command goes through its methods instead of touching shared variables.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    State Architecture                                   │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │  AppState                                                       │   │
//! │  │  ├── Database / DocumentRepository   (durable documents)        │   │
//! │  │  ├── Mirror + AutoSyncHandle         (external copy)            │   │
//! │  │  └── Mutex<Workspace>                                           │   │
//! │  │        config, storage, inventory, quotes, templates ×3,        │   │
//! │  │        formats, parts, draft, dirty keys                        │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                              ▲                                          │
//! │                              │ save_draft (after quiet period)          │
//! │  ┌───────────────────────────┴─────────────────────────────────────┐   │
//! │  │  DraftDebouncer                                                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

mod draft;
mod manager;
mod workspace;

pub use draft::{DraftDebouncer, DraftHandle, DraftStatus, DEFAULT_QUIET_PERIOD};
pub use manager::AppState;
pub use workspace::{Workspace, MIRRORED_KEYS};
