//! # Repository Module
//!
//! Database repository implementations for QuoteKit.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  State manager                                                         │
//! │       │                                                                 │
//! │       │  db.documents().load::<Vec<Quote>>(DocumentKey::SavedQuotes)   │
//! │       ▼                                                                 │
//! │  DocumentRepository                                                    │
//! │  ├── get / fetch / load                                                │
//! │  ├── put / save                                                        │
//! │  ├── put_many (one transaction)                                        │
//! │  └── remove / list                                                     │
//! │       │                                                                 │
//! │       │  SQL Query                                                      │
//! │       ▼                                                                 │
//! │  SQLite `documents` table                                              │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

pub mod document;
