//! # Error Types
//!
//! Domain-specific error types for quotekit-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  quotekit-core errors (this file)                                      │
//! │  ├── CoreError        - Quote/inventory/template rule violations       │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  quotekit-db errors                                                    │
//! │  └── DbError          - Document Store failures (StorageUnavailable)   │
//! │                                                                         │
//! │  quotekit-sync errors                                                  │
//! │  └── SyncError        - Mirror I/O, MalformedImport                    │
//! │                                                                         │
//! │  App errors                                                            │
//! │  └── ApiError         - What the user sees (code + message)            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. Validation errors are raised BEFORE any aggregate is touched
//! 2. Include the offending identifier in every message
//! 3. Errors are enum variants, never String

use thiserror::Error;

use crate::inventory::StockShortfall;

// =============================================================================
// Core Error
// =============================================================================

/// Business rule violations raised by the aggregates.
#[derive(Debug, Error)]
pub enum CoreError {
    /// No quote with this quote number exists.
    #[error("Quote not found: {0}")]
    QuoteNotFound(String),

    /// A quote exists but has no saved revisions (only possible with
    /// hand-edited documents).
    #[error("Quote {0} has no saved revisions")]
    NoRevisions(String),

    /// Revision lookup by index failed.
    #[error("Quote {quote_number} has no revision at index {index}")]
    RevisionNotFound { quote_number: String, index: usize },

    /// Inventory item cannot be found.
    #[error("Inventory item not found: {0}")]
    InventoryItemNotFound(String),

    /// Category cannot be found.
    #[error("Category not found: {0}")]
    CategoryNotFound(String),

    /// Template cannot be found.
    #[error("Template '{key}' not found in {class} templates")]
    TemplateNotFound { class: String, key: String },

    /// Approval-time stock check failed.
    ///
    /// ## User Workflow
    /// ```text
    /// approve("QT-20250101-001")
    ///      │
    ///      ▼
    /// Check ALL linked lines first
    ///   Generator: stock 5, requested 3  ✓
    ///   Lift:      stock 2, requested 3  ✗
    ///      │
    ///      ▼
    /// InsufficientStock { shortfalls: [Lift] }
    ///      │
    ///      ▼
    /// No stock touched, quote stays unapproved
    /// ```
    #[error("Insufficient stock: {}", describe_shortfalls(.shortfalls))]
    InsufficientStock { shortfalls: Vec<StockShortfall> },

    /// The latest revision is already approved and the caller did not
    /// confirm a second deduction.
    #[error(
        "Quote {quote_number} revision {revision} is already approved; \
         confirm to deduct inventory again"
    )]
    ReapprovalNotConfirmed { quote_number: String, revision: u32 },

    /// Quote snapshot failed save-time validation.
    #[error("Quote is incomplete: {}", describe_issues(.issues))]
    IncompleteQuote { issues: Vec<ValidationError> },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl CoreError {
    /// Returns true for errors caused by user input (reported inline,
    /// nothing was written).
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            CoreError::Validation(_) | CoreError::IncompleteQuote { .. }
        )
    }
}

fn describe_shortfalls(shortfalls: &[StockShortfall]) -> String {
    shortfalls
        .iter()
        .map(|s| {
            format!(
                "{} ({}): available {}, requested {}",
                s.name, s.item_id, s.available, s.requested
            )
        })
        .collect::<Vec<_>>()
        .join("; ")
}

fn describe_issues(issues: &[ValidationError]) -> String {
    issues
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Invalid format (e.g., malformed quote number).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Duplicate value (e.g., template key already used).
    #[error("{field} '{value}' already exists")]
    Duplicate { field: String, value: String },

    /// The operation would break an invariant of the collection.
    #[error("{field} '{value}' cannot be changed: {reason}")]
    NotAllowed {
        field: String,
        value: String,
        reason: String,
    },

    /// A problem with one line of a quote section.
    #[error("{section} item {position}: {problem}")]
    LineItem {
        section: String,
        position: usize,
        problem: Box<ValidationError>,
    },
}

impl ValidationError {
    pub(crate) fn required(field: impl Into<String>) -> Self {
        ValidationError::Required {
            field: field.into(),
        }
    }

    pub(crate) fn positive(field: impl Into<String>) -> Self {
        ValidationError::MustBePositive {
            field: field.into(),
        }
    }

    /// Wraps a problem with the 1-based position of the offending line.
    pub(crate) fn in_line(self, section: &str, position: usize) -> Self {
        ValidationError::LineItem {
            section: section.to_string(),
            position,
            problem: Box::new(self),
        }
    }
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insufficient_stock_message_lists_every_shortfall() {
        let err = CoreError::InsufficientStock {
            shortfalls: vec![
                StockShortfall {
                    item_id: "inv-006".to_string(),
                    name: "Lift".to_string(),
                    available: 2,
                    requested: 3,
                },
                StockShortfall {
                    item_id: "inv-004".to_string(),
                    name: "Cable Tester".to_string(),
                    available: 0,
                    requested: 1,
                },
            ],
        };
        assert_eq!(
            err.to_string(),
            "Insufficient stock: Lift (inv-006): available 2, requested 3; \
             Cable Tester (inv-004): available 0, requested 1"
        );
    }

    #[test]
    fn test_line_item_message() {
        let err = ValidationError::required("description").in_line("Labor", 2);
        assert_eq!(err.to_string(), "Labor item 2: description is required");
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let core_err: CoreError = ValidationError::required("name").into();
        assert!(core_err.is_validation());
        assert_eq!(core_err.to_string(), "Validation error: name is required");
    }
}
