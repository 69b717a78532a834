//! # Validation Module
//!
//! Input validation shared by the aggregates.
//!
//! ## Validation Philosophy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  VALIDATE FIRST, MUTATE SECOND                                          │
//! │                                                                         │
//! │  Form input ──► validate_*() ──► Ok ──► aggregate mutation ──► persist │
//! │                      │                                                  │
//! │                      └──► Err(ValidationError) ──► shown inline,       │
//! │                                                   nothing changed      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::NaiveDate;

use crate::error::ValidationError;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// Field Validators
// =============================================================================

/// Validates that a text field is non-empty after trimming.
///
/// ## Returns
/// The trimmed value.
pub fn validate_required(field: &str, value: &str) -> ValidationResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::required(field));
    }
    Ok(trimmed.to_string())
}

/// Validates that an integer is within `[min, max]`.
pub fn validate_range(field: &str, value: i64, min: i64, max: i64) -> ValidationResult<i64> {
    if value < min || value > max {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min,
            max,
        });
    }
    Ok(value)
}

// =============================================================================
// Template Keys
// =============================================================================

/// Derives a template key from a user-supplied name.
///
/// ## Rules
/// 1. Lowercase
/// 2. Runs of whitespace become a single `_`
/// 3. Anything outside `[a-z0-9_]` is stripped
/// 4. The result must be non-empty and must not start with a digit
///
/// ## Example
/// ```rust
/// use quotekit_core::validation::sanitize_template_key;
///
/// assert_eq!(sanitize_template_key("My Custom Scope!").unwrap(), "my_custom_scope");
/// assert!(sanitize_template_key("2nd Floor").is_err());
/// assert!(sanitize_template_key("!!!").is_err());
/// ```
pub fn sanitize_template_key(name: &str) -> ValidationResult<String> {
    let mut key = String::with_capacity(name.len());
    let mut in_whitespace = false;

    for ch in name.trim().chars().flat_map(char::to_lowercase) {
        if ch.is_whitespace() {
            if !in_whitespace {
                key.push('_');
            }
            in_whitespace = true;
            continue;
        }
        in_whitespace = false;
        if ch.is_ascii_lowercase() || ch.is_ascii_digit() || ch == '_' {
            key.push(ch);
        }
    }

    match key.chars().next() {
        None => Err(ValidationError::InvalidFormat {
            field: "templateName".to_string(),
            reason: "name must contain letters or numbers".to_string(),
        }),
        Some(first) if first.is_ascii_digit() => Err(ValidationError::InvalidFormat {
            field: "templateName".to_string(),
            reason: format!("key '{}' cannot start with a number", key),
        }),
        Some(_) => Ok(key),
    }
}

// =============================================================================
// Quote Numbers
// =============================================================================

/// Prefix of every quote number.
pub const QUOTE_NUMBER_PREFIX: &str = "QT";

/// Formats a quote number: `QT-YYYYMMDD-NNN`.
pub fn format_quote_number(date: NaiveDate, sequence: u16) -> String {
    format!(
        "{}-{}-{:03}",
        QUOTE_NUMBER_PREFIX,
        date.format("%Y%m%d"),
        sequence
    )
}

/// Parses and validates a quote number.
///
/// ## Returns
/// The date and sequence encoded in the number.
///
/// ## Example
/// ```rust
/// use quotekit_core::validation::parse_quote_number;
///
/// let (date, seq) = parse_quote_number("QT-20250101-001").unwrap();
/// assert_eq!(date.to_string(), "2025-01-01");
/// assert_eq!(seq, 1);
/// assert!(parse_quote_number("QT-2025-1").is_err());
/// ```
pub fn parse_quote_number(value: &str) -> ValidationResult<(NaiveDate, u16)> {
    let invalid = |reason: &str| ValidationError::InvalidFormat {
        field: "quoteNumber".to_string(),
        reason: format!("{} (expected QT-YYYYMMDD-NNN, got '{}')", reason, value),
    };

    let mut parts = value.trim().split('-');
    let (Some(prefix), Some(date), Some(seq), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return Err(invalid("wrong number of segments"));
    };

    if prefix != QUOTE_NUMBER_PREFIX {
        return Err(invalid("missing QT prefix"));
    }
    if date.len() != 8 || !date.chars().all(|c| c.is_ascii_digit()) {
        return Err(invalid("date must be 8 digits"));
    }
    if seq.len() != 3 || !seq.chars().all(|c| c.is_ascii_digit()) {
        return Err(invalid("sequence must be 3 digits"));
    }

    let date = NaiveDate::parse_from_str(date, "%Y%m%d").map_err(|_| invalid("invalid date"))?;
    let seq = seq.parse::<u16>().map_err(|_| invalid("invalid sequence"))?;
    Ok((date, seq))
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_required_trims() {
        assert_eq!(validate_required("name", "  Lift ").unwrap(), "Lift");
        assert!(validate_required("name", "   ").is_err());
    }

    #[test]
    fn test_validate_range() {
        assert!(validate_range("qty", 5, 1, 10).is_ok());
        assert!(validate_range("qty", 0, 1, 10).is_err());
    }

    #[test]
    fn test_sanitize_template_key() {
        assert_eq!(
            sanitize_template_key("My Custom Scope!").unwrap(),
            "my_custom_scope"
        );
        assert_eq!(
            sanitize_template_key("  Service   Upgrade ").unwrap(),
            "service_upgrade"
        );
        assert_eq!(sanitize_template_key("Panel-200A").unwrap(), "panel200a");
    }

    #[test]
    fn test_sanitize_rejects_leading_digit() {
        let err = sanitize_template_key("2nd Floor Rough-in").unwrap_err();
        assert!(matches!(err, ValidationError::InvalidFormat { .. }));
    }

    #[test]
    fn test_sanitize_rejects_empty() {
        assert!(sanitize_template_key("").is_err());
        assert!(sanitize_template_key("¡¿!?").is_err());
    }

    #[test]
    fn test_quote_number_round_trip() {
        let date = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
        let number = format_quote_number(date, 7);
        assert_eq!(number, "QT-20250101-007");
        assert_eq!(parse_quote_number(&number).unwrap(), (date, 7));
    }

    #[test]
    fn test_quote_number_rejects_garbage() {
        assert!(parse_quote_number("QT-20251340-001").is_err());
        assert!(parse_quote_number("QX-20250101-001").is_err());
        assert!(parse_quote_number("QT-20250101-01").is_err());
        assert!(parse_quote_number("QT-20250101-001-9").is_err());
    }
}
