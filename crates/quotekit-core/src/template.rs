//! # Templates
//!
//! Reusable text blocks (scope, notes, exclusions) and structured
//! quote-format presets, each keyed by a sanitized identifier.
//!
//! ## Keys
//! ```text
//! "My Custom Scope!"  ──sanitize──►  "my_custom_scope"
//! "2nd Floor"         ──sanitize──►  rejected (leading digit)
//! ```
//!
//! ## Removal Rules (text classes)
//! - `custom` is the blank slot and can never be removed
//! - at least one non-`custom` template must remain

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use ts_rs::TS;

use crate::calc::PartLine;
use crate::defaults;
use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;
use crate::types::{Hours, Percent};
use crate::validation::sanitize_template_key;

/// Key of the blank template offered in every notes/exclusions picker.
pub const CUSTOM_TEMPLATE_KEY: &str = "custom";

// =============================================================================
// Template Class
// =============================================================================

/// The three text template families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum TemplateClass {
    Scope,
    Notes,
    Exclusions,
}

impl TemplateClass {
    pub const ALL: [TemplateClass; 3] = [
        TemplateClass::Scope,
        TemplateClass::Notes,
        TemplateClass::Exclusions,
    ];
}

impl fmt::Display for TemplateClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TemplateClass::Scope => write!(f, "scope"),
            TemplateClass::Notes => write!(f, "notes"),
            TemplateClass::Exclusions => write!(f, "exclusions"),
        }
    }
}

impl std::str::FromStr for TemplateClass {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "scope" => Ok(TemplateClass::Scope),
            "notes" => Ok(TemplateClass::Notes),
            "exclusions" => Ok(TemplateClass::Exclusions),
            other => Err(ValidationError::InvalidFormat {
                field: "templateClass".to_string(),
                reason: format!("unknown class '{}' (scope, notes, exclusions)", other),
            }),
        }
    }
}

// =============================================================================
// Text Templates
// =============================================================================

/// One text template family.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextTemplates {
    class: TemplateClass,
    entries: BTreeMap<String, String>,
}

impl TextTemplates {
    pub fn new(class: TemplateClass, entries: BTreeMap<String, String>) -> Self {
        TextTemplates { class, entries }
    }

    /// The stock templates of a class.
    pub fn defaults(class: TemplateClass) -> Self {
        TextTemplates::new(class, defaults::templates(class))
    }

    pub fn class(&self) -> TemplateClass {
        self.class
    }

    pub fn entries(&self) -> &BTreeMap<String, String> {
        &self.entries
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    /// Adds a template under the key derived from `name`.
    ///
    /// ## Returns
    /// The sanitized key.
    pub fn add(&mut self, name: &str, text: &str) -> CoreResult<String> {
        let key = sanitize_template_key(name)?;
        if self.entries.contains_key(&key) {
            return Err(ValidationError::Duplicate {
                field: format!("{} template", self.class),
                value: key,
            }
            .into());
        }
        self.entries.insert(key.clone(), text.to_string());
        Ok(key)
    }

    /// Replaces the text of an existing template.
    pub fn update(&mut self, key: &str, text: &str) -> CoreResult<()> {
        match self.entries.get_mut(key) {
            Some(slot) => {
                *slot = text.to_string();
                Ok(())
            }
            None => Err(self.not_found(key)),
        }
    }

    /// Removes a template.
    pub fn remove(&mut self, key: &str) -> CoreResult<String> {
        if key == CUSTOM_TEMPLATE_KEY {
            return Err(self.protected(key, "the custom template is always available"));
        }
        if !self.entries.contains_key(key) {
            return Err(self.not_found(key));
        }
        let others = self
            .entries
            .keys()
            .filter(|k| k.as_str() != key && k.as_str() != CUSTOM_TEMPLATE_KEY)
            .count();
        if others == 0 {
            return Err(self.protected(key, "at least one template must remain"));
        }
        self.entries.remove(key).ok_or_else(|| self.not_found(key))
    }

    /// Restores the stock templates, discarding user additions.
    pub fn reset(&mut self) {
        self.entries = defaults::templates(self.class);
    }

    pub fn into_entries(self) -> BTreeMap<String, String> {
        self.entries
    }

    fn not_found(&self, key: &str) -> CoreError {
        CoreError::TemplateNotFound {
            class: self.class.to_string(),
            key: key.to_string(),
        }
    }

    fn protected(&self, key: &str, reason: &str) -> CoreError {
        ValidationError::NotAllowed {
            field: format!("{} template", self.class),
            value: key.to_string(),
            reason: reason.to_string(),
        }
        .into()
    }
}

// =============================================================================
// Quote-Format Templates
// =============================================================================

/// A saved quote preset: company block, parts list and labor defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct QuoteFormatTemplate {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub company_name: String,
    #[serde(default)]
    pub company_address: String,
    #[serde(default)]
    pub company_phone: String,
    #[serde(default)]
    pub company_email: String,
    #[serde(default)]
    pub parts: Vec<PartLine>,
    #[serde(default)]
    pub parts_markup: Percent,
    #[serde(default)]
    pub labor_rate: Money,
    #[serde(default)]
    pub labor_hours: Hours,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub terms: String,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

/// Quote-format presets keyed by sanitized name (document
/// `quoteFormatTemplates`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QuoteFormatLibrary {
    entries: BTreeMap<String, QuoteFormatTemplate>,
}

impl QuoteFormatLibrary {
    pub fn new(entries: BTreeMap<String, QuoteFormatTemplate>) -> Self {
        QuoteFormatLibrary { entries }
    }

    pub fn entries(&self) -> &BTreeMap<String, QuoteFormatTemplate> {
        &self.entries
    }

    pub fn get(&self, key: &str) -> Option<&QuoteFormatTemplate> {
        self.entries.get(key)
    }

    /// Saves a preset. Saving under an existing name overwrites it but keeps
    /// the original creation time.
    ///
    /// ## Returns
    /// The sanitized key.
    pub fn save(&mut self, mut template: QuoteFormatTemplate, now: DateTime<Utc>) -> CoreResult<String> {
        template.name = template.name.trim().to_string();
        let key = sanitize_template_key(&template.name)?;

        for (index, part) in template.parts.iter_mut().enumerate() {
            if part.part_number.trim().is_empty() {
                return Err(ValidationError::required("partNumber")
                    .in_line("Part", index + 1)
                    .into());
            }
            part.recalculate();
        }

        template.created_at = self
            .entries
            .get(&key)
            .map(|existing| existing.created_at)
            .unwrap_or(now);
        template.updated_at = now;
        self.entries.insert(key.clone(), template);
        Ok(key)
    }

    pub fn remove(&mut self, key: &str) -> CoreResult<QuoteFormatTemplate> {
        self.entries
            .remove(key)
            .ok_or_else(|| CoreError::TemplateNotFound {
                class: "quote format".to_string(),
                key: key.to_string(),
            })
    }

    pub fn into_entries(self) -> BTreeMap<String, QuoteFormatTemplate> {
        self.entries
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
