//! # Quote Aggregate
//!
//! Versioned quotes with an approval workflow that debits inventory.
//!
//! ## Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   create_or_append_revision()         approve()                        │
//! │   ───────────────────────────         ─────────                        │
//! │                                                                         │
//! │   QT-20250101-001                     latest revision (r2)             │
//! │   ├── r1  (immutable snapshot)             │                            │
//! │   └── r2  (immutable snapshot)  ─────►     ▼                            │
//! │                                       sum linked equipment qty         │
//! │                                            │                            │
//! │                                            ▼                            │
//! │                                       Inventory::deduct_stock()        │
//! │                                       (all-or-nothing)                 │
//! │                                            │                            │
//! │                                            ▼                            │
//! │                                       approved = true                  │
//! │                                       approvedRevision = 2             │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Revisions are append-only. The only way to remove one is to delete the
//! whole quote, which never restores stock deducted by an earlier approval.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use ts_rs::TS;

use crate::calc::{EquipmentLine, LaborLine, PartLine, QuoteTotals};
use crate::error::{CoreError, CoreResult, ValidationError};
use crate::inventory::{Inventory, StockDeduction, StockRequest};
use crate::money::Money;
use crate::types::{AppConfig, Percent};
use crate::validation::{format_quote_number, parse_quote_number, ValidationResult};

/// Days a quote stays valid when no explicit date is given.
pub const DEFAULT_VALIDITY_DAYS: i64 = 30;

/// Highest sequence a quote number can carry for one date.
pub const MAX_DAILY_SEQUENCE: u16 = 999;

// =============================================================================
// Quote Snapshot
// =============================================================================

/// Full content of a quote form at the moment it was saved.
///
/// Also used as the `quoteDraft` document while a quote is being edited.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct QuoteSnapshot {
    #[serde(default)]
    pub quote_number: String,
    /// Blank on the form is stored as `""`.
    #[serde(default, with = "form_date")]
    #[ts(type = "string")]
    pub quote_date: Option<NaiveDate>,
    #[serde(default, with = "form_date")]
    #[ts(type = "string")]
    pub valid_until: Option<NaiveDate>,
    #[serde(default)]
    pub customer_name: String,
    #[serde(default)]
    pub job_name: String,
    #[serde(default)]
    pub jobsite_address: String,
    #[serde(default)]
    pub scope_summary: String,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub exclusions: String,
    #[serde(default)]
    pub labor_items: Vec<LaborLine>,
    #[serde(default)]
    pub equipment_items: Vec<EquipmentLine>,
    #[serde(default)]
    pub part_items: Vec<PartLine>,
    #[serde(default)]
    pub tax_rate: Percent,

    // Computed by `recalculate`
    #[serde(default)]
    pub labor_subtotal: Money,
    #[serde(default)]
    pub equipment_subtotal: Money,
    #[serde(default)]
    pub parts_subtotal: Money,
    #[serde(default)]
    pub subtotal: Money,
    #[serde(default)]
    pub tax_amount: Money,
    #[serde(default)]
    pub grand_total: Money,
}

impl QuoteSnapshot {
    /// An empty form dated `quote_date`, valid for the default period.
    pub fn blank(quote_date: NaiveDate, tax_rate: Percent) -> Self {
        QuoteSnapshot {
            quote_number: String::new(),
            quote_date: Some(quote_date),
            valid_until: Some(quote_date + Duration::days(DEFAULT_VALIDITY_DAYS)),
            customer_name: String::new(),
            job_name: String::new(),
            jobsite_address: String::new(),
            scope_summary: String::new(),
            notes: String::new(),
            exclusions: String::new(),
            labor_items: Vec::new(),
            equipment_items: Vec::new(),
            part_items: Vec::new(),
            tax_rate,
            labor_subtotal: Money::zero(),
            equipment_subtotal: Money::zero(),
            parts_subtotal: Money::zero(),
            subtotal: Money::zero(),
            tax_amount: Money::zero(),
            grand_total: Money::zero(),
        }
    }

    /// Computes totals from the current line items without storing them.
    pub fn compute_totals(&self) -> QuoteTotals {
        QuoteTotals::compute(
            &self.labor_items,
            &self.equipment_items,
            &self.part_items,
            self.tax_rate,
        )
    }

    /// Refreshes every line total and the summary fields.
    pub fn recalculate(&mut self) {
        self.labor_items.iter_mut().for_each(LaborLine::recalculate);
        self.equipment_items
            .iter_mut()
            .for_each(EquipmentLine::recalculate);
        self.part_items.iter_mut().for_each(PartLine::recalculate);

        let totals = self.compute_totals();
        self.labor_subtotal = totals.labor_subtotal;
        self.equipment_subtotal = totals.equipment_subtotal;
        self.parts_subtotal = totals.parts_subtotal;
        self.subtotal = totals.subtotal;
        self.tax_amount = totals.tax_amount;
        self.grand_total = totals.grand_total;
    }

    /// Save-time validation. Every problem is collected so the form can
    /// show them all at once.
    pub fn validate(&self, config: &AppConfig) -> CoreResult<()> {
        let mut issues = Vec::new();

        if !config.is_ready_for_quotes() {
            issues.push(ValidationError::required("companyName"));
        }
        if self.customer_name.trim().is_empty() {
            issues.push(ValidationError::required("customerName"));
        }
        if self.scope_summary.trim().is_empty() {
            issues.push(ValidationError::required("scopeSummary"));
        }
        let expires_early = match (self.quote_date, self.valid_until) {
            (Some(quote_date), Some(valid_until)) => valid_until < quote_date,
            _ => false,
        };
        if expires_early {
            issues.push(ValidationError::InvalidFormat {
                field: "validUntil".to_string(),
                reason: "must not be before the quote date".to_string(),
            });
        }
        if self.labor_items.is_empty() && self.equipment_items.is_empty() {
            issues.push(ValidationError::required("labor or equipment item"));
        }

        for (index, line) in self.labor_items.iter().enumerate() {
            let position = index + 1;
            if line.description.trim().is_empty() {
                issues.push(ValidationError::required("description").in_line("Labor", position));
            }
            if !line.hours.is_positive() {
                issues.push(ValidationError::positive("hours").in_line("Labor", position));
            }
            if !line.rate.is_positive() {
                issues.push(ValidationError::positive("rate").in_line("Labor", position));
            }
        }

        for (index, line) in self.equipment_items.iter().enumerate() {
            let position = index + 1;
            if line.description.trim().is_empty() {
                issues.push(ValidationError::required("description").in_line("Equipment", position));
            }
            if line.quantity < 1 {
                issues.push(ValidationError::positive("quantity").in_line("Equipment", position));
            }
            if !line.price.is_positive() {
                issues.push(ValidationError::positive("price").in_line("Equipment", position));
            }
        }

        for (index, line) in self.part_items.iter().enumerate() {
            let position = index + 1;
            if line.part_number.trim().is_empty() {
                issues.push(ValidationError::required("partNumber").in_line("Part", position));
            }
            if line.quantity < 1 {
                issues.push(ValidationError::positive("quantity").in_line("Part", position));
            }
            if line.price.is_negative() {
                issues.push(
                    ValidationError::InvalidFormat {
                        field: "price".to_string(),
                        reason: "must not be negative".to_string(),
                    }
                    .in_line("Part", position),
                );
            }
        }

        if issues.is_empty() {
            Ok(())
        } else {
            Err(CoreError::IncompleteQuote { issues })
        }
    }
}

/// `YYYY-MM-DD` form dates where an empty string means "not set".
mod form_date {
    use chrono::NaiveDate;
    use serde::{Deserialize, Deserializer, Serializer};

    const FORMAT: &str = "%Y-%m-%d";

    pub fn serialize<S: Serializer>(date: &Option<NaiveDate>, serializer: S) -> Result<S::Ok, S::Error> {
        match date {
            Some(date) => serializer.collect_str(&date.format(FORMAT)),
            None => serializer.serialize_str(""),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<NaiveDate>, D::Error> {
        let raw: Option<String> = Option::deserialize(deserializer)?;
        match raw.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(text) => NaiveDate::parse_from_str(text, FORMAT)
                .map(Some)
                .map_err(serde::de::Error::custom),
        }
    }
}

// =============================================================================
// Revision & Quote
// =============================================================================

/// One immutable saved version of a quote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Revision {
    /// 1-based, increasing.
    pub revision_number: u32,
    #[ts(type = "string")]
    pub saved_at: DateTime<Utc>,
    pub data: QuoteSnapshot,
    #[serde(default)]
    pub notes: String,
}

/// A quote and its revision history (one entry of `savedQuotes`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Quote {
    pub quote_number: String,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub last_modified: DateTime<Utc>,
    #[serde(default)]
    pub customer_name: String,
    #[serde(default)]
    pub job_name: String,
    #[serde(default)]
    pub revisions: Vec<Revision>,
    #[serde(default)]
    pub approved: bool,
    #[serde(default)]
    #[ts(type = "string | null")]
    pub approved_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub approved_revision: Option<u32>,
}

impl Quote {
    fn new(quote_number: String, now: DateTime<Utc>) -> Self {
        Quote {
            quote_number,
            created_at: now,
            last_modified: now,
            customer_name: String::new(),
            job_name: String::new(),
            revisions: Vec::new(),
            approved: false,
            approved_at: None,
            approved_revision: None,
        }
    }

    /// The highest-numbered revision.
    pub fn latest(&self) -> Option<&Revision> {
        self.revisions.last()
    }

    /// Revision by 0-based position.
    pub fn revision(&self, index: usize) -> Option<&Revision> {
        self.revisions.get(index)
    }

    /// True when the latest revision is the approved one.
    pub fn is_latest_approved(&self) -> bool {
        self.approved && self.approved_revision.is_some()
            && self.approved_revision == self.latest().map(|r| r.revision_number)
    }

    fn next_revision_number(&self) -> u32 {
        let count = self.revisions.len() as u32;
        let highest = self
            .revisions
            .iter()
            .map(|r| r.revision_number)
            .max()
            .unwrap_or(0);
        count.max(highest) + 1
    }

    /// Re-derives the listing fields from the latest revision.
    fn refresh_metadata(&mut self) {
        if let Some(latest) = self.revisions.last() {
            self.customer_name = latest.data.customer_name.clone();
            self.job_name = latest.data.job_name.clone();
        }
        if let Some(newest) = self.revisions.iter().map(|r| r.saved_at).max() {
            self.last_modified = self.last_modified.max(newest);
        }
    }

    /// Checks the structural invariants of a quote read from outside.
    ///
    /// ## Rules
    /// - revision numbers are >= 1 and sorted ascending
    /// - `approvedRevision`, when set, names an existing revision
    pub fn check_invariants(&self) -> ValidationResult<()> {
        let field = format!("quote {}", self.quote_number);
        let mut previous = 0;
        for revision in &self.revisions {
            if revision.revision_number == 0 || revision.revision_number < previous {
                return Err(ValidationError::InvalidFormat {
                    field,
                    reason: "revision numbers must start at 1 and ascend".to_string(),
                });
            }
            previous = revision.revision_number;
        }
        if let Some(approved) = self.approved_revision {
            if !self.revisions.iter().any(|r| r.revision_number == approved) {
                return Err(ValidationError::InvalidFormat {
                    field,
                    reason: format!("approvedRevision {} does not exist", approved),
                });
            }
        }
        Ok(())
    }
}

// =============================================================================
// Results
// =============================================================================

/// Row of the saved-quotes list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct QuoteSummary {
    pub quote_number: String,
    pub customer_name: String,
    pub job_name: String,
    pub revision_count: usize,
    pub grand_total: Money,
    pub approved: bool,
    #[ts(type = "string")]
    pub last_modified: DateTime<Utc>,
}

/// Why an equipment line did not move stock during approval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub enum SkipReason {
    /// No inventory back-reference; stock is not tracked.
    Unlinked,
    /// The referenced inventory item has since been deleted.
    MissingItem,
}

/// Equipment line left out of the stock deduction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct SkippedLine {
    /// 1-based position in the equipment section.
    pub position: usize,
    pub description: String,
    pub inventory_id: Option<String>,
    pub reason: SkipReason,
}

/// Outcome of a successful approval.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ApprovalReport {
    pub quote_number: String,
    pub revision_number: u32,
    #[ts(type = "string")]
    pub approved_at: DateTime<Utc>,
    pub deductions: Vec<StockDeduction>,
    pub skipped: Vec<SkippedLine>,
    /// True when this revision had already been approved and stock was
    /// deducted a second time on confirmation.
    pub reapproval: bool,
}

/// Counts from merging imported quotes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct QuoteMergeStats {
    pub quotes_added: usize,
    pub revisions_added: usize,
}

// =============================================================================
// Quote Book
// =============================================================================

/// Every saved quote (document `savedQuotes`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QuoteBook {
    quotes: Vec<Quote>,
}

impl QuoteBook {
    pub fn new(quotes: Vec<Quote>) -> Self {
        QuoteBook { quotes }
    }

    pub fn quotes(&self) -> &[Quote] {
        &self.quotes
    }

    pub fn len(&self) -> usize {
        self.quotes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.quotes.is_empty()
    }

    pub fn get(&self, quote_number: &str) -> Option<&Quote> {
        self.quotes.iter().find(|q| q.quote_number == quote_number)
    }

    fn get_mut(&mut self, quote_number: &str) -> CoreResult<&mut Quote> {
        self.quotes
            .iter_mut()
            .find(|q| q.quote_number == quote_number)
            .ok_or_else(|| CoreError::QuoteNotFound(quote_number.to_string()))
    }

    /// Lowest unused `QT-YYYYMMDD-NNN` for the date.
    pub fn next_quote_number(&self, date: NaiveDate) -> CoreResult<String> {
        let used: HashSet<u16> = self
            .quotes
            .iter()
            .filter_map(|q| parse_quote_number(&q.quote_number).ok())
            .filter(|(d, _)| *d == date)
            .map(|(_, seq)| seq)
            .collect();

        (1..=MAX_DAILY_SEQUENCE)
            .find(|seq| !used.contains(seq))
            .map(|seq| format_quote_number(date, seq))
            .ok_or_else(|| {
                ValidationError::OutOfRange {
                    field: "quoteNumber sequence".to_string(),
                    min: 1,
                    max: MAX_DAILY_SEQUENCE as i64,
                }
                .into()
            })
    }

    /// Saves a snapshot as the next revision of `quote_number`, creating the
    /// quote when it does not exist yet.
    ///
    /// ## Arguments
    /// * `quote_number` - `QT-YYYYMMDD-NNN`
    /// * `snapshot` - form content; totals are recomputed here
    /// * `note` - optional revision note
    /// * `config` - company settings (must be configured)
    /// * `now` - revision timestamp
    ///
    /// ## Returns
    /// The new revision number.
    pub fn create_or_append_revision(
        &mut self,
        quote_number: &str,
        mut snapshot: QuoteSnapshot,
        note: &str,
        config: &AppConfig,
        now: DateTime<Utc>,
    ) -> CoreResult<u32> {
        let quote_number = quote_number.trim();
        parse_quote_number(quote_number)?;

        snapshot.quote_number = quote_number.to_string();
        snapshot.validate(config)?;
        snapshot.recalculate();

        let index = match self.quotes.iter().position(|q| q.quote_number == quote_number) {
            Some(index) => index,
            None => {
                self.quotes.push(Quote::new(quote_number.to_string(), now));
                self.quotes.len() - 1
            }
        };

        let quote = &mut self.quotes[index];
        let revision_number = quote.next_revision_number();
        quote.revisions.push(Revision {
            revision_number,
            saved_at: now,
            data: snapshot,
            notes: note.trim().to_string(),
        });
        quote.last_modified = now;
        quote.refresh_metadata();

        Ok(revision_number)
    }

    /// Approves the latest revision and deducts linked equipment from
    /// inventory.
    ///
    /// ## Arguments
    /// * `confirm_reapproval` - must be true to approve a revision that is
    ///   already approved (stock is deducted again)
    ///
    /// ## Errors
    /// - `QuoteNotFound` / `NoRevisions`
    /// - `ReapprovalNotConfirmed` - nothing touched
    /// - `InsufficientStock` - nothing touched, every shortfall listed
    pub fn approve(
        &mut self,
        quote_number: &str,
        inventory: &mut Inventory,
        confirm_reapproval: bool,
        now: DateTime<Utc>,
    ) -> CoreResult<ApprovalReport> {
        let quote = self.get_mut(quote_number)?;
        let latest = quote
            .latest()
            .ok_or_else(|| CoreError::NoRevisions(quote_number.to_string()))?;
        let revision_number = latest.revision_number;

        let reapproval = quote.is_latest_approved();
        if reapproval && !confirm_reapproval {
            return Err(CoreError::ReapprovalNotConfirmed {
                quote_number: quote_number.to_string(),
                revision: revision_number,
            });
        }

        let mut requests = Vec::new();
        let mut skipped = Vec::new();
        for (index, line) in latest.data.equipment_items.iter().enumerate() {
            let reason = match line.linked_inventory_id() {
                Some(id) if inventory.get(id).is_some() => {
                    requests.push(StockRequest {
                        item_id: id.to_string(),
                        quantity: line.quantity,
                    });
                    continue;
                }
                Some(_) => SkipReason::MissingItem,
                None => SkipReason::Unlinked,
            };
            skipped.push(SkippedLine {
                position: index + 1,
                description: line.description.clone(),
                inventory_id: line.linked_inventory_id().map(str::to_string),
                reason,
            });
        }

        let deductions = inventory.deduct_stock(&requests)?;

        quote.approved = true;
        quote.approved_at = Some(now);
        quote.approved_revision = Some(revision_number);
        quote.last_modified = now;

        Ok(ApprovalReport {
            quote_number: quote_number.to_string(),
            revision_number,
            approved_at: now,
            deductions,
            skipped,
            reapproval,
        })
    }

    /// Removes a quote and all its revisions. Deducted stock stays deducted.
    pub fn delete(&mut self, quote_number: &str) -> CoreResult<Quote> {
        let index = self
            .quotes
            .iter()
            .position(|q| q.quote_number == quote_number)
            .ok_or_else(|| CoreError::QuoteNotFound(quote_number.to_string()))?;
        Ok(self.quotes.remove(index))
    }

    /// Revision by 0-based index.
    pub fn revision(&self, quote_number: &str, index: usize) -> CoreResult<&Revision> {
        let quote = self
            .get(quote_number)
            .ok_or_else(|| CoreError::QuoteNotFound(quote_number.to_string()))?;
        quote.revision(index).ok_or_else(|| CoreError::RevisionNotFound {
            quote_number: quote_number.to_string(),
            index,
        })
    }

    /// The latest revision of a quote.
    pub fn latest(&self, quote_number: &str) -> CoreResult<&Revision> {
        let quote = self
            .get(quote_number)
            .ok_or_else(|| CoreError::QuoteNotFound(quote_number.to_string()))?;
        quote
            .latest()
            .ok_or_else(|| CoreError::NoRevisions(quote_number.to_string()))
    }

    /// Saved quotes, most recently modified first.
    pub fn list(&self) -> Vec<QuoteSummary> {
        let mut rows: Vec<QuoteSummary> = self
            .quotes
            .iter()
            .map(|q| QuoteSummary {
                quote_number: q.quote_number.clone(),
                customer_name: q.customer_name.clone(),
                job_name: q.job_name.clone(),
                revision_count: q.revisions.len(),
                grand_total: q.latest().map(|r| r.data.grand_total).unwrap_or_default(),
                approved: q.approved,
                last_modified: q.last_modified,
            })
            .collect();
        rows.sort_by(|a, b| b.last_modified.cmp(&a.last_modified));
        rows
    }

    /// Merges imported quotes without losing local history.
    ///
    /// ## Policy
    /// - unknown quote number: inserted wholesale
    /// - known quote number: imported revisions whose `savedAt` is not
    ///   present locally are appended, then revisions are re-sorted by
    ///   number; a local unapproved quote adopts an imported approval
    pub fn merge(&mut self, imported: Vec<Quote>) -> QuoteMergeStats {
        let mut stats = QuoteMergeStats::default();

        for incoming in imported {
            let Some(local) = self
                .quotes
                .iter_mut()
                .find(|q| q.quote_number == incoming.quote_number)
            else {
                stats.quotes_added += 1;
                stats.revisions_added += incoming.revisions.len();
                self.quotes.push(incoming);
                continue;
            };

            let known: HashSet<DateTime<Utc>> =
                local.revisions.iter().map(|r| r.saved_at).collect();
            for revision in incoming.revisions {
                if !known.contains(&revision.saved_at) {
                    local.revisions.push(revision);
                    stats.revisions_added += 1;
                }
            }
            local
                .revisions
                .sort_by_key(|r| (r.revision_number, r.saved_at));

            if !local.approved && incoming.approved {
                local.approved = true;
                local.approved_at = incoming.approved_at;
                local.approved_revision = incoming.approved_revision;
            }
            local.created_at = local.created_at.min(incoming.created_at);
            local.last_modified = local.last_modified.max(incoming.last_modified);
            local.refresh_metadata();
        }

        stats
    }

    /// Validates every quote's invariants.
    pub fn check_invariants(&self) -> ValidationResult<()> {
        self.quotes.iter().try_for_each(Quote::check_invariants)
    }

    pub fn into_quotes(self) -> Vec<Quote> {
        self.quotes
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
