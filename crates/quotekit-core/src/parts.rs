//! # Parts Library
//!
//! Catalog of previously quoted parts, deduplicated by part number
//! (case-insensitive), with an optional on-hand counter per part.
//!
//! This counter is independent of the equipment stock in
//! [`crate::inventory`]: it moves when a quote document is finalized, not
//! when a quote is approved.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::calc::PartLine;
use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;
use crate::quote::QuoteSnapshot;
use crate::validation::validate_required;

/// File name of a finalized quote document: `Quote_<number>_<MM-DD-YYYY>.pdf`,
/// or `Quote_<number>.pdf` when the form has no date.
pub fn pdf_file_name(quote_number: &str, quote_date: Option<NaiveDate>) -> String {
    match quote_date {
        Some(date) => format!("Quote_{}_{}.pdf", quote_number, date.format("%m-%d-%Y")),
        None => format!("Quote_{}.pdf", quote_number),
    }
}

/// One catalog entry (element of document `partsLibrary`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct LibraryPart {
    #[serde(default)]
    pub vendor: String,
    pub part_number: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub price: Money,
    /// On-hand count; `None` means the part is not counted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inventory: Option<i64>,
}

/// Whether an upsert created or replaced an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Upserted {
    Added,
    Updated,
}

/// Counter movement for one part.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct PartDecrement {
    pub part_number: String,
    pub quantity: i64,
    pub remaining: i64,
}

/// A counted part that did not have enough on hand. The counter is
/// clamped at zero.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct PartShortage {
    pub part_number: String,
    pub available: i64,
    pub requested: i64,
}

/// Result of finalizing a quote document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct FinalizeReport {
    pub file_name: String,
    pub parts_recorded: usize,
    pub decrements: Vec<PartDecrement>,
    pub warnings: Vec<PartShortage>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PartsLibrary {
    parts: Vec<LibraryPart>,
}

impl PartsLibrary {
    pub fn new(parts: Vec<LibraryPart>) -> Self {
        PartsLibrary { parts }
    }

    pub fn parts(&self) -> &[LibraryPart] {
        &self.parts
    }

    pub fn find(&self, part_number: &str) -> Option<&LibraryPart> {
        self.position(part_number).map(|i| &self.parts[i])
    }

    fn position(&self, part_number: &str) -> Option<usize> {
        let wanted = part_number.trim();
        self.parts
            .iter()
            .position(|p| p.part_number.trim().eq_ignore_ascii_case(wanted))
    }

    /// Inserts a part or replaces the entry with the same part number.
    /// An existing counter is kept when the new entry carries none.
    pub fn upsert(&mut self, mut part: LibraryPart) -> CoreResult<Upserted> {
        part.part_number = validate_required("partNumber", &part.part_number)?;
        if part.price.is_negative() {
            return Err(ValidationError::InvalidFormat {
                field: "price".to_string(),
                reason: "must not be negative".to_string(),
            }
            .into());
        }

        match self.position(&part.part_number) {
            Some(index) => {
                let existing = &mut self.parts[index];
                if part.inventory.is_none() {
                    part.inventory = existing.inventory;
                }
                *existing = part;
                Ok(Upserted::Updated)
            }
            None => {
                self.parts.push(part);
                Ok(Upserted::Added)
            }
        }
    }

    /// Sets or clears the on-hand counter of a part.
    pub fn set_inventory(&mut self, part_number: &str, count: Option<i64>) -> CoreResult<()> {
        if matches!(count, Some(n) if n < 0) {
            return Err(ValidationError::OutOfRange {
                field: "inventory".to_string(),
                min: 0,
                max: i64::MAX,
            }
            .into());
        }
        let index = self
            .position(part_number)
            .ok_or_else(|| CoreError::InventoryItemNotFound(part_number.to_string()))?;
        self.parts[index].inventory = count;
        Ok(())
    }

    pub fn remove(&mut self, part_number: &str) -> CoreResult<LibraryPart> {
        let index = self
            .position(part_number)
            .ok_or_else(|| CoreError::InventoryItemNotFound(part_number.to_string()))?;
        Ok(self.parts.remove(index))
    }

    /// Records every part line of a finalized quote and decrements counted
    /// parts.
    ///
    /// ## Returns
    /// The document file name, the counter movements and any shortages.
    /// Shortages are warnings: the counter stops at zero and finalizing
    /// still succeeds.
    pub fn finalize(&mut self, snapshot: &QuoteSnapshot) -> FinalizeReport {
        let mut report = FinalizeReport {
            file_name: pdf_file_name(&snapshot.quote_number, snapshot.quote_date),
            parts_recorded: 0,
            decrements: Vec::new(),
            warnings: Vec::new(),
        };

        for line in &snapshot.part_items {
            let Some(index) = self.record(line) else {
                continue;
            };
            report.parts_recorded += 1;

            let part = &mut self.parts[index];
            let Some(available) = part.inventory else {
                continue;
            };
            if available < line.quantity {
                report.warnings.push(PartShortage {
                    part_number: part.part_number.clone(),
                    available,
                    requested: line.quantity,
                });
            }
            let remaining = (available - line.quantity).max(0);
            part.inventory = Some(remaining);
            report.decrements.push(PartDecrement {
                part_number: part.part_number.clone(),
                quantity: available - remaining,
                remaining,
            });
        }

        report
    }

    /// Upserts a quoted part line, keeping the vendor of an existing entry.
    fn record(&mut self, line: &PartLine) -> Option<usize> {
        let part_number = line.part_number.trim();
        if part_number.is_empty() {
            return None;
        }
        match self.position(part_number) {
            Some(index) => {
                let entry = &mut self.parts[index];
                if !line.description.trim().is_empty() {
                    entry.description = line.description.trim().to_string();
                }
                entry.price = line.price;
                Some(index)
            }
            None => {
                self.parts.push(LibraryPart {
                    vendor: String::new(),
                    part_number: part_number.to_string(),
                    description: line.description.trim().to_string(),
                    price: line.price,
                    inventory: None,
                });
                Some(self.parts.len() - 1)
            }
        }
    }

    pub fn into_parts(self) -> Vec<LibraryPart> {
        self.parts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Percent;

    fn part(number: &str, inventory: Option<i64>) -> LibraryPart {
        LibraryPart {
            vendor: "Graybar".to_string(),
            part_number: number.to_string(),
            description: "20A breaker".to_string(),
            price: Money::from_cents(1299),
            inventory,
        }
    }

    #[test]
    fn test_pdf_file_name() {
        let date = NaiveDate::from_ymd_opt(2025, 3, 7).unwrap();
        assert_eq!(
            pdf_file_name("QT-20250307-002", Some(date)),
            "Quote_QT-20250307-002_03-07-2025.pdf"
        );
        assert_eq!(pdf_file_name("QT-20250307-002", None), "Quote_QT-20250307-002.pdf");
    }

    #[test]
    fn test_upsert_is_case_insensitive() {
        let mut library = PartsLibrary::default();
        assert_eq!(library.upsert(part("QO120", Some(10))).unwrap(), Upserted::Added);
        assert_eq!(library.upsert(part("qo120", None)).unwrap(), Upserted::Updated);
        assert_eq!(library.parts().len(), 1);
        assert_eq!(library.find("Qo120").unwrap().inventory, Some(10));
    }

    #[test]
    fn test_upsert_rejects_blank_part_number() {
        let mut library = PartsLibrary::default();
        assert!(library.upsert(part("  ", None)).is_err());
    }

    #[test]
    fn test_finalize_decrements_and_clamps() {
        let mut library = PartsLibrary::new(vec![part("QO120", Some(3)), part("THHN-12", None)]);
        let mut snapshot =
            QuoteSnapshot::blank(NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(), Percent::zero());
        snapshot.quote_number = "QT-20250101-001".to_string();
        snapshot.part_items = vec![
            PartLine::new("qo120", "20A breaker", Money::from_cents(1350), 5),
            PartLine::new("THHN-12", "12 AWG wire", Money::from_cents(8900), 1),
            PartLine::new("WAGO-221", "Lever nuts", Money::from_cents(2500), 2),
        ];

        let report = library.finalize(&snapshot);
        assert_eq!(report.file_name, "Quote_QT-20250101-001_01-01-2025.pdf");
        assert_eq!(report.parts_recorded, 3);
        assert_eq!(
            report.warnings,
            vec![PartShortage {
                part_number: "QO120".to_string(),
                available: 3,
                requested: 5,
            }]
        );
        assert_eq!(report.decrements[0].quantity, 3);
        assert_eq!(library.find("QO120").unwrap().inventory, Some(0));
        assert_eq!(library.find("QO120").unwrap().price, Money::from_cents(1350));
        assert_eq!(library.find("QO120").unwrap().vendor, "Graybar");
        assert!(library.find("wago-221").is_some());
    }
}
