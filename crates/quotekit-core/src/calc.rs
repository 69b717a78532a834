//! # Calculation Engine
//!
//! Pure functions that turn line items into line totals, section subtotals,
//! tax and a grand total. Nothing here persists anything; callers recompute
//! whenever a line changes.
//!
//! ## Formulas
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Labor line       = hours × rate                                        │
//! │  Equipment line   = quantity × price × (1 + markup/100)                 │
//! │  Part line        = price × quantity                                    │
//! │  Inventory price  = base × (1 − discount/100) × multiplier              │
//! │                                                                         │
//! │  subtotal   = Σ labor + Σ equipment + Σ parts                           │
//! │  tax        = subtotal × taxRate/100                                    │
//! │  grandTotal = subtotal + tax                                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Worked Example
//! ```rust
//! use quotekit_core::calc::{EquipmentLine, LaborLine, QuoteTotals};
//! use quotekit_core::money::Money;
//! use quotekit_core::types::{Hours, Percent};
//!
//! let labor = vec![LaborLine::new("Rough-in", Hours::whole(8), Money::from_dollars(75))];
//! let equipment = vec![EquipmentLine::new(
//!     "Wire Puller",
//!     2,
//!     Money::from_dollars(50),
//!     Percent::from_whole(10),
//! )];
//!
//! let totals = QuoteTotals::compute(&labor, &equipment, &[], Percent::from_whole(8));
//! assert_eq!(totals.labor_subtotal, Money::from_dollars(600));
//! assert_eq!(totals.equipment_subtotal, Money::from_dollars(110));
//! assert_eq!(totals.subtotal, Money::from_dollars(710));
//! assert_eq!(totals.tax_amount, Money::from_cents(5680));
//! assert_eq!(totals.grand_total, Money::from_cents(76680));
//! ```

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;
use crate::types::{Hours, Multiplier, Percent};

const BPS: i128 = Percent::FULL_BPS as i128;

// =============================================================================
// Line Totals
// =============================================================================

/// Labor line total = hours × rate.
pub fn labor_line_total(hours: Hours, rate: Money) -> Money {
    rate.scale(hours.hundredths() as i128, 100)
}

/// Equipment line total = quantity × price × (1 + markup/100).
pub fn equipment_line_total(quantity: i64, unit_price: Money, markup: Percent) -> Money {
    unit_price.scale(quantity as i128 * (BPS + markup.bps() as i128), BPS)
}

/// Part line total = price × quantity.
pub fn part_line_total(unit_price: Money, quantity: i64) -> Money {
    unit_price.multiply_quantity(quantity)
}

/// Tax on a subtotal.
pub fn tax_amount(subtotal: Money, rate: Percent) -> Money {
    subtotal.scale(rate.bps() as i128, BPS)
}

/// Inventory final unit price = base × (1 − discount/100) × multiplier.
///
/// Discount and multiplier are applied in one step so the result is
/// rounded once, not twice.
pub fn final_unit_price(base: Money, discount: Percent, multiplier: Multiplier) -> Money {
    let keep = BPS - discount.bps() as i128;
    let factor = multiplier.ten_thousandths() as i128;
    base.scale(keep * factor, BPS * Multiplier::SCALE as i128)
}

// =============================================================================
// Line Items
// =============================================================================

/// A labor line on a quote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct LaborLine {
    pub description: String,
    pub hours: Hours,
    pub rate: Money,
    /// Computed; refreshed by [`LaborLine::recalculate`].
    #[serde(default)]
    pub total: Money,
}

impl LaborLine {
    pub fn new(description: impl Into<String>, hours: Hours, rate: Money) -> Self {
        let mut line = LaborLine {
            description: description.into(),
            hours,
            rate,
            total: Money::zero(),
        };
        line.recalculate();
        line
    }

    pub fn line_total(&self) -> Money {
        labor_line_total(self.hours, self.rate)
    }

    pub fn recalculate(&mut self) {
        self.total = self.line_total();
    }
}

/// An equipment rental line, optionally linked to an inventory item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct EquipmentLine {
    pub description: String,
    pub quantity: i64,
    pub price: Money,
    #[serde(default)]
    pub markup: Percent,
    #[serde(default)]
    pub total: Money,
    /// Back-reference to an inventory item. Empty strings count as unlinked.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inventory_id: Option<String>,
}

impl EquipmentLine {
    pub fn new(description: impl Into<String>, quantity: i64, price: Money, markup: Percent) -> Self {
        let mut line = EquipmentLine {
            description: description.into(),
            quantity,
            price,
            markup,
            total: Money::zero(),
            inventory_id: None,
        };
        line.recalculate();
        line
    }

    /// Links the line to an inventory item.
    pub fn linked_to(mut self, inventory_id: impl Into<String>) -> Self {
        self.inventory_id = Some(inventory_id.into());
        self
    }

    /// The inventory item this line draws stock from, if any.
    pub fn linked_inventory_id(&self) -> Option<&str> {
        self.inventory_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
    }

    pub fn line_total(&self) -> Money {
        equipment_line_total(self.quantity, self.price, self.markup)
    }

    pub fn recalculate(&mut self) {
        self.total = self.line_total();
    }
}

/// A part line (tracked separately through the parts library).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct PartLine {
    pub part_number: String,
    pub description: String,
    pub price: Money,
    pub quantity: i64,
    #[serde(default)]
    pub total: Money,
}

impl PartLine {
    pub fn new(
        part_number: impl Into<String>,
        description: impl Into<String>,
        price: Money,
        quantity: i64,
    ) -> Self {
        let mut line = PartLine {
            part_number: part_number.into(),
            description: description.into(),
            price,
            quantity,
            total: Money::zero(),
        };
        line.recalculate();
        line
    }

    pub fn line_total(&self) -> Money {
        part_line_total(self.price, self.quantity)
    }

    pub fn recalculate(&mut self) {
        self.total = self.line_total();
    }
}

// =============================================================================
// Quote Totals
// =============================================================================

/// Section subtotals, tax and grand total for one quote.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct QuoteTotals {
    pub labor_subtotal: Money,
    pub equipment_subtotal: Money,
    pub parts_subtotal: Money,
    pub subtotal: Money,
    pub tax_amount: Money,
    pub grand_total: Money,
}

impl QuoteTotals {
    /// Computes every total from the line items.
    pub fn compute(
        labor: &[LaborLine],
        equipment: &[EquipmentLine],
        parts: &[PartLine],
        tax_rate: Percent,
    ) -> Self {
        let labor_subtotal: Money = labor.iter().map(LaborLine::line_total).sum();
        let equipment_subtotal: Money = equipment.iter().map(EquipmentLine::line_total).sum();
        let parts_subtotal: Money = parts.iter().map(PartLine::line_total).sum();

        let subtotal = labor_subtotal + equipment_subtotal + parts_subtotal;
        let tax_amount = tax_amount(subtotal, tax_rate);

        QuoteTotals {
            labor_subtotal,
            equipment_subtotal,
            parts_subtotal,
            subtotal,
            tax_amount,
            grand_total: subtotal + tax_amount,
        }
    }

    /// The tax row is displayed only when there is tax to show.
    pub fn shows_tax_row(&self) -> bool {
        self.tax_amount.is_positive()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_labor_line_total_fractional_hours() {
        // 7.75h × $80 = $620.00
        assert_eq!(
            labor_line_total(Hours::from_hundredths(775), Money::from_dollars(80)),
            Money::from_dollars(620)
        );
    }

    #[test]
    fn test_equipment_line_total_rounds_once() {
        // 3 × $12.10 × 1.15 = $41.745 → $41.75
        assert_eq!(
            equipment_line_total(3, Money::from_cents(1210), Percent::from_whole(15)),
            Money::from_cents(4175)
        );
    }

    #[test]
    fn test_part_line_total() {
        assert_eq!(
            part_line_total(Money::from_cents(1299), 4),
            Money::from_cents(5196)
        );
    }

    #[test]
    fn test_final_unit_price() {
        // $250 with 10% discount and ×1.5 multiplier = $337.50
        assert_eq!(
            final_unit_price(
                Money::from_dollars(250),
                Percent::from_whole(10),
                Multiplier::from_ten_thousandths(15_000)
            ),
            Money::from_cents(33_750)
        );
        // no modifiers: unchanged
        assert_eq!(
            final_unit_price(Money::from_dollars(85), Percent::zero(), Multiplier::ONE),
            Money::from_dollars(85)
        );
    }

    #[test]
    fn test_grand_total_reference_quote() {
        let labor = vec![LaborLine::new("Install", Hours::whole(8), Money::from_dollars(75))];
        let equipment = vec![EquipmentLine::new(
            "Generator",
            2,
            Money::from_dollars(50),
            Percent::from_whole(10),
        )];

        let totals = QuoteTotals::compute(&labor, &equipment, &[], Percent::from_whole(8));

        assert_eq!(totals.labor_subtotal.to_string(), "$600.00");
        assert_eq!(totals.equipment_subtotal.to_string(), "$110.00");
        assert_eq!(totals.subtotal.to_string(), "$710.00");
        assert_eq!(totals.tax_amount.to_string(), "$56.80");
        assert_eq!(totals.grand_total.to_string(), "$766.80");
        assert!(totals.shows_tax_row());
    }

    #[test]
    fn test_zero_tax_hides_row() {
        let labor = vec![LaborLine::new("Service call", Hours::whole(1), Money::from_dollars(95))];
        let totals = QuoteTotals::compute(&labor, &[], &[], Percent::zero());
        assert_eq!(totals.grand_total, Money::from_dollars(95));
        assert!(!totals.shows_tax_row());
    }

    #[test]
    fn test_linked_inventory_id_ignores_blank() {
        let mut line = EquipmentLine::new("Lift", 1, Money::from_dollars(175), Percent::zero());
        assert_eq!(line.linked_inventory_id(), None);
        line.inventory_id = Some("  ".to_string());
        assert_eq!(line.linked_inventory_id(), None);
        let line = line.linked_to("inv-006");
        assert_eq!(line.linked_inventory_id(), Some("inv-006"));
    }

    #[test]
    fn test_equipment_line_document_shape() {
        let json = r#"{"description":"Ladder","quantity":2,"price":85,"markup":0,"total":170,"inventoryId":""}"#;
        let line: EquipmentLine = serde_json::from_str(json).unwrap();
        assert_eq!(line.price, Money::from_dollars(85));
        assert_eq!(line.linked_inventory_id(), None);
    }
}
