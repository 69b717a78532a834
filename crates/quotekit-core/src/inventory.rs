//! # Inventory Aggregate
//!
//! Catalog of rentable equipment with stock counts, pricing modifiers and
//! category membership.
//!
//! ## Invariants
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  • "General" is always present in the category list                    │
//! │  • every item's category is a known category                           │
//! │  • stock never goes negative                                           │
//! │  • a stock deduction either applies to every requested item or to none │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

use crate::calc::final_unit_price;
use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;
use crate::types::{Multiplier, Percent};
use crate::validation::validate_required;

/// Category every orphaned item falls back to.
pub const GENERAL_CATEGORY: &str = "General";

// =============================================================================
// Inventory Item
// =============================================================================

/// A rentable or consumable item (one entry of the `inventory` document).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct InventoryItem {
    pub id: String,
    pub name: String,
    pub model: String,
    #[serde(default)]
    pub description: String,
    pub price: Money,
    #[serde(default)]
    pub discount: Percent,
    #[serde(default)]
    pub multiplier: Multiplier,
    #[serde(default)]
    pub stock: i64,
    #[serde(default = "general_category")]
    pub category: String,
}

fn general_category() -> String {
    GENERAL_CATEGORY.to_string()
}

impl InventoryItem {
    /// Price quoted for one unit: base × (1 − discount) × multiplier.
    pub fn final_price(&self) -> Money {
        final_unit_price(self.price, self.discount, self.multiplier)
    }
}

/// Form input for adding or editing an item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct InventoryItemInput {
    pub name: String,
    pub model: String,
    #[serde(default)]
    pub description: String,
    pub price: Money,
    #[serde(default)]
    pub discount: Percent,
    #[serde(default)]
    pub multiplier: Multiplier,
    #[serde(default)]
    pub stock: i64,
    #[serde(default)]
    pub category: String,
}

impl InventoryItemInput {
    /// Validates the form, returning trimmed `(name, model)`.
    fn validate(&self) -> CoreResult<(String, String)> {
        let name = validate_required("name", &self.name)?;
        let model = validate_required("model", &self.model)?;

        if self.price.is_negative() {
            return Err(ValidationError::OutOfRange {
                field: "price".to_string(),
                min: 0,
                max: i64::MAX,
            }
            .into());
        }
        if self.discount.bps() >= Percent::FULL_BPS {
            return Err(ValidationError::OutOfRange {
                field: "discount".to_string(),
                min: 0,
                max: 99,
            }
            .into());
        }
        if self.multiplier.ten_thousandths() == 0 {
            return Err(ValidationError::positive("multiplier").into());
        }
        if self.stock < 0 {
            return Err(ValidationError::OutOfRange {
                field: "stock".to_string(),
                min: 0,
                max: i64::MAX,
            }
            .into());
        }
        Ok((name, model))
    }
}

// =============================================================================
// Listing
// =============================================================================

/// Sort order for inventory listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum InventorySort {
    #[default]
    Name,
    Category,
    /// Highest base price first.
    PriceDesc,
    /// Highest stock first.
    StockDesc,
}

/// Listing filter: substring search plus optional category.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase", default)]
#[ts(export)]
pub struct InventoryQuery {
    /// Case-insensitive match on name, model or description.
    pub search: String,
    pub category: Option<String>,
    pub sort: InventorySort,
}

// =============================================================================
// Stock Movements
// =============================================================================

/// Quantity of one item requested by an approval.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StockRequest {
    pub item_id: String,
    pub quantity: i64,
}

/// One item that cannot cover its requested quantity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct StockShortfall {
    pub item_id: String,
    pub name: String,
    pub available: i64,
    pub requested: i64,
}

/// A deduction that was applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct StockDeduction {
    pub item_id: String,
    pub name: String,
    pub quantity: i64,
    pub remaining: i64,
}

// =============================================================================
// Inventory Aggregate
// =============================================================================

/// Items plus the category list (documents `inventory` and
/// `inventoryCategories`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Inventory {
    items: Vec<InventoryItem>,
    categories: Vec<String>,
}

impl Inventory {
    /// Builds the aggregate from its two documents, repairing category
    /// references.
    ///
    /// ## Repairs
    /// - "General" is appended to the category list when missing
    /// - items pointing at an unknown category move to "General"
    pub fn new(items: Vec<InventoryItem>, categories: Vec<String>) -> Self {
        let mut inventory = Inventory { items, categories };
        inventory.normalize();
        inventory
    }

    fn normalize(&mut self) {
        if !self.has_category(GENERAL_CATEGORY) {
            self.categories.push(GENERAL_CATEGORY.to_string());
        }
        for item in &mut self.items {
            if !self.categories.iter().any(|c| *c == item.category) {
                item.category = GENERAL_CATEGORY.to_string();
            }
        }
    }

    pub fn items(&self) -> &[InventoryItem] {
        &self.items
    }

    pub fn categories(&self) -> &[String] {
        &self.categories
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&InventoryItem> {
        self.items.iter().find(|item| item.id == id)
    }

    fn has_category(&self, name: &str) -> bool {
        self.categories.iter().any(|c| c == name)
    }

    /// Resolves a submitted category, falling back to "General".
    fn resolve_category(&self, requested: &str) -> String {
        let requested = requested.trim();
        if self.has_category(requested) {
            requested.to_string()
        } else {
            GENERAL_CATEGORY.to_string()
        }
    }

    // =========================================================================
    // Item CRUD
    // =========================================================================

    /// Adds an item with a freshly generated id.
    pub fn add(&mut self, input: InventoryItemInput) -> CoreResult<&InventoryItem> {
        let (name, model) = input.validate()?;
        let item = InventoryItem {
            id: format!("inv-{}", Uuid::new_v4().simple()),
            name,
            model,
            description: input.description.trim().to_string(),
            price: input.price,
            discount: input.discount,
            multiplier: input.multiplier,
            stock: input.stock,
            category: self.resolve_category(&input.category),
        };
        self.items.push(item);
        let index = self.items.len() - 1;
        Ok(&self.items[index])
    }

    /// Replaces every editable field of an existing item.
    pub fn edit(&mut self, id: &str, input: InventoryItemInput) -> CoreResult<&InventoryItem> {
        let (name, model) = input.validate()?;
        let category = self.resolve_category(&input.category);
        let index = self
            .items
            .iter()
            .position(|item| item.id == id)
            .ok_or_else(|| CoreError::InventoryItemNotFound(id.to_string()))?;

        let item = &mut self.items[index];
        item.name = name;
        item.model = model;
        item.description = input.description.trim().to_string();
        item.price = input.price;
        item.discount = input.discount;
        item.multiplier = input.multiplier;
        item.stock = input.stock;
        item.category = category;
        Ok(&self.items[index])
    }

    /// Removes an item. Historical quotes keep their own copy of the line.
    pub fn delete(&mut self, id: &str) -> CoreResult<InventoryItem> {
        let index = self
            .items
            .iter()
            .position(|item| item.id == id)
            .ok_or_else(|| CoreError::InventoryItemNotFound(id.to_string()))?;
        Ok(self.items.remove(index))
    }

    /// Filters and sorts the catalog.
    pub fn list(&self, query: &InventoryQuery) -> Vec<&InventoryItem> {
        let needle = query.search.trim().to_lowercase();
        let category = query
            .category
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty());

        let mut matches: Vec<&InventoryItem> = self
            .items
            .iter()
            .filter(|item| category.map_or(true, |c| item.category == c))
            .filter(|item| {
                needle.is_empty()
                    || item.name.to_lowercase().contains(&needle)
                    || item.model.to_lowercase().contains(&needle)
                    || item.description.to_lowercase().contains(&needle)
            })
            .collect();

        let by_name = |a: &&InventoryItem, b: &&InventoryItem| {
            a.name.to_lowercase().cmp(&b.name.to_lowercase())
        };
        matches.sort_by(|a, b| match query.sort {
            InventorySort::Name => by_name(a, b),
            InventorySort::Category => a
                .category
                .to_lowercase()
                .cmp(&b.category.to_lowercase())
                .then_with(|| by_name(a, b)),
            InventorySort::PriceDesc => b.price.cmp(&a.price).then_with(|| by_name(a, b)),
            InventorySort::StockDesc => b.stock.cmp(&a.stock).then_with(|| by_name(a, b)),
        });
        matches
    }

    // =========================================================================
    // Categories
    // =========================================================================

    /// Adds a category (unique, case-insensitive).
    pub fn add_category(&mut self, name: &str) -> CoreResult<String> {
        let name = validate_required("category", name)?;
        if self.categories.iter().any(|c| c.eq_ignore_ascii_case(&name)) {
            return Err(ValidationError::Duplicate {
                field: "category".to_string(),
                value: name,
            }
            .into());
        }
        self.categories.push(name.clone());
        Ok(name)
    }

    /// Renames a category and re-labels its items.
    ///
    /// ## Returns
    /// Number of items moved to the new name.
    pub fn rename_category(&mut self, old: &str, new: &str) -> CoreResult<usize> {
        let new = validate_required("category", new)?;
        let index = self
            .categories
            .iter()
            .position(|c| c == old)
            .ok_or_else(|| CoreError::CategoryNotFound(old.to_string()))?;

        if old == GENERAL_CATEGORY {
            return Err(ValidationError::NotAllowed {
                field: "category".to_string(),
                value: old.to_string(),
                reason: "the fallback category cannot be renamed".to_string(),
            }
            .into());
        }
        let clashes = self
            .categories
            .iter()
            .enumerate()
            .any(|(i, c)| i != index && c.eq_ignore_ascii_case(&new));
        if clashes {
            return Err(ValidationError::Duplicate {
                field: "category".to_string(),
                value: new,
            }
            .into());
        }

        self.categories[index] = new.clone();
        let mut moved = 0;
        for item in self.items.iter_mut().filter(|item| item.category == old) {
            item.category = new.clone();
            moved += 1;
        }
        Ok(moved)
    }

    /// Removes a category; its items move to "General".
    ///
    /// ## Returns
    /// Number of items reassigned.
    pub fn remove_category(&mut self, name: &str) -> CoreResult<usize> {
        if name == GENERAL_CATEGORY {
            return Err(ValidationError::NotAllowed {
                field: "category".to_string(),
                value: name.to_string(),
                reason: "the fallback category cannot be removed".to_string(),
            }
            .into());
        }
        let index = self
            .categories
            .iter()
            .position(|c| c == name)
            .ok_or_else(|| CoreError::CategoryNotFound(name.to_string()))?;

        self.categories.remove(index);
        let mut reassigned = 0;
        for item in self.items.iter_mut().filter(|item| item.category == name) {
            item.category = GENERAL_CATEGORY.to_string();
            reassigned += 1;
        }
        Ok(reassigned)
    }

    // =========================================================================
    // Stock
    // =========================================================================

    /// Deducts stock for every request, or for none of them.
    ///
    /// ## All-or-Nothing
    /// ```text
    /// requests: [inv-001 × 3, inv-006 × 3]     stock: [5, 2]
    ///      │
    ///      ▼
    /// Phase 1: sum per item, check EVERY item   → inv-006 short by 1
    ///      │
    ///      ▼
    /// Err(InsufficientStock)                    stock still [5, 2]
    /// ```
    /// Requests for the same item are summed before checking.
    pub fn deduct_stock(&mut self, requests: &[StockRequest]) -> CoreResult<Vec<StockDeduction>> {
        let mut totals: Vec<(usize, i64)> = Vec::new();
        for request in requests {
            let index = self
                .items
                .iter()
                .position(|item| item.id == request.item_id)
                .ok_or_else(|| CoreError::InventoryItemNotFound(request.item_id.clone()))?;
            match totals.iter_mut().find(|(i, _)| *i == index) {
                Some((_, quantity)) => *quantity += request.quantity,
                None => totals.push((index, request.quantity)),
            }
        }

        let shortfalls: Vec<StockShortfall> = totals
            .iter()
            .filter_map(|&(index, requested)| {
                let item = &self.items[index];
                (item.stock < requested).then(|| StockShortfall {
                    item_id: item.id.clone(),
                    name: item.name.clone(),
                    available: item.stock,
                    requested,
                })
            })
            .collect();

        if !shortfalls.is_empty() {
            return Err(CoreError::InsufficientStock { shortfalls });
        }

        Ok(totals
            .into_iter()
            .map(|(index, quantity)| {
                let item = &mut self.items[index];
                item.stock -= quantity;
                StockDeduction {
                    item_id: item.id.clone(),
                    name: item.name.clone(),
                    quantity,
                    remaining: item.stock,
                }
            })
            .collect())
    }

    /// Splits the aggregate back into its two documents.
    pub fn into_parts(self) -> (Vec<InventoryItem>, Vec<String>) {
        (self.items, self.categories)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::defaults;

    fn seeded() -> Inventory {
        Inventory::new(defaults::inventory_items(), defaults::inventory_categories())
    }

    fn input(name: &str, model: &str, category: &str) -> InventoryItemInput {
        InventoryItemInput {
            name: name.to_string(),
            model: model.to_string(),
            description: String::new(),
            price: Money::from_dollars(40),
            discount: Percent::zero(),
            multiplier: Multiplier::ONE,
            stock: 3,
            category: category.to_string(),
        }
    }

    #[test]
    fn test_new_adds_general_and_repairs_orphans() {
        let mut items = defaults::inventory_items();
        items[0].category = "Retired".to_string();
        let inventory = Inventory::new(items, vec!["Tools".to_string()]);

        assert!(inventory.categories().contains(&GENERAL_CATEGORY.to_string()));
        assert_eq!(inventory.items()[0].category, GENERAL_CATEGORY);
    }

    #[test]
    fn test_add_requires_name_and_model() {
        let mut inventory = seeded();
        let err = inventory.add(input("  ", "X1", "Tools")).unwrap_err();
        assert!(err.is_validation());
        let err = inventory.add(input("Drill", "", "Tools")).unwrap_err();
        assert!(err.is_validation());
        assert_eq!(inventory.len(), 8);
    }

    #[test]
    fn test_add_unknown_category_defaults_to_general() {
        let mut inventory = seeded();
        let item = inventory.add(input("Drill", "DCD791", "Cordless")).unwrap();
        assert_eq!(item.category, GENERAL_CATEGORY);
        assert!(item.id.starts_with("inv-"));
    }

    #[test]
    fn test_add_rejects_full_discount() {
        let mut inventory = seeded();
        let mut form = input("Drill", "DCD791", "Tools");
        form.discount = Percent::from_whole(100);
        assert!(inventory.add(form).is_err());
    }

    #[test]
    fn test_edit_and_delete() {
        let mut inventory = seeded();
        let mut form = input("Generator XL", "Honda EU7000iS", "Power Equipment");
        form.stock = 9;
        let edited = inventory.edit("inv-001", form).unwrap();
        assert_eq!(edited.stock, 9);
        assert_eq!(edited.name, "Generator XL");

        let removed = inventory.delete("inv-001").unwrap();
        assert_eq!(removed.id, "inv-001");
        assert!(inventory.get("inv-001").is_none());
        assert!(matches!(
            inventory.delete("inv-001"),
            Err(CoreError::InventoryItemNotFound(_))
        ));
    }

    #[test]
    fn test_list_search_filter_sort() {
        let inventory = seeded();

        let fluke = inventory.list(&InventoryQuery {
            search: "fluke".to_string(),
            ..Default::default()
        });
        assert_eq!(fluke.len(), 2);

        let tools = inventory.list(&InventoryQuery {
            category: Some("Tools".to_string()),
            sort: InventorySort::PriceDesc,
            ..Default::default()
        });
        let names: Vec<_> = tools.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, vec!["Wire Puller", "Cable Puller", "Conduit Bender"]);

        let by_stock = inventory.list(&InventoryQuery {
            sort: InventorySort::StockDesc,
            ..Default::default()
        });
        assert_eq!(by_stock[0].name, "Ladder");
    }

    #[test]
    fn test_remove_category_reassigns_items() {
        let mut inventory = seeded();
        let before = inventory.len();
        let tools = inventory
            .items()
            .iter()
            .filter(|i| i.category == "Tools")
            .count();

        let reassigned = inventory.remove_category("Tools").unwrap();

        assert_eq!(reassigned, tools);
        assert_eq!(inventory.len(), before);
        assert!(!inventory.categories().contains(&"Tools".to_string()));
        assert_eq!(
            inventory
                .items()
                .iter()
                .filter(|i| i.category == GENERAL_CATEGORY)
                .count(),
            tools
        );
    }

    #[test]
    fn test_general_cannot_be_removed() {
        let mut inventory = seeded();
        assert!(inventory.remove_category(GENERAL_CATEGORY).is_err());
        assert!(inventory.categories().contains(&GENERAL_CATEGORY.to_string()));
    }

    #[test]
    fn test_rename_category_moves_items() {
        let mut inventory = seeded();
        let moved = inventory.rename_category("Testing Equipment", "Meters").unwrap();
        assert_eq!(moved, 2);
        assert!(inventory.items().iter().any(|i| i.category == "Meters"));
        assert!(inventory.rename_category("Meters", "tools").is_err());
    }

    #[test]
    fn test_add_category_rejects_duplicates() {
        let mut inventory = seeded();
        assert!(inventory.add_category("tools").is_err());
        assert_eq!(inventory.add_category(" Lighting ").unwrap(), "Lighting");
    }

    #[test]
    fn test_deduct_stock_is_all_or_nothing() {
        let mut items = defaults::inventory_items();
        items[0].stock = 5;
        items[1].stock = 2;
        let (a, b) = (items[0].id.clone(), items[1].id.clone());
        let mut inventory = Inventory::new(items, defaults::inventory_categories());

        let err = inventory
            .deduct_stock(&[
                StockRequest { item_id: a.clone(), quantity: 3 },
                StockRequest { item_id: b.clone(), quantity: 3 },
            ])
            .unwrap_err();

        match err {
            CoreError::InsufficientStock { shortfalls } => {
                assert_eq!(shortfalls.len(), 1);
                assert_eq!(shortfalls[0].item_id, b);
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(inventory.get(&a).unwrap().stock, 5);
        assert_eq!(inventory.get(&b).unwrap().stock, 2);
    }

    #[test]
    fn test_deduct_stock_sums_repeated_items() {
        let mut inventory = seeded();
        // Generator has 4 in stock: 3 + 2 on separate lines must fail.
        let err = inventory.deduct_stock(&[
            StockRequest { item_id: "inv-001".to_string(), quantity: 3 },
            StockRequest { item_id: "inv-001".to_string(), quantity: 2 },
        ]);
        assert!(err.is_err());
        assert_eq!(inventory.get("inv-001").unwrap().stock, 4);

        let deductions = inventory
            .deduct_stock(&[
                StockRequest { item_id: "inv-001".to_string(), quantity: 1 },
                StockRequest { item_id: "inv-001".to_string(), quantity: 3 },
            ])
            .unwrap();
        assert_eq!(deductions.len(), 1);
        assert_eq!(deductions[0].remaining, 0);
    }

    #[test]
    fn test_final_price_matches_calc_engine() {
        let mut item = seeded().get("inv-001").unwrap().clone();
        item.discount = Percent::from_whole(20);
        item.multiplier = Multiplier::from_ten_thousandths(12_500);
        // 250 × 0.8 × 1.25 = 250
        assert_eq!(item.final_price(), Money::from_dollars(250));
        assert_eq!(
            item.final_price(),
            final_unit_price(item.price, item.discount, item.multiplier)
        );
    }
}
