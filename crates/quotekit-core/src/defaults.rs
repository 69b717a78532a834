//! # Seed Documents
//!
//! Every document key has a defined default that is returned when the key
//! has never been written: a starter rental catalog, its categories, and
//! the stock scope/notes/exclusions templates.

use std::collections::BTreeMap;

use crate::inventory::{InventoryItem, GENERAL_CATEGORY};
use crate::money::Money;
use crate::template::{TemplateClass, CUSTOM_TEMPLATE_KEY};
use crate::types::{Multiplier, Percent};

/// `(id, name, model, description, price $, stock, category)`
const SEED_ITEMS: &[(&str, &str, &str, &str, i64, i64, &str)] = &[
    ("inv-001", "Generator", "Honda EU7000iS", "7000W portable inverter generator", 250, 4, "Power Equipment"),
    ("inv-002", "Wire Puller", "Greenlee 555", "Power cable puller for conduit runs", 180, 3, "Tools"),
    ("inv-003", "Conduit Bender", "Greenlee 881", "Electric conduit bender for EMT and rigid", 95, 6, "Tools"),
    ("inv-004", "Cable Tester", "Fluke TS90", "Network and coax cable tester", 320, 2, "Testing Equipment"),
    ("inv-005", "Multimeter", "Fluke 87V", "True-RMS industrial multimeter", 280, 5, "Testing Equipment"),
    ("inv-006", "Lift", "Genie GS-1930", "19 ft electric scissor lift", 175, 3, "Access Equipment"),
    ("inv-007", "Ladder", "Werner D6232", "32 ft fiberglass extension ladder", 85, 8, "Access Equipment"),
    ("inv-008", "Cable Puller", "Greenlee 555-M", "Compact cable puller with mobile cart", 150, 4, "Tools"),
];

const SEED_CATEGORIES: &[&str] = &[
    "Power Equipment",
    "Tools",
    "Testing Equipment",
    "Access Equipment",
    "Safety Equipment",
    GENERAL_CATEGORY,
];

/// Starter rental catalog (document `inventory`).
pub fn inventory_items() -> Vec<InventoryItem> {
    SEED_ITEMS
        .iter()
        .map(
            |&(id, name, model, description, dollars, stock, category)| InventoryItem {
                id: id.to_string(),
                name: name.to_string(),
                model: model.to_string(),
                description: description.to_string(),
                price: Money::from_dollars(dollars),
                discount: Percent::zero(),
                multiplier: Multiplier::ONE,
                stock,
                category: category.to_string(),
            },
        )
        .collect()
}

/// Starter category list (document `inventoryCategories`).
pub fn inventory_categories() -> Vec<String> {
    SEED_CATEGORIES.iter().map(|c| c.to_string()).collect()
}

/// Stock templates for one text class.
pub fn templates(class: TemplateClass) -> BTreeMap<String, String> {
    let entries: &[(&str, &str)] = match class {
        TemplateClass::Scope => &[
            (
                "residential",
                "Furnish and install electrical wiring, devices and fixtures for the residential \
                 project described above. All work performed per NEC and local code.",
            ),
            (
                "commercial",
                "Furnish labor, equipment and materials for commercial electrical installation \
                 including branch circuits, panel terminations and fixture mounting per approved plans.",
            ),
            (
                "service_upgrade",
                "Upgrade existing electrical service, including removal of the existing panel, \
                 installation of a new main panel, meter base coordination with the utility and \
                 re-termination of existing circuits.",
            ),
            (
                "troubleshooting",
                "Diagnose and repair reported electrical faults. Includes testing of affected \
                 circuits, identification of root cause and repair of failed components.",
            ),
            (
                "lighting",
                "Furnish and install interior and exterior lighting fixtures, controls and \
                 associated wiring as described above.",
            ),
        ],
        TemplateClass::Notes => &[
            (
                "standard",
                "Quote valid for 30 days. Payment due upon completion unless otherwise agreed in writing.",
            ),
            (
                "site",
                "Customer to provide clear access to work areas and electrical panels. \
                 Site must be ready for work on the scheduled date.",
            ),
            (
                "materials",
                "Material pricing subject to change based on supplier availability at time of purchase.",
            ),
            (CUSTOM_TEMPLATE_KEY, ""),
        ],
        TemplateClass::Exclusions => &[
            (
                "standard",
                "Excludes patching, painting, trenching, concrete work and any work not \
                 specifically listed above.",
            ),
            (
                "permits",
                "Permit and inspection fees are not included and will be billed at cost.",
            ),
            (
                "materials",
                "Owner-furnished fixtures and equipment are excluded from warranty coverage.",
            ),
            (CUSTOM_TEMPLATE_KEY, ""),
        ],
    };

    entries
        .iter()
        .map(|(key, text)| (key.to_string(), text.to_string()))
        .collect()
}
