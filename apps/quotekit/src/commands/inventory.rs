//! # Inventory Commands

use serde::Serialize;
use tracing::debug;

use quotekit_core::inventory::InventoryQuery;
use quotekit_core::{InventoryItem, Money, Multiplier, Percent};

use crate::state::AppState;

/// Inventory row with the derived unit price.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryRow {
    pub id: String,
    pub name: String,
    pub model: String,
    pub category: String,
    pub price: Money,
    pub discount: Percent,
    pub multiplier: Multiplier,
    pub final_price: Money,
    pub stock: i64,
}

impl From<&InventoryItem> for InventoryRow {
    fn from(item: &InventoryItem) -> Self {
        InventoryRow {
            id: item.id.clone(),
            name: item.name.clone(),
            model: item.model.clone(),
            category: item.category.clone(),
            price: item.price,
            discount: item.discount,
            multiplier: item.multiplier,
            final_price: item.final_price(),
            stock: item.stock,
        }
    }
}

/// Lists items matching `search`, sorted by name.
pub async fn list_inventory(state: &AppState, search: &str) -> Vec<InventoryRow> {
    let query = InventoryQuery {
        search: search.to_string(),
        ..InventoryQuery::default()
    };
    let items = state.list_inventory(&query).await;
    debug!(search, count = items.len(), "Inventory listed");
    items.iter().map(InventoryRow::from).collect()
}
