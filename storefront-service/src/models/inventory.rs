//! Inventory item model.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Sellable catalog item. Never physically removed: `delete_status` hides it
/// from listings while historical order lines keep pointing at it.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryItem {
    pub id: Uuid,
    pub name: String,
    pub price: Decimal,
    pub description: String,
    pub image_url: String,
    pub in_stock: i32,
    pub delete_status: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl InventoryItem {
    /// Whether the item can still be ordered.
    pub fn is_available(&self) -> bool {
        !self.delete_status
    }
}

/// Input for creating an inventory item.
#[derive(Debug, Clone)]
pub struct NewInventoryItem {
    pub name: String,
    pub price: Decimal,
    pub description: String,
    pub image_url: String,
    pub in_stock: i32,
}

/// Partial update; `None` leaves the column untouched.
#[derive(Debug, Clone, Default)]
pub struct InventoryItemChanges {
    pub name: Option<String>,
    pub price: Option<Decimal>,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub in_stock: Option<i32>,
    pub delete_status: Option<bool>,
}

impl InventoryItemChanges {
    /// Apply the changes to an in-memory item.
    pub fn apply(&self, item: &mut InventoryItem) {
        if let Some(name) = &self.name {
            item.name = name.clone();
        }
        if let Some(price) = self.price {
            item.price = price;
        }
        if let Some(description) = &self.description {
            item.description = description.clone();
        }
        if let Some(image_url) = &self.image_url {
            item.image_url = image_url.clone();
        }
        if let Some(in_stock) = self.in_stock {
            item.in_stock = in_stock;
        }
        if let Some(delete_status) = self.delete_status {
            item.delete_status = delete_status;
        }
    }
}
