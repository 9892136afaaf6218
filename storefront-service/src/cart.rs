//! Client-side shopping cart.
//!
//! The cart lives entirely with the client and is persisted as a JSON file.
//! It never talks to the store; checkout turns it into [`OrderItem`]s for
//! [`crate::services::OrderSettlement`].

use crate::models::InventoryItem;
use crate::services::OrderItem;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use service_core::error::AppError;
use std::io::ErrorKind;
use std::path::Path;
use tokio::fs;
use uuid::Uuid;

/// A catalog item snapshot together with the quantity wanted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    pub item: InventoryItem,
    pub quantity: i32,
}

impl CartItem {
    pub fn line_total(&self) -> Decimal {
        self.item.price * Decimal::from(self.quantity)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cart {
    items: Vec<CartItem>,
}

fn check_quantity(quantity: i32) -> Result<(), AppError> {
    if quantity < 1 {
        return Err(AppError::BadRequest(anyhow::anyhow!(
            "Quantity must be at least 1, got {}",
            quantity
        )));
    }
    Ok(())
}

impl Cart {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `quantity` of `item`. Adding an item already in the cart merges
    /// the quantities into the existing line.
    pub fn add(&mut self, item: InventoryItem, quantity: i32) -> Result<(), AppError> {
        check_quantity(quantity)?;
        match self.items.iter_mut().find(|line| line.item.id == item.id) {
            Some(line) => {
                line.quantity = line.quantity.checked_add(quantity).ok_or_else(|| {
                    AppError::BadRequest(anyhow::anyhow!(
                        "Quantity for item {} is too large",
                        line.item.id
                    ))
                })?;
            }
            None => self.items.push(CartItem { item, quantity }),
        }
        Ok(())
    }

    /// Replace the quantity of a line. Quantities never drop below 1; use
    /// [`Cart::remove`] to take a line out.
    pub fn set_quantity(&mut self, inventory_id: Uuid, quantity: i32) -> Result<(), AppError> {
        check_quantity(quantity)?;
        let line = self
            .items
            .iter_mut()
            .find(|line| line.item.id == inventory_id)
            .ok_or_else(|| {
                AppError::NotFound(anyhow::anyhow!("Item {} is not in the cart", inventory_id))
            })?;
        line.quantity = quantity;
        Ok(())
    }

    /// Remove a line. Returns whether anything was removed.
    pub fn remove(&mut self, inventory_id: Uuid) -> bool {
        let before = self.items.len();
        self.items.retain(|line| line.item.id != inventory_id);
        self.items.len() != before
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    pub fn items(&self) -> &[CartItem] {
        &self.items
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Sum of price times quantity over all lines, at the prices captured
    /// when the items were added.
    pub fn subtotal(&self) -> Decimal {
        self.items.iter().map(CartItem::line_total).sum()
    }

    pub fn to_order_items(&self) -> Vec<OrderItem> {
        self.items
            .iter()
            .map(|line| OrderItem {
                inventory_id: line.item.id,
                quantity: line.quantity,
            })
            .collect()
    }

    /// Load a cart from `path`. A missing file is an empty cart.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, AppError> {
        let data = match fs::read(path.as_ref()).await {
            Ok(data) => data,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Self::new()),
            Err(e) => return Err(e.into()),
        };
        serde_json::from_slice(&data).map_err(|e| {
            AppError::BadRequest(anyhow::anyhow!(
                "Corrupt cart file {}: {}",
                path.as_ref().display(),
                e
            ))
        })
    }

    /// Persist the cart to `path`. An empty cart removes the file.
    pub async fn save(&self, path: impl AsRef<Path>) -> Result<(), AppError> {
        let path = path.as_ref();
        if self.is_empty() {
            return match fs::remove_file(path).await {
                Err(e) if e.kind() != ErrorKind::NotFound => Err(e.into()),
                _ => Ok(()),
            };
        }
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }
        let data = serde_json::to_vec_pretty(self).map_err(anyhow::Error::new)?;
        fs::write(path, data).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::str::FromStr;

    fn item(name: &str, price: &str) -> InventoryItem {
        let now = Utc::now();
        InventoryItem {
            id: Uuid::new_v4(),
            name: name.to_string(),
            price: Decimal::from_str(price).unwrap(),
            description: String::new(),
            image_url: String::new(),
            in_stock: 10,
            delete_status: false,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_add_merges_existing_line() {
        let mug = item("Mug", "12.50");
        let mut cart = Cart::new();
        cart.add(mug.clone(), 1).unwrap();
        cart.add(mug.clone(), 2).unwrap();

        assert_eq!(cart.items().len(), 1);
        assert_eq!(cart.items()[0].quantity, 3);
        assert_eq!(cart.subtotal(), Decimal::from_str("37.50").unwrap());
    }

    #[test]
    fn test_quantity_never_below_one() {
        let mug = item("Mug", "12.50");
        let mut cart = Cart::new();
        assert!(matches!(cart.add(mug.clone(), 0), Err(AppError::BadRequest(_))));

        cart.add(mug.clone(), 2).unwrap();
        assert!(cart.set_quantity(mug.id, 0).is_err());
        assert_eq!(cart.items()[0].quantity, 2);

        cart.set_quantity(mug.id, 5).unwrap();
        assert_eq!(cart.items()[0].quantity, 5);
    }

    #[test]
    fn test_merge_overflow_is_rejected() {
        let mug = item("Mug", "12.50");
        let mut cart = Cart::new();
        cart.add(mug.clone(), i32::MAX).unwrap();

        assert!(matches!(cart.add(mug.clone(), 1), Err(AppError::BadRequest(_))));
        assert_eq!(cart.items()[0].quantity, i32::MAX);
    }

    #[test]
    fn test_set_quantity_of_missing_item() {
        let mut cart = Cart::new();
        let result = cart.set_quantity(Uuid::new_v4(), 1);
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[test]
    fn test_remove_and_clear() {
        let mug = item("Mug", "12.50");
        let pen = item("Pen", "1.25");
        let mut cart = Cart::new();
        cart.add(mug.clone(), 1).unwrap();
        cart.add(pen.clone(), 4).unwrap();

        assert!(cart.remove(mug.id));
        assert!(!cart.remove(mug.id));
        assert_eq!(cart.subtotal(), Decimal::from(5));

        cart.clear();
        assert!(cart.is_empty());
        assert_eq!(cart.subtotal(), Decimal::ZERO);
    }

    #[test]
    fn test_to_order_items_keeps_cart_order() {
        let mug = item("Mug", "12.50");
        let pen = item("Pen", "1.25");
        let mut cart = Cart::new();
        cart.add(mug.clone(), 1).unwrap();
        cart.add(pen.clone(), 4).unwrap();

        let lines = cart.to_order_items();
        assert_eq!(
            lines,
            vec![
                OrderItem { inventory_id: mug.id, quantity: 1 },
                OrderItem { inventory_id: pen.id, quantity: 4 },
            ]
        );
    }

    #[tokio::test]
    async fn test_persists_between_sessions() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cart.json");

        let empty = Cart::load(&path).await.unwrap();
        assert!(empty.is_empty());

        let mut cart = Cart::new();
        cart.add(item("Mug", "12.50"), 2).unwrap();
        cart.save(&path).await.unwrap();

        let restored = Cart::load(&path).await.unwrap();
        assert_eq!(restored, cart);

        cart.clear();
        cart.save(&path).await.unwrap();
        assert!(!path.exists());
        assert!(Cart::load(&path).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_corrupt_file_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cart.json");
        std::fs::write(&path, b"not json").unwrap();

        assert!(matches!(Cart::load(&path).await, Err(AppError::BadRequest(_))));
    }
}
