//! Persistence seam for storefront-service.
//!
//! Every method is one atomic unit against the backing store. Multi-row writes
//! (order settlement, user removal) either fully apply or leave no trace.

use crate::models::{
    Coupon, InventoryItem, InventoryItemChanges, NewCoupon, NewInventoryItem, NewSupplier,
    NewOrderLine, NewUser, Order, OrderChanges, OrderFilter, PointsAccount, Settlement, Supplier,
    SupplierChanges, User, UserChanges,
};
use async_trait::async_trait;
use rust_decimal::Decimal;
use service_core::error::AppError;
use std::collections::BTreeMap;
use uuid::Uuid;

#[async_trait]
pub trait Repository: Send + Sync {
    async fn health_check(&self) -> Result<(), AppError>;

    // -------------------------------------------------------------------------
    // Users
    // -------------------------------------------------------------------------

    async fn create_user(&self, input: &NewUser) -> Result<User, AppError>;
    async fn list_users(&self) -> Result<Vec<User>, AppError>;
    async fn get_user(&self, user_id: Uuid) -> Result<Option<User>, AppError>;
    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>, AppError>;
    async fn update_user(
        &self,
        user_id: Uuid,
        changes: &UserChanges,
    ) -> Result<Option<User>, AppError>;
    /// Remove a user together with their order lines, orders and points account.
    async fn delete_user(&self, user_id: Uuid) -> Result<Option<User>, AppError>;

    // -------------------------------------------------------------------------
    // Inventory
    // -------------------------------------------------------------------------

    async fn create_item(&self, input: &NewInventoryItem) -> Result<InventoryItem, AppError>;
    /// Items that are not soft-deleted.
    async fn list_items(&self) -> Result<Vec<InventoryItem>, AppError>;
    /// Any item, soft-deleted or not.
    async fn get_item(&self, item_id: Uuid) -> Result<Option<InventoryItem>, AppError>;
    async fn get_items(&self, item_ids: &[Uuid]) -> Result<Vec<InventoryItem>, AppError>;
    async fn update_item(
        &self,
        item_id: Uuid,
        changes: &InventoryItemChanges,
    ) -> Result<Option<InventoryItem>, AppError>;
    async fn soft_delete_item(&self, item_id: Uuid) -> Result<Option<InventoryItem>, AppError>;

    // -------------------------------------------------------------------------
    // Coupons
    // -------------------------------------------------------------------------

    /// Fails with `NotFound` if an allowed item does not exist and `Conflict`
    /// if the code is taken.
    async fn create_coupon(&self, input: &NewCoupon) -> Result<Coupon, AppError>;
    async fn list_coupons(&self) -> Result<Vec<Coupon>, AppError>;
    async fn get_coupon(&self, coupon_id: Uuid) -> Result<Option<Coupon>, AppError>;
    async fn deactivate_coupon(&self, coupon_id: Uuid) -> Result<Option<Coupon>, AppError>;
    async fn delete_coupon(&self, coupon_id: Uuid) -> Result<Option<Coupon>, AppError>;

    // -------------------------------------------------------------------------
    // Suppliers
    // -------------------------------------------------------------------------

    async fn create_supplier(&self, input: &NewSupplier) -> Result<Supplier, AppError>;
    async fn list_suppliers(&self) -> Result<Vec<Supplier>, AppError>;
    async fn get_supplier(&self, supplier_id: Uuid) -> Result<Option<Supplier>, AppError>;
    async fn update_supplier(
        &self,
        supplier_id: Uuid,
        changes: &SupplierChanges,
    ) -> Result<Option<Supplier>, AppError>;
    async fn delete_supplier(&self, supplier_id: Uuid) -> Result<Option<Supplier>, AppError>;

    // -------------------------------------------------------------------------
    // Orders
    // -------------------------------------------------------------------------

    /// Persist a priced order in one transaction: debit redeemed points,
    /// decrement stock, insert the order and its lines, credit earned points.
    async fn settle_order(&self, settlement: &Settlement) -> Result<Order, AppError>;
    /// Newest first, soft-deleted orders excluded.
    async fn list_orders(&self, filter: &OrderFilter) -> Result<Vec<Order>, AppError>;
    async fn get_order(&self, order_id: Uuid) -> Result<Option<Order>, AppError>;
    async fn update_order(
        &self,
        order_id: Uuid,
        changes: &OrderChanges,
    ) -> Result<Option<Order>, AppError>;
    /// Fails with `NotFound` or, when the order is not `Pending`,
    /// `InvalidStateTransition`.
    async fn soft_delete_order(&self, order_id: Uuid) -> Result<Order, AppError>;

    // -------------------------------------------------------------------------
    // Points
    // -------------------------------------------------------------------------

    /// Add to a user's balance, opening the account on first credit.
    async fn credit_points(&self, user_id: Uuid, amount: Decimal)
        -> Result<PointsAccount, AppError>;
    /// Subtract from a user's balance; `InsufficientBalance` if it would go negative.
    async fn debit_points(&self, user_id: Uuid, amount: Decimal)
        -> Result<PointsAccount, AppError>;
    async fn get_points(&self, user_id: Uuid) -> Result<Option<PointsAccount>, AppError>;
    /// All accounts with their owning user attached.
    async fn list_points(&self) -> Result<Vec<PointsAccount>, AppError>;
}

pub(crate) fn insufficient_balance(available: Decimal, requested: Decimal) -> AppError {
    AppError::InsufficientBalance(anyhow::anyhow!(
        "Insufficient points: balance {}, requested {}",
        available,
        requested
    ))
}

pub(crate) fn user_not_found(user_id: Uuid) -> AppError {
    AppError::NotFound(anyhow::anyhow!("User {} not found", user_id))
}

pub(crate) fn item_not_found(item_id: Uuid) -> AppError {
    AppError::NotFound(anyhow::anyhow!("Inventory item {} not found", item_id))
}

/// Total quantity requested per item, in ascending item id order.
pub(crate) fn stock_demand(lines: &[NewOrderLine]) -> Result<BTreeMap<Uuid, i32>, AppError> {
    let mut demand: BTreeMap<Uuid, i32> = BTreeMap::new();
    for line in lines {
        let total = demand.entry(line.inventory_id).or_insert(0);
        *total = total.checked_add(line.quantity).ok_or_else(|| {
            AppError::BadRequest(anyhow::anyhow!(
                "Total quantity for item {} is too large",
                line.inventory_id
            ))
        })?;
    }
    Ok(demand)
}
