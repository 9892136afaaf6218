//! In-process store backend.
//!
//! All state sits behind one async lock and every repository call holds the
//! write lock for its whole duration, so each call is atomic and isolated.
//! Checks run before any mutation, which keeps failed calls side-effect free.

use super::repository::{
    insufficient_balance, item_not_found, stock_demand, user_not_found, Repository,
};
use crate::models::{
    Coupon, InventoryItem, InventoryItemChanges, NewCoupon, NewInventoryItem, NewSupplier,
    NewUser, Order, OrderChanges, OrderFilter, OrderLine, OrderStatus, PointsAccount, Settlement,
    Supplier, SupplierChanges, User, UserChanges,
};
use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use service_core::error::AppError;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{info, instrument};
use uuid::Uuid;

#[derive(Default)]
struct State {
    users: Vec<User>,
    items: Vec<InventoryItem>,
    coupons: Vec<Coupon>,
    suppliers: Vec<Supplier>,
    orders: Vec<Order>,
    points: Vec<PointsAccount>,
}

impl State {
    fn user(&self, user_id: Uuid) -> Option<&User> {
        self.users.iter().find(|u| u.id == user_id)
    }

    fn item(&self, item_id: Uuid) -> Option<&InventoryItem> {
        self.items.iter().find(|i| i.id == item_id)
    }

    fn account_mut(&mut self, user_id: Uuid) -> Option<&mut PointsAccount> {
        self.points.iter_mut().find(|p| p.user_id == user_id)
    }

    /// Attach the live inventory items and the user for display.
    fn hydrate(&self, order: &Order) -> Order {
        let mut order = order.clone();
        for line in &mut order.ordered_items {
            line.inventory = self.item(line.inventory_id).cloned();
        }
        order.user = self.user(order.user_id).cloned();
        order
    }

    fn credit(&mut self, user_id: Uuid, amount: Decimal) -> PointsAccount {
        let now = Utc::now();
        match self.account_mut(user_id) {
            Some(account) => {
                account.balance += amount;
                account.updated_at = now;
                account.clone()
            }
            None => {
                let account = PointsAccount {
                    id: Uuid::new_v4(),
                    user_id,
                    balance: amount,
                    created_at: now,
                    updated_at: now,
                    user: None,
                };
                self.points.push(account.clone());
                account
            }
        }
    }

    fn check_debit(&self, user_id: Uuid, amount: Decimal) -> Result<(), AppError> {
        let available = self
            .points
            .iter()
            .find(|p| p.user_id == user_id)
            .map(|p| p.balance)
            .unwrap_or(Decimal::ZERO);
        if available < amount {
            return Err(insufficient_balance(available, amount));
        }
        Ok(())
    }
}

/// Store backend kept entirely in memory; cheap to clone.
#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<RwLock<State>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Repository for MemoryStore {
    async fn health_check(&self) -> Result<(), AppError> {
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Users
    // -------------------------------------------------------------------------

    #[instrument(skip(self, input), fields(username = %input.username))]
    async fn create_user(&self, input: &NewUser) -> Result<User, AppError> {
        let mut state = self.state.write().await;
        if state.users.iter().any(|u| u.username == input.username) {
            return Err(AppError::Conflict(anyhow::anyhow!(
                "Username '{}' is already taken",
                input.username
            )));
        }

        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            name: input.name.clone(),
            username: input.username.clone(),
            email: input.email.clone(),
            contact_number: input.contact_number.clone(),
            role: input.role,
            password_hash: input.password_hash.clone(),
            created_at: now,
            updated_at: now,
        };
        state.users.push(user.clone());

        info!(user_id = %user.id, "User created");
        Ok(user)
    }

    async fn list_users(&self) -> Result<Vec<User>, AppError> {
        Ok(self.state.read().await.users.clone())
    }

    async fn get_user(&self, user_id: Uuid) -> Result<Option<User>, AppError> {
        Ok(self.state.read().await.user(user_id).cloned())
    }

    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>, AppError> {
        let state = self.state.read().await;
        Ok(state.users.iter().find(|u| u.username == username).cloned())
    }

    async fn update_user(
        &self,
        user_id: Uuid,
        changes: &UserChanges,
    ) -> Result<Option<User>, AppError> {
        let mut state = self.state.write().await;
        if let Some(username) = &changes.username {
            if state
                .users
                .iter()
                .any(|u| u.id != user_id && &u.username == username)
            {
                return Err(AppError::Conflict(anyhow::anyhow!(
                    "Username '{}' is already taken",
                    username
                )));
            }
        }

        let Some(user) = state.users.iter_mut().find(|u| u.id == user_id) else {
            return Ok(None);
        };
        changes.apply(user);
        user.updated_at = Utc::now();
        Ok(Some(user.clone()))
    }

    #[instrument(skip(self))]
    async fn delete_user(&self, user_id: Uuid) -> Result<Option<User>, AppError> {
        let mut state = self.state.write().await;
        let Some(position) = state.users.iter().position(|u| u.id == user_id) else {
            return Ok(None);
        };

        state.orders.retain(|o| o.user_id != user_id);
        state.points.retain(|p| p.user_id != user_id);
        let user = state.users.remove(position);

        info!(user_id = %user_id, "User and dependent records removed");
        Ok(Some(user))
    }

    // -------------------------------------------------------------------------
    // Inventory
    // -------------------------------------------------------------------------

    async fn create_item(&self, input: &NewInventoryItem) -> Result<InventoryItem, AppError> {
        let now = Utc::now();
        let item = InventoryItem {
            id: Uuid::new_v4(),
            name: input.name.clone(),
            price: input.price,
            description: input.description.clone(),
            image_url: input.image_url.clone(),
            in_stock: input.in_stock,
            delete_status: false,
            created_at: now,
            updated_at: now,
        };
        self.state.write().await.items.push(item.clone());
        Ok(item)
    }

    async fn list_items(&self) -> Result<Vec<InventoryItem>, AppError> {
        let state = self.state.read().await;
        Ok(state
            .items
            .iter()
            .filter(|i| !i.delete_status)
            .cloned()
            .collect())
    }

    async fn get_item(&self, item_id: Uuid) -> Result<Option<InventoryItem>, AppError> {
        Ok(self.state.read().await.item(item_id).cloned())
    }

    async fn get_items(&self, item_ids: &[Uuid]) -> Result<Vec<InventoryItem>, AppError> {
        let state = self.state.read().await;
        Ok(state
            .items
            .iter()
            .filter(|i| item_ids.contains(&i.id))
            .cloned()
            .collect())
    }

    async fn update_item(
        &self,
        item_id: Uuid,
        changes: &InventoryItemChanges,
    ) -> Result<Option<InventoryItem>, AppError> {
        let mut state = self.state.write().await;
        let Some(item) = state.items.iter_mut().find(|i| i.id == item_id) else {
            return Ok(None);
        };
        changes.apply(item);
        item.updated_at = Utc::now();
        Ok(Some(item.clone()))
    }

    async fn soft_delete_item(&self, item_id: Uuid) -> Result<Option<InventoryItem>, AppError> {
        self.update_item(
            item_id,
            &InventoryItemChanges {
                delete_status: Some(true),
                ..Default::default()
            },
        )
        .await
    }

    // -------------------------------------------------------------------------
    // Coupons
    // -------------------------------------------------------------------------

    async fn create_coupon(&self, input: &NewCoupon) -> Result<Coupon, AppError> {
        let mut state = self.state.write().await;
        if state
            .coupons
            .iter()
            .any(|c| c.coupon_code == input.coupon_code)
        {
            return Err(AppError::Conflict(anyhow::anyhow!(
                "Coupon code '{}' already exists",
                input.coupon_code
            )));
        }
        if let Some(missing) = input
            .allowed_items
            .iter()
            .find(|id| state.item(**id).is_none())
        {
            return Err(item_not_found(*missing));
        }

        let now = Utc::now();
        let mut allowed_items = input.allowed_items.clone();
        allowed_items.sort();
        allowed_items.dedup();
        let coupon = Coupon {
            id: Uuid::new_v4(),
            coupon_code: input.coupon_code.clone(),
            discounted_amount: input.discounted_amount,
            active_status: true,
            allowed_items,
            created_at: now,
            updated_at: now,
        };
        state.coupons.push(coupon.clone());
        Ok(coupon)
    }

    async fn list_coupons(&self) -> Result<Vec<Coupon>, AppError> {
        Ok(self.state.read().await.coupons.clone())
    }

    async fn get_coupon(&self, coupon_id: Uuid) -> Result<Option<Coupon>, AppError> {
        let state = self.state.read().await;
        Ok(state.coupons.iter().find(|c| c.id == coupon_id).cloned())
    }

    async fn deactivate_coupon(&self, coupon_id: Uuid) -> Result<Option<Coupon>, AppError> {
        let mut state = self.state.write().await;
        let Some(coupon) = state.coupons.iter_mut().find(|c| c.id == coupon_id) else {
            return Ok(None);
        };
        coupon.active_status = false;
        coupon.updated_at = Utc::now();
        Ok(Some(coupon.clone()))
    }

    async fn delete_coupon(&self, coupon_id: Uuid) -> Result<Option<Coupon>, AppError> {
        let mut state = self.state.write().await;
        let position = state.coupons.iter().position(|c| c.id == coupon_id);
        Ok(position.map(|p| state.coupons.remove(p)))
    }

    // -------------------------------------------------------------------------
    // Suppliers
    // -------------------------------------------------------------------------

    async fn create_supplier(&self, input: &NewSupplier) -> Result<Supplier, AppError> {
        let now = Utc::now();
        let supplier = Supplier {
            id: Uuid::new_v4(),
            name: input.name.clone(),
            email: input.email.clone(),
            contact_number: input.contact_number.clone(),
            address: input.address.clone(),
            created_at: now,
            updated_at: now,
        };
        self.state.write().await.suppliers.push(supplier.clone());
        Ok(supplier)
    }

    async fn list_suppliers(&self) -> Result<Vec<Supplier>, AppError> {
        Ok(self.state.read().await.suppliers.clone())
    }

    async fn get_supplier(&self, supplier_id: Uuid) -> Result<Option<Supplier>, AppError> {
        let state = self.state.read().await;
        Ok(state.suppliers.iter().find(|s| s.id == supplier_id).cloned())
    }

    async fn update_supplier(
        &self,
        supplier_id: Uuid,
        changes: &SupplierChanges,
    ) -> Result<Option<Supplier>, AppError> {
        let mut state = self.state.write().await;
        let Some(supplier) = state.suppliers.iter_mut().find(|s| s.id == supplier_id) else {
            return Ok(None);
        };
        changes.apply(supplier);
        supplier.updated_at = Utc::now();
        Ok(Some(supplier.clone()))
    }

    async fn delete_supplier(&self, supplier_id: Uuid) -> Result<Option<Supplier>, AppError> {
        let mut state = self.state.write().await;
        let position = state.suppliers.iter().position(|s| s.id == supplier_id);
        Ok(position.map(|p| state.suppliers.remove(p)))
    }

    // -------------------------------------------------------------------------
    // Orders
    // -------------------------------------------------------------------------

    #[instrument(skip(self, settlement), fields(user_id = %settlement.user_id, line_count = settlement.lines.len()))]
    async fn settle_order(&self, settlement: &Settlement) -> Result<Order, AppError> {
        let mut state = self.state.write().await;

        if state.user(settlement.user_id).is_none() {
            return Err(user_not_found(settlement.user_id));
        }

        // Quantities per item, so repeated lines for one item share its stock.
        let demand = stock_demand(&settlement.lines)?;
        for (item_id, quantity) in &demand {
            let item = state
                .item(*item_id)
                .filter(|i| i.is_available())
                .ok_or_else(|| item_not_found(*item_id))?;
            if item.in_stock < *quantity {
                return Err(AppError::InsufficientStock(anyhow::anyhow!(
                    "Item {} has {} in stock, {} requested",
                    item_id,
                    item.in_stock,
                    quantity
                )));
            }
        }

        if settlement.points_redeemed > Decimal::ZERO {
            state.check_debit(settlement.user_id, settlement.points_redeemed)?;
        }

        // All checks passed; apply every effect.
        let now = Utc::now();
        if settlement.points_redeemed > Decimal::ZERO {
            if let Some(account) = state.account_mut(settlement.user_id) {
                account.balance -= settlement.points_redeemed;
                account.updated_at = now;
            }
        }
        for item in state.items.iter_mut() {
            if let Some(quantity) = demand.get(&item.id) {
                item.in_stock -= quantity;
                item.updated_at = now;
            }
        }

        let order_id = Uuid::new_v4();
        let order = Order {
            id: order_id,
            user_id: settlement.user_id,
            total_bill: settlement.total_bill,
            discount: settlement.discount,
            coupon_code: settlement.coupon_code.clone(),
            points_redeemed: settlement.points_redeemed,
            address: settlement.address.clone(),
            name: settlement.name.clone(),
            email: settlement.email.clone(),
            contact_number: settlement.contact_number.clone(),
            order_status: OrderStatus::Pending,
            delete_status: false,
            created_at: now,
            updated_at: now,
            ordered_items: settlement
                .lines
                .iter()
                .map(|line| OrderLine {
                    id: Uuid::new_v4(),
                    order_id,
                    inventory_id: line.inventory_id,
                    quantity: line.quantity,
                    unit_price: line.unit_price,
                    inventory: None,
                })
                .collect(),
            user: None,
        };
        state.orders.push(order.clone());

        state.credit(settlement.user_id, settlement.points_earned);

        info!(order_id = %order_id, total_bill = %settlement.total_bill, "Order settled");
        Ok(state.hydrate(&order))
    }

    async fn list_orders(&self, filter: &OrderFilter) -> Result<Vec<Order>, AppError> {
        let state = self.state.read().await;
        Ok(state
            .orders
            .iter()
            .rev()
            .filter(|o| filter.matches(o))
            .map(|o| state.hydrate(o))
            .collect())
    }

    async fn get_order(&self, order_id: Uuid) -> Result<Option<Order>, AppError> {
        let state = self.state.read().await;
        Ok(state
            .orders
            .iter()
            .find(|o| o.id == order_id)
            .map(|o| state.hydrate(o)))
    }

    async fn update_order(
        &self,
        order_id: Uuid,
        changes: &OrderChanges,
    ) -> Result<Option<Order>, AppError> {
        let mut state = self.state.write().await;
        let Some(order) = state.orders.iter_mut().find(|o| o.id == order_id) else {
            return Ok(None);
        };
        changes.apply(order);
        order.updated_at = Utc::now();
        let order = order.clone();
        Ok(Some(state.hydrate(&order)))
    }

    async fn soft_delete_order(&self, order_id: Uuid) -> Result<Order, AppError> {
        let mut state = self.state.write().await;
        let order = state
            .orders
            .iter_mut()
            .find(|o| o.id == order_id)
            .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Order {} not found", order_id)))?;

        if !order.order_status.allows_soft_delete() {
            return Err(AppError::InvalidStateTransition(anyhow::anyhow!(
                "Order {} is {} and can no longer be deleted",
                order_id,
                order.order_status
            )));
        }
        order.delete_status = true;
        order.updated_at = Utc::now();
        let order = order.clone();
        Ok(state.hydrate(&order))
    }

    // -------------------------------------------------------------------------
    // Points
    // -------------------------------------------------------------------------

    async fn credit_points(
        &self,
        user_id: Uuid,
        amount: Decimal,
    ) -> Result<PointsAccount, AppError> {
        let mut state = self.state.write().await;
        if state.user(user_id).is_none() {
            return Err(user_not_found(user_id));
        }
        Ok(state.credit(user_id, amount))
    }

    async fn debit_points(
        &self,
        user_id: Uuid,
        amount: Decimal,
    ) -> Result<PointsAccount, AppError> {
        let mut state = self.state.write().await;
        if state.user(user_id).is_none() {
            return Err(user_not_found(user_id));
        }
        state.check_debit(user_id, amount)?;

        let account = state
            .account_mut(user_id)
            .ok_or_else(|| insufficient_balance(Decimal::ZERO, amount))?;
        account.balance -= amount;
        account.updated_at = Utc::now();
        Ok(account.clone())
    }

    async fn get_points(&self, user_id: Uuid) -> Result<Option<PointsAccount>, AppError> {
        let state = self.state.read().await;
        Ok(state.points.iter().find(|p| p.user_id == user_id).cloned())
    }

    async fn list_points(&self) -> Result<Vec<PointsAccount>, AppError> {
        let state = self.state.read().await;
        Ok(state
            .points
            .iter()
            .map(|p| PointsAccount {
                user: state.user(p.user_id).cloned(),
                ..p.clone()
            })
            .collect())
    }
}
