//! Domain models for storefront-service.

mod coupon;
mod inventory;
mod order;
mod points;
mod supplier;
mod user;

pub use coupon::{Coupon, NewCoupon};
pub use inventory::{InventoryItem, InventoryItemChanges, NewInventoryItem};
pub use order::{
    NewOrderLine, Order, OrderChanges, OrderFilter, OrderLine, OrderStatus, Settlement,
};
pub use points::PointsAccount;
pub use supplier::{NewSupplier, Supplier, SupplierChanges};
pub use user::{NewUser, User, UserChanges, UserRole};
