//! Order and order line models.

use super::{InventoryItem, User};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Fulfilment status of an order. Every order starts as `Pending`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "varchar")]
pub enum OrderStatus {
    #[default]
    Pending,
    Processing,
    Completed,
}

impl OrderStatus {
    /// Get string representation for database.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Processing => "Processing",
            Self::Completed => "Completed",
        }
    }

    /// Transitions are unrestricted; any status may follow any other.
    pub fn can_transition_to(self, _next: OrderStatus) -> bool {
        true
    }

    /// Soft delete is only allowed while the order has not been picked up.
    pub fn allows_soft_delete(self) -> bool {
        self == Self::Pending
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Pending" => Ok(Self::Pending),
            "Processing" => Ok(Self::Processing),
            "Completed" => Ok(Self::Completed),
            _ => Err(format!("Invalid order status: {}", s)),
        }
    }
}

/// One purchased item of an order, priced at purchase time.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderLine {
    pub id: Uuid,
    pub order_id: Uuid,
    pub inventory_id: Uuid,
    pub quantity: i32,
    pub unit_price: Decimal,
    #[sqlx(skip)]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inventory: Option<InventoryItem>,
}

impl OrderLine {
    pub fn line_total(&self) -> Decimal {
        self.unit_price * Decimal::from(self.quantity)
    }
}

/// Persisted order with its lines and, when loaded for display, its user.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: Uuid,
    pub user_id: Uuid,
    pub total_bill: Decimal,
    pub discount: Decimal,
    pub coupon_code: Option<String>,
    pub points_redeemed: Decimal,
    pub address: String,
    pub name: String,
    pub email: String,
    pub contact_number: String,
    pub order_status: OrderStatus,
    pub delete_status: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[sqlx(skip)]
    #[serde(default)]
    pub ordered_items: Vec<OrderLine>,
    #[sqlx(skip)]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<User>,
}

impl Order {
    /// Sum of the line totals before any discount.
    pub fn base_total(&self) -> Decimal {
        self.ordered_items.iter().map(OrderLine::line_total).sum()
    }
}

/// A priced line ready to be persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct NewOrderLine {
    pub inventory_id: Uuid,
    pub quantity: i32,
    pub unit_price: Decimal,
}

/// Everything the store must write, atomically, to settle one order.
#[derive(Debug, Clone)]
pub struct Settlement {
    pub user_id: Uuid,
    pub lines: Vec<NewOrderLine>,
    pub total_bill: Decimal,
    pub discount: Decimal,
    pub coupon_code: Option<String>,
    pub points_redeemed: Decimal,
    pub points_earned: Decimal,
    pub name: String,
    pub email: String,
    pub contact_number: String,
    pub address: String,
}

/// Partial order update restricted to the admin-editable fields.
#[derive(Debug, Clone, Default)]
pub struct OrderChanges {
    pub total_bill: Option<Decimal>,
    pub discount: Option<Decimal>,
    pub coupon_code: Option<String>,
    pub order_status: Option<OrderStatus>,
}

impl OrderChanges {
    pub fn apply(&self, order: &mut Order) {
        if let Some(total_bill) = self.total_bill {
            order.total_bill = total_bill;
        }
        if let Some(discount) = self.discount {
            order.discount = discount;
        }
        if let Some(coupon_code) = &self.coupon_code {
            order.coupon_code = Some(coupon_code.clone());
        }
        if let Some(order_status) = self.order_status {
            order.order_status = order_status;
        }
    }
}

/// Listing filter. Soft-deleted orders are always excluded.
#[derive(Debug, Clone, Default)]
pub struct OrderFilter {
    pub user_id: Option<Uuid>,
    pub status: Option<OrderStatus>,
}

impl OrderFilter {
    pub fn for_customer(user_id: Uuid) -> Self {
        Self {
            user_id: Some(user_id),
            status: None,
        }
    }

    pub fn matches(&self, order: &Order) -> bool {
        !order.delete_status
            && self.user_id.map_or(true, |id| order.user_id == id)
            && self.status.map_or(true, |s| order.order_status == s)
    }
}
