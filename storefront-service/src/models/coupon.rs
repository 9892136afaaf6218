//! Coupon model.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Discount coupon restricted to a set of inventory items.
///
/// Applying a coupon deactivates it. Orders keep the code as plain text, so
/// deleting a coupon never leaves a dangling reference behind.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Coupon {
    pub id: Uuid,
    pub coupon_code: String,
    pub discounted_amount: Decimal,
    pub active_status: bool,
    #[sqlx(skip)]
    #[serde(default)]
    pub allowed_items: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a coupon.
#[derive(Debug, Clone)]
pub struct NewCoupon {
    pub coupon_code: String,
    pub discounted_amount: Decimal,
    pub allowed_items: Vec<Uuid>,
}
