use crate::models::{
    InventoryItemChanges, NewCoupon, NewInventoryItem, NewSupplier, SupplierChanges,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateInventoryItemRequest {
    #[validate(length(min = 1, message = "Name is required"))]
    pub name: String,
    pub price: Decimal,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub image_url: String,
    #[validate(range(min = 0, message = "Stock cannot be negative"))]
    #[serde(default)]
    pub in_stock: i32,
}

impl From<CreateInventoryItemRequest> for NewInventoryItem {
    fn from(req: CreateInventoryItemRequest) -> Self {
        NewInventoryItem {
            name: req.name,
            price: req.price,
            description: req.description,
            image_url: req.image_url,
            in_stock: req.in_stock,
        }
    }
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateInventoryItemRequest {
    #[validate(length(min = 1, message = "Name cannot be empty"))]
    pub name: Option<String>,
    pub price: Option<Decimal>,
    pub description: Option<String>,
    pub image_url: Option<String>,
    #[validate(range(min = 0, message = "Stock cannot be negative"))]
    pub in_stock: Option<i32>,
}

impl From<UpdateInventoryItemRequest> for InventoryItemChanges {
    fn from(req: UpdateInventoryItemRequest) -> Self {
        InventoryItemChanges {
            name: req.name,
            price: req.price,
            description: req.description,
            image_url: req.image_url,
            in_stock: req.in_stock,
            delete_status: None,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateCouponRequest {
    #[validate(length(min = 1, max = 64, message = "Coupon code must be 1-64 characters"))]
    pub coupon_code: String,
    pub discounted_amount: Decimal,
    #[serde(default)]
    pub allowed_items: Vec<Uuid>,
}

impl From<CreateCouponRequest> for NewCoupon {
    fn from(req: CreateCouponRequest) -> Self {
        NewCoupon {
            coupon_code: req.coupon_code,
            discounted_amount: req.discounted_amount,
            allowed_items: req.allowed_items,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateSupplierRequest {
    #[validate(length(min = 1, message = "Name is required"))]
    pub name: String,
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
    #[validate(length(min = 1, message = "Contact number is required"))]
    pub contact_number: String,
    #[validate(length(min = 1, message = "Address is required"))]
    pub address: String,
}

impl From<CreateSupplierRequest> for NewSupplier {
    fn from(req: CreateSupplierRequest) -> Self {
        NewSupplier {
            name: req.name,
            email: req.email,
            contact_number: req.contact_number,
            address: req.address,
        }
    }
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSupplierRequest {
    pub name: Option<String>,
    #[validate(email(message = "Invalid email format"))]
    pub email: Option<String>,
    pub contact_number: Option<String>,
    pub address: Option<String>,
}

impl From<UpdateSupplierRequest> for SupplierChanges {
    fn from(req: UpdateSupplierRequest) -> Self {
        SupplierChanges {
            name: req.name,
            email: req.email,
            contact_number: req.contact_number,
            address: req.address,
        }
    }
}
