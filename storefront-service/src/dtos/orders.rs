use crate::models::{Order, OrderChanges, OrderStatus};
use crate::services::{OrderItem, PlaceOrder};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct OrderItemRequest {
    pub inventory_id: Uuid,
    #[validate(range(min = 1, max = 10000, message = "Quantity must be between 1 and 10000"))]
    pub quantity: i32,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    pub user_id: Uuid,
    #[validate(length(min = 1, message = "At least one item is required"))]
    #[validate(nested)]
    pub items: Vec<OrderItemRequest>,
    pub total_bill: Option<Decimal>,
    pub discount: Option<Decimal>,
    pub points_to_redeem: Option<Decimal>,
    pub coupon_code: Option<String>,
    #[validate(length(min = 1, message = "Name is required"))]
    pub name: String,
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
    #[validate(length(min = 1, message = "Contact number is required"))]
    pub contact_number: String,
    #[validate(length(min = 1, message = "Address is required"))]
    pub address: String,
}

impl From<CreateOrderRequest> for PlaceOrder {
    fn from(req: CreateOrderRequest) -> Self {
        PlaceOrder {
            user_id: req.user_id,
            items: req
                .items
                .into_iter()
                .map(|i| OrderItem {
                    inventory_id: i.inventory_id,
                    quantity: i.quantity,
                })
                .collect(),
            total_bill: req.total_bill,
            discount: req.discount,
            points_to_redeem: req.points_to_redeem,
            coupon_code: req.coupon_code,
            name: req.name,
            email: req.email,
            contact_number: req.contact_number,
            address: req.address,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateOrderRequest {
    pub total_bill: Option<Decimal>,
    pub discount: Option<Decimal>,
    pub coupon_code: Option<String>,
    pub order_status: Option<OrderStatus>,
}

impl From<UpdateOrderRequest> for OrderChanges {
    fn from(req: UpdateOrderRequest) -> Self {
        OrderChanges {
            total_bill: req.total_bill,
            discount: req.discount,
            coupon_code: req.coupon_code,
            order_status: req.order_status,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateStatusRequest {
    pub order_status: OrderStatus,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderListParams {
    pub customer_id: Option<Uuid>,
    pub status: Option<OrderStatus>,
}

#[derive(Debug, Serialize)]
pub struct DeleteOrderResponse {
    pub message: String,
    pub order: Order,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_order_item_request_round_trips_as_camel_case() {
        let request = OrderItemRequest {
            inventory_id: Uuid::new_v4(),
            quantity: 3,
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value, json!({ "inventoryId": request.inventory_id, "quantity": 3 }));

        let parsed: OrderItemRequest = serde_json::from_value(value).unwrap();
        assert_eq!(parsed.inventory_id, request.inventory_id);
        assert_eq!(parsed.quantity, 3);
    }

    #[test]
    fn test_quantity_bounds() {
        let line = |quantity| OrderItemRequest {
            inventory_id: Uuid::new_v4(),
            quantity,
        };
        assert!(line(1).validate().is_ok());
        assert!(line(10_000).validate().is_ok());
        assert!(line(0).validate().is_err());
        assert!(line(10_001).validate().is_err());
        assert!(line(i32::MAX).validate().is_err());
    }
}
