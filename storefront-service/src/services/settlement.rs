//! Order settlement: prices an order against the live catalog and hands the
//! store one atomic unit of work.

use super::metrics::{ERRORS_TOTAL, ORDERS_TOTAL, POINTS_OPERATIONS_TOTAL};
use super::points::{earned_points, redemption_discount, to_cents};
use super::repository::{item_not_found, stock_demand, user_not_found, Repository};
use crate::models::{NewOrderLine, Order, Settlement};
use rust_decimal::Decimal;
use service_core::error::AppError;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

/// Largest quantity a single order line may ask for.
pub const MAX_LINE_QUANTITY: i32 = 10_000;

/// One requested line: which item and how many.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderItem {
    pub inventory_id: Uuid,
    pub quantity: i32,
}

/// A customer's order as submitted.
#[derive(Debug, Clone, Default)]
pub struct PlaceOrder {
    pub user_id: Uuid,
    pub items: Vec<OrderItem>,
    /// Payable total the client computed; must agree with the server price.
    pub total_bill: Option<Decimal>,
    /// Flat discount, used only when no points are redeemed.
    pub discount: Option<Decimal>,
    pub points_to_redeem: Option<Decimal>,
    pub coupon_code: Option<String>,
    pub name: String,
    pub email: String,
    pub contact_number: String,
    pub address: String,
}

#[derive(Clone)]
pub struct OrderSettlement {
    store: Arc<dyn Repository>,
}

impl OrderSettlement {
    pub fn new(store: Arc<dyn Repository>) -> Self {
        Self { store }
    }

    /// Validate, price and persist an order.
    ///
    /// Redeemed points are debited, stock is decremented, the order and its
    /// lines are written and earned points are credited in a single store
    /// call. A failure anywhere leaves nothing behind.
    #[instrument(skip(self, request), fields(user_id = %request.user_id, item_count = request.items.len()))]
    pub async fn place_order(&self, request: PlaceOrder) -> Result<Order, AppError> {
        let result = self.settle(request).await;
        match &result {
            Ok(order) => {
                ORDERS_TOTAL.with_label_values(&["ok"]).inc();
                POINTS_OPERATIONS_TOTAL.with_label_values(&["earn"]).inc();
                if order.points_redeemed > Decimal::ZERO {
                    POINTS_OPERATIONS_TOTAL.with_label_values(&["redeem"]).inc();
                }
                info!(order_id = %order.id, total_bill = %order.total_bill, "Order placed");
            }
            Err(e) => {
                ORDERS_TOTAL.with_label_values(&["error"]).inc();
                ERRORS_TOTAL.with_label_values(&[e.kind()]).inc();
                warn!(error = %e, "Order placement failed");
            }
        }
        result
    }

    async fn settle(&self, request: PlaceOrder) -> Result<Order, AppError> {
        if request.items.is_empty() {
            return Err(AppError::BadRequest(anyhow::anyhow!(
                "An order needs at least one item"
            )));
        }
        if let Some(item) = request
            .items
            .iter()
            .find(|i| !(1..=MAX_LINE_QUANTITY).contains(&i.quantity))
        {
            return Err(AppError::BadRequest(anyhow::anyhow!(
                "Quantity for item {} must be between 1 and {}",
                item.inventory_id,
                MAX_LINE_QUANTITY
            )));
        }

        if self.store.get_user(request.user_id).await?.is_none() {
            return Err(user_not_found(request.user_id));
        }

        let mut ids: Vec<Uuid> = request.items.iter().map(|i| i.inventory_id).collect();
        ids.sort();
        ids.dedup();
        let catalog: HashMap<Uuid, _> = self
            .store
            .get_items(&ids)
            .await?
            .into_iter()
            .filter(|item| item.is_available())
            .map(|item| (item.id, item))
            .collect();

        let mut lines = Vec::with_capacity(request.items.len());
        for requested in &request.items {
            let item = catalog
                .get(&requested.inventory_id)
                .ok_or_else(|| item_not_found(requested.inventory_id))?;
            lines.push(NewOrderLine {
                inventory_id: item.id,
                quantity: requested.quantity,
                unit_price: item.price,
            });
        }

        stock_demand(&lines)?;

        let base_total: Decimal = lines
            .iter()
            .map(|l| l.unit_price * Decimal::from(l.quantity))
            .sum();

        let (discount, points_redeemed) = price_discount(&request, base_total)?;
        let total_bill = to_cents(base_total - discount);

        if let Some(claimed) = request.total_bill {
            if to_cents(claimed) != total_bill {
                return Err(AppError::BadRequest(anyhow::anyhow!(
                    "totalBill {} does not match the computed total {}",
                    claimed,
                    total_bill
                )));
            }
        }

        let settlement = Settlement {
            user_id: request.user_id,
            lines,
            total_bill,
            discount,
            coupon_code: request.coupon_code.filter(|code| !code.trim().is_empty()),
            points_redeemed,
            points_earned: earned_points(total_bill),
            name: request.name,
            email: request.email,
            contact_number: request.contact_number,
            address: request.address,
        };

        self.store.settle_order(&settlement).await
    }
}

/// Work out the discount and the points it consumes.
fn price_discount(request: &PlaceOrder, base_total: Decimal) -> Result<(Decimal, Decimal), AppError> {
    match request.points_to_redeem {
        Some(points) => {
            if points <= Decimal::ZERO {
                return Err(AppError::BadRequest(anyhow::anyhow!(
                    "Points to redeem must be positive"
                )));
            }
            let points = to_cents(points);
            let discount = redemption_discount(points, base_total);
            if let Some(claimed) = request.discount {
                if to_cents(claimed) != discount {
                    return Err(AppError::BadRequest(anyhow::anyhow!(
                        "discount {} does not match the redemption value {}",
                        claimed,
                        discount
                    )));
                }
            }
            Ok((discount, points))
        }
        None => {
            let discount = to_cents(request.discount.unwrap_or(Decimal::ZERO));
            if discount < Decimal::ZERO || discount > base_total {
                return Err(AppError::BadRequest(anyhow::anyhow!(
                    "discount must be between 0 and the order total {}",
                    base_total
                )));
            }
            Ok((discount, Decimal::ZERO))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{InventoryItem, NewInventoryItem, NewUser, OrderFilter, UserRole};
    use crate::services::MemoryStore;

    fn dec(value: &str) -> Decimal {
        value.parse().unwrap()
    }

    struct Fixture {
        store: Arc<MemoryStore>,
        settlement: OrderSettlement,
        user_id: Uuid,
        item: InventoryItem,
    }

    async fn fixture() -> Fixture {
        let store = Arc::new(MemoryStore::new());
        let user = store
            .create_user(&NewUser {
                name: "Kasun Fernando".to_string(),
                username: "kasun".to_string(),
                email: "kasun@example.com".to_string(),
                contact_number: "0701112233".to_string(),
                role: UserRole::Customer,
                password_hash: "hash".to_string(),
            })
            .await
            .unwrap();
        let item = store
            .create_item(&NewInventoryItem {
                name: "Clay pot".to_string(),
                price: dec("100"),
                description: "Hand thrown".to_string(),
                image_url: "https://img.example.com/pot.png".to_string(),
                in_stock: 10,
            })
            .await
            .unwrap();
        Fixture {
            settlement: OrderSettlement::new(store.clone()),
            store,
            user_id: user.id,
            item,
        }
    }

    fn request(user_id: Uuid, inventory_id: Uuid, quantity: i32) -> PlaceOrder {
        PlaceOrder {
            user_id,
            items: vec![OrderItem {
                inventory_id,
                quantity,
            }],
            name: "Kasun Fernando".to_string(),
            email: "kasun@example.com".to_string(),
            contact_number: "0701112233".to_string(),
            address: "7 Temple Road, Kandy".to_string(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_order_earns_a_tenth_of_total() {
        let fx = fixture().await;
        let mut req = request(fx.user_id, fx.item.id, 2);
        req.total_bill = Some(dec("200"));
        req.discount = Some(Decimal::ZERO);

        let order = fx.settlement.place_order(req).await.unwrap();
        assert_eq!(order.total_bill, dec("200"));
        assert_eq!(order.ordered_items.len(), 1);
        assert_eq!(order.ordered_items[0].unit_price, dec("100"));

        let points = fx.store.get_points(fx.user_id).await.unwrap().unwrap();
        assert_eq!(points.balance, dec("20"));
    }

    #[tokio::test]
    async fn test_redeeming_points_discounts_half_their_value() {
        let fx = fixture().await;
        fx.store.credit_points(fx.user_id, dec("50")).await.unwrap();

        let mut req = request(fx.user_id, fx.item.id, 2);
        req.points_to_redeem = Some(dec("30"));
        req.total_bill = Some(dec("185"));

        let order = fx.settlement.place_order(req).await.unwrap();
        assert_eq!(order.discount, dec("15"));
        assert_eq!(order.total_bill, dec("185"));
        assert_eq!(order.points_redeemed, dec("30"));

        // 50 - 30 redeemed + 18.5 earned
        let points = fx.store.get_points(fx.user_id).await.unwrap().unwrap();
        assert_eq!(points.balance, dec("38.5"));
    }

    #[tokio::test]
    async fn test_overdrawn_redemption_rolls_back_everything() {
        let fx = fixture().await;
        fx.store.credit_points(fx.user_id, dec("10")).await.unwrap();

        let mut req = request(fx.user_id, fx.item.id, 2);
        req.points_to_redeem = Some(dec("50"));

        let err = fx.settlement.place_order(req).await.unwrap_err();
        assert!(matches!(err, AppError::InsufficientBalance(_)));

        let points = fx.store.get_points(fx.user_id).await.unwrap().unwrap();
        assert_eq!(points.balance, dec("10"));
        assert!(fx
            .store
            .list_orders(&OrderFilter::default())
            .await
            .unwrap()
            .is_empty());
        assert_eq!(
            fx.store.get_item(fx.item.id).await.unwrap().unwrap().in_stock,
            10
        );
    }

    #[tokio::test]
    async fn test_rejects_mismatched_total() {
        let fx = fixture().await;
        let mut req = request(fx.user_id, fx.item.id, 2);
        req.total_bill = Some(dec("150"));

        let err = fx.settlement.place_order(req).await.unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[tokio::test]
    async fn test_rejects_empty_or_zero_quantity() {
        let fx = fixture().await;

        let mut req = request(fx.user_id, fx.item.id, 1);
        req.items.clear();
        assert!(matches!(
            fx.settlement.place_order(req).await,
            Err(AppError::BadRequest(_))
        ));

        let req = request(fx.user_id, fx.item.id, 0);
        assert!(matches!(
            fx.settlement.place_order(req).await,
            Err(AppError::BadRequest(_))
        ));
    }

    #[tokio::test]
    async fn test_unknown_user_or_item_is_not_found() {
        let fx = fixture().await;

        let req = request(Uuid::new_v4(), fx.item.id, 1);
        assert!(matches!(
            fx.settlement.place_order(req).await,
            Err(AppError::NotFound(_))
        ));

        let req = request(fx.user_id, Uuid::new_v4(), 1);
        assert!(matches!(
            fx.settlement.place_order(req).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_soft_deleted_item_cannot_be_ordered() {
        let fx = fixture().await;
        fx.store.soft_delete_item(fx.item.id).await.unwrap();

        let req = request(fx.user_id, fx.item.id, 1);
        assert!(matches!(
            fx.settlement.place_order(req).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_flat_discount_cannot_exceed_base_total() {
        let fx = fixture().await;
        let mut req = request(fx.user_id, fx.item.id, 1);
        req.discount = Some(dec("100.01"));

        assert!(matches!(
            fx.settlement.place_order(req).await,
            Err(AppError::BadRequest(_))
        ));
    }

    #[tokio::test]
    async fn test_stock_shortage_is_reported() {
        let fx = fixture().await;
        let req = request(fx.user_id, fx.item.id, 11);

        assert!(matches!(
            fx.settlement.place_order(req).await,
            Err(AppError::InsufficientStock(_))
        ));
    }

    #[tokio::test]
    async fn test_huge_repeated_quantities_are_rejected() {
        let fx = fixture().await;
        let mut req = request(fx.user_id, fx.item.id, i32::MAX);
        req.items.push(OrderItem {
            inventory_id: fx.item.id,
            quantity: i32::MAX,
        });

        assert!(matches!(
            fx.settlement.place_order(req).await,
            Err(AppError::BadRequest(_))
        ));
        assert_eq!(
            fx.store.get_item(fx.item.id).await.unwrap().unwrap().in_stock,
            10
        );
    }

    #[tokio::test]
    async fn test_repeated_lines_share_stock() {
        let fx = fixture().await;
        let mut req = request(fx.user_id, fx.item.id, MAX_LINE_QUANTITY);
        req.items.push(OrderItem {
            inventory_id: fx.item.id,
            quantity: MAX_LINE_QUANTITY,
        });

        assert!(matches!(
            fx.settlement.place_order(req).await,
            Err(AppError::InsufficientStock(_))
        ));
    }
}
