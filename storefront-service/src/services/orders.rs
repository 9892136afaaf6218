//! Order queries and back-office status management.

use super::metrics::ERRORS_TOTAL;
use super::repository::Repository;
use crate::models::{Order, OrderChanges, OrderFilter, OrderStatus};
use rust_decimal::Decimal;
use service_core::error::AppError;
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

fn order_not_found(order_id: Uuid) -> AppError {
    AppError::NotFound(anyhow::anyhow!("Order {} not found", order_id))
}

#[derive(Clone)]
pub struct OrderService {
    store: Arc<dyn Repository>,
}

impl OrderService {
    pub fn new(store: Arc<dyn Repository>) -> Self {
        Self { store }
    }

    /// Non-deleted orders matching the filter, newest first.
    pub async fn list(&self, filter: &OrderFilter) -> Result<Vec<Order>, AppError> {
        self.store.list_orders(filter).await
    }

    /// Any order by id, including soft-deleted ones.
    pub async fn get(&self, order_id: Uuid) -> Result<Order, AppError> {
        self.store
            .get_order(order_id)
            .await?
            .ok_or_else(|| order_not_found(order_id))
    }

    #[instrument(skip(self, changes))]
    pub async fn update(&self, order_id: Uuid, changes: &OrderChanges) -> Result<Order, AppError> {
        for (field, value) in [("totalBill", changes.total_bill), ("discount", changes.discount)] {
            if value.is_some_and(|v| v < Decimal::ZERO) {
                return Err(AppError::BadRequest(anyhow::anyhow!(
                    "{} must not be negative",
                    field
                )));
            }
        }

        if let Some(next) = changes.order_status {
            self.check_transition(order_id, next).await?;
        }

        let order = self
            .store
            .update_order(order_id, changes)
            .await?
            .ok_or_else(|| order_not_found(order_id))?;

        info!(order_status = %order.order_status, "Order updated");
        Ok(order)
    }

    pub async fn update_status(&self, order_id: Uuid, status: OrderStatus) -> Result<Order, AppError> {
        self.update(
            order_id,
            &OrderChanges {
                order_status: Some(status),
                ..Default::default()
            },
        )
        .await
    }

    /// Hide a `Pending` order from listings.
    #[instrument(skip(self))]
    pub async fn soft_delete(&self, order_id: Uuid) -> Result<Order, AppError> {
        let result = self.store.soft_delete_order(order_id).await;
        match &result {
            Ok(_) => info!("Order soft-deleted"),
            Err(e) => ERRORS_TOTAL.with_label_values(&[e.kind()]).inc(),
        }
        result
    }

    async fn check_transition(&self, order_id: Uuid, next: OrderStatus) -> Result<(), AppError> {
        let current = self.get(order_id).await?.order_status;
        if !current.can_transition_to(next) {
            return Err(AppError::InvalidStateTransition(anyhow::anyhow!(
                "Order {} cannot move from {} to {}",
                order_id,
                current,
                next
            )));
        }
        Ok(())
    }
}
