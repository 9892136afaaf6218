//! Reward points ledger.
//!
//! Customers earn a tenth of every order's payable total and may redeem
//! points at half a currency unit each, capped at the order's base total.

use super::metrics::POINTS_OPERATIONS_TOTAL;
use super::repository::{insufficient_balance, user_not_found, Repository};
use crate::models::PointsAccount;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;
use service_core::error::AppError;
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

const EARN_DIVISOR: Decimal = Decimal::TEN;

/// Money and points are kept to cents.
pub fn to_cents(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Points earned for an order with the given payable total.
pub fn earned_points(total_bill: Decimal) -> Decimal {
    to_cents(total_bill / EARN_DIVISOR)
}

/// Discount bought by redeeming `points` against an order worth `base_total`.
pub fn redemption_discount(points: Decimal, base_total: Decimal) -> Decimal {
    to_cents(points.min(base_total) / Decimal::TWO)
}

/// Result of pricing a redemption without applying it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RedemptionQuote {
    pub user_id: Uuid,
    pub points: Decimal,
    pub discount_amount: Decimal,
    pub final_payable: Decimal,
    pub remaining_balance: Decimal,
}

#[derive(Clone)]
pub struct PointsLedger {
    store: Arc<dyn Repository>,
}

impl PointsLedger {
    pub fn new(store: Arc<dyn Repository>) -> Self {
        Self { store }
    }

    #[instrument(skip(self))]
    pub async fn credit(&self, user_id: Uuid, amount: Decimal) -> Result<PointsAccount, AppError> {
        if amount < Decimal::ZERO {
            return Err(AppError::BadRequest(anyhow::anyhow!(
                "Points to add must not be negative"
            )));
        }

        let account = self.store.credit_points(user_id, to_cents(amount)).await?;
        POINTS_OPERATIONS_TOTAL.with_label_values(&["credit"]).inc();
        info!(balance = %account.balance, "Points credited");
        Ok(account)
    }

    #[instrument(skip(self))]
    pub async fn debit(&self, user_id: Uuid, amount: Decimal) -> Result<PointsAccount, AppError> {
        if amount <= Decimal::ZERO {
            return Err(AppError::BadRequest(anyhow::anyhow!(
                "Points to deduct must be positive"
            )));
        }

        let account = self.store.debit_points(user_id, to_cents(amount)).await?;
        POINTS_OPERATIONS_TOTAL.with_label_values(&["debit"]).inc();
        info!(balance = %account.balance, "Points debited");
        Ok(account)
    }

    /// The user's account; `NotFound` when none has been opened yet.
    pub async fn balance(&self, user_id: Uuid) -> Result<PointsAccount, AppError> {
        self.store.get_points(user_id).await?.ok_or_else(|| {
            AppError::NotFound(anyhow::anyhow!("No points account for user {}", user_id))
        })
    }

    pub async fn accounts(&self) -> Result<Vec<PointsAccount>, AppError> {
        self.store.list_points().await
    }

    /// Price a redemption against the current balance. Nothing is debited:
    /// the order placement re-checks and deducts atomically.
    #[instrument(skip(self))]
    pub async fn quote_redemption(
        &self,
        user_id: Uuid,
        points: Decimal,
        order_total: Decimal,
    ) -> Result<RedemptionQuote, AppError> {
        if points <= Decimal::ZERO {
            return Err(AppError::BadRequest(anyhow::anyhow!(
                "Points to redeem must be positive"
            )));
        }
        if order_total < Decimal::ZERO {
            return Err(AppError::BadRequest(anyhow::anyhow!(
                "Order total must not be negative"
            )));
        }
        if self.store.get_user(user_id).await?.is_none() {
            return Err(user_not_found(user_id));
        }

        let balance = self
            .store
            .get_points(user_id)
            .await?
            .map(|account| account.balance)
            .unwrap_or(Decimal::ZERO);
        if points > balance {
            return Err(insufficient_balance(balance, points));
        }

        let discount_amount = redemption_discount(points, order_total);
        POINTS_OPERATIONS_TOTAL.with_label_values(&["quote"]).inc();

        Ok(RedemptionQuote {
            user_id,
            points,
            discount_amount,
            final_payable: order_total - discount_amount,
            remaining_balance: balance - points,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{NewUser, UserRole};
    use crate::services::MemoryStore;

    fn dec(value: &str) -> Decimal {
        value.parse().unwrap()
    }

    async fn ledger_with_user() -> (PointsLedger, Uuid) {
        let store = Arc::new(MemoryStore::new());
        let user = store
            .create_user(&NewUser {
                name: "Amaya Silva".to_string(),
                username: "amaya".to_string(),
                email: "amaya@example.com".to_string(),
                contact_number: "0712345678".to_string(),
                role: UserRole::Customer,
                password_hash: "hash".to_string(),
            })
            .await
            .unwrap();
        (PointsLedger::new(store), user.id)
    }

    #[test]
    fn test_earned_points_is_a_tenth() {
        assert_eq!(earned_points(dec("200")), dec("20"));
        assert_eq!(earned_points(dec("185")), dec("18.5"));
        assert_eq!(earned_points(dec("0.05")), dec("0.01"));
    }

    #[test]
    fn test_redemption_discount_is_capped_at_base_total() {
        assert_eq!(redemption_discount(dec("30"), dec("200")), dec("15"));
        assert_eq!(redemption_discount(dec("500"), dec("120")), dec("60"));
    }

    #[tokio::test]
    async fn test_quote_does_not_touch_balance() {
        let (ledger, user_id) = ledger_with_user().await;
        ledger.credit(user_id, dec("50")).await.unwrap();

        let quote = ledger
            .quote_redemption(user_id, dec("30"), dec("200"))
            .await
            .unwrap();
        assert_eq!(quote.discount_amount, dec("15"));
        assert_eq!(quote.final_payable, dec("185"));
        assert_eq!(quote.remaining_balance, dec("20"));

        assert_eq!(ledger.balance(user_id).await.unwrap().balance, dec("50"));
    }

    #[tokio::test]
    async fn test_overdraw_fails_and_keeps_balance() {
        let (ledger, user_id) = ledger_with_user().await;
        ledger.credit(user_id, dec("10")).await.unwrap();

        let err = ledger
            .quote_redemption(user_id, dec("50"), dec("200"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InsufficientBalance(_)));

        let err = ledger.debit(user_id, dec("50")).await.unwrap_err();
        assert!(matches!(err, AppError::InsufficientBalance(_)));

        assert_eq!(ledger.balance(user_id).await.unwrap().balance, dec("10"));
    }

    #[tokio::test]
    async fn test_amount_rules() {
        let (ledger, user_id) = ledger_with_user().await;

        assert!(matches!(
            ledger.credit(user_id, dec("-1")).await,
            Err(AppError::BadRequest(_))
        ));
        assert!(matches!(
            ledger.debit(user_id, Decimal::ZERO).await,
            Err(AppError::BadRequest(_))
        ));
        assert!(matches!(
            ledger.quote_redemption(user_id, Decimal::ZERO, dec("100")).await,
            Err(AppError::BadRequest(_))
        ));
    }

    #[tokio::test]
    async fn test_missing_account_is_distinct_from_zero_balance() {
        let (ledger, user_id) = ledger_with_user().await;
        assert!(matches!(
            ledger.balance(user_id).await,
            Err(AppError::NotFound(_))
        ));

        ledger.credit(user_id, Decimal::ZERO).await.unwrap();
        assert_eq!(ledger.balance(user_id).await.unwrap().balance, Decimal::ZERO);
    }

    #[tokio::test]
    async fn test_credit_for_unknown_user_is_not_found() {
        let (ledger, _) = ledger_with_user().await;
        assert!(matches!(
            ledger.credit(Uuid::new_v4(), dec("5")).await,
            Err(AppError::NotFound(_))
        ));
    }
}
