use rust_decimal::Decimal;
use serde::Deserialize;
use uuid::Uuid;

/// Body of `/api/points/add` and `/api/points/deduct`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PointsRequest {
    pub user_id: Uuid,
    pub points: Decimal,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RedeemRequest {
    pub user_id: Uuid,
    pub points: Decimal,
    pub order_total: Decimal,
}
