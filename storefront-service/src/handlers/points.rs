use crate::dtos::{PointsRequest, RedeemRequest};
use crate::startup::AppState;
use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};
use service_core::error::AppError;
use uuid::Uuid;

pub async fn add_points(
    State(state): State<AppState>,
    Json(req): Json<PointsRequest>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(state.points.credit(req.user_id, req.points).await?))
}

pub async fn deduct_points(
    State(state): State<AppState>,
    Json(req): Json<PointsRequest>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(state.points.debit(req.user_id, req.points).await?))
}

/// Quote the discount a redemption would buy. The balance is not touched.
pub async fn redeem_points(
    State(state): State<AppState>,
    Json(req): Json<RedeemRequest>,
) -> Result<impl IntoResponse, AppError> {
    let quote = state
        .points
        .quote_redemption(req.user_id, req.points, req.order_total)
        .await?;
    Ok(Json(quote))
}

pub async fn get_balance(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(state.points.balance(user_id).await?))
}

pub async fn list_customers(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    Ok(Json(state.points.accounts().await?))
}
