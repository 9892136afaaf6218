use crate::dtos::CreateCouponRequest;
use crate::startup::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use rust_decimal::Decimal;
use service_core::error::AppError;
use uuid::Uuid;
use validator::Validate;

fn coupon_not_found(coupon_id: Uuid) -> AppError {
    AppError::NotFound(anyhow::anyhow!("Coupon {} not found", coupon_id))
}

pub async fn create_coupon(
    State(state): State<AppState>,
    Json(req): Json<CreateCouponRequest>,
) -> Result<impl IntoResponse, AppError> {
    req.validate()?;
    if req.discounted_amount < Decimal::ZERO {
        return Err(AppError::BadRequest(anyhow::anyhow!(
            "Discounted amount cannot be negative"
        )));
    }

    let coupon = state.store.create_coupon(&req.into()).await?;
    tracing::info!(coupon_id = %coupon.id, "Coupon created");
    Ok((StatusCode::CREATED, Json(coupon)))
}

pub async fn list_coupons(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    Ok(Json(state.store.list_coupons().await?))
}

pub async fn get_coupon(
    State(state): State<AppState>,
    Path(coupon_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let coupon = state
        .store
        .get_coupon(coupon_id)
        .await?
        .ok_or_else(|| coupon_not_found(coupon_id))?;
    Ok(Json(coupon))
}

/// Mark a coupon as used. A coupon can only be applied once.
pub async fn apply_coupon(
    State(state): State<AppState>,
    Path(coupon_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let coupon = state
        .store
        .get_coupon(coupon_id)
        .await?
        .ok_or_else(|| coupon_not_found(coupon_id))?;
    if !coupon.active_status {
        return Err(AppError::Conflict(anyhow::anyhow!(
            "Coupon {} has already been applied",
            coupon.coupon_code
        )));
    }

    let coupon = state
        .store
        .deactivate_coupon(coupon_id)
        .await?
        .ok_or_else(|| coupon_not_found(coupon_id))?;
    Ok(Json(coupon))
}

pub async fn delete_coupon(
    State(state): State<AppState>,
    Path(coupon_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let coupon = state
        .store
        .delete_coupon(coupon_id)
        .await?
        .ok_or_else(|| coupon_not_found(coupon_id))?;
    Ok(Json(coupon))
}
