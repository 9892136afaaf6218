use crate::dtos::{CreateInventoryItemRequest, UpdateInventoryItemRequest};
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

fn item_not_found(item_id: Uuid) -> AppError {
    AppError::NotFound(anyhow::anyhow!("Inventory item {} not found", item_id))
}

fn check_price(price: Option<Decimal>) -> Result<(), AppError> {
    match price {
        Some(p) if p < Decimal::ZERO => Err(AppError::BadRequest(anyhow::anyhow!(
            "Price cannot be negative"
        ))),
        _ => Ok(()),
    }
}

pub async fn create_item(
    State(state): State<AppState>,
    Json(req): Json<CreateInventoryItemRequest>,
) -> Result<impl IntoResponse, AppError> {
    req.validate()?;
    check_price(Some(req.price))?;

    let item = state.store.create_item(&req.into()).await?;
    tracing::info!(item_id = %item.id, "Inventory item created");
    Ok((StatusCode::CREATED, Json(item)))
}

pub async fn list_items(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    Ok(Json(state.store.list_items().await?))
}

pub async fn get_item(
    State(state): State<AppState>,
    Path(item_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let item = state
        .store
        .get_item(item_id)
        .await?
        .ok_or_else(|| item_not_found(item_id))?;
    Ok(Json(item))
}

pub async fn update_item(
    State(state): State<AppState>,
    Path(item_id): Path<Uuid>,
    Json(req): Json<UpdateInventoryItemRequest>,
) -> Result<impl IntoResponse, AppError> {
    req.validate()?;
    check_price(req.price)?;

    let item = state
        .store
        .update_item(item_id, &req.into())
        .await?
        .ok_or_else(|| item_not_found(item_id))?;
    Ok(Json(item))
}

/// Soft delete: the item disappears from listings but old orders keep it.
pub async fn delete_item(
    State(state): State<AppState>,
    Path(item_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let item = state
        .store
        .soft_delete_item(item_id)
        .await?
        .ok_or_else(|| item_not_found(item_id))?;
    Ok(Json(item))
}
