use crate::dtos::{CreateSupplierRequest, UpdateSupplierRequest};
use crate::startup::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use service_core::error::AppError;
use uuid::Uuid;
use validator::Validate;

fn supplier_not_found(supplier_id: Uuid) -> AppError {
    AppError::NotFound(anyhow::anyhow!("Supplier {} not found", supplier_id))
}

pub async fn create_supplier(
    State(state): State<AppState>,
    Json(req): Json<CreateSupplierRequest>,
) -> Result<impl IntoResponse, AppError> {
    req.validate()?;
    let supplier = state.store.create_supplier(&req.into()).await?;
    Ok((StatusCode::CREATED, Json(supplier)))
}

pub async fn list_suppliers(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    Ok(Json(state.store.list_suppliers().await?))
}

pub async fn get_supplier(
    State(state): State<AppState>,
    Path(supplier_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let supplier = state
        .store
        .get_supplier(supplier_id)
        .await?
        .ok_or_else(|| supplier_not_found(supplier_id))?;
    Ok(Json(supplier))
}

pub async fn update_supplier(
    State(state): State<AppState>,
    Path(supplier_id): Path<Uuid>,
    Json(req): Json<UpdateSupplierRequest>,
) -> Result<impl IntoResponse, AppError> {
    req.validate()?;
    let supplier = state
        .store
        .update_supplier(supplier_id, &req.into())
        .await?
        .ok_or_else(|| supplier_not_found(supplier_id))?;
    Ok(Json(supplier))
}

pub async fn delete_supplier(
    State(state): State<AppState>,
    Path(supplier_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let supplier = state
        .store
        .delete_supplier(supplier_id)
        .await?
        .ok_or_else(|| supplier_not_found(supplier_id))?;
    Ok(Json(supplier))
}
