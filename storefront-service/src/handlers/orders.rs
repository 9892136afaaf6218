use crate::dtos::{
    CreateOrderRequest, DeleteOrderResponse, OrderListParams, UpdateOrderRequest,
    UpdateStatusRequest,
};
use crate::models::OrderFilter;
use crate::startup::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use service_core::error::AppError;
use uuid::Uuid;
use validator::Validate;

pub async fn create_order(
    State(state): State<AppState>,
    Json(req): Json<CreateOrderRequest>,
) -> Result<impl IntoResponse, AppError> {
    req.validate()?;
    let order = state.settlement.place_order(req.into()).await?;
    Ok((StatusCode::CREATED, Json(order)))
}

pub async fn list_orders(
    State(state): State<AppState>,
    Query(params): Query<OrderListParams>,
) -> Result<impl IntoResponse, AppError> {
    let filter = OrderFilter {
        user_id: params.customer_id,
        status: params.status,
    };
    Ok(Json(state.orders.list(&filter).await?))
}

pub async fn list_customer_orders(
    State(state): State<AppState>,
    Path(customer_id): Path<Uuid>,
    Query(params): Query<OrderListParams>,
) -> Result<impl IntoResponse, AppError> {
    let filter = OrderFilter {
        status: params.status,
        ..OrderFilter::for_customer(customer_id)
    };
    Ok(Json(state.orders.list(&filter).await?))
}

pub async fn get_order(
    State(state): State<AppState>,
    Path(order_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(state.orders.get(order_id).await?))
}

pub async fn update_order(
    State(state): State<AppState>,
    Path(order_id): Path<Uuid>,
    Json(req): Json<UpdateOrderRequest>,
) -> Result<impl IntoResponse, AppError> {
    let order = state.orders.update(order_id, &req.into()).await?;
    Ok(Json(order))
}

pub async fn update_order_status(
    State(state): State<AppState>,
    Path(order_id): Path<Uuid>,
    Json(req): Json<UpdateStatusRequest>,
) -> Result<impl IntoResponse, AppError> {
    let order = state.orders.update_status(order_id, req.order_status).await?;
    Ok(Json(order))
}

pub async fn delete_order(
    State(state): State<AppState>,
    Path(order_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let order = state.orders.soft_delete(order_id).await?;
    Ok(Json(DeleteOrderResponse {
        message: "Order deleted".to_string(),
        order,
    }))
}
