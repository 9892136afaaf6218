use crate::dtos::{CreateUserRequest, LoginRequest, LoginResponse, UpdateUserRequest};
use crate::models::{NewUser, UserChanges};
use crate::services::password::{hash_password, verify_password, Password};
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

fn user_not_found(user_id: Uuid) -> AppError {
    AppError::NotFound(anyhow::anyhow!("User {} not found", user_id))
}

pub async fn create_user(
    State(state): State<AppState>,
    Json(req): Json<CreateUserRequest>,
) -> Result<impl IntoResponse, AppError> {
    req.validate()?;

    let password_hash = hash_password(&Password::new(req.password))?;
    let user = state
        .store
        .create_user(&NewUser {
            name: req.name,
            username: req.username,
            email: req.email,
            contact_number: req.contact_number,
            role: req.role,
            password_hash,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(user)))
}

pub async fn list_users(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    Ok(Json(state.store.list_users().await?))
}

pub async fn get_user(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let user = state
        .store
        .get_user(user_id)
        .await?
        .ok_or_else(|| user_not_found(user_id))?;
    Ok(Json(user))
}

pub async fn update_user(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
    Json(req): Json<UpdateUserRequest>,
) -> Result<impl IntoResponse, AppError> {
    req.validate()?;

    let password_hash = req
        .password
        .map(|p| hash_password(&Password::new(p)))
        .transpose()?;
    let changes = UserChanges {
        name: req.name,
        username: req.username,
        email: req.email,
        contact_number: req.contact_number,
        role: req.role,
        password_hash,
    };

    let user = state
        .store
        .update_user(user_id, &changes)
        .await?
        .ok_or_else(|| user_not_found(user_id))?;
    Ok(Json(user))
}

/// Remove the user along with their orders and points account.
pub async fn delete_user(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let user = state
        .store
        .delete_user(user_id)
        .await?
        .ok_or_else(|| user_not_found(user_id))?;
    Ok(Json(user))
}

pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    req.validate()?;

    let user = state
        .store
        .get_user_by_username(&req.username)
        .await?
        .ok_or_else(|| AppError::Unauthorized(anyhow::anyhow!("Invalid username or password")))?;
    verify_password(&Password::new(req.password), &user.password_hash)?;

    tracing::info!(user_id = %user.id, "User logged in");
    Ok(Json(LoginResponse {
        message: "Login successful".to_string(),
        user,
    }))
}
