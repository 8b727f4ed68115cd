use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;
use tracing::info;

use super::parse_user_id;
use crate::api::AppState;
use crate::domain::{User, UserProfile};
use crate::error::AppError;
use crate::orchestration::SyncReport;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CountResponse {
    pub count: i64,
}

pub async fn list_users(State(state): State<AppState>) -> Result<Json<Vec<User>>, AppError> {
    Ok(Json(state.repo.list_users().await?))
}

pub async fn get_user(
    Path(user_id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<User>, AppError> {
    let user_id = parse_user_id(&user_id)?;
    state
        .repo
        .get_user(&user_id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("User {} not found", user_id)))
}

pub async fn create_user(
    State(state): State<AppState>,
    Json(profile): Json<UserProfile>,
) -> Result<(StatusCode, Json<User>), AppError> {
    profile.validate().map_err(AppError::BadRequest)?;
    ensure_email_free(&state, &profile.email).await?;

    let user = state.repo.create_user(&profile).await?;
    info!(user = %user.unique_id, "User created by admin");
    Ok((StatusCode::CREATED, Json(user)))
}

pub async fn update_user(
    Path(user_id): Path<String>,
    State(state): State<AppState>,
    Json(profile): Json<UserProfile>,
) -> Result<Json<User>, AppError> {
    let user_id = parse_user_id(&user_id)?;
    profile.validate().map_err(AppError::BadRequest)?;

    state
        .repo
        .update_user(&user_id, &profile)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("User {} not found", user_id)))
}

pub async fn delete_user(
    Path(user_id): Path<String>,
    State(state): State<AppState>,
) -> Result<StatusCode, AppError> {
    let user_id = parse_user_id(&user_id)?;
    if !state.repo.delete_user(&user_id).await? {
        return Err(AppError::NotFound(format!("User {} not found", user_id)));
    }
    info!(user = %user_id, "User deleted");
    Ok(StatusCode::NO_CONTENT)
}

pub async fn count_users(State(state): State<AppState>) -> Result<Json<CountResponse>, AppError> {
    Ok(Json(CountResponse {
        count: state.repo.count_users().await?,
    }))
}

/// Pull the hosted profile directory into the users table.
pub async fn refresh_users(State(state): State<AppState>) -> Result<Json<SyncReport>, AppError> {
    Ok(Json(state.profiles.refresh().await?))
}

/// 409 when `email` already belongs to a user.
pub(crate) async fn ensure_email_free(state: &AppState, email: &str) -> Result<(), AppError> {
    if state.repo.get_user_by_email(email).await?.is_some() {
        return Err(AppError::Conflict(format!(
            "Email {} is already registered",
            email.trim()
        )));
    }
    Ok(())
}
