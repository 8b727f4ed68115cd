use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use std::str::FromStr;
use tracing::info;

use super::parse_user_id;
use super::users::CountResponse;
use crate::api::AppState;
use crate::domain::{Account, AccountDraft, AccountStatus};
use crate::error::AppError;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountsQuery {
    pub status: Option<String>,
}

pub async fn list_accounts(
    Query(params): Query<AccountsQuery>,
    State(state): State<AppState>,
) -> Result<Json<Vec<Account>>, AppError> {
    let status = params
        .status
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(AccountStatus::from_str)
        .transpose()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    Ok(Json(state.repo.list_accounts(status).await?))
}

pub async fn list_user_accounts(
    Path(user_id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<Vec<Account>>, AppError> {
    let user_id = parse_user_id(&user_id)?;
    Ok(Json(state.repo.list_accounts_for_user(&user_id).await?))
}

pub async fn get_account(
    Path(id): Path<i64>,
    State(state): State<AppState>,
) -> Result<Json<Account>, AppError> {
    state
        .repo
        .get_account(id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("Account {} not found", id)))
}

/// Admin creation: any status, no plan capacity check.
pub async fn create_account(
    State(state): State<AppState>,
    Json(draft): Json<AccountDraft>,
) -> Result<(StatusCode, Json<Account>), AppError> {
    draft.validate().map_err(AppError::BadRequest)?;
    if state.repo.get_user(&draft.user_id).await?.is_none() {
        return Err(AppError::NotFound(format!("User {} not found", draft.user_id)));
    }

    let account = state.repo.insert_account(&draft, draft.status).await?;
    info!(
        user = %account.user_id,
        account_id = account.id,
        status = %account.status,
        "Account created"
    );
    Ok((StatusCode::CREATED, Json(account)))
}

/// Customer request path: Pending, gated by the user's active plan.
pub async fn request_account(
    State(state): State<AppState>,
    Json(draft): Json<AccountDraft>,
) -> Result<(StatusCode, Json<Account>), AppError> {
    draft.validate().map_err(AppError::BadRequest)?;
    let account = state.enroller.request_account(&draft).await?;
    Ok((StatusCode::CREATED, Json(account)))
}

pub async fn update_account(
    Path(id): Path<i64>,
    State(state): State<AppState>,
    Json(draft): Json<AccountDraft>,
) -> Result<Json<Account>, AppError> {
    draft.validate().map_err(AppError::BadRequest)?;
    let account = state
        .repo
        .update_account(id, &draft)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Account {} not found", id)))?;
    info!(account_id = id, status = %account.status, "Account updated");
    Ok(Json(account))
}

pub async fn delete_account(
    Path(id): Path<i64>,
    State(state): State<AppState>,
) -> Result<StatusCode, AppError> {
    if !state.repo.delete_account(id).await? {
        return Err(AppError::NotFound(format!("Account {} not found", id)));
    }
    info!(account_id = id, "Account deleted");
    Ok(StatusCode::NO_CONTENT)
}

pub async fn count_accounts(
    State(state): State<AppState>,
) -> Result<Json<CountResponse>, AppError> {
    Ok(Json(CountResponse {
        count: state.repo.count_accounts().await?,
    }))
}
