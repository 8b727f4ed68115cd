use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::parse_user_id;
use crate::api::AppState;
use crate::domain::{Decimal, Wallet};
use crate::error::AppError;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletsQuery {
    pub archived: Option<bool>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateWalletRequest {
    pub user_id: String,
    #[serde(default)]
    pub balance: Decimal,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetBalanceRequest {
    pub balance: Decimal,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TotalValueResponse {
    pub total: Decimal,
}

pub async fn list_wallets(
    Query(params): Query<WalletsQuery>,
    State(state): State<AppState>,
) -> Result<Json<Vec<Wallet>>, AppError> {
    let archived = params.archived.unwrap_or(false);
    Ok(Json(state.repo.list_wallets(archived).await?))
}

pub async fn get_wallet(
    Path(user_id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<Wallet>, AppError> {
    let user_id = parse_user_id(&user_id)?;
    state
        .repo
        .get_active_wallet(&user_id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("User {} has no active wallet", user_id)))
}

pub async fn create_wallet(
    State(state): State<AppState>,
    Json(req): Json<CreateWalletRequest>,
) -> Result<(StatusCode, Json<Wallet>), AppError> {
    let user_id = parse_user_id(&req.user_id)?;
    if state.repo.get_user(&user_id).await?.is_none() {
        return Err(AppError::NotFound(format!("User {} not found", user_id)));
    }
    if state.repo.get_active_wallet(&user_id).await?.is_some() {
        return Err(AppError::Conflict(format!(
            "User {} already has an active wallet",
            user_id
        )));
    }

    let wallet = state.repo.insert_wallet(&user_id, req.balance).await?;
    info!(user = %user_id, balance = %wallet.balance, "Wallet created");
    Ok((StatusCode::CREATED, Json(wallet)))
}

/// Manual balance override.
pub async fn set_balance(
    Path(user_id): Path<String>,
    State(state): State<AppState>,
    Json(req): Json<SetBalanceRequest>,
) -> Result<Json<Wallet>, AppError> {
    let user_id = parse_user_id(&user_id)?;
    let wallet = state
        .repo
        .set_wallet_balance(&user_id, req.balance)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User {} has no active wallet", user_id)))?;
    info!(user = %user_id, balance = %wallet.balance, "Wallet balance set");
    Ok(Json(wallet))
}

pub async fn archive_wallet(
    Path(user_id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<Wallet>, AppError> {
    let user_id = parse_user_id(&user_id)?;
    let wallet = state
        .repo
        .archive_wallet(&user_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User {} has no active wallet", user_id)))?;
    info!(user = %user_id, wallet_id = wallet.wallet_id, "Wallet archived");
    Ok(Json(wallet))
}

pub async fn total_value(
    State(state): State<AppState>,
) -> Result<Json<TotalValueResponse>, AppError> {
    Ok(Json(TotalValueResponse {
        total: state.repo.total_active_wallet_value().await?,
    }))
}
