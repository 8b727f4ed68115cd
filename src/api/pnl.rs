use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};

use super::{parse_date, parse_optional_date, parse_user_id};
use crate::api::AppState;
use crate::domain::{Decimal, PnlEntry};
use crate::error::AppError;
use crate::orchestration::LedgerLine;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PnlQuery {
    pub user_id: Option<String>,
    pub from: Option<String>,
    pub to: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePnlRequest {
    pub user_ids: Vec<String>,
    pub date: String,
    pub symbol: String,
    #[serde(rename = "totalPnL")]
    pub total_pnl: Decimal,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePnlRequest {
    pub date: String,
    pub symbol: String,
    #[serde(rename = "totalPnL")]
    pub total_pnl: Decimal,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PnlEntriesResponse {
    pub entries: Vec<PnlEntry>,
}

pub async fn list_entries(
    Query(params): Query<PnlQuery>,
    State(state): State<AppState>,
) -> Result<Json<Vec<LedgerLine>>, AppError> {
    let user = params
        .user_id
        .as_deref()
        .filter(|s| !s.trim().is_empty())
        .map(parse_user_id)
        .transpose()?;
    let from = parse_optional_date("from", params.from.as_deref())?;
    let to = parse_optional_date("to", params.to.as_deref())?;
    if let (Some(from), Some(to)) = (from, to) {
        if from > to {
            return Err(AppError::BadRequest("from must be <= to".to_string()));
        }
    }

    Ok(Json(state.ledger.list(user.as_ref(), from, to).await?))
}

/// Book the same PnL for every listed user.
pub async fn create_entries(
    State(state): State<AppState>,
    Json(req): Json<CreatePnlRequest>,
) -> Result<(StatusCode, Json<PnlEntriesResponse>), AppError> {
    let users = req
        .user_ids
        .iter()
        .map(|id| parse_user_id(id))
        .collect::<Result<Vec<_>, _>>()?;
    let date = parse_date("date", &req.date)?;

    let entries = state
        .ledger
        .create_entries(&users, date, &req.symbol, req.total_pnl)
        .await?;
    Ok((StatusCode::CREATED, Json(PnlEntriesResponse { entries })))
}

pub async fn update_entry(
    Path(id): Path<i64>,
    State(state): State<AppState>,
    Json(req): Json<UpdatePnlRequest>,
) -> Result<Json<PnlEntry>, AppError> {
    let date = parse_date("date", &req.date)?;
    let entry = state
        .ledger
        .update_entry(id, date, &req.symbol, req.total_pnl)
        .await?;
    Ok(Json(entry))
}

pub async fn delete_entry(
    Path(id): Path<i64>,
    State(state): State<AppState>,
) -> Result<Json<PnlEntry>, AppError> {
    Ok(Json(state.ledger.delete_entry(id).await?))
}

/// Body is CSV with a `user_id,date,symbol,total_pnl` header.
pub async fn import_entries(
    State(state): State<AppState>,
    body: String,
) -> Result<(StatusCode, Json<PnlEntriesResponse>), AppError> {
    let entries = state.ledger.import_csv(&body).await?;
    Ok((StatusCode::CREATED, Json(PnlEntriesResponse { entries })))
}
