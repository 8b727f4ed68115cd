use axum::extract::{Path, Query, State};
use axum::Json;
use chrono::{Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::{parse_optional_date, parse_user_id};
use crate::api::AppState;
use crate::domain::{AccountStatus, Decimal};
use crate::engine::{daily_series, DailyPnl};
use crate::error::AppError;

/// Days covered by the default chart window, today included.
const DEFAULT_WINDOW_DAYS: i64 = 30;

/// Longest window a chart may request, both ends included.
const MAX_WINDOW_DAYS: i64 = 366;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WindowQuery {
    pub from: Option<String>,
    pub to: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminDashboard {
    pub total_users: i64,
    pub total_accounts: i64,
    pub active_wallets: usize,
    pub net_platform_share: Decimal,
    pub daily_pnl: Vec<DailyPnl>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerDashboard {
    pub earnings: Decimal,
    pub approved_accounts: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wallet_balance: Option<Decimal>,
    pub daily_pnl: Vec<DailyPnl>,
}

fn window(params: &WindowQuery) -> Result<(NaiveDate, NaiveDate), AppError> {
    let to = parse_optional_date("to", params.to.as_deref())?
        .unwrap_or_else(|| Utc::now().date_naive());
    let from = parse_optional_date("from", params.from.as_deref())?
        .unwrap_or_else(|| to - Duration::days(DEFAULT_WINDOW_DAYS - 1));
    if from > to {
        return Err(AppError::BadRequest("from must be <= to".to_string()));
    }
    if (to - from).num_days() + 1 > MAX_WINDOW_DAYS {
        return Err(AppError::BadRequest(format!(
            "window may cover at most {} days",
            MAX_WINDOW_DAYS
        )));
    }
    Ok((from, to))
}

pub async fn admin_dashboard(
    Query(params): Query<WindowQuery>,
    State(state): State<AppState>,
) -> Result<Json<AdminDashboard>, AppError> {
    let (from, to) = window(&params)?;

    let (total_users, total_accounts, wallets, entries) = futures::try_join!(
        state.repo.count_users(),
        state.repo.count_accounts(),
        state.repo.list_wallets(false),
        state.repo.list_pnl_entries(None, None, None),
    )?;
    let book = state.ledger.book().await?;

    Ok(Json(AdminDashboard {
        total_users,
        total_accounts,
        active_wallets: wallets.len(),
        net_platform_share: book.platform_net_total(&entries)?,
        daily_pnl: daily_series(&entries, from, to)?,
    }))
}

pub async fn customer_dashboard(
    Path(user_id): Path<String>,
    Query(params): Query<WindowQuery>,
    State(state): State<AppState>,
) -> Result<Json<CustomerDashboard>, AppError> {
    let user_id = parse_user_id(&user_id)?;
    let (from, to) = window(&params)?;
    if state.repo.get_user(&user_id).await?.is_none() {
        return Err(AppError::NotFound(format!("User {} not found", user_id)));
    }

    let (accounts, wallet, entries) = futures::try_join!(
        state.repo.list_accounts_for_user(&user_id),
        state.repo.get_active_wallet(&user_id),
        state.repo.list_pnl_entries(Some(&user_id), None, None),
    )?;
    let book = state.ledger.book().await?;

    Ok(Json(CustomerDashboard {
        earnings: book.customer_total(&entries)?,
        approved_accounts: accounts
            .iter()
            .filter(|a| a.status == AccountStatus::Approved)
            .count(),
        wallet_balance: wallet.map(|w| w.balance),
        daily_pnl: daily_series(&entries, from, to)?,
    }))
}
