use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::api::AppState;
use crate::domain::{Decimal, PnlEntry, User, UserId};
use crate::engine::ProfitSplit;
use crate::error::AppError;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionsQuery {
    pub search: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionDto {
    #[serde(flatten)]
    pub entry: PnlEntry,
    pub username: String,
    pub split: ProfitSplit,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionSummary {
    /// Net platform share across the whole ledger.
    pub realized: Decimal,
    /// Combined balance of active wallets.
    pub unrealized: Decimal,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionsResponse {
    pub transactions: Vec<TransactionDto>,
    pub summary: TransactionSummary,
}

pub async fn list_transactions(
    Query(params): Query<TransactionsQuery>,
    State(state): State<AppState>,
) -> Result<Json<TransactionsResponse>, AppError> {
    let search = params
        .search
        .as_deref()
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty());

    let (users, entries, unrealized) = futures::try_join!(
        state.repo.list_users(),
        state.repo.list_pnl_entries(None, None, None),
        state.repo.total_active_wallet_value(),
    )?;
    let book = state.ledger.book().await?;
    let realized = book.platform_net_total(&entries)?;

    let users: HashMap<&UserId, &User> = users.iter().map(|u| (&u.unique_id, u)).collect();
    let mut transactions = Vec::with_capacity(entries.len());
    for entry in &entries {
        let Some(user) = users.get(&entry.user_id) else {
            continue;
        };
        if let Some(term) = &search {
            let haystack = format!("{} {} {}", user.username, user.unique_id, entry.symbol)
                .to_lowercase();
            if !haystack.contains(term.as_str()) {
                continue;
            }
        }
        transactions.push(TransactionDto {
            split: book.split(entry)?,
            username: user.username.clone(),
            entry: entry.clone(),
        });
    }
    transactions.sort_by(|a, b| b.entry.date.cmp(&a.entry.date).then(b.entry.id.cmp(&a.entry.id)));

    Ok(Json(TransactionsResponse {
        transactions,
        summary: TransactionSummary {
            realized,
            unrealized,
        },
    }))
}
