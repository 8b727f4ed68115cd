//! Daily profit-and-loss ledger entry.

use crate::domain::{Decimal, UserId};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Total PnL booked for one user, date and symbol.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PnlEntry {
    pub id: i64,
    pub user_id: UserId,
    pub date: NaiveDate,
    pub symbol: String,
    /// Signed; losses are negative.
    #[serde(rename = "totalPnL")]
    pub total_pnl: Decimal,
    /// Amount this entry has currently moved the user's wallet by.
    pub wallet_applied: Decimal,
}
