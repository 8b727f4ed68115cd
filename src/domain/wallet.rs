//! Divine Coins wallet.

use crate::domain::{Decimal, TimeMs, UserId};
use serde::{Deserialize, Serialize};

/// Running virtual balance for one user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Wallet {
    pub wallet_id: i64,
    pub user_id: UserId,
    pub balance: Decimal,
    pub created_at: TimeMs,
    pub updated_at: TimeMs,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub archived_at: Option<TimeMs>,
}

impl Wallet {
    pub fn is_archived(&self) -> bool {
        self.archived_at.is_some()
    }
}
