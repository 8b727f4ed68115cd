//! Trading account provisioned for a user.

use crate::domain::{ParseLabelError, UserId};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Review state of a trading account request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum AccountStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
}

impl AccountStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountStatus::Pending => "Pending",
            AccountStatus::Approved => "Approved",
            AccountStatus::Rejected => "Rejected",
        }
    }
}

impl FromStr for AccountStatus {
    type Err = ParseLabelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Pending" => Ok(AccountStatus::Pending),
            "Approved" => Ok(AccountStatus::Approved),
            "Rejected" => Ok(AccountStatus::Rejected),
            other => Err(ParseLabelError::new("account status", other)),
        }
    }
}

impl fmt::Display for AccountStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A broker trading account (MT4/MT5 login) attached to one user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub id: i64,
    pub user_id: UserId,
    pub account_no: String,
    pub server: String,
    pub password: String,
    pub status: AccountStatus,
}

/// Fields accepted when creating or editing an account.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountDraft {
    pub user_id: UserId,
    pub account_no: String,
    #[serde(default = "default_server")]
    pub server: String,
    pub password: String,
    #[serde(default)]
    pub status: AccountStatus,
}

fn default_server() -> String {
    "MT4-Live".to_string()
}

impl AccountDraft {
    pub fn validate(&self) -> Result<(), String> {
        if self.user_id.as_str().trim().is_empty() {
            return Err("userId is required".to_string());
        }
        if self.account_no.trim().is_empty() {
            return Err("accountNo is required".to_string());
        }
        if self.password.is_empty() {
            return Err("password is required".to_string());
        }
        Ok(())
    }
}
