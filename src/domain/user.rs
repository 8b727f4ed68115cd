//! Platform user (customer or agent).

use crate::domain::{Status, TimeMs, UserId};
use serde::{Deserialize, Serialize};

/// A registered user profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Row id.
    pub id: i64,
    pub unique_id: UserId,
    pub username: String,
    pub email: String,
    pub phone_code: String,
    pub phone: String,
    pub status: Status,
    pub created_at: TimeMs,
}

/// Editable profile fields, used for both create and update.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub username: String,
    pub email: String,
    #[serde(default = "default_phone_code")]
    pub phone_code: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub status: Status,
}

fn default_phone_code() -> String {
    "+1".to_string()
}

impl UserProfile {
    /// Client-side style required-field check.
    pub fn validate(&self) -> Result<(), String> {
        if self.username.trim().is_empty() {
            return Err("username is required".to_string());
        }
        if self.email.trim().is_empty() || !self.email.contains('@') {
            return Err("a valid email is required".to_string());
        }
        Ok(())
    }
}
