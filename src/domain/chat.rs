//! Support chat between customers and the admin desk.

use crate::domain::{TimeMs, UserId};
use serde::{Deserialize, Serialize};

/// Sender/receiver id used by the support side.
pub const ADMIN_ID: &str = "admin";

/// One conversation thread per customer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Chat {
    pub id: String,
    pub customer_id: UserId,
    pub last_message: String,
    pub last_message_time: TimeMs,
    pub unread_count: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: String,
    pub sender_id: UserId,
    pub receiver_id: UserId,
    pub content: String,
    pub timestamp: TimeMs,
    pub read: bool,
}

/// A message before it has been stored.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewMessage {
    pub sender_id: UserId,
    pub receiver_id: UserId,
    pub content: String,
    #[serde(default)]
    pub read: bool,
}

impl NewMessage {
    /// The customer whose chat this message belongs to.
    pub fn customer_id(&self) -> &UserId {
        if self.sender_id.as_str() == ADMIN_ID {
            &self.receiver_id
        } else {
            &self.sender_id
        }
    }
}
