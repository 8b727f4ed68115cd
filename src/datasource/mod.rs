//! Profile directory abstraction for refreshing users from the hosted backend.

use crate::domain::{Status, TimeMs, UserId, UserProfile};
use async_trait::async_trait;
use serde::Deserialize;
use std::fmt;

pub mod mock;
pub mod rest;

pub use mock::MockProfileSource;
pub use rest::RestProfileSource;

/// Source of user profiles maintained outside this service.
///
/// Implementations handle retry/backoff themselves; an error returned here is final.
#[async_trait]
pub trait ProfileSource: Send + Sync + fmt::Debug {
    /// Fetch every profile, newest first.
    async fn fetch_profiles(&self) -> Result<Vec<RemoteProfile>, ProfileSourceError>;
}

/// A profile row as served by the directory (snake_case, loosely typed).
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RemoteProfile {
    pub id: serde_json::Value,
    #[serde(default)]
    pub unique_id: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone_code: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
}

impl RemoteProfile {
    /// Public id: `unique_id` when present, otherwise the directory's own id.
    pub fn user_id(&self) -> Option<UserId> {
        let id = match (&self.unique_id, &self.id) {
            (Some(unique), _) if !unique.trim().is_empty() => unique.trim().to_string(),
            (_, serde_json::Value::String(s)) => s.trim().to_string(),
            (_, serde_json::Value::Number(n)) => n.to_string(),
            _ => return None,
        };
        (!id.is_empty()).then(|| UserId::new(id))
    }

    /// Convert to a local profile. Missing phone code defaults to "+1", an
    /// unknown status to Active.
    pub fn to_profile(&self) -> UserProfile {
        UserProfile {
            username: self.username.clone().unwrap_or_default(),
            email: self.email.clone().unwrap_or_default(),
            phone_code: self
                .phone_code
                .clone()
                .filter(|c| !c.trim().is_empty())
                .unwrap_or_else(|| "+1".to_string()),
            phone: self.phone.clone().unwrap_or_default(),
            status: self
                .status
                .as_deref()
                .and_then(|s| s.parse::<Status>().ok())
                .unwrap_or_default(),
        }
    }

    /// Creation time from an RFC 3339 `created_at`, if present and valid.
    pub fn created_at(&self) -> Option<TimeMs> {
        let raw = self.created_at.as_deref()?;
        chrono::DateTime::parse_from_rfc3339(raw)
            .ok()
            .map(|dt| TimeMs::new(dt.timestamp_millis()))
    }
}

/// Error type for profile directory operations.
#[derive(Debug, Clone)]
pub enum ProfileSourceError {
    /// Network error (e.g., connection timeout, DNS failure)
    NetworkError(String),
    /// HTTP error (e.g., 401 bad key, 5xx server error)
    HttpError { status: u16, message: String },
    /// Parsing error (invalid JSON or malformed response)
    ParseError(String),
    /// Rate limit exceeded
    RateLimited,
    /// No directory configured
    NotConfigured,
}

impl fmt::Display for ProfileSourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProfileSourceError::NetworkError(msg) => write!(f, "Network error: {}", msg),
            ProfileSourceError::HttpError { status, message } => {
                write!(f, "HTTP error {}: {}", status, message)
            }
            ProfileSourceError::ParseError(msg) => write!(f, "Parse error: {}", msg),
            ProfileSourceError::RateLimited => write!(f, "Rate limited"),
            ProfileSourceError::NotConfigured => write!(f, "Profile directory is not configured"),
        }
    }
}

impl std::error::Error for ProfileSourceError {}
