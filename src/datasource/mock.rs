//! Mock profile directory for testing without network calls.

use super::{ProfileSource, ProfileSourceError, RemoteProfile};
use async_trait::async_trait;

/// Mock profile source that returns predefined rows, or a fixed error.
#[derive(Debug, Clone, Default)]
pub struct MockProfileSource {
    profiles: Vec<RemoteProfile>,
    error: Option<ProfileSourceError>,
}

impl MockProfileSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_profile(mut self, profile: RemoteProfile) -> Self {
        self.profiles.push(profile);
        self
    }

    /// Make every fetch fail with `error`.
    pub fn failing(mut self, error: ProfileSourceError) -> Self {
        self.error = Some(error);
        self
    }
}

#[async_trait]
impl ProfileSource for MockProfileSource {
    async fn fetch_profiles(&self) -> Result<Vec<RemoteProfile>, ProfileSourceError> {
        match &self.error {
            Some(err) => Err(err.clone()),
            None => Ok(self.profiles.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_returns_rows() {
        let row = serde_json::from_value(serde_json::json!({"id": "x", "unique_id": "A1000"}))
            .unwrap();
        let source = MockProfileSource::new().with_profile(row);
        let rows = source.fetch_profiles().await.unwrap();
        assert_eq!(rows.len(), 1);
    }

    #[tokio::test]
    async fn test_mock_failing() {
        let source = MockProfileSource::new().failing(ProfileSourceError::RateLimited);
        assert!(source.fetch_profiles().await.is_err());
    }
}
