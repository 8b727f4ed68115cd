//! PostgREST profile directory client.

use super::{ProfileSource, ProfileSourceError, RemoteProfile};
use crate::config::ProfilesApi;
use async_trait::async_trait;
use backoff::future::retry;
use backoff::ExponentialBackoff;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, warn};

/// Profile directory served over a PostgREST-style REST endpoint.
#[derive(Debug, Clone)]
pub struct RestProfileSource {
    client: Client,
    base_url: String,
    api_key: String,
}

impl RestProfileSource {
    pub fn new(base_url: String, api_key: String) -> Self {
        Self {
            client: Client::new(),
            base_url,
            api_key,
        }
    }

    pub fn from_config(api: &ProfilesApi) -> Self {
        Self::new(api.url.clone(), api.api_key.clone())
    }

    fn profiles_url(&self) -> String {
        format!(
            "{}/rest/v1/profiles?select=*&order=created_at.desc",
            self.base_url.trim_end_matches('/')
        )
    }

    async fn get_json(&self, url: &str) -> Result<serde_json::Value, ProfileSourceError> {
        let backoff = ExponentialBackoff {
            max_elapsed_time: Some(Duration::from_secs(30)),
            ..Default::default()
        };

        retry(backoff, || async {
            let response = self
                .client
                .get(url)
                .header("apikey", &self.api_key)
                .bearer_auth(&self.api_key)
                .send()
                .await
                .map_err(|e| {
                    backoff::Error::transient(ProfileSourceError::NetworkError(e.to_string()))
                })?;

            let status = response.status();
            if status == 429 {
                return Err(backoff::Error::transient(ProfileSourceError::RateLimited));
            }
            if status.is_server_error() {
                return Err(backoff::Error::transient(ProfileSourceError::HttpError {
                    status: status.as_u16(),
                    message: "Server error".to_string(),
                }));
            }
            if !status.is_success() {
                return Err(backoff::Error::permanent(ProfileSourceError::HttpError {
                    status: status.as_u16(),
                    message: "Client error".to_string(),
                }));
            }

            response.json::<serde_json::Value>().await.map_err(|e| {
                backoff::Error::permanent(ProfileSourceError::ParseError(e.to_string()))
            })
        })
        .await
    }
}

#[async_trait]
impl ProfileSource for RestProfileSource {
    async fn fetch_profiles(&self) -> Result<Vec<RemoteProfile>, ProfileSourceError> {
        let url = self.profiles_url();
        debug!(url = %url, "Fetching profile directory");

        let response = self.get_json(&url).await?;
        parse_profiles(&response)
    }
}

/// Parse a directory response, skipping rows that do not decode.
fn parse_profiles(response: &serde_json::Value) -> Result<Vec<RemoteProfile>, ProfileSourceError> {
    let rows = response
        .as_array()
        .ok_or_else(|| ProfileSourceError::ParseError("Expected array response".to_string()))?;

    let mut profiles = Vec::with_capacity(rows.len());
    for row in rows {
        match serde_json::from_value::<RemoteProfile>(row.clone()) {
            Ok(profile) => profiles.push(profile),
            Err(e) => warn!("Failed to parse profile row: {}", e),
        }
    }
    Ok(profiles)
}
