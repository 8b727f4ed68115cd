//! User refresh from the hosted profile directory.

use crate::datasource::{ProfileSource, ProfileSourceError};
use crate::db::Repository;
use crate::domain::TimeMs;
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Clone)]
pub struct ProfileSync {
    source: Option<Arc<dyn ProfileSource>>,
    repo: Arc<Repository>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncReport {
    pub fetched: usize,
    pub created: usize,
    pub updated: usize,
    pub skipped: usize,
}

impl ProfileSync {
    /// `source` is None when no directory is configured; refresh then fails with `NotConfigured`.
    pub fn new(source: Option<Arc<dyn ProfileSource>>, repo: Arc<Repository>) -> Self {
        Self { source, repo }
    }

    /// Pull every profile and upsert it by public id.
    ///
    /// Rows without an id or with an invalid profile are skipped with a warning.
    pub async fn refresh(&self) -> Result<SyncReport, SyncError> {
        let source = self
            .source
            .as_ref()
            .ok_or(SyncError::Source(ProfileSourceError::NotConfigured))?;

        let profiles = source.fetch_profiles().await?;
        let mut report = SyncReport {
            fetched: profiles.len(),
            ..SyncReport::default()
        };

        for remote in &profiles {
            let Some(user_id) = remote.user_id() else {
                warn!(row_id = %remote.id, "Skipping profile without id");
                report.skipped += 1;
                continue;
            };
            let profile = remote.to_profile();
            if let Err(reason) = profile.validate() {
                warn!(user = %user_id, reason = %reason, "Skipping invalid profile");
                report.skipped += 1;
                continue;
            }

            let created_at = remote.created_at().unwrap_or_else(TimeMs::now);
            match self.repo.upsert_user(&user_id, &profile, created_at).await {
                Ok(true) => report.created += 1,
                Ok(false) => report.updated += 1,
                Err(e) if is_unique_violation(&e) => {
                    warn!(user = %user_id, error = %e, "Skipping profile with conflicting email");
                    report.skipped += 1;
                }
                Err(e) => return Err(e.into()),
            }
        }

        info!(
            fetched = report.fetched,
            created = report.created,
            updated = report.updated,
            skipped = report.skipped,
            "Profile directory synced"
        );
        Ok(report)
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .map(|e| e.is_unique_violation())
        .unwrap_or(false)
}

#[derive(Debug, Error)]
pub enum SyncError {
    #[error(transparent)]
    Source(#[from] ProfileSourceError),
    #[error(transparent)]
    Db(#[from] sqlx::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datasource::{MockProfileSource, RemoteProfile};
    use crate::db::migrations::init_db;
    use crate::domain::UserId;
    use tempfile::TempDir;

    async fn setup_repo() -> (Arc<Repository>, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir
            .path()
            .join("test.db")
            .to_string_lossy()
            .to_string();
        let pool = init_db(&db_path).await.expect("init_db failed");
        (Arc::new(Repository::new(pool)), temp_dir)
    }

    fn row(json: serde_json::Value) -> RemoteProfile {
        serde_json::from_value(json).unwrap()
    }

    #[tokio::test]
    async fn test_refresh_upserts_and_skips() {
        let (repo, _temp) = setup_repo().await;
        let source = MockProfileSource::new()
            .with_profile(row(serde_json::json!({
                "id": "a", "unique_id": "A1000", "username": "ann",
                "email": "ann@example.com", "created_at": "2025-01-02T03:04:05Z"
            })))
            .with_profile(row(serde_json::json!({
                "id": "b", "unique_id": "B2000", "username": "", "email": "bob@example.com"
            })))
            .with_profile(row(serde_json::json!({"id": null})));
        let sync = ProfileSync::new(Some(Arc::new(source)), repo.clone());

        let report = sync.refresh().await.unwrap();
        assert_eq!(
            report,
            SyncReport {
                fetched: 3,
                created: 1,
                updated: 0,
                skipped: 2
            }
        );
        let ann = repo.get_user(&UserId::from("A1000")).await.unwrap().unwrap();
        assert_eq!(ann.created_at, TimeMs::new(1_735_787_045_000));

        let again = sync.refresh().await.unwrap();
        assert_eq!(again.updated, 1);
        assert_eq!(repo.count_users().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_refresh_surfaces_source_errors() {
        let (repo, _temp) = setup_repo().await;
        let failing = MockProfileSource::new().failing(ProfileSourceError::HttpError {
            status: 503,
            message: "Server error".to_string(),
        });
        let sync = ProfileSync::new(Some(Arc::new(failing)), repo.clone());
        assert!(matches!(sync.refresh().await, Err(SyncError::Source(_))));

        let unconfigured = ProfileSync::new(None, repo);
        assert!(matches!(
            unconfigured.refresh().await,
            Err(SyncError::Source(ProfileSourceError::NotConfigured))
        ));
    }
}
