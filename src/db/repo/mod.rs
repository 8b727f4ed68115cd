//! Repository layer for database operations.
//!
//! This module provides the `Repository` struct for all database operations.
//! Methods are organized across submodules by domain:
//! - `accounts.rs` - Trading account operations
//! - `plans.rs` - Plan assignment and enrollment
//! - `pnl.rs` - PnL ledger rows and their wallet effects
//! - `wallets.rs` - Wallet balances and archiving
//! - `referrals.rs` - Referral registry
//! - `chats.rs` - Support chats and messages
//! - `team.rs` - Team members and permission grids
//!
//! User operations live here since every other table references users by
//! `unique_id`.

mod accounts;
mod chats;
mod plans;
mod pnl;
mod referrals;
mod team;
mod wallets;

pub use plans::Enrollment;
pub use pnl::{PnlWrite, PnlWriteError};

use crate::domain::{Decimal, ParseLabelError, TimeMs, User, UserId, UserProfile};
use chrono::NaiveDate;
use sqlx::sqlite::{SqlitePool, SqliteRow};
use sqlx::Row;
use std::str::FromStr;
use tracing::{debug, warn};

/// Attempts at drawing an unused random id before giving up.
const ID_ATTEMPTS: usize = 32;

/// Repository for database operations.
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: SqlitePool) -> Self {
        Repository { pool }
    }

    /// Round-trip a trivial query to confirm the database is reachable.
    pub async fn ping(&self) -> Result<(), sqlx::Error> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    // =========================================================================
    // User operations
    // =========================================================================

    /// Insert a user under a freshly generated `unique_id`.
    ///
    /// # Errors
    /// Returns an error if the insert fails (including a duplicate email) or
    /// no unused id could be drawn.
    pub async fn create_user(&self, profile: &UserProfile) -> Result<User, sqlx::Error> {
        let unique_id = self.unused_user_id().await?;
        let created_at = TimeMs::now();

        let result = sqlx::query(
            r#"
            INSERT INTO users (unique_id, username, email, phone_code, phone, status, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(unique_id.as_str())
        .bind(profile.username.trim())
        .bind(profile.email.trim())
        .bind(&profile.phone_code)
        .bind(&profile.phone)
        .bind(profile.status.as_str())
        .bind(created_at.as_ms())
        .execute(&self.pool)
        .await?;

        debug!(unique_id = %unique_id, "User created");

        Ok(User {
            id: result.last_insert_rowid(),
            unique_id,
            username: profile.username.trim().to_string(),
            email: profile.email.trim().to_string(),
            phone_code: profile.phone_code.clone(),
            phone: profile.phone.clone(),
            status: profile.status,
            created_at,
        })
    }

    async fn unused_user_id(&self) -> Result<UserId, sqlx::Error> {
        for _ in 0..ID_ATTEMPTS {
            let candidate = UserId::generate();
            if self.get_user(&candidate).await?.is_none() {
                return Ok(candidate);
            }
        }
        Err(sqlx::Error::Protocol(
            "could not allocate an unused user id".to_string(),
        ))
    }

    /// List all users, newest first.
    pub async fn list_users(&self) -> Result<Vec<User>, sqlx::Error> {
        let rows = sqlx::query(
            r#"
            SELECT id, unique_id, username, email, phone_code, phone, status, created_at
            FROM users
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(user_from_row).collect()
    }

    /// Get a user by `unique_id`.
    pub async fn get_user(&self, unique_id: &UserId) -> Result<Option<User>, sqlx::Error> {
        let row = sqlx::query(
            r#"
            SELECT id, unique_id, username, email, phone_code, phone, status, created_at
            FROM users
            WHERE unique_id = ?
            "#,
        )
        .bind(unique_id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(user_from_row).transpose()
    }

    /// Get a user by email (exact match after trimming).
    pub async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, sqlx::Error> {
        let row = sqlx::query(
            r#"
            SELECT id, unique_id, username, email, phone_code, phone, status, created_at
            FROM users
            WHERE email = ?
            "#,
        )
        .bind(email.trim())
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(user_from_row).transpose()
    }

    /// Overwrite a user's profile fields. Returns the updated user, or None if unknown.
    ///
    /// # Errors
    /// Returns an error if the update fails (including an email already used by another user).
    pub async fn update_user(
        &self,
        unique_id: &UserId,
        profile: &UserProfile,
    ) -> Result<Option<User>, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET username = ?, email = ?, phone_code = ?, phone = ?, status = ?
            WHERE unique_id = ?
            "#,
        )
        .bind(profile.username.trim())
        .bind(profile.email.trim())
        .bind(&profile.phone_code)
        .bind(&profile.phone)
        .bind(profile.status.as_str())
        .bind(unique_id.as_str())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }
        self.get_user(unique_id).await
    }

    /// Delete a user row. Accounts, wallets, plans and PnL are left in place.
    pub async fn delete_user(&self, unique_id: &UserId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM users WHERE unique_id = ?")
            .bind(unique_id.as_str())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn count_users(&self) -> Result<i64, sqlx::Error> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM users")
            .fetch_one(&self.pool)
            .await?;
        Ok(row.get("n"))
    }

    /// Insert or refresh a user keyed by an externally assigned `unique_id`.
    ///
    /// Returns true when a new row was created.
    pub async fn upsert_user(
        &self,
        unique_id: &UserId,
        profile: &UserProfile,
        created_at: TimeMs,
    ) -> Result<bool, sqlx::Error> {
        let existed = self.get_user(unique_id).await?.is_some();

        sqlx::query(
            r#"
            INSERT INTO users (unique_id, username, email, phone_code, phone, status, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(unique_id) DO UPDATE SET
                username = excluded.username,
                email = excluded.email,
                phone_code = excluded.phone_code,
                phone = excluded.phone,
                status = excluded.status
            "#,
        )
        .bind(unique_id.as_str())
        .bind(profile.username.trim())
        .bind(profile.email.trim())
        .bind(&profile.phone_code)
        .bind(&profile.phone)
        .bind(profile.status.as_str())
        .bind(created_at.as_ms())
        .execute(&self.pool)
        .await?;

        Ok(!existed)
    }
}

// =========================================================================
// Row decoding helpers
// =========================================================================

fn user_from_row(row: &SqliteRow) -> Result<User, sqlx::Error> {
    let status: String = row.get("status");
    Ok(User {
        id: row.get("id"),
        unique_id: UserId::new(row.get::<String, _>("unique_id")),
        username: row.get("username"),
        email: row.get("email"),
        phone_code: row.get("phone_code"),
        phone: row.get("phone"),
        status: parse_label(&status)?,
        created_at: TimeMs::new(row.get("created_at")),
    })
}

/// Decode a stored enum label, surfacing unknown labels as a decode error.
fn parse_label<T>(value: &str) -> Result<T, sqlx::Error>
where
    T: FromStr<Err = ParseLabelError>,
{
    value
        .parse::<T>()
        .map_err(|e| sqlx::Error::Decode(Box::new(e)))
}

/// Decode a stored money column. Unparseable text is a decode error so a
/// corrupt balance is never read back (and rewritten) as zero.
fn parse_decimal(column: &'static str, value: &str) -> Result<Decimal, sqlx::Error> {
    Decimal::from_str(value).map_err(|e| {
        warn!(
            column = column,
            value = %value,
            error = %e,
            "Failed to parse stored decimal"
        );
        sqlx::Error::Decode(Box::new(e))
    })
}

fn parse_date(value: &str) -> Result<NaiveDate, sqlx::Error> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|e| sqlx::Error::Decode(Box::new(e)))
}

fn format_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::Repository;
    use crate::db::migrations::init_db;
    use tempfile::TempDir;

    pub async fn setup_test_db() -> (Repository, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir
            .path()
            .join("test.db")
            .to_string_lossy()
            .to_string();
        let pool = init_db(&db_path).await.expect("init_db failed");
        (Repository::new(pool), temp_dir)
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::setup_test_db;
    use super::*;
    use crate::domain::Status;

    fn profile(name: &str) -> UserProfile {
        UserProfile {
            username: name.to_string(),
            email: format!("{}@example.com", name),
            phone_code: "+44".to_string(),
            phone: "7700900000".to_string(),
            status: Status::Active,
        }
    }

    #[tokio::test]
    async fn test_create_and_get_user() {
        let (repo, _temp) = setup_test_db().await;

        let created = repo.create_user(&profile("ann")).await.unwrap();
        let fetched = repo.get_user(&created.unique_id).await.unwrap();
        assert_eq!(fetched, Some(created.clone()));

        let by_email = repo.get_user_by_email(" ann@example.com ").await.unwrap();
        assert_eq!(by_email.map(|u| u.unique_id), Some(created.unique_id));
    }

    #[tokio::test]
    async fn test_duplicate_email_rejected() {
        let (repo, _temp) = setup_test_db().await;
        repo.create_user(&profile("ann")).await.unwrap();
        let err = repo.create_user(&profile("ann")).await.unwrap_err();
        let is_unique = err
            .as_database_error()
            .map(|e| e.is_unique_violation())
            .unwrap_or(false);
        assert!(is_unique, "expected unique violation, got {}", err);
    }

    #[tokio::test]
    async fn test_list_users_newest_first() {
        let (repo, _temp) = setup_test_db().await;
        repo.upsert_user(&UserId::from("A1000"), &profile("old"), TimeMs::new(1_000))
            .await
            .unwrap();
        repo.upsert_user(&UserId::from("B2000"), &profile("new"), TimeMs::new(2_000))
            .await
            .unwrap();

        let users = repo.list_users().await.unwrap();
        let ids: Vec<&str> = users.iter().map(|u| u.unique_id.as_str()).collect();
        assert_eq!(ids, vec!["B2000", "A1000"]);
        assert_eq!(repo.count_users().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_update_and_delete_user() {
        let (repo, _temp) = setup_test_db().await;
        let user = repo.create_user(&profile("ann")).await.unwrap();

        let mut changed = profile("ann");
        changed.status = Status::Inactive;
        changed.phone = "123".to_string();
        let updated = repo
            .update_user(&user.unique_id, &changed)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.status, Status::Inactive);
        assert_eq!(updated.phone, "123");

        assert!(repo
            .update_user(&UserId::from("Z9999"), &changed)
            .await
            .unwrap()
            .is_none());

        assert!(repo.delete_user(&user.unique_id).await.unwrap());
        assert!(!repo.delete_user(&user.unique_id).await.unwrap());
        assert_eq!(repo.count_users().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_upsert_reports_new_rows_only() {
        let (repo, _temp) = setup_test_db().await;
        let id = UserId::from("C3000");
        assert!(repo.upsert_user(&id, &profile("cat"), TimeMs::new(5)).await.unwrap());

        let mut renamed = profile("cat");
        renamed.username = "catherine".to_string();
        assert!(!repo.upsert_user(&id, &renamed, TimeMs::new(9)).await.unwrap());

        let user = repo.get_user(&id).await.unwrap().unwrap();
        assert_eq!(user.username, "catherine");
        assert_eq!(user.created_at, TimeMs::new(5));
    }
}
