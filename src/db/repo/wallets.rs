//! Wallet ("Divine Coins") operations for the repository.
//!
//! A user has at most one active wallet (`archived_at IS NULL`), enforced by a
//! partial unique index. Balances are stored as canonical decimal text and
//! summed in Rust.

use crate::domain::{Decimal, TimeMs, UserId, Wallet};
use sqlx::sqlite::{SqliteConnection, SqliteRow};
use sqlx::Row;
use tracing::debug;

use super::pnl::PnlWriteError;
use super::{parse_decimal, Repository};

impl Repository {
    /// Create an active wallet for a user.
    ///
    /// # Errors
    /// Returns a unique-violation error if the user already has an active wallet.
    pub async fn insert_wallet(
        &self,
        user: &UserId,
        balance: Decimal,
    ) -> Result<Wallet, sqlx::Error> {
        let mut conn = self.pool.acquire().await?;
        insert_wallet_conn(&mut conn, user, balance, TimeMs::now()).await
    }

    /// List active wallets, or archived ones when `archived` is true.
    pub async fn list_wallets(&self, archived: bool) -> Result<Vec<Wallet>, sqlx::Error> {
        let sql = if archived {
            r#"
            SELECT wallet_id, user_id, balance, created_at, updated_at, archived_at
            FROM wallets
            WHERE archived_at IS NOT NULL
            ORDER BY archived_at DESC, wallet_id DESC
            "#
        } else {
            r#"
            SELECT wallet_id, user_id, balance, created_at, updated_at, archived_at
            FROM wallets
            WHERE archived_at IS NULL
            ORDER BY wallet_id ASC
            "#
        };

        let rows = sqlx::query(sql).fetch_all(&self.pool).await?;
        rows.iter().map(wallet_from_row).collect()
    }

    pub async fn get_active_wallet(&self, user: &UserId) -> Result<Option<Wallet>, sqlx::Error> {
        let mut conn = self.pool.acquire().await?;
        active_wallet_conn(&mut conn, user).await
    }

    /// Overwrite the balance of a user's active wallet.
    pub async fn set_wallet_balance(
        &self,
        user: &UserId,
        balance: Decimal,
    ) -> Result<Option<Wallet>, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE wallets
            SET balance = ?, updated_at = ?
            WHERE user_id = ? AND archived_at IS NULL
            "#,
        )
        .bind(balance.to_canonical_string())
        .bind(TimeMs::now().as_ms())
        .bind(user.as_str())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }
        debug!(user = %user, balance = %balance, "Wallet balance set");
        self.get_active_wallet(user).await
    }

    /// Move a user's active wallet to the archived set. Returns the archived wallet.
    pub async fn archive_wallet(&self, user: &UserId) -> Result<Option<Wallet>, sqlx::Error> {
        let Some(wallet) = self.get_active_wallet(user).await? else {
            return Ok(None);
        };
        let now = TimeMs::now();

        sqlx::query("UPDATE wallets SET archived_at = ?, updated_at = ? WHERE wallet_id = ?")
            .bind(now.as_ms())
            .bind(now.as_ms())
            .bind(wallet.wallet_id)
            .execute(&self.pool)
            .await?;

        Ok(Some(Wallet {
            updated_at: now,
            archived_at: Some(now),
            ..wallet
        }))
    }

    /// Sum of active wallet balances.
    pub async fn total_active_wallet_value(&self) -> Result<Decimal, sqlx::Error> {
        let wallets = self.list_wallets(false).await?;
        Decimal::checked_sum(wallets.iter().map(|w| w.balance))
            .map_err(|e| sqlx::Error::Protocol(format!("active wallet total: {}", e)))
    }
}

/// Load the active wallet of a user on an existing connection or transaction.
pub(super) async fn active_wallet_conn(
    conn: &mut SqliteConnection,
    user: &UserId,
) -> Result<Option<Wallet>, sqlx::Error> {
    let row = sqlx::query(
        r#"
        SELECT wallet_id, user_id, balance, created_at, updated_at, archived_at
        FROM wallets
        WHERE user_id = ? AND archived_at IS NULL
        "#,
    )
    .bind(user.as_str())
    .fetch_optional(&mut *conn)
    .await?;

    row.as_ref().map(wallet_from_row).transpose()
}

pub(super) async fn insert_wallet_conn(
    conn: &mut SqliteConnection,
    user: &UserId,
    balance: Decimal,
    now: TimeMs,
) -> Result<Wallet, sqlx::Error> {
    let result = sqlx::query(
        r#"
        INSERT INTO wallets (user_id, balance, created_at, updated_at)
        VALUES (?, ?, ?, ?)
        "#,
    )
    .bind(user.as_str())
    .bind(balance.to_canonical_string())
    .bind(now.as_ms())
    .bind(now.as_ms())
    .execute(&mut *conn)
    .await?;

    Ok(Wallet {
        wallet_id: result.last_insert_rowid(),
        user_id: user.clone(),
        balance,
        created_at: now,
        updated_at: now,
        archived_at: None,
    })
}

/// Add `delta` to a user's active wallet. Returns None when the user has no active wallet.
///
/// # Errors
/// `OutOfRange` when the new balance cannot be represented; the wallet is not touched.
pub(super) async fn adjust_active_wallet(
    conn: &mut SqliteConnection,
    user: &UserId,
    delta: Decimal,
) -> Result<Option<Decimal>, PnlWriteError> {
    let Some(wallet) = active_wallet_conn(conn, user).await? else {
        return Ok(None);
    };
    let balance = wallet
        .balance
        .checked_add(delta)
        .map_err(|_| PnlWriteError::OutOfRange(user.clone()))?;

    sqlx::query("UPDATE wallets SET balance = ?, updated_at = ? WHERE wallet_id = ?")
        .bind(balance.to_canonical_string())
        .bind(TimeMs::now().as_ms())
        .bind(wallet.wallet_id)
        .execute(&mut *conn)
        .await?;

    debug!(
        user = %user,
        delta = %delta,
        balance = %balance,
        "Wallet adjusted"
    );
    Ok(Some(balance))
}

fn wallet_from_row(row: &SqliteRow) -> Result<Wallet, sqlx::Error> {
    let balance: String = row.get("balance");
    Ok(Wallet {
        wallet_id: row.get("wallet_id"),
        user_id: UserId::new(row.get::<String, _>("user_id")),
        balance: parse_decimal("wallets.balance", &balance)?,
        created_at: TimeMs::new(row.get("created_at")),
        updated_at: TimeMs::new(row.get("updated_at")),
        archived_at: row.get::<Option<i64>, _>("archived_at").map(TimeMs::new),
    })
}

#[cfg(test)]
mod tests {
    use super::super::test_support::setup_test_db;
    use super::*;
    use std::str::FromStr;

    fn d(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[tokio::test]
    async fn test_one_active_wallet_per_user() {
        let (repo, _temp) = setup_test_db().await;
        let user = UserId::from("T1234");

        repo.insert_wallet(&user, d("10")).await.unwrap();
        let dup = repo.insert_wallet(&user, d("5")).await;
        assert!(dup.is_err());

        let archived = repo.archive_wallet(&user).await.unwrap().unwrap();
        assert!(archived.is_archived());
        assert!(repo.get_active_wallet(&user).await.unwrap().is_none());

        let fresh = repo.insert_wallet(&user, d("0")).await.unwrap();
        assert_eq!(fresh.balance, Decimal::zero());
        assert_eq!(repo.list_wallets(true).await.unwrap().len(), 1);
        assert_eq!(repo.list_wallets(false).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_total_value_counts_active_only() {
        let (repo, _temp) = setup_test_db().await;
        repo.insert_wallet(&UserId::from("A1000"), d("100.25"))
            .await
            .unwrap();
        repo.insert_wallet(&UserId::from("B2000"), d("-20.05"))
            .await
            .unwrap();
        repo.insert_wallet(&UserId::from("C3000"), d("999"))
            .await
            .unwrap();
        repo.archive_wallet(&UserId::from("C3000")).await.unwrap();

        assert_eq!(repo.total_active_wallet_value().await.unwrap(), d("80.2"));
    }

    #[tokio::test]
    async fn test_set_balance_and_adjust() {
        let (repo, _temp) = setup_test_db().await;
        let user = UserId::from("T1234");
        assert!(repo.set_wallet_balance(&user, d("1")).await.unwrap().is_none());

        repo.insert_wallet(&user, d("0")).await.unwrap();
        let wallet = repo.set_wallet_balance(&user, d("42.5")).await.unwrap().unwrap();
        assert_eq!(wallet.balance, d("42.5"));

        let mut conn = repo.pool.acquire().await.unwrap();
        let balance = adjust_active_wallet(&mut conn, &user, d("-2.5"))
            .await
            .unwrap();
        assert_eq!(balance, Some(d("40")));

        let missing = adjust_active_wallet(&mut conn, &UserId::from("Z9999"), d("1"))
            .await
            .unwrap();
        assert_eq!(missing, None);
    }

    #[tokio::test]
    async fn test_adjust_past_decimal_range_leaves_balance() {
        let (repo, _temp) = setup_test_db().await;
        let user = UserId::from("T1234");
        let near_max = d("79000000000000000000000000000");
        repo.insert_wallet(&user, near_max).await.unwrap();

        let mut conn = repo.pool.acquire().await.unwrap();
        let result = adjust_active_wallet(&mut conn, &user, near_max).await;
        assert!(matches!(result, Err(PnlWriteError::OutOfRange(ref u)) if *u == user));
        drop(conn);

        assert_eq!(
            repo.get_active_wallet(&user).await.unwrap().unwrap().balance,
            near_max
        );
    }

    #[tokio::test]
    async fn test_corrupt_balance_is_a_decode_error() {
        let (repo, _temp) = setup_test_db().await;
        let user = UserId::from("T1234");
        repo.insert_wallet(&user, d("12.5")).await.unwrap();
        sqlx::query("UPDATE wallets SET balance = 'abc' WHERE user_id = ?")
            .bind(user.as_str())
            .execute(&repo.pool)
            .await
            .unwrap();

        assert!(repo.get_active_wallet(&user).await.is_err());
        assert!(repo.list_wallets(false).await.is_err());

        let mut conn = repo.pool.acquire().await.unwrap();
        assert!(adjust_active_wallet(&mut conn, &user, d("1")).await.is_err());
        drop(conn);

        let stored: String = sqlx::query("SELECT balance FROM wallets WHERE user_id = ?")
            .bind(user.as_str())
            .fetch_one(&repo.pool)
            .await
            .unwrap()
            .get("balance");
        assert_eq!(stored, "abc");
    }
}
