//! Trading account operations for the repository.

use crate::domain::{Account, AccountDraft, AccountStatus, UserId};
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

use super::{parse_label, Repository};

impl Repository {
    /// Insert an account with the given status.
    ///
    /// # Errors
    /// Returns an error if the insert fails.
    pub async fn insert_account(
        &self,
        draft: &AccountDraft,
        status: AccountStatus,
    ) -> Result<Account, sqlx::Error> {
        let result = sqlx::query(
            r#"
            INSERT INTO accounts (user_id, account_no, server, password, status)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(draft.user_id.as_str())
        .bind(draft.account_no.trim())
        .bind(&draft.server)
        .bind(&draft.password)
        .bind(status.as_str())
        .execute(&self.pool)
        .await?;

        Ok(Account {
            id: result.last_insert_rowid(),
            user_id: draft.user_id.clone(),
            account_no: draft.account_no.trim().to_string(),
            server: draft.server.clone(),
            password: draft.password.clone(),
            status,
        })
    }

    /// List accounts, optionally restricted to one status.
    pub async fn list_accounts(
        &self,
        status: Option<AccountStatus>,
    ) -> Result<Vec<Account>, sqlx::Error> {
        let rows = match status {
            Some(status) => {
                sqlx::query(
                    r#"
                    SELECT id, user_id, account_no, server, password, status
                    FROM accounts
                    WHERE status = ?
                    ORDER BY id ASC
                    "#,
                )
                .bind(status.as_str())
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query(
                    r#"
                    SELECT id, user_id, account_no, server, password, status
                    FROM accounts
                    ORDER BY id ASC
                    "#,
                )
                .fetch_all(&self.pool)
                .await?
            }
        };

        rows.iter().map(account_from_row).collect()
    }

    pub async fn list_accounts_for_user(&self, user: &UserId) -> Result<Vec<Account>, sqlx::Error> {
        let rows = sqlx::query(
            r#"
            SELECT id, user_id, account_no, server, password, status
            FROM accounts
            WHERE user_id = ?
            ORDER BY id ASC
            "#,
        )
        .bind(user.as_str())
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(account_from_row).collect()
    }

    pub async fn get_account(&self, id: i64) -> Result<Option<Account>, sqlx::Error> {
        let row = sqlx::query(
            "SELECT id, user_id, account_no, server, password, status FROM accounts WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(account_from_row).transpose()
    }

    /// Overwrite every field of an account. Returns None if the id is unknown.
    pub async fn update_account(
        &self,
        id: i64,
        draft: &AccountDraft,
    ) -> Result<Option<Account>, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE accounts
            SET user_id = ?, account_no = ?, server = ?, password = ?, status = ?
            WHERE id = ?
            "#,
        )
        .bind(draft.user_id.as_str())
        .bind(draft.account_no.trim())
        .bind(&draft.server)
        .bind(&draft.password)
        .bind(draft.status.as_str())
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }
        self.get_account(id).await
    }

    pub async fn delete_account(&self, id: i64) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM accounts WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn count_accounts(&self) -> Result<i64, sqlx::Error> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM accounts")
            .fetch_one(&self.pool)
            .await?;
        Ok(row.get("n"))
    }

    /// Count a user's accounts regardless of status.
    pub async fn count_accounts_for_user(&self, user: &UserId) -> Result<i64, sqlx::Error> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM accounts WHERE user_id = ?")
            .bind(user.as_str())
            .fetch_one(&self.pool)
            .await?;
        Ok(row.get("n"))
    }
}

fn account_from_row(row: &SqliteRow) -> Result<Account, sqlx::Error> {
    let status: String = row.get("status");
    Ok(Account {
        id: row.get("id"),
        user_id: UserId::new(row.get::<String, _>("user_id")),
        account_no: row.get("account_no"),
        server: row.get("server"),
        password: row.get("password"),
        status: parse_label(&status)?,
    })
}
