//! PnL ledger operations for the repository.
//!
//! Every mutation moves the owner's active wallet in the same transaction and
//! records the applied amount on the entry as `wallet_applied`, so later edits
//! and deletes reverse exactly what was applied. The owner's plan and referral
//! are read inside that transaction, so the wallet amount always matches the
//! state it is committed against.

use crate::domain::{Decimal, PnlEntry, TimeMs, UserId};
use crate::engine::SplitCalculator;
use chrono::NaiveDate;
use sqlx::sqlite::{SqliteConnection, SqliteRow};
use sqlx::Row;
use thiserror::Error;
use tracing::{info, warn};

use super::plans::user_plan_conn;
use super::referrals::referral_for_customer_conn;
use super::wallets::adjust_active_wallet;
use super::{format_date, parse_date, parse_decimal, Repository};

/// A PnL row to write. Its wallet amount is derived inside the write transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PnlWrite {
    pub user_id: UserId,
    pub date: NaiveDate,
    pub symbol: String,
    pub total_pnl: Decimal,
}

#[derive(Debug, Error)]
pub enum PnlWriteError {
    #[error("PnL amount for user {0} is outside the supported range")]
    OutOfRange(UserId),
    #[error(transparent)]
    Db(#[from] sqlx::Error),
}

impl Repository {
    /// Insert PnL entries and credit each owner's active wallet atomically.
    ///
    /// An owner without an active wallet gets `wallet_applied = 0`.
    ///
    /// # Errors
    /// Returns an error if any database operation fails or any amount leaves
    /// the decimal range; nothing is committed then.
    pub async fn insert_pnl_entries_atomic(
        &self,
        calc: &SplitCalculator,
        writes: &[PnlWrite],
    ) -> Result<Vec<PnlEntry>, PnlWriteError> {
        let mut tx = self.pool.begin().await?;
        let mut entries = Vec::with_capacity(writes.len());

        for write in writes {
            let amount = wallet_amount_conn(&mut tx, calc, &write.user_id, write.total_pnl).await?;
            let applied = apply_or_skip(&mut tx, &write.user_id, amount).await?;

            let result = sqlx::query(
                r#"
                INSERT INTO pnl_entries (user_id, date, symbol, total_pnl, wallet_applied, created_at)
                VALUES (?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(write.user_id.as_str())
            .bind(format_date(write.date))
            .bind(&write.symbol)
            .bind(write.total_pnl.to_canonical_string())
            .bind(applied.to_canonical_string())
            .bind(TimeMs::now().as_ms())
            .execute(&mut *tx)
            .await?;

            entries.push(PnlEntry {
                id: result.last_insert_rowid(),
                user_id: write.user_id.clone(),
                date: write.date,
                symbol: write.symbol.clone(),
                total_pnl: write.total_pnl,
                wallet_applied: applied,
            });
        }

        tx.commit().await?;
        info!(count = entries.len(), "PnL entries created");
        Ok(entries)
    }

    /// Rewrite an entry's date, symbol and total, moving the wallet by the
    /// difference between the new amount and the amount previously applied.
    ///
    /// Returns None if the entry does not exist.
    pub async fn update_pnl_entry_atomic(
        &self,
        calc: &SplitCalculator,
        id: i64,
        date: NaiveDate,
        symbol: &str,
        total_pnl: Decimal,
    ) -> Result<Option<PnlEntry>, PnlWriteError> {
        let mut tx = self.pool.begin().await?;

        let Some(existing) = pnl_entry_conn(&mut tx, id).await? else {
            return Ok(None);
        };

        let wallet_amount = wallet_amount_conn(&mut tx, calc, &existing.user_id, total_pnl).await?;
        let delta = wallet_amount
            .checked_sub(existing.wallet_applied)
            .map_err(|_| PnlWriteError::OutOfRange(existing.user_id.clone()))?;
        let applied = match adjust_active_wallet(&mut tx, &existing.user_id, delta).await? {
            Some(_) => wallet_amount,
            None => {
                warn!(
                    entry_id = id,
                    user = %existing.user_id,
                    "No active wallet for PnL owner; entry no longer moves a wallet"
                );
                Decimal::zero()
            }
        };

        sqlx::query(
            r#"
            UPDATE pnl_entries
            SET date = ?, symbol = ?, total_pnl = ?, wallet_applied = ?
            WHERE id = ?
            "#,
        )
        .bind(format_date(date))
        .bind(symbol)
        .bind(total_pnl.to_canonical_string())
        .bind(applied.to_canonical_string())
        .bind(id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        info!(entry_id = id, delta = %delta, "PnL entry updated");

        Ok(Some(PnlEntry {
            id,
            user_id: existing.user_id,
            date,
            symbol: symbol.to_string(),
            total_pnl,
            wallet_applied: applied,
        }))
    }

    /// Delete an entry and reverse its applied wallet amount.
    ///
    /// Returns the removed entry, or None if it did not exist.
    pub async fn delete_pnl_entry_atomic(
        &self,
        id: i64,
    ) -> Result<Option<PnlEntry>, PnlWriteError> {
        let mut tx = self.pool.begin().await?;

        let Some(existing) = pnl_entry_conn(&mut tx, id).await? else {
            return Ok(None);
        };

        if !existing.wallet_applied.is_zero()
            && adjust_active_wallet(&mut tx, &existing.user_id, -existing.wallet_applied)
                .await?
                .is_none()
        {
            warn!(
                entry_id = id,
                user = %existing.user_id,
                applied = %existing.wallet_applied,
                "No active wallet to reverse PnL entry against"
            );
        }

        sqlx::query("DELETE FROM pnl_entries WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        info!(entry_id = id, "PnL entry deleted");
        Ok(Some(existing))
    }

    pub async fn get_pnl_entry(&self, id: i64) -> Result<Option<PnlEntry>, sqlx::Error> {
        let mut conn = self.pool.acquire().await?;
        pnl_entry_conn(&mut conn, id).await
    }

    /// List entries, newest date first, optionally for one user and an inclusive date window.
    pub async fn list_pnl_entries(
        &self,
        user: Option<&UserId>,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> Result<Vec<PnlEntry>, sqlx::Error> {
        let from = from.map(format_date).unwrap_or_else(|| "0000-01-01".to_string());
        let to = to.map(format_date).unwrap_or_else(|| "9999-12-31".to_string());

        let rows = match user {
            Some(user) => {
                sqlx::query(
                    r#"
                    SELECT id, user_id, date, symbol, total_pnl, wallet_applied
                    FROM pnl_entries
                    WHERE user_id = ? AND date >= ? AND date <= ?
                    ORDER BY date DESC, id DESC
                    "#,
                )
                .bind(user.as_str())
                .bind(&from)
                .bind(&to)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query(
                    r#"
                    SELECT id, user_id, date, symbol, total_pnl, wallet_applied
                    FROM pnl_entries
                    WHERE date >= ? AND date <= ?
                    ORDER BY date DESC, id DESC
                    "#,
                )
                .bind(&from)
                .bind(&to)
                .fetch_all(&self.pool)
                .await?
            }
        };

        rows.iter().map(pnl_entry_from_row).collect()
    }
}

/// Wallet amount for `total_pnl` under the plan and referral visible on `conn`.
async fn wallet_amount_conn(
    conn: &mut SqliteConnection,
    calc: &SplitCalculator,
    user: &UserId,
    total_pnl: Decimal,
) -> Result<Decimal, PnlWriteError> {
    let plan = user_plan_conn(conn, user)
        .await?
        .and_then(|up| up.active_plan());
    let has_active_agent = referral_for_customer_conn(conn, user)
        .await?
        .map(|r| r.is_active)
        .unwrap_or(false);

    let split = calc
        .split(total_pnl, plan.as_ref(), has_active_agent)
        .map_err(|_| PnlWriteError::OutOfRange(user.clone()))?;
    Ok(calc.wallet_amount(&split))
}

async fn apply_or_skip(
    conn: &mut SqliteConnection,
    user: &UserId,
    amount: Decimal,
) -> Result<Decimal, PnlWriteError> {
    match adjust_active_wallet(conn, user, amount).await? {
        Some(_) => Ok(amount),
        None => {
            warn!(user = %user, amount = %amount, "No active wallet for PnL owner; wallet not moved");
            Ok(Decimal::zero())
        }
    }
}

async fn pnl_entry_conn(
    conn: &mut SqliteConnection,
    id: i64,
) -> Result<Option<PnlEntry>, sqlx::Error> {
    let row = sqlx::query(
        r#"
        SELECT id, user_id, date, symbol, total_pnl, wallet_applied
        FROM pnl_entries
        WHERE id = ?
        "#,
    )
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;

    row.as_ref().map(pnl_entry_from_row).transpose()
}

fn pnl_entry_from_row(row: &SqliteRow) -> Result<PnlEntry, sqlx::Error> {
    let date: String = row.get("date");
    let total_pnl: String = row.get("total_pnl");
    let wallet_applied: String = row.get("wallet_applied");
    Ok(PnlEntry {
        id: row.get("id"),
        user_id: UserId::new(row.get::<String, _>("user_id")),
        date: parse_date(&date)?,
        symbol: row.get("symbol"),
        total_pnl: parse_decimal("pnl_entries.total_pnl", &total_pnl)?,
        wallet_applied: parse_decimal("pnl_entries.wallet_applied", &wallet_applied)?,
    })
}
