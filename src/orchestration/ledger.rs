//! PnL ledger commands: create, edit, delete and bulk import of PnL entries,
//! each moving the owner's wallet by the split's wallet amount.

use crate::db::{PnlWrite, PnlWriteError, Repository};
use crate::domain::{Decimal, DecimalOverflow, PnlEntry, UserId};
use crate::engine::{ProfitSplit, SplitBook, SplitCalculator};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

/// A stored entry together with its split under the current plans and referrals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LedgerLine {
    #[serde(flatten)]
    pub entry: PnlEntry,
    pub split: ProfitSplit,
}

#[derive(Clone)]
pub struct PnlLedger {
    repo: Arc<Repository>,
    calc: SplitCalculator,
}

impl PnlLedger {
    pub fn new(repo: Arc<Repository>, calc: SplitCalculator) -> Self {
        Self { repo, calc }
    }

    pub fn calculator(&self) -> &SplitCalculator {
        &self.calc
    }

    /// Create one entry per distinct user, crediting each wallet.
    ///
    /// # Errors
    /// `Invalid` for an empty user list, an empty symbol, an unknown user or an
    /// amount whose shares leave the decimal range.
    pub async fn create_entries(
        &self,
        users: &[UserId],
        date: NaiveDate,
        symbol: &str,
        total_pnl: Decimal,
    ) -> Result<Vec<PnlEntry>, LedgerError> {
        let symbol = require_symbol(symbol)?;
        if users.is_empty() {
            return Err(LedgerError::Invalid("at least one user is required".to_string()));
        }

        let mut seen = HashSet::new();
        let mut writes = Vec::with_capacity(users.len());
        for user in users.iter().filter(|u| seen.insert(*u)) {
            writes.push(self.prepare(user, date, symbol, total_pnl).await?);
        }

        let entries = self.repo.insert_pnl_entries_atomic(&self.calc, &writes).await?;
        info!(
            users = entries.len(),
            date = %date,
            symbol = %symbol,
            total_pnl = %total_pnl,
            "PnL recorded"
        );
        Ok(entries)
    }

    /// Rewrite an entry, moving the wallet by the difference to its previous effect.
    ///
    /// The owning user cannot change.
    pub async fn update_entry(
        &self,
        id: i64,
        date: NaiveDate,
        symbol: &str,
        total_pnl: Decimal,
    ) -> Result<PnlEntry, LedgerError> {
        let symbol = require_symbol(symbol)?;
        self.repo
            .update_pnl_entry_atomic(&self.calc, id, date, symbol, total_pnl)
            .await?
            .ok_or(LedgerError::NotFound(id))
    }

    /// Delete an entry and reverse what it applied to the wallet.
    pub async fn delete_entry(&self, id: i64) -> Result<PnlEntry, LedgerError> {
        self.repo
            .delete_pnl_entry_atomic(id)
            .await?
            .ok_or(LedgerError::NotFound(id))
    }

    /// Entries (newest first) decorated with their current split.
    pub async fn list(
        &self,
        user: Option<&UserId>,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> Result<Vec<LedgerLine>, LedgerError> {
        let entries = self.repo.list_pnl_entries(user, from, to).await?;
        let book = self.book().await?;
        entries
            .into_iter()
            .map(|entry| -> Result<LedgerLine, LedgerError> {
                Ok(LedgerLine {
                    split: book.split(&entry)?,
                    entry,
                })
            })
            .collect()
    }

    /// Split lookups for every user, built from the current plans and referrals.
    pub async fn book(&self) -> Result<SplitBook, LedgerError> {
        let plans = self.repo.list_user_plans().await?;
        let referrals = self.repo.list_referrals().await?;
        Ok(SplitBook::new(self.calc, &plans, &referrals))
    }

    /// Import `user_id,date,symbol,total_pnl` rows (header required) in one transaction.
    ///
    /// Any malformed row rejects the whole body.
    pub async fn import_csv(&self, body: &str) -> Result<Vec<PnlEntry>, LedgerError> {
        let rows = parse_import(body)?;
        let mut writes = Vec::with_capacity(rows.len());
        for row in &rows {
            writes.push(
                self.prepare(&row.user_id, row.date, &row.symbol, row.total_pnl)
                    .await?,
            );
        }

        let entries = self.repo.insert_pnl_entries_atomic(&self.calc, &writes).await?;
        info!(rows = entries.len(), "PnL CSV imported");
        Ok(entries)
    }

    async fn prepare(
        &self,
        user: &UserId,
        date: NaiveDate,
        symbol: &str,
        total_pnl: Decimal,
    ) -> Result<PnlWrite, LedgerError> {
        if self.repo.get_user(user).await?.is_none() {
            return Err(LedgerError::Invalid(format!("unknown user {}", user)));
        }
        Ok(PnlWrite {
            user_id: user.clone(),
            date,
            symbol: symbol.to_string(),
            total_pnl,
        })
    }
}

fn require_symbol(symbol: &str) -> Result<&str, LedgerError> {
    let symbol = symbol.trim();
    if symbol.is_empty() {
        return Err(LedgerError::Invalid("symbol is required".to_string()));
    }
    Ok(symbol)
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct ImportRow {
    user_id: UserId,
    date: NaiveDate,
    symbol: String,
    total_pnl: Decimal,
}

fn parse_import(body: &str) -> Result<Vec<ImportRow>, LedgerError> {
    #[derive(Debug, Deserialize)]
    struct Row {
        user_id: String,
        date: String,
        symbol: String,
        total_pnl: String,
    }

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(body.as_bytes());

    let mut rows = Vec::new();
    for (idx, record) in reader.deserialize::<Row>().enumerate() {
        // header is line 1
        let line = idx + 2;
        let row = record.map_err(|e| LedgerError::Invalid(format!("line {}: {}", line, e)))?;
        if row.user_id.is_empty() {
            return Err(LedgerError::Invalid(format!("line {}: user_id is empty", line)));
        }
        let date = NaiveDate::parse_from_str(&row.date, "%Y-%m-%d").map_err(|e| {
            LedgerError::Invalid(format!("line {}: invalid date {}: {}", line, row.date, e))
        })?;
        let total_pnl = Decimal::from_str_canonical(&row.total_pnl).map_err(|e| {
            LedgerError::Invalid(format!(
                "line {}: invalid total_pnl {}: {}",
                line, row.total_pnl, e
            ))
        })?;
        let symbol = require_symbol(&row.symbol)
            .map_err(|e| LedgerError::Invalid(format!("line {}: {}", line, e)))?
            .to_string();

        rows.push(ImportRow {
            user_id: UserId::new(row.user_id),
            date,
            symbol,
            total_pnl,
        });
    }

    if rows.is_empty() {
        return Err(LedgerError::Invalid("no rows to import".to_string()));
    }
    Ok(rows)
}

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("{0}")]
    Invalid(String),
    #[error("PnL entry {0} not found")]
    NotFound(i64),
    /// A stored amount could not be split or summed when reading.
    #[error(transparent)]
    Overflow(#[from] DecimalOverflow),
    #[error(transparent)]
    Db(#[from] sqlx::Error),
}

impl From<PnlWriteError> for LedgerError {
    fn from(err: PnlWriteError) -> Self {
        match err {
            PnlWriteError::OutOfRange(_) => LedgerError::Invalid(err.to_string()),
            PnlWriteError::Db(e) => LedgerError::Db(e),
        }
    }
}
