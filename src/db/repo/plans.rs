//! Plan assignment operations for the repository.

use crate::domain::{Decimal, PlanTier, Status, TimeMs, UserId, UserPlan};
use chrono::NaiveDate;
use sqlx::sqlite::{SqliteConnection, SqliteRow};
use sqlx::Row;
use tracing::info;

use super::wallets::{active_wallet_conn, insert_wallet_conn};
use super::{format_date, parse_date, parse_label, Repository};

/// Outcome of assigning a plan to a user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Enrollment {
    pub user_plan: UserPlan,
    /// True when the user had no plan row before this assignment.
    pub first_assignment: bool,
    pub wallet_created: bool,
    pub referral_activated: bool,
}

impl Repository {
    /// Assign (or reassign) a plan to a user in one transaction.
    ///
    /// On the first assignment the user also gets a zero-balance wallet when
    /// none is active, and their referral (if any) is activated.
    ///
    /// # Errors
    /// Returns an error if any database operation fails; nothing is committed then.
    pub async fn enroll_user_plan(
        &self,
        user: &UserId,
        plan: PlanTier,
        status: Status,
        start_date: NaiveDate,
    ) -> Result<Enrollment, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        let existing: Option<i64> = sqlx::query("SELECT id FROM user_plans WHERE user_id = ?")
            .bind(user.as_str())
            .fetch_optional(&mut *tx)
            .await?
            .map(|row| row.get("id"));

        let id = match existing {
            Some(id) => {
                sqlx::query(
                    "UPDATE user_plans SET plan = ?, status = ?, start_date = ? WHERE id = ?",
                )
                .bind(plan.as_str())
                .bind(status.as_str())
                .bind(format_date(start_date))
                .bind(id)
                .execute(&mut *tx)
                .await?;
                id
            }
            None => sqlx::query(
                r#"
                INSERT INTO user_plans (user_id, plan, status, start_date)
                VALUES (?, ?, ?, ?)
                "#,
            )
            .bind(user.as_str())
            .bind(plan.as_str())
            .bind(status.as_str())
            .bind(format_date(start_date))
            .execute(&mut *tx)
            .await?
            .last_insert_rowid(),
        };

        let first_assignment = existing.is_none();
        let mut wallet_created = false;
        let mut referral_activated = false;

        if first_assignment {
            if active_wallet_conn(&mut tx, user).await?.is_none() {
                insert_wallet_conn(&mut tx, user, Decimal::zero(), TimeMs::now()).await?;
                wallet_created = true;
            }

            referral_activated = sqlx::query(
                "UPDATE referrals SET is_active = 1 WHERE customer_id = ? AND is_active = 0",
            )
            .bind(user.as_str())
            .execute(&mut *tx)
            .await?
            .rows_affected()
                > 0;
        }

        tx.commit().await?;

        info!(
            user = %user,
            plan = %plan,
            status = %status,
            first_assignment,
            wallet_created,
            referral_activated,
            "Plan assigned"
        );

        Ok(Enrollment {
            user_plan: UserPlan {
                id,
                user_id: user.clone(),
                plan,
                status,
                start_date,
            },
            first_assignment,
            wallet_created,
            referral_activated,
        })
    }

    pub async fn get_user_plan(&self, user: &UserId) -> Result<Option<UserPlan>, sqlx::Error> {
        let mut conn = self.pool.acquire().await?;
        user_plan_conn(&mut conn, user).await
    }

    pub async fn list_user_plans(&self) -> Result<Vec<UserPlan>, sqlx::Error> {
        let rows = sqlx::query(
            "SELECT id, user_id, plan, status, start_date FROM user_plans ORDER BY id ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(user_plan_from_row).collect()
    }

    /// Remove a user's plan row. The wallet and referral are left untouched.
    pub async fn delete_user_plan(&self, user: &UserId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM user_plans WHERE user_id = ?")
            .bind(user.as_str())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

pub(super) async fn user_plan_conn(
    conn: &mut SqliteConnection,
    user: &UserId,
) -> Result<Option<UserPlan>, sqlx::Error> {
    let row = sqlx::query(
        "SELECT id, user_id, plan, status, start_date FROM user_plans WHERE user_id = ?",
    )
    .bind(user.as_str())
    .fetch_optional(&mut *conn)
    .await?;

    row.as_ref().map(user_plan_from_row).transpose()
}

fn user_plan_from_row(row: &SqliteRow) -> Result<UserPlan, sqlx::Error> {
    let plan: String = row.get("plan");
    let status: String = row.get("status");
    let start_date: String = row.get("start_date");
    Ok(UserPlan {
        id: row.get("id"),
        user_id: UserId::new(row.get::<String, _>("user_id")),
        plan: parse_label(&plan)?,
        status: parse_label(&status)?,
        start_date: parse_date(&start_date)?,
    })
}
