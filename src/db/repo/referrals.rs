//! Referral registry operations for the repository.

use crate::domain::{Referral, TimeMs, UserId};
use sqlx::sqlite::{SqliteConnection, SqliteRow};
use sqlx::Row;
use tracing::debug;

use super::Repository;

impl Repository {
    /// Record that `customer` was referred by `agent`, as an inactive referral.
    ///
    /// Returns None without writing when the two ids are equal or the customer
    /// already has a referral.
    ///
    /// # Errors
    /// Returns an error if the query fails.
    pub async fn insert_referral_if_absent(
        &self,
        agent: &UserId,
        customer: &UserId,
        is_manual_assignment: bool,
    ) -> Result<Option<Referral>, sqlx::Error> {
        if agent == customer {
            debug!(user = %agent, "Ignoring self-referral");
            return Ok(None);
        }
        if self.referral_for_customer(customer).await?.is_some() {
            debug!(customer = %customer, "Customer already referred");
            return Ok(None);
        }

        let referral = Referral {
            id: uuid::Uuid::new_v4().to_string(),
            agent_id: agent.clone(),
            customer_id: customer.clone(),
            signup_date: TimeMs::now(),
            is_manual_assignment,
            is_active: false,
        };

        let result = sqlx::query(
            r#"
            INSERT INTO referrals (id, agent_id, customer_id, signup_date, is_manual_assignment, is_active)
            VALUES (?, ?, ?, ?, ?, 0)
            ON CONFLICT(customer_id) DO NOTHING
            "#,
        )
        .bind(&referral.id)
        .bind(referral.agent_id.as_str())
        .bind(referral.customer_id.as_str())
        .bind(referral.signup_date.as_ms())
        .bind(referral.is_manual_assignment)
        .execute(&self.pool)
        .await?;

        Ok((result.rows_affected() > 0).then_some(referral))
    }

    pub async fn list_referrals(&self) -> Result<Vec<Referral>, sqlx::Error> {
        let rows = sqlx::query(
            r#"
            SELECT id, agent_id, customer_id, signup_date, is_manual_assignment, is_active
            FROM referrals
            ORDER BY signup_date ASC, id ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(referral_from_row).collect())
    }

    pub async fn referrals_by_agent(&self, agent: &UserId) -> Result<Vec<Referral>, sqlx::Error> {
        let rows = sqlx::query(
            r#"
            SELECT id, agent_id, customer_id, signup_date, is_manual_assignment, is_active
            FROM referrals
            WHERE agent_id = ?
            ORDER BY signup_date ASC, id ASC
            "#,
        )
        .bind(agent.as_str())
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(referral_from_row).collect())
    }

    pub async fn referral_for_customer(
        &self,
        customer: &UserId,
    ) -> Result<Option<Referral>, sqlx::Error> {
        let mut conn = self.pool.acquire().await?;
        referral_for_customer_conn(&mut conn, customer).await
    }

    /// Activate a customer's referral. Returns false if the customer has none.
    pub async fn activate_referral(&self, customer: &UserId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("UPDATE referrals SET is_active = 1 WHERE customer_id = ?")
            .bind(customer.as_str())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// True when any referral names the user as agent.
    pub async fn is_agent(&self, user: &UserId) -> Result<bool, sqlx::Error> {
        let row = sqlx::query("SELECT EXISTS(SELECT 1 FROM referrals WHERE agent_id = ?) AS found")
            .bind(user.as_str())
            .fetch_one(&self.pool)
            .await?;
        Ok(row.get::<bool, _>("found"))
    }

    /// Distinct agent ids, sorted.
    pub async fn agent_ids(&self) -> Result<Vec<UserId>, sqlx::Error> {
        let rows = sqlx::query("SELECT DISTINCT agent_id FROM referrals ORDER BY agent_id ASC")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows
            .iter()
            .map(|row| UserId::new(row.get::<String, _>("agent_id")))
            .collect())
    }
}

pub(super) async fn referral_for_customer_conn(
    conn: &mut SqliteConnection,
    customer: &UserId,
) -> Result<Option<Referral>, sqlx::Error> {
    let row = sqlx::query(
        r#"
        SELECT id, agent_id, customer_id, signup_date, is_manual_assignment, is_active
        FROM referrals
        WHERE customer_id = ?
        "#,
    )
    .bind(customer.as_str())
    .fetch_optional(&mut *conn)
    .await?;

    Ok(row.as_ref().map(referral_from_row))
}

fn referral_from_row(row: &SqliteRow) -> Referral {
    Referral {
        id: row.get("id"),
        agent_id: UserId::new(row.get::<String, _>("agent_id")),
        customer_id: UserId::new(row.get::<String, _>("customer_id")),
        signup_date: TimeMs::new(row.get("signup_date")),
        is_manual_assignment: row.get("is_manual_assignment"),
        is_active: row.get("is_active"),
    }
}
