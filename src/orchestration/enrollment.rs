//! Plan enrollment and customer account requests.

use crate::db::{Enrollment, Repository};
use crate::domain::{Account, AccountDraft, AccountStatus, PlanTier, Status, UserId};
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

#[derive(Clone)]
pub struct Enroller {
    repo: Arc<Repository>,
}

impl Enroller {
    pub fn new(repo: Arc<Repository>) -> Self {
        Self { repo }
    }

    /// Assign `plan` to a user starting today.
    ///
    /// The first assignment also opens a zero wallet and activates the user's referral.
    pub async fn assign_plan(
        &self,
        user: &UserId,
        plan: PlanTier,
        status: Status,
    ) -> Result<Enrollment, EnrollmentError> {
        if self.repo.get_user(user).await?.is_none() {
            return Err(EnrollmentError::UnknownUser(user.clone()));
        }
        let today = chrono::Utc::now().date_naive();
        Ok(self.repo.enroll_user_plan(user, plan, status, today).await?)
    }

    /// Open a Pending account for a customer with an active plan and spare capacity.
    pub async fn request_account(&self, draft: &AccountDraft) -> Result<Account, EnrollmentError> {
        let plan = self
            .repo
            .get_user_plan(&draft.user_id)
            .await?
            .and_then(|up| up.active_plan())
            .ok_or_else(|| EnrollmentError::NoActivePlan(draft.user_id.clone()))?;

        let existing = self.repo.count_accounts_for_user(&draft.user_id).await?;
        if existing >= i64::from(plan.max_accounts) {
            return Err(EnrollmentError::AccountLimit {
                plan: plan.name,
                max_accounts: plan.max_accounts,
            });
        }

        let account = self
            .repo
            .insert_account(draft, AccountStatus::Pending)
            .await?;
        info!(
            user = %draft.user_id,
            account_id = account.id,
            plan = %plan.name,
            "Account requested"
        );
        Ok(account)
    }
}

#[derive(Debug, Error)]
pub enum EnrollmentError {
    #[error("User {0} not found")]
    UnknownUser(UserId),
    #[error("User {0} has no active plan")]
    NoActivePlan(UserId),
    #[error("{plan} plan allows at most {max_accounts} accounts")]
    AccountLimit { plan: PlanTier, max_accounts: u32 },
    #[error(transparent)]
    Db(#[from] sqlx::Error),
}
