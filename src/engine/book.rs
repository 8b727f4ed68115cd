//! Read-side derivations over the PnL ledger: per-entry splits, platform
//! totals, customer earnings and agent commission statistics.

use super::split::{ProfitSplit, SplitCalculator};
use crate::domain::{Decimal, DecimalOverflow, Plan, PnlEntry, Referral, User, UserId, UserPlan};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

/// Snapshot of plan assignments and referrals used to split many entries.
#[derive(Debug, Clone)]
pub struct SplitBook {
    calc: SplitCalculator,
    plans: HashMap<UserId, Plan>,
    active_agents: HashMap<UserId, UserId>,
}

/// Commission statistics for one agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentStats {
    pub agent_id: UserId,
    pub agent_name: String,
    pub referral_count: usize,
    pub active_referral_count: usize,
    pub total_earnings: Decimal,
    pub referrals: Vec<Referral>,
}

impl SplitBook {
    pub fn new(calc: SplitCalculator, user_plans: &[UserPlan], referrals: &[Referral]) -> Self {
        let plans = user_plans
            .iter()
            .filter_map(|up| up.active_plan().map(|p| (up.user_id.clone(), p)))
            .collect();
        let active_agents = referrals
            .iter()
            .filter(|r| r.is_active)
            .map(|r| (r.customer_id.clone(), r.agent_id.clone()))
            .collect();
        Self {
            calc,
            plans,
            active_agents,
        }
    }

    pub fn calculator(&self) -> &SplitCalculator {
        &self.calc
    }

    pub fn split(&self, entry: &PnlEntry) -> Result<ProfitSplit, DecimalOverflow> {
        self.calc.split(
            entry.total_pnl,
            self.plans.get(&entry.user_id),
            self.active_agents.contains_key(&entry.user_id),
        )
    }

    /// Net platform share after agent commissions across `entries`.
    pub fn platform_net_total(&self, entries: &[PnlEntry]) -> Result<Decimal, DecimalOverflow> {
        entries.iter().try_fold(Decimal::zero(), |acc, e| {
            acc.checked_add(self.calc.wallet_amount(&self.split(e)?))
        })
    }

    /// Customer share across `entries` (signed, unaffected by the wallet policy).
    pub fn customer_total(&self, entries: &[PnlEntry]) -> Result<Decimal, DecimalOverflow> {
        entries
            .iter()
            .try_fold(Decimal::zero(), |acc, e| acc.checked_add(self.split(e)?.customer_share))
    }

    /// Per-agent statistics, ordered by agent id.
    ///
    /// Earnings sum the commission of every entry whose customer is referred
    /// by the agent through an active referral.
    pub fn agent_stats(
        &self,
        referrals: &[Referral],
        users: &[User],
        entries: &[PnlEntry],
    ) -> Result<Vec<AgentStats>, DecimalOverflow> {
        let names: HashMap<&UserId, &str> = users
            .iter()
            .map(|u| (&u.unique_id, u.username.as_str()))
            .collect();

        let mut by_agent: BTreeMap<&UserId, Vec<Referral>> = BTreeMap::new();
        for referral in referrals {
            by_agent
                .entry(&referral.agent_id)
                .or_default()
                .push(referral.clone());
        }

        let mut earnings: HashMap<&UserId, Decimal> = HashMap::new();
        for entry in entries {
            if let Some(agent) = self.active_agents.get(&entry.user_id) {
                let earned = self.calc.agent_earning(&self.split(entry)?);
                let total = earnings.entry(agent).or_insert_with(Decimal::zero);
                *total = total.checked_add(earned)?;
            }
        }

        Ok(by_agent
            .into_iter()
            .map(|(agent_id, referrals)| AgentStats {
                agent_id: agent_id.clone(),
                agent_name: names
                    .get(agent_id)
                    .map(|n| n.to_string())
                    .unwrap_or_else(|| "Unknown Agent".to_string()),
                referral_count: referrals.len(),
                active_referral_count: referrals.iter().filter(|r| r.is_active).count(),
                total_earnings: earnings.get(agent_id).copied().unwrap_or_default(),
                referrals,
            })
            .collect())
    }
}
