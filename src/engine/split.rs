//! Profit-split calculator.
//!
//! Splits a PnL amount between customer and platform according to the plan,
//! carves the agent commission out of the platform side, and decides how much
//! of the result moves the customer's wallet.

use crate::config::{Config, WalletPolicy};
use crate::domain::{Decimal, DecimalOverflow, Plan};
use serde::Serialize;

/// Derived shares for one PnL amount. Never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfitSplit {
    #[serde(rename = "totalPnL")]
    pub total_pnl: Decimal,
    pub customer_share: Decimal,
    pub platform_share_gross: Decimal,
    pub agent_commission: Decimal,
    pub platform_share_net: Decimal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SplitCalculator {
    agent_commission_pct: Decimal,
    wallet_policy: WalletPolicy,
}

impl SplitCalculator {
    pub fn new(agent_commission_pct: Decimal, wallet_policy: WalletPolicy) -> Self {
        Self {
            agent_commission_pct,
            wallet_policy,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.agent_commission_pct, config.wallet_policy)
    }

    /// Split `total_pnl` under `plan`.
    ///
    /// No plan means nothing is owed to anyone: the split is all zero apart
    /// from `total_pnl`. Amounts whose shares leave the decimal range fail.
    pub fn split(
        &self,
        total_pnl: Decimal,
        plan: Option<&Plan>,
        has_active_agent: bool,
    ) -> Result<ProfitSplit, DecimalOverflow> {
        let Some(plan) = plan else {
            return Ok(ProfitSplit {
                total_pnl,
                ..ProfitSplit::default()
            });
        };

        let customer_share = total_pnl.checked_percent(plan.profit_sharing.customer_pct())?;
        let platform_share_gross = total_pnl.checked_percent(plan.profit_sharing.platform_pct())?;
        let agent_commission = if has_active_agent {
            platform_share_gross.checked_percent(self.agent_commission_pct)?
        } else {
            Decimal::zero()
        };

        Ok(ProfitSplit {
            total_pnl,
            customer_share,
            platform_share_gross,
            agent_commission,
            platform_share_net: platform_share_gross.checked_sub(agent_commission)?,
        })
    }

    /// Whether this split takes part in wallet movements and earnings totals.
    pub fn counts(&self, split: &ProfitSplit) -> bool {
        match self.wallet_policy {
            WalletPolicy::Signed => true,
            WalletPolicy::ProfitOnly => split.total_pnl.is_positive(),
        }
    }

    /// Amount the wallet moves by for this split.
    pub fn wallet_amount(&self, split: &ProfitSplit) -> Decimal {
        if self.counts(split) {
            split.platform_share_net
        } else {
            Decimal::zero()
        }
    }

    /// Commission credited to the referring agent for this split.
    pub fn agent_earning(&self, split: &ProfitSplit) -> Decimal {
        if self.counts(split) {
            split.agent_commission
        } else {
            Decimal::zero()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::PlanTier;
    use std::str::FromStr;

    fn calc(policy: WalletPolicy) -> SplitCalculator {
        SplitCalculator::new(Decimal::from_i64(30), policy)
    }

    fn d(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn silver_without_agent() {
        let silver = PlanTier::Silver.plan();
        let split = calc(WalletPolicy::Signed).split(d("100"), Some(&silver), false).unwrap();
        assert_eq!(split.customer_share, d("40"));
        assert_eq!(split.platform_share_gross, d("60"));
        assert_eq!(split.agent_commission, Decimal::zero());
        assert_eq!(split.platform_share_net, d("60"));
    }

    #[test]
    fn silver_with_active_agent() {
        let silver = PlanTier::Silver.plan();
        let split = calc(WalletPolicy::Signed).split(d("100"), Some(&silver), true).unwrap();
        assert_eq!(split.agent_commission, d("18"));
        assert_eq!(split.platform_share_net, d("42"));
    }

    #[test]
    fn shares_conserve_total_for_every_plan_and_sign() {
        let amounts = ["100", "-100", "0", "0.01", "-73.37", "12345.6789", "-0.005"];
        for plan in crate::domain::Plan::catalog() {
            for amount in amounts {
                for agent in [false, true] {
                    let split = calc(WalletPolicy::Signed).split(d(amount), Some(&plan), agent).unwrap();
                    assert_eq!(
                        split.customer_share + split.platform_share_gross,
                        d(amount),
                        "plan {} amount {}",
                        plan.name,
                        amount
                    );
                    assert_eq!(
                        split.agent_commission + split.platform_share_net,
                        split.platform_share_gross
                    );
                }
            }
        }
    }

    #[test]
    fn losses_split_symmetrically() {
        let gold = PlanTier::Gold.plan();
        let split = calc(WalletPolicy::Signed).split(d("-80"), Some(&gold), true).unwrap();
        assert_eq!(split.customer_share, d("-40"));
        assert_eq!(split.platform_share_gross, d("-40"));
        assert_eq!(split.agent_commission, d("-12"));
        assert_eq!(split.platform_share_net, d("-28"));
    }

    #[test]
    fn no_plan_is_all_zero() {
        let split = calc(WalletPolicy::Signed).split(d("250"), None, true).unwrap();
        assert_eq!(split.total_pnl, d("250"));
        assert_eq!(split.customer_share, Decimal::zero());
        assert_eq!(split.platform_share_net, Decimal::zero());
    }

    #[test]
    fn signed_policy_moves_wallet_on_losses() {
        let silver = PlanTier::Silver.plan();
        let c = calc(WalletPolicy::Signed);
        let split = c.split(d("-50"), Some(&silver), false).unwrap();
        assert_eq!(c.wallet_amount(&split), d("-30"));
    }

    #[test]
    fn profit_only_policy_ignores_losses() {
        let silver = PlanTier::Silver.plan();
        let c = calc(WalletPolicy::ProfitOnly);
        let loss = c.split(d("-50"), Some(&silver), true).unwrap();
        assert_eq!(c.wallet_amount(&loss), Decimal::zero());
        assert_eq!(c.agent_earning(&loss), Decimal::zero());

        let gain = c.split(d("50"), Some(&silver), true).unwrap();
        assert_eq!(c.wallet_amount(&gain), d("21"));
        assert_eq!(c.agent_earning(&gain), d("9"));
    }

    #[test]
    fn out_of_range_amount_is_rejected() {
        let silver = PlanTier::Silver.plan();
        let c = calc(WalletPolicy::Signed);
        let huge = d("50000000000000000000000000000");
        assert_eq!(c.split(huge, Some(&silver), true), Err(DecimalOverflow));
        // without a plan nothing is multiplied
        assert!(c.split(huge, None, true).is_ok());
    }

    #[test]
    fn commission_rate_is_configurable() {
        let platinum = PlanTier::Platinum.plan();
        let c = SplitCalculator::new(Decimal::from_i64(50), WalletPolicy::Signed);
        let split = c.split(d("100"), Some(&platinum), true).unwrap();
        assert_eq!(split.platform_share_gross, d("40"));
        assert_eq!(split.agent_commission, d("20"));
    }
}
