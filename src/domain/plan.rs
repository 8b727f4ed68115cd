//! Subscription plan catalog and per-user plan assignments.

use crate::domain::{Decimal, ParseLabelError, Status, UserId};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Plan tier name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PlanTier {
    Silver,
    Gold,
    Platinum,
}

impl PlanTier {
    pub const ALL: [PlanTier; 3] = [PlanTier::Silver, PlanTier::Gold, PlanTier::Platinum];

    pub fn as_str(&self) -> &'static str {
        match self {
            PlanTier::Silver => "Silver",
            PlanTier::Gold => "Gold",
            PlanTier::Platinum => "Platinum",
        }
    }

    /// Static catalog entry for this tier.
    pub fn plan(&self) -> Plan {
        match self {
            PlanTier::Silver => Plan {
                name: PlanTier::Silver,
                min_deposit: 250,
                max_deposit: 500,
                max_accounts: 2,
                profit_sharing: ProfitSharing {
                    customer: 40,
                    platform: 60,
                },
                upfront_fee: 50,
            },
            PlanTier::Gold => Plan {
                name: PlanTier::Gold,
                min_deposit: 250,
                max_deposit: 1000,
                max_accounts: 4,
                profit_sharing: ProfitSharing {
                    customer: 50,
                    platform: 50,
                },
                upfront_fee: 150,
            },
            PlanTier::Platinum => Plan {
                name: PlanTier::Platinum,
                min_deposit: 250,
                max_deposit: 10000,
                max_accounts: 40,
                profit_sharing: ProfitSharing {
                    customer: 60,
                    platform: 40,
                },
                upfront_fee: 250,
            },
        }
    }
}

impl FromStr for PlanTier {
    type Err = ParseLabelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Silver" => Ok(PlanTier::Silver),
            "Gold" => Ok(PlanTier::Gold),
            "Platinum" => Ok(PlanTier::Platinum),
            other => Err(ParseLabelError::new("plan", other)),
        }
    }
}

impl fmt::Display for PlanTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Profit split percentages; `customer + platform == 100`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfitSharing {
    pub customer: u32,
    pub platform: u32,
}

impl ProfitSharing {
    pub fn customer_pct(&self) -> Decimal {
        Decimal::from(self.customer)
    }

    pub fn platform_pct(&self) -> Decimal {
        Decimal::from(self.platform)
    }
}

/// A catalog plan. Amounts are whole dollars.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Plan {
    pub name: PlanTier,
    pub min_deposit: i64,
    pub max_deposit: i64,
    pub max_accounts: u32,
    pub profit_sharing: ProfitSharing,
    pub upfront_fee: i64,
}

impl Plan {
    /// The full static catalog, cheapest tier first.
    pub fn catalog() -> Vec<Plan> {
        PlanTier::ALL.iter().map(PlanTier::plan).collect()
    }
}

/// A plan assigned to a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserPlan {
    pub id: i64,
    pub user_id: UserId,
    pub plan: PlanTier,
    pub status: Status,
    pub start_date: NaiveDate,
}

impl UserPlan {
    /// The catalog plan when this assignment is active.
    pub fn active_plan(&self) -> Option<Plan> {
        self.status.is_active().then(|| self.plan.plan())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_splits_sum_to_hundred() {
        for plan in Plan::catalog() {
            assert_eq!(
                plan.profit_sharing.customer + plan.profit_sharing.platform,
                100,
                "{} split does not sum to 100",
                plan.name
            );
            assert!(plan.min_deposit <= plan.max_deposit);
        }
    }

    #[test]
    fn silver_is_forty_sixty() {
        let silver = PlanTier::Silver.plan();
        assert_eq!(silver.profit_sharing.customer, 40);
        assert_eq!(silver.profit_sharing.platform, 60);
        assert_eq!(silver.max_accounts, 2);
    }

    #[test]
    fn inactive_assignment_has_no_active_plan() {
        let up = UserPlan {
            id: 1,
            user_id: UserId::from("T1234"),
            plan: PlanTier::Gold,
            status: Status::Inactive,
            start_date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
        };
        assert!(up.active_plan().is_none());
    }

    #[test]
    fn plan_serializes_camel_case() {
        let json = serde_json::to_value(PlanTier::Gold.plan()).unwrap();
        assert_eq!(json["name"], "Gold");
        assert_eq!(json["profitSharing"]["platform"], 50);
        assert_eq!(json["upfrontFee"], 150);
    }
}
