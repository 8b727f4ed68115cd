//! Domain types for the copy-trading back office.
//!
//! This module provides:
//! - Lossless money handling via the Decimal wrapper
//! - Primitives: TimeMs, UserId, Status
//! - Entities for users, accounts, plans, PnL, wallets, referrals, chat and team

pub mod account;
pub mod chat;
pub mod decimal;
pub mod plan;
pub mod pnl;
pub mod primitives;
pub mod referral;
pub mod team;
pub mod user;
pub mod wallet;

pub use account::{Account, AccountDraft, AccountStatus};
pub use chat::{Chat, Message, NewMessage, ADMIN_ID};
pub use decimal::{Decimal, DecimalOverflow};
pub use plan::{Plan, PlanTier, ProfitSharing, UserPlan};
pub use pnl::PnlEntry;
pub use primitives::{ParseLabelError, Status, TimeMs, UserId};
pub use referral::{Referral, ReferralCode};
pub use team::{
    ModulePermissions, Permission, PermissionAction, PermissionModule, TeamMember,
    TeamMemberDraft, TeamRole,
};
pub use user::{User, UserProfile};
pub use wallet::Wallet;
