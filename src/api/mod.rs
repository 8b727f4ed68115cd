pub mod accounts;
pub mod agents;
pub mod chat;
pub mod dashboard;
pub mod health;
pub mod plans;
pub mod pnl;
pub mod register;
pub mod team;
pub mod transactions;
pub mod users;
pub mod wallets;

use crate::config::Config;
use crate::datasource::ProfileSource;
use crate::db::Repository;
use crate::domain::UserId;
use crate::engine::SplitCalculator;
use crate::error::AppError;
use crate::orchestration::{Enroller, PnlLedger, ProfileSync};
use axum::{
    routing::{get, post, put},
    Router,
};
use chrono::NaiveDate;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<Repository>,
    pub config: Config,
    pub ledger: PnlLedger,
    pub enroller: Enroller,
    pub profiles: ProfileSync,
}

impl AppState {
    pub fn new(
        repo: Arc<Repository>,
        config: Config,
        profile_source: Option<Arc<dyn ProfileSource>>,
    ) -> Self {
        let calc = SplitCalculator::from_config(&config);
        Self {
            ledger: PnlLedger::new(repo.clone(), calc),
            enroller: Enroller::new(repo.clone()),
            profiles: ProfileSync::new(profile_source, repo.clone()),
            repo,
            config,
        }
    }
}

pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health::health))
        .route("/ready", get(health::ready))
        // users
        .route("/v1/users", get(users::list_users).post(users::create_user))
        .route("/v1/users/count", get(users::count_users))
        .route("/v1/users/refresh", post(users::refresh_users))
        .route(
            "/v1/users/:user_id",
            get(users::get_user)
                .put(users::update_user)
                .delete(users::delete_user),
        )
        .route("/v1/users/:user_id/accounts", get(accounts::list_user_accounts))
        .route("/v1/register", post(register::register))
        // accounts
        .route(
            "/v1/accounts",
            get(accounts::list_accounts).post(accounts::create_account),
        )
        .route("/v1/accounts/count", get(accounts::count_accounts))
        .route("/v1/accounts/request", post(accounts::request_account))
        .route(
            "/v1/accounts/:id",
            get(accounts::get_account)
                .put(accounts::update_account)
                .delete(accounts::delete_account),
        )
        // plans
        .route("/v1/plans", get(plans::catalog))
        .route(
            "/v1/user-plans",
            get(plans::list_user_plans).post(plans::assign_plan),
        )
        .route(
            "/v1/user-plans/:user_id",
            get(plans::get_user_plan).delete(plans::delete_user_plan),
        )
        // pnl
        .route("/v1/pnl", get(pnl::list_entries).post(pnl::create_entries))
        .route("/v1/pnl/import", post(pnl::import_entries))
        .route(
            "/v1/pnl/:id",
            put(pnl::update_entry).delete(pnl::delete_entry),
        )
        // wallets
        .route(
            "/v1/wallets",
            get(wallets::list_wallets).post(wallets::create_wallet),
        )
        .route("/v1/wallets/total", get(wallets::total_value))
        .route(
            "/v1/wallets/:user_id",
            get(wallets::get_wallet).put(wallets::set_balance),
        )
        .route("/v1/wallets/:user_id/archive", post(wallets::archive_wallet))
        .route("/v1/transactions", get(transactions::list_transactions))
        // referrals and agents
        .route(
            "/v1/referrals",
            get(agents::list_referrals).post(agents::add_referral),
        )
        .route(
            "/v1/referrals/:customer_id",
            get(agents::agent_for_customer),
        )
        .route(
            "/v1/referrals/:customer_id/activate",
            post(agents::activate_referral),
        )
        .route("/v1/referral-codes/:code", get(agents::validate_code))
        .route("/v1/agents", get(agents::agent_stats))
        .route("/v1/agents/ids", get(agents::list_agents))
        .route("/v1/agents/:agent_id/referrals", get(agents::referrals_by_agent))
        .route("/v1/agents/:agent_id/link", get(agents::referral_link))
        .route("/v1/agents/:agent_id/is-agent", get(agents::is_agent))
        // dashboards
        .route("/v1/dashboard/admin", get(dashboard::admin_dashboard))
        .route(
            "/v1/dashboard/customer/:user_id",
            get(dashboard::customer_dashboard),
        )
        // chat
        .route("/v1/chats", get(chat::list_chats).post(chat::create_chat))
        .route(
            "/v1/chats/:chat_id",
            get(chat::chat_messages).delete(chat::delete_chat),
        )
        .route("/v1/chats/:chat_id/read", post(chat::mark_read))
        .route("/v1/messages", post(chat::add_message))
        .route("/v1/unread/:user_id", get(chat::unread_count))
        // team
        .route("/v1/team", get(team::list_members).post(team::create_member))
        .route(
            "/v1/team/:member_id",
            get(team::get_member)
                .put(team::update_member)
                .delete(team::delete_member),
        )
        .route(
            "/v1/team/:member_id/permissions",
            get(team::get_permissions)
                .put(team::replace_permissions)
                .patch(team::set_permission),
        )
        .route("/v1/team/:member_id/can", get(team::can))
        .layer(cors)
        .with_state(state)
}

fn parse_user_id(input: &str) -> Result<UserId, AppError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(AppError::BadRequest("userId is required".to_string()));
    }
    Ok(UserId::new(trimmed))
}

fn parse_date(field: &str, input: &str) -> Result<NaiveDate, AppError> {
    NaiveDate::parse_from_str(input.trim(), "%Y-%m-%d")
        .map_err(|_| AppError::BadRequest(format!("{} must be a YYYY-MM-DD date", field)))
}

fn parse_optional_date(field: &str, input: Option<&str>) -> Result<Option<NaiveDate>, AppError> {
    input
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| parse_date(field, s))
        .transpose()
}

fn require(field: &str, value: &str) -> Result<(), AppError> {
    if value.trim().is_empty() {
        return Err(AppError::BadRequest(format!("{} is required", field)));
    }
    Ok(())
}
