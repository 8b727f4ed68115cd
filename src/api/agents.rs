use axum::extract::{Path, Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::parse_user_id;
use crate::api::AppState;
use crate::domain::{Referral, ReferralCode, UserId};
use crate::engine::AgentStats;
use crate::error::AppError;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddReferralRequest {
    pub agent_id: String,
    pub customer_id: String,
    #[serde(default = "default_manual")]
    pub is_manual: bool,
}

fn default_manual() -> bool {
    true
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AddReferralResponse {
    pub created: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub referral: Option<Referral>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivateResponse {
    pub activated: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CodeResponse {
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agent_id: Option<UserId>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkResponse {
    pub agent_id: UserId,
    pub code: String,
    pub link: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IsAgentResponse {
    pub agent_id: UserId,
    pub is_agent: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentSearchQuery {
    pub search: Option<String>,
}

pub async fn list_referrals(
    State(state): State<AppState>,
) -> Result<Json<Vec<Referral>>, AppError> {
    Ok(Json(state.repo.list_referrals().await?))
}

/// Link a customer to an agent. A self-referral or an already referred
/// customer leaves the registry unchanged and reports `created: false`.
pub async fn add_referral(
    State(state): State<AppState>,
    Json(req): Json<AddReferralRequest>,
) -> Result<Json<AddReferralResponse>, AppError> {
    let agent = parse_user_id(&req.agent_id)?;
    let customer = parse_user_id(&req.customer_id)?;
    for user in [&agent, &customer] {
        if state.repo.get_user(user).await?.is_none() {
            return Err(AppError::NotFound(format!("User {} not found", user)));
        }
    }

    let referral = state
        .repo
        .insert_referral_if_absent(&agent, &customer, req.is_manual)
        .await?;
    if referral.is_some() {
        info!(agent = %agent, customer = %customer, manual = req.is_manual, "Referral added");
    }
    Ok(Json(AddReferralResponse {
        created: referral.is_some(),
        referral,
    }))
}

pub async fn agent_for_customer(
    Path(customer_id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<Referral>, AppError> {
    let customer = parse_user_id(&customer_id)?;
    state
        .repo
        .referral_for_customer(&customer)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("User {} has no referring agent", customer)))
}

pub async fn activate_referral(
    Path(customer_id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<ActivateResponse>, AppError> {
    let customer = parse_user_id(&customer_id)?;
    let activated = state.repo.activate_referral(&customer).await?;
    Ok(Json(ActivateResponse { activated }))
}

/// A code is valid when it decodes to an existing user.
pub async fn validate_code(
    Path(code): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<CodeResponse>, AppError> {
    let agent_id = match ReferralCode::decode(&code) {
        Some(agent) if state.repo.get_user(&agent).await?.is_some() => Some(agent),
        _ => None,
    };
    Ok(Json(CodeResponse {
        valid: agent_id.is_some(),
        agent_id,
    }))
}

pub async fn referral_link(
    Path(agent_id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<LinkResponse>, AppError> {
    let agent_id = parse_user_id(&agent_id)?;
    Ok(Json(LinkResponse {
        code: ReferralCode::encode(&agent_id),
        link: ReferralCode::link(&state.config.public_base_url, &agent_id),
        agent_id,
    }))
}

pub async fn referrals_by_agent(
    Path(agent_id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<Vec<Referral>>, AppError> {
    let agent_id = parse_user_id(&agent_id)?;
    Ok(Json(state.repo.referrals_by_agent(&agent_id).await?))
}

pub async fn is_agent(
    Path(agent_id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<IsAgentResponse>, AppError> {
    let agent_id = parse_user_id(&agent_id)?;
    let is_agent = state.repo.is_agent(&agent_id).await?;
    Ok(Json(IsAgentResponse { agent_id, is_agent }))
}

pub async fn list_agents(State(state): State<AppState>) -> Result<Json<Vec<UserId>>, AppError> {
    Ok(Json(state.repo.agent_ids().await?))
}

/// Commission statistics per agent, optionally filtered by agent id or name.
pub async fn agent_stats(
    Query(params): Query<AgentSearchQuery>,
    State(state): State<AppState>,
) -> Result<Json<Vec<AgentStats>>, AppError> {
    let (referrals, users, entries) = futures::try_join!(
        state.repo.list_referrals(),
        state.repo.list_users(),
        state.repo.list_pnl_entries(None, None, None),
    )?;
    let book = state.ledger.book().await?;
    let mut stats = book.agent_stats(&referrals, &users, &entries)?;

    if let Some(term) = params
        .search
        .as_deref()
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
    {
        stats.retain(|s| {
            s.agent_id.as_str().to_lowercase().contains(&term)
                || s.agent_name.to_lowercase().contains(&term)
        });
    }
    Ok(Json(stats))
}
