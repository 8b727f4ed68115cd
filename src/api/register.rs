use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::require;
use super::users::ensure_email_free;
use crate::api::AppState;
use crate::domain::{ReferralCode, Status, User, UserId, UserProfile};
use crate::error::AppError;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub phone_code: String,
    pub phone: String,
    /// Referral code from the signup link.
    #[serde(default, rename = "ref")]
    pub referral: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterResponse {
    pub user: User,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub referred_by: Option<UserId>,
}

/// Self-service signup, optionally crediting the agent behind a referral code.
pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<RegisterResponse>), AppError> {
    require("name", &req.name)?;
    require("email", &req.email)?;
    require("phoneCode", &req.phone_code)?;
    require("phone", &req.phone)?;

    let profile = UserProfile {
        username: req.name.trim().to_string(),
        email: req.email.trim().to_string(),
        phone_code: req.phone_code.trim().to_string(),
        phone: req.phone.trim().to_string(),
        status: Status::Active,
    };
    profile.validate().map_err(AppError::BadRequest)?;
    ensure_email_free(&state, &profile.email).await?;

    let user = state.repo.create_user(&profile).await?;

    let mut referred_by = None;
    if let Some(code) = req.referral.as_deref().filter(|c| !c.trim().is_empty()) {
        match ReferralCode::decode(code) {
            Some(agent) if state.repo.get_user(&agent).await?.is_some() => {
                if state
                    .repo
                    .insert_referral_if_absent(&agent, &user.unique_id, false)
                    .await?
                    .is_some()
                {
                    referred_by = Some(agent);
                }
            }
            _ => warn!(code = %code, user = %user.unique_id, "Ignoring unknown referral code"),
        }
    }

    info!(
        user = %user.unique_id,
        referred_by = ?referred_by.as_ref().map(UserId::as_str),
        "User registered"
    );
    Ok((StatusCode::CREATED, Json(RegisterResponse { user, referred_by })))
}
