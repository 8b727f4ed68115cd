use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};

use super::parse_user_id;
use crate::api::AppState;
use crate::domain::{Plan, PlanTier, Status, UserPlan};
use crate::error::AppError;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignPlanRequest {
    pub user_id: String,
    pub plan: PlanTier,
    #[serde(default)]
    pub status: Status,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignPlanResponse {
    pub user_plan: UserPlan,
    pub first_assignment: bool,
    pub wallet_created: bool,
    pub referral_activated: bool,
}

pub async fn catalog() -> Json<Vec<Plan>> {
    Json(Plan::catalog())
}

pub async fn list_user_plans(
    State(state): State<AppState>,
) -> Result<Json<Vec<UserPlan>>, AppError> {
    Ok(Json(state.repo.list_user_plans().await?))
}

pub async fn get_user_plan(
    Path(user_id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<UserPlan>, AppError> {
    let user_id = parse_user_id(&user_id)?;
    state
        .repo
        .get_user_plan(&user_id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("User {} has no plan", user_id)))
}

pub async fn assign_plan(
    State(state): State<AppState>,
    Json(req): Json<AssignPlanRequest>,
) -> Result<Json<AssignPlanResponse>, AppError> {
    let user_id = parse_user_id(&req.user_id)?;
    let enrollment = state
        .enroller
        .assign_plan(&user_id, req.plan, req.status)
        .await?;

    Ok(Json(AssignPlanResponse {
        user_plan: enrollment.user_plan,
        first_assignment: enrollment.first_assignment,
        wallet_created: enrollment.wallet_created,
        referral_activated: enrollment.referral_activated,
    }))
}

pub async fn delete_user_plan(
    Path(user_id): Path<String>,
    State(state): State<AppState>,
) -> Result<StatusCode, AppError> {
    let user_id = parse_user_id(&user_id)?;
    if !state.repo.delete_user_plan(&user_id).await? {
        return Err(AppError::NotFound(format!("User {} has no plan", user_id)));
    }
    Ok(StatusCode::NO_CONTENT)
}
