use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::require;
use crate::api::AppState;
use crate::domain::{
    ModulePermissions, PermissionAction, PermissionModule, TeamMember, TeamMemberDraft,
};
use crate::error::AppError;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetPermissionRequest {
    pub module: PermissionModule,
    pub action: PermissionAction,
    pub value: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CanQuery {
    pub module: PermissionModule,
    pub action: PermissionAction,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CanResponse {
    pub allowed: bool,
}

fn not_found(id: &str) -> AppError {
    AppError::NotFound(format!("Team member {} not found", id))
}

fn validate(draft: &TeamMemberDraft) -> Result<(), AppError> {
    require("name", &draft.name)?;
    require("email", &draft.email)?;
    if !draft.email.contains('@') {
        return Err(AppError::BadRequest("a valid email is required".to_string()));
    }
    Ok(())
}

pub async fn list_members(
    State(state): State<AppState>,
) -> Result<Json<Vec<TeamMember>>, AppError> {
    Ok(Json(state.repo.list_team_members().await?))
}

pub async fn get_member(
    Path(member_id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<TeamMember>, AppError> {
    state
        .repo
        .get_team_member(&member_id)
        .await?
        .map(Json)
        .ok_or_else(|| not_found(&member_id))
}

/// New members start with the default permission grid.
pub async fn create_member(
    State(state): State<AppState>,
    Json(draft): Json<TeamMemberDraft>,
) -> Result<(StatusCode, Json<TeamMember>), AppError> {
    validate(&draft)?;
    let member = state
        .repo
        .insert_team_member(&draft, ModulePermissions::default())
        .await?;
    info!(member = %member.id, role = %member.role.as_str(), "Team member added");
    Ok((StatusCode::CREATED, Json(member)))
}

pub async fn update_member(
    Path(member_id): Path<String>,
    State(state): State<AppState>,
    Json(draft): Json<TeamMemberDraft>,
) -> Result<Json<TeamMember>, AppError> {
    validate(&draft)?;
    state
        .repo
        .update_team_member(&member_id, &draft)
        .await?
        .map(Json)
        .ok_or_else(|| not_found(&member_id))
}

pub async fn delete_member(
    Path(member_id): Path<String>,
    State(state): State<AppState>,
) -> Result<StatusCode, AppError> {
    if !state.repo.delete_team_member(&member_id).await? {
        return Err(not_found(&member_id));
    }
    info!(member = %member_id, "Team member removed");
    Ok(StatusCode::NO_CONTENT)
}

pub async fn get_permissions(
    Path(member_id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<ModulePermissions>, AppError> {
    state
        .repo
        .get_team_member(&member_id)
        .await?
        .map(|m| Json(m.permissions))
        .ok_or_else(|| not_found(&member_id))
}

pub async fn replace_permissions(
    Path(member_id): Path<String>,
    State(state): State<AppState>,
    Json(permissions): Json<ModulePermissions>,
) -> Result<Json<ModulePermissions>, AppError> {
    if !state
        .repo
        .set_team_permissions(&member_id, &permissions)
        .await?
    {
        return Err(not_found(&member_id));
    }
    Ok(Json(permissions))
}

/// Flip a single `(module, action)` flag.
pub async fn set_permission(
    Path(member_id): Path<String>,
    State(state): State<AppState>,
    Json(req): Json<SetPermissionRequest>,
) -> Result<Json<ModulePermissions>, AppError> {
    let member = state
        .repo
        .get_team_member(&member_id)
        .await?
        .ok_or_else(|| not_found(&member_id))?;

    let permissions = member.permissions.with(req.module, req.action, req.value);
    if !state
        .repo
        .set_team_permissions(&member_id, &permissions)
        .await?
    {
        return Err(not_found(&member_id));
    }
    info!(
        member = %member_id,
        module = ?req.module,
        action = ?req.action,
        value = req.value,
        "Permission changed"
    );
    Ok(Json(permissions))
}

/// Unknown members are denied rather than reported missing.
pub async fn can(
    Path(member_id): Path<String>,
    Query(params): Query<CanQuery>,
    State(state): State<AppState>,
) -> Result<Json<CanResponse>, AppError> {
    let allowed = state
        .repo
        .get_team_member(&member_id)
        .await?
        .map(|m| m.permissions.allows(params.module, params.action))
        .unwrap_or(false);
    Ok(Json(CanResponse { allowed }))
}
