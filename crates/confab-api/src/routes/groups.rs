use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use confab_core::{group, AppState};
use confab_models::GroupWithMembers;
use serde::Deserialize;

use crate::error::ApiError;
use crate::middleware::AuthUser;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateGroupRequest {
    pub name: String,
    pub description: Option<String>,
    pub member_ids: Vec<i64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddMemberRequest {
    pub user_id: i64,
}

pub async fn create_group(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(body): Json<CreateGroupRequest>,
) -> Result<(StatusCode, Json<GroupWithMembers>), ApiError> {
    let created = group::create_group(
        &state.db,
        &state.members,
        auth.user_id,
        &body.name,
        body.description.as_deref(),
        &body.member_ids,
    )
    .await?;
    tracing::info!(group_id = created.group.id, admin_id = auth.user_id, "group created");
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn list_groups(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<Vec<GroupWithMembers>>, ApiError> {
    let groups = group::list_groups(&state.db, auth.user_id).await?;
    Ok(Json(groups))
}

pub async fn add_member(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(group_id): Path<i64>,
    Json(body): Json<AddMemberRequest>,
) -> Result<StatusCode, ApiError> {
    group::add_member(&state.db, &state.members, group_id, auth.user_id, body.user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn remove_member(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((group_id, user_id)): Path<(i64, i64)>,
) -> Result<StatusCode, ApiError> {
    group::remove_member(&state.db, &state.members, group_id, auth.user_id, user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
