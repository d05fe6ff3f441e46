use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use confab_core::{message, AppState};
use confab_models::{Conversation, Message};
use serde::Deserialize;

use crate::error::ApiError;
use crate::middleware::AuthUser;

#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    pub conversation: Conversation,
    pub text: Option<String>,
    pub image: Option<String>,
}

/// Persist the message, then fan it out to live sessions. A store failure
/// fails the whole request; live-delivery failures never surface here.
pub async fn send_message(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(body): Json<SendMessageRequest>,
) -> Result<(StatusCode, Json<Message>), ApiError> {
    let sent = message::send_message(
        &state.db,
        &state.router,
        auth.user_id,
        body.conversation,
        body.text.as_deref(),
        body.image.as_deref(),
    )
    .await?;
    Ok((StatusCode::CREATED, Json(sent)))
}

pub async fn direct_history(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(peer_id): Path<i64>,
) -> Result<Json<Vec<Message>>, ApiError> {
    let history = message::direct_history(&state.db, auth.user_id, peer_id).await?;
    Ok(Json(history))
}

pub async fn group_history(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(group_id): Path<i64>,
) -> Result<Json<Vec<Message>>, ApiError> {
    let history = message::group_history(&state.db, auth.user_id, group_id).await?;
    Ok(Json(history))
}
