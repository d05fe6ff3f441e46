use axum::{extract::State, Json};
use confab_core::AppState;
use confab_models::User;

use crate::error::ApiError;
use crate::middleware::AuthUser;

/// Everyone except the caller, for the conversation sidebar.
pub async fn list_users(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<Vec<User>>, ApiError> {
    let rows = confab_db::users::list_users_except(&state.db, auth.user_id).await?;
    Ok(Json(rows.into_iter().map(User::from).collect()))
}
