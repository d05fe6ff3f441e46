use axum::{extract::State, http::StatusCode, Json};
use confab_core::{auth, AppState};
use confab_models::User;
use confab_util::{snowflake, validation};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: User,
}

pub async fn register(
    State(state): State<AppState>,
    Json(body): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), ApiError> {
    validation::validate_username(&body.username)?;
    validation::validate_email(&body.email)?;
    validation::validate_password(&body.password)?;

    if confab_db::users::get_user_by_email(&state.db, &body.email)
        .await?
        .is_some()
    {
        return Err(ApiError::Conflict("email already registered".into()));
    }
    if confab_db::users::username_exists(&state.db, &body.username).await? {
        return Err(ApiError::Conflict("username already taken".into()));
    }

    let password_hash = auth::hash_password(&body.password)?;
    let id = snowflake::generate(1);
    let row = confab_db::users::create_user(
        &state.db,
        id,
        &body.username,
        &body.email,
        &password_hash,
    )
    .await?;

    let token = auth::create_token(row.id, &state.config.jwt_secret, state.config.jwt_expiry_seconds)?;
    tracing::info!(user_id = row.id, "user registered");

    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            token,
            user: row.into(),
        }),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    let row = confab_db::users::get_user_by_email(&state.db, &body.email)
        .await?
        .ok_or(ApiError::Unauthorized)?;

    if !auth::verify_password(&body.password, &row.password_hash)? {
        return Err(ApiError::Unauthorized);
    }

    let token = auth::create_token(row.id, &state.config.jwt_secret, state.config.jwt_expiry_seconds)?;
    Ok(Json(AuthResponse {
        token,
        user: row.into(),
    }))
}
