use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("not found")]
    NotFound,
    #[error("unauthorized")]
    Unauthorized,
    #[error("forbidden")]
    Forbidden,
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("internal server error")]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ApiError::NotFound => (StatusCode::NOT_FOUND, self.to_string()),
            ApiError::Unauthorized => (StatusCode::UNAUTHORIZED, self.to_string()),
            ApiError::Forbidden => (StatusCode::FORBIDDEN, self.to_string()),
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, self.to_string()),
            ApiError::Conflict(_) => (StatusCode::CONFLICT, self.to_string()),
            ApiError::Internal(err) => {
                tracing::error!("API internal error: {err:#}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal server error".to_string(),
                )
            }
        };
        (status, Json(json!({ "error": message, "message": message }))).into_response()
    }
}

impl From<confab_core::error::CoreError> for ApiError {
    fn from(e: confab_core::error::CoreError) -> Self {
        match e {
            confab_core::error::CoreError::NotFound => ApiError::NotFound,
            confab_core::error::CoreError::Unauthorized => ApiError::Forbidden,
            confab_core::error::CoreError::Validation(msg) => ApiError::BadRequest(msg),
            confab_core::error::CoreError::Database(_) => {
                ApiError::Internal(anyhow::anyhow!("database error"))
            }
            confab_core::error::CoreError::Internal(msg) => {
                ApiError::Internal(anyhow::anyhow!(msg))
            }
        }
    }
}

impl From<confab_db::DbError> for ApiError {
    fn from(e: confab_db::DbError) -> Self {
        match e {
            confab_db::DbError::NotFound => ApiError::NotFound,
            confab_db::DbError::Sqlx(_) => ApiError::Internal(anyhow::anyhow!("database error")),
        }
    }
}

impl From<confab_core::auth::AuthError> for ApiError {
    fn from(e: confab_core::auth::AuthError) -> Self {
        match e {
            confab_core::auth::AuthError::InvalidCredentials
            | confab_core::auth::AuthError::InvalidToken => ApiError::Unauthorized,
            confab_core::auth::AuthError::Internal(msg) => {
                ApiError::Internal(anyhow::anyhow!(msg))
            }
        }
    }
}

impl From<confab_util::validation::ValidationError> for ApiError {
    fn from(e: confab_util::validation::ValidationError) -> Self {
        ApiError::BadRequest(e.to_string())
    }
}
