use axum::{
    routing::{delete, get, post},
    Router,
};
use confab_core::AppState;
use tower_http::cors::CorsLayer;

pub mod error;
pub mod middleware;
pub mod routes;

pub fn build_router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        // Auth
        .route("/api/v1/auth/register", post(routes::auth::register))
        .route("/api/v1/auth/login", post(routes::auth::login))
        // Users
        .route("/api/v1/users", get(routes::users::list_users))
        // Groups
        .route(
            "/api/v1/groups",
            get(routes::groups::list_groups).post(routes::groups::create_group),
        )
        .route(
            "/api/v1/groups/{group_id}/members",
            post(routes::groups::add_member),
        )
        .route(
            "/api/v1/groups/{group_id}/members/{user_id}",
            delete(routes::groups::remove_member),
        )
        // Messages
        .route("/api/v1/messages", post(routes::messages::send_message))
        .route(
            "/api/v1/messages/direct/{peer_id}",
            get(routes::messages::direct_history),
        )
        .route(
            "/api/v1/messages/group/{group_id}",
            get(routes::messages::group_history),
        )
        .layer(CorsLayer::permissive())
}

async fn health() -> &'static str {
    "ok"
}
