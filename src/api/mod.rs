pub mod branches;
pub mod checkins;
pub mod extractors;
pub mod members;
pub mod membership_types;
pub mod memberships;
pub mod offers;

use axum::Router;

use crate::config::CONFIG;
use crate::state::AppState;

/// Create the main API router
pub fn create_router(state: AppState) -> Router {
    Router::new().nest("/api", api_routes(state))
}

/// API routes under /api/*
fn api_routes(state: AppState) -> Router {
    Router::new()
        .route("/health", axum::routing::get(health_check))
        .route("/system/version", axum::routing::get(get_version))
        .nest("/branches", branches::branches_routes(state.clone()))
        .nest("/members", members::members_routes(state.clone()))
        .nest(
            "/membership-types",
            membership_types::membership_types_routes(state.clone()),
        )
        .nest("/offers", offers::offers_routes(state.clone()))
        .nest("/memberships", memberships::memberships_routes(state.clone()))
        .nest("/checkins", checkins::checkins_routes(state))
}

/// Health check endpoint
async fn health_check() -> &'static str {
    "OK"
}

/// Version info endpoint
async fn get_version() -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({
        "version": CONFIG.version,
        "commit_hash": CONFIG.commit_hash,
        "build_time": CONFIG.build_time,
    }))
}
