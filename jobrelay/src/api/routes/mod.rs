//! API route modules.
//!
//! Organizes routes by resource type.

pub mod agent;
pub mod dispatch;
pub mod health;
pub mod jobs;

use axum::Router;

use crate::api::server::AppState;

/// Create the main API router with all routes.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .nest("/api/agent", agent::router())
        .nest("/api/dispatch", dispatch::router())
        .nest("/api/jobs", jobs::router())
        .nest("/health", health::router())
        .with_state(state)
}
