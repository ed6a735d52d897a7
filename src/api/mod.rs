//! HTTP API module
//!
//! This module contains all HTTP endpoint handlers and response structures.

pub mod handlers;
pub mod responses;

use std::sync::Arc;
use axum::{
    routing::{get, post, put},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::state::AppState;
use handlers::*;

/// Create the HTTP router with all endpoints
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/scopes", get(list_scopes_handler).post(create_scope_handler))
        .route("/scopes/:id", get(get_scope_handler).delete(delete_scope_handler))
        .route("/scopes/:id/timer/start", post(start_timer_handler))
        .route("/scopes/:id/timer/pause", post(pause_timer_handler))
        .route("/scopes/:id/timer/reset", post(reset_timer_handler))
        .route("/scopes/:id/timer/duration", put(set_duration_handler))
        .route("/countdowns", get(countdowns_handler))
        .route("/status", get(status_handler))
        .route("/health", get(health_handler))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
