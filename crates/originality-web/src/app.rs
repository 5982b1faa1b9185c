use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::AppState;

/// Largest accepted request body (extracted text of a long paper).
const BODY_LIMIT: usize = 10 * 1024 * 1024;

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/analyses", post(handlers::analyses::create))
        .route(
            "/analyses/{id}",
            get(handlers::analyses::show).delete(handlers::analyses::delete),
        )
        .route("/analyses/{id}/status", get(handlers::analyses::status))
        .route(
            "/analyze-research",
            post(handlers::trigger::analyze_research),
        )
        .layer(axum::extract::DefaultBodyLimit::max(BODY_LIMIT))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
