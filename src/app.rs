use axum::{middleware, routing::post, Router};
use std::path::Path;
use tower_http::services::ServeDir;

use crate::handlers::{chat_handler, feedback_handler, rating_handler};
use crate::middleware::tracing::trace_requests;
use crate::state::AppState;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/chat", post(chat_handler))
        .route("/feedback", post(feedback_handler))
        .route("/feedback/rating", post(rating_handler))
        .layer(middleware::from_fn(trace_requests))
        .with_state(state)
}

/// Same routes, with the widget's static assets served for every other path.
pub fn router_with_assets(state: AppState, static_dir: &Path) -> Router {
    router(state).fallback_service(ServeDir::new(static_dir))
}
