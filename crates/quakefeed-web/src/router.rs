//! Axum router — maps all URL paths to handlers.

use axum::{
    Router,
    routing::{get, post},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use crate::state::SharedState;
use crate::handlers::{
    dashboard::dashboard,
    feed::{api_feed, api_toggle, form_toggle},
};
use crate::sse::sse_handler;

/// Build and return the full Axum router.
pub fn build_router(shared: SharedState) -> Router {
    Router::new()
        .route("/", get(dashboard))
        .route("/feed/toggle", post(form_toggle))

        // API endpoints
        .route("/api/feed",        get(api_feed))
        .route("/api/feed/toggle", post(api_toggle))

        // SSE streaming
        .route("/api/events", get(sse_handler))

        // Middleware
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(shared)
}
