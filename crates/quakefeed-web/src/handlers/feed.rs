//! Feed API — snapshot reads and the single user control.

use axum::{extract::State, response::Redirect, Json};
use quakefeed_feed::snapshot::{toggle_label, FeedSnapshot};
use serde::Serialize;
use tracing::info;

use crate::state::SharedState;

pub async fn api_feed(State(state): State<SharedState>) -> Json<FeedSnapshot> {
    Json(state.feed.snapshot())
}

#[derive(Debug, Serialize)]
pub struct ToggleResponse {
    pub running: bool,
    pub label: &'static str,
}

pub async fn api_toggle(State(state): State<SharedState>) -> Json<ToggleResponse> {
    let running = state.feed.toggle();
    info!(running, "feed toggled");
    Json(ToggleResponse { running, label: toggle_label(running) })
}

/// Toggle from the dashboard form, then send the browser back to the page.
pub async fn form_toggle(State(state): State<SharedState>) -> Redirect {
    let running = state.feed.toggle();
    info!(running, "feed toggled from dashboard");
    Redirect::to("/")
}
