//! Shared application state for the web server.

use quakefeed_feed::{FeedEvent, LiveFeed};
use std::sync::Arc;
use tokio::sync::broadcast;

/// Shared state injected into every Axum handler.
pub struct AppState {
    pub feed: LiveFeed,
}

impl AppState {
    pub fn new(feed: LiveFeed) -> Self {
        Self { feed }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<FeedEvent> {
        self.feed.subscribe()
    }
}

pub type SharedState = Arc<AppState>;
