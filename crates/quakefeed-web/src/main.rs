//! Quakefeed web server
//!
//! Run with: cargo run -p quakefeed-web

use quakefeed_config::Config;
use quakefeed_feed::LiveFeed;
use quakefeed_web::{router::build_router, state::AppState};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialise structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("quakefeed=debug,info")),
        )
        .init();

    info!("Quakefeed starting up...");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let config = Config::load()?;
    info!(
        "Configuration loaded. Source: {}, poll every {} ms",
        config.source.base_url, config.poll.interval_ms
    );

    let feed = LiveFeed::from_config(&config)?;
    if config.poll.autostart {
        feed.start();
    }

    let state = Arc::new(AppState::new(feed));
    let router = build_router(state.clone());

    let listener = tokio::net::TcpListener::bind(&config.web.bind).await?;
    info!("Dashboard listening on http://{}", config.web.bind);
    info!("   Snapshot: http://{}/api/feed", config.web.bind);
    info!("   Events:   http://{}/api/events", config.web.bind);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    state.feed.stop();
    info!("Quakefeed stopped.");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Could not listen for Ctrl+C: {e}");
        std::future::pending::<()>().await;
    }
    info!("Shutdown requested");
}
