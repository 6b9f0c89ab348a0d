//! HTTP prediction source against the in-process simulated service.

use quakefeed_common::QuakefeedError;
use quakefeed_config::{Config, SourceConfig};
use quakefeed_feed::{FailureKind, HttpPredictionSource, LiveFeed, PredictionSource, TimeStep};
use quakefeed_test_utils::fixtures::batch_json;
use quakefeed_test_utils::{Behaviour, MockPredictionServer};
use std::time::Duration;

fn source_for(server: &MockPredictionServer, timeout_ms: u64) -> HttpPredictionSource {
    HttpPredictionSource::new(&SourceConfig { base_url: server.base_url(), timeout_ms }).unwrap()
}

#[tokio::test]
async fn test_fetch_simulated_window() {
    let server = MockPredictionServer::start(Behaviour::Simulate).await.unwrap();
    let source = source_for(&server, 2000);

    let first = source.fetch_latest().await.unwrap();
    assert_eq!(first.len(), 1);
    assert!(first.current_prediction.is_some());

    for _ in 0..11 {
        source.fetch_latest().await.unwrap();
    }
    let batch = source.fetch_latest().await.unwrap();
    assert_eq!(batch.len(), 10);
    assert_eq!(batch.history[0].time_step, TimeStep::Integer(4));
    assert_eq!(batch.latest_point().unwrap().time_step, TimeStep::Integer(13));
    assert!(batch.error_mismatches(1e-9).is_empty());
    assert_eq!(server.hits(), 13);
}

#[tokio::test]
async fn test_fixed_body_decodes() {
    let body = batch_json(&[(30.0, 70.0), (31.0, 71.0), (29.0, 69.0)]);
    let server = MockPredictionServer::start(Behaviour::Fixed(body)).await.unwrap();

    let batch = source_for(&server, 2000).fetch_latest().await.unwrap();
    assert_eq!(batch.len(), 3);
    assert_eq!(batch.mean_absolute_error, Some(0.25));
}

#[tokio::test]
async fn test_non_2xx_is_protocol_failure() {
    let server = MockPredictionServer::start(Behaviour::Status(500)).await.unwrap();

    let err = source_for(&server, 2000).fetch_latest().await.unwrap_err();
    assert!(matches!(err, QuakefeedError::Status { status: 500, .. }));
    assert!(err.is_protocol());
}

#[tokio::test]
async fn test_malformed_body_is_protocol_failure() {
    let server = MockPredictionServer::start(Behaviour::Malformed).await.unwrap();

    let err = source_for(&server, 2000).fetch_latest().await.unwrap_err();
    assert!(matches!(err, QuakefeedError::Decode(_)));
}

#[tokio::test]
async fn test_slow_service_times_out() {
    let server = MockPredictionServer::start(Behaviour::Simulate).await.unwrap();
    server.set_delay(Some(Duration::from_millis(500)));

    let err = source_for(&server, 50).fetch_latest().await.unwrap_err();
    assert!(matches!(err, QuakefeedError::Timeout(50)));
    assert!(!err.is_protocol());
}

#[tokio::test]
async fn test_unreachable_service_is_transport_failure() {
    let server = MockPredictionServer::start(Behaviour::Simulate).await.unwrap();
    let url = server.base_url();
    drop(server);
    tokio::time::sleep(Duration::from_millis(20)).await;

    let source = HttpPredictionSource::new(&SourceConfig { base_url: url, timeout_ms: 500 }).unwrap();
    let err = source.fetch_latest().await.unwrap_err();
    assert!(!err.is_protocol());
}

#[tokio::test]
async fn test_live_feed_end_to_end() {
    let server = MockPredictionServer::start(Behaviour::Simulate).await.unwrap();
    let mut config = Config::default();
    config.source.base_url = server.base_url();
    config.poll.interval_ms = 50;

    let feed = LiveFeed::from_config(&config).unwrap();
    let mut events = feed.subscribe();
    feed.start();

    // running, then the first batch
    events.recv().await.unwrap();
    events.recv().await.unwrap();
    let snap = feed.snapshot();
    assert!(snap.running);
    assert!(!snap.markers.is_empty());
    assert!(snap.bounds.is_some());

    server.set_behaviour(Behaviour::Status(502));
    tokio::time::sleep(Duration::from_millis(200)).await;
    let snap = feed.snapshot();
    assert_eq!(snap.last_error.as_ref().map(|e| e.kind), Some(FailureKind::Protocol));
    assert!(!snap.markers.is_empty());

    feed.stop();
    tokio::time::sleep(Duration::from_millis(20)).await;
    let hits = server.hits();
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(server.hits(), hits);
}
