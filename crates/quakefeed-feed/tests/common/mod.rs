//! Scripted in-memory prediction source for scheduler tests.

#![allow(dead_code)]

use async_trait::async_trait;
use quakefeed_common::Result;
use quakefeed_feed::{PredictionBatch, PredictionPoint, PredictionSource, TimeStep};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

type Respond = Box<dyn Fn(usize) -> Result<PredictionBatch> + Send + Sync>;

pub struct ScriptedSource {
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    delay: Duration,
    respond: Respond,
}

impl ScriptedSource {
    /// `respond` receives the 0-based call index.
    pub fn new(delay: Duration, respond: impl Fn(usize) -> Result<PredictionBatch> + Send + Sync + 'static) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            delay,
            respond: Box::new(respond),
        }
    }

    /// Every call returns a batch whose history length is `call index + 1`.
    pub fn growing() -> Self {
        Self::new(Duration::ZERO, |i| Ok(batch_of(i + 1)))
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PredictionSource for ScriptedSource {
    async fn fetch_latest(&self) -> Result<PredictionBatch> {
        let index = self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        (self.respond)(index)
    }
}

pub fn batch_of(n: usize) -> PredictionBatch {
    PredictionBatch {
        current_prediction: Some(4.8),
        current_actual: Some(4.6),
        mean_absolute_error: Some(0.2),
        history: (0..n)
            .map(|i| PredictionPoint {
                time_step: TimeStep::Integer(i as i64 + 1),
                latitude: 30.0 + i as f64 * 0.25,
                longitude: 76.0 + i as f64 * 0.25,
                predicted: 4.8,
                actual: 4.6,
                absolute_error: 0.2,
            })
            .collect(),
    }
}

/// Let spawned tasks run without moving the paused clock past a tick.
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(1)).await;
}
