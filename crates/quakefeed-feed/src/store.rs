//! Prediction store: the single owned state object of a feed.
//!
//! The scheduler and the render adapter share one `PredictionStore` handle.
//! Only the feed core mutates it; every mutation is visible on the next read
//! and is published as a `FeedEvent`.

use chrono::{DateTime, Utc};
use quakefeed_common::QuakefeedError;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tokio::sync::broadcast;
use tracing::{debug, warn};

use crate::models::{PredictionBatch, PredictionPoint};

const EVENT_CAPACITY: usize = 256;
const DEFAULT_ERROR_TOLERANCE: f64 = 1e-6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Network unreachable, connection reset, timeout.
    Transport,
    /// Non-2xx status or a body that is not a valid batch.
    Protocol,
}

/// Record of the most recent failed poll.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedError {
    pub kind: FailureKind,
    pub message: String,
    pub occurred_at: DateTime<Utc>,
    /// Issue number of the cycle that failed.
    pub sequence: u64,
}

impl FeedError {
    pub fn from_error(sequence: u64, err: &QuakefeedError) -> Self {
        let kind = if err.is_protocol() { FailureKind::Protocol } else { FailureKind::Transport };
        Self {
            kind,
            message: err.to_string(),
            occurred_at: Utc::now(),
            sequence,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct FeedState {
    pub latest_batch: PredictionBatch,
    pub running: bool,
    pub last_error: Option<FeedError>,
    /// Issue number of the batch currently held; 0 before the first sequenced apply.
    pub applied_sequence: u64,
    /// Points in `latest_batch` whose reported absolute error disagrees with the recomputed one.
    pub error_mismatches: usize,
}

/// Events pushed to subscribers (SSE, tests, loggers).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FeedEvent {
    BatchApplied { sequence: u64, points: usize },
    PollFailed { error: FeedError },
    RunningChanged { running: bool },
}

#[derive(Clone)]
pub struct PredictionStore {
    state: Arc<RwLock<FeedState>>,
    events: broadcast::Sender<FeedEvent>,
    error_tolerance: f64,
}

impl Default for PredictionStore {
    fn default() -> Self { Self::new() }
}

impl PredictionStore {
    pub fn new() -> Self {
        Self::with_error_tolerance(DEFAULT_ERROR_TOLERANCE)
    }

    pub fn with_error_tolerance(error_tolerance: f64) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            state: Arc::new(RwLock::new(FeedState::default())),
            events,
            error_tolerance,
        }
    }

    fn read_state(&self) -> RwLockReadGuard<'_, FeedState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_state(&self) -> RwLockWriteGuard<'_, FeedState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<FeedEvent> {
        self.events.subscribe()
    }

    /// Replace the held batch wholesale and clear `last_error`.
    /// No merging or deduplication with the previous batch.
    pub fn update(&self, batch: PredictionBatch) {
        let points = batch.len();
        let sequence = {
            let mut state = self.write_state();
            self.replace(&mut state, batch);
            state.applied_sequence
        };
        let _ = self.events.send(FeedEvent::BatchApplied { sequence, points });
    }

    /// Apply a batch issued as cycle `sequence`. Completions that are not newer
    /// than the batch already held are discarded and `false` is returned.
    pub fn apply(&self, sequence: u64, batch: PredictionBatch) -> bool {
        let points = batch.len();
        {
            let mut state = self.write_state();
            if sequence <= state.applied_sequence {
                debug!(sequence, applied = state.applied_sequence, "discarding stale batch");
                return false;
            }
            self.replace(&mut state, batch);
            state.applied_sequence = sequence;
        }
        let _ = self.events.send(FeedEvent::BatchApplied { sequence, points });
        true
    }

    fn replace(&self, state: &mut FeedState, batch: PredictionBatch) {
        let mismatches = batch.error_mismatches(self.error_tolerance);
        if !mismatches.is_empty() {
            warn!(
                count = mismatches.len(),
                first_index = mismatches[0],
                tolerance = self.error_tolerance,
                "reported absolute_error differs from |predicted - actual|"
            );
        }
        state.error_mismatches = mismatches.len();
        state.latest_batch = batch;
        state.last_error = None;
    }

    /// Remember a failed poll. The held batch stays as it is.
    pub fn record_failure(&self, error: FeedError) {
        warn!(kind = ?error.kind, sequence = error.sequence, "prediction poll failed: {}", error.message);
        self.write_state().last_error = Some(error.clone());
        let _ = self.events.send(FeedEvent::PollFailed { error });
    }

    /// Set the running flag. Returns `true` when the value changed.
    pub fn set_running(&self, value: bool) -> bool {
        let changed = {
            let mut state = self.write_state();
            let changed = state.running != value;
            state.running = value;
            changed
        };
        if changed {
            let _ = self.events.send(FeedEvent::RunningChanged { running: value });
        }
        changed
    }

    pub fn is_running(&self) -> bool {
        self.read_state().running
    }

    pub fn latest_batch(&self) -> PredictionBatch {
        self.read_state().latest_batch.clone()
    }

    pub fn last_error(&self) -> Option<FeedError> {
        self.read_state().last_error.clone()
    }

    /// The last `k` history points of the held batch.
    pub fn recent(&self, k: usize) -> Vec<PredictionPoint> {
        self.read_state().latest_batch.recent(k).to_vec()
    }

    pub fn state(&self) -> FeedState {
        self.read_state().clone()
    }

    /// Run `f` against the current state under the read lock.
    pub fn read<R>(&self, f: impl FnOnce(&FeedState) -> R) -> R {
        f(&self.read_state())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TimeStep;

    fn batch(n: usize, mae: f64) -> PredictionBatch {
        PredictionBatch {
            current_prediction: Some(4.5),
            current_actual: Some(4.4),
            mean_absolute_error: Some(mae),
            history: (0..n)
                .map(|i| PredictionPoint {
                    time_step: TimeStep::Integer(i as i64 + 1),
                    latitude: 31.0,
                    longitude: 77.0,
                    predicted: 4.5,
                    actual: 4.25,
                    absolute_error: 0.25,
                })
                .collect(),
        }
    }

    fn failure(sequence: u64) -> FeedError {
        FeedError::from_error(sequence, &QuakefeedError::Timeout(5000))
    }

    #[test]
    fn test_update_replaces_and_clears_error() {
        let store = PredictionStore::new();
        store.update(batch(3, 0.1));
        store.record_failure(failure(2));
        assert!(store.last_error().is_some());

        store.update(PredictionBatch::default());
        assert!(store.last_error().is_none());
        assert!(store.latest_batch().is_empty());
    }

    #[test]
    fn test_record_failure_keeps_batch() {
        let store = PredictionStore::new();
        store.update(batch(3, 0.1));
        let before = store.latest_batch();

        store.record_failure(failure(2));
        assert_eq!(store.latest_batch(), before);
        assert_eq!(store.last_error().unwrap().kind, FailureKind::Transport);
    }

    #[test]
    fn test_out_of_range_point_kept_in_history() {
        let store = PredictionStore::new();
        let mut b = batch(2, 0.3);
        b.history[0].latitude = 95.0;
        store.update(b);
        let held = store.latest_batch();
        assert_eq!(held.len(), 2);
        assert_eq!(held.mean_absolute_error, Some(0.3));
        assert_eq!(held.valid_points().count(), 1);
    }

    #[test]
    fn test_apply_discards_stale_sequence() {
        let store = PredictionStore::new();
        assert!(store.apply(2, batch(2, 0.2)));
        assert!(!store.apply(1, batch(5, 0.5)));
        assert!(!store.apply(2, batch(5, 0.5)));
        assert_eq!(store.latest_batch().len(), 2);
        assert_eq!(store.state().applied_sequence, 2);
        assert!(store.apply(3, batch(4, 0.4)));
        assert_eq!(store.latest_batch().len(), 4);
    }

    #[test]
    fn test_set_running_leaves_batch() {
        let store = PredictionStore::new();
        store.update(batch(3, 0.1));
        assert!(store.set_running(true));
        assert!(!store.set_running(true));
        assert!(store.is_running());
        assert_eq!(store.latest_batch().len(), 3);
    }

    #[test]
    fn test_mismatch_counted_not_blocking() {
        let store = PredictionStore::new();
        let mut b = batch(3, 0.1);
        b.history[1].absolute_error = 2.0;
        store.update(b);
        let state = store.state();
        assert_eq!(state.error_mismatches, 1);
        assert_eq!(state.latest_batch.len(), 3);
    }

    #[test]
    fn test_mutations_are_published() {
        let store = PredictionStore::new();
        let mut rx = store.subscribe();
        store.set_running(true);
        store.apply(1, batch(3, 0.1));
        store.record_failure(failure(2));

        assert_eq!(rx.try_recv().unwrap(), FeedEvent::RunningChanged { running: true });
        assert_eq!(rx.try_recv().unwrap(), FeedEvent::BatchApplied { sequence: 1, points: 3 });
        assert!(matches!(rx.try_recv().unwrap(), FeedEvent::PollFailed { error } if error.sequence == 2));
    }

    #[test]
    fn test_recent_rows() {
        let store = PredictionStore::new();
        store.update(batch(10, 0.1));
        let rows = store.recent(4);
        assert_eq!(rows.len(), 4);
        assert_eq!(rows[3].time_step, TimeStep::Integer(10));
    }
}
