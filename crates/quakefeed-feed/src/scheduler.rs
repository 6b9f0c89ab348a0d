//! Polling scheduler.
//!
//! A started scheduler owns one tokio task that runs fetch cycles back to back
//! on a fixed period. Cycles never overlap: the task awaits each fetch before
//! waiting for the next tick, and ticks missed during a slow fetch are skipped.
//!
//! Every cycle takes an issue number from a monotonic counter, and every
//! `start()` opens a new generation. A completion is applied only if its
//! generation is still the current one and the store still reports running;
//! the store itself rejects batches older than the one it holds.

use quakefeed_config::PollConfig;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::source::PredictionSource;
use crate::store::{FeedError, PredictionStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SchedulerPhase {
    Idle,
    Fetching,
    Applying,
}

struct Shared {
    source: Arc<dyn PredictionSource>,
    store: PredictionStore,
    period: Duration,
    issued: AtomicU64,
    generation: AtomicU64,
    phase: Mutex<SchedulerPhase>,
}

impl Shared {
    fn is_current(&self, generation: u64) -> bool {
        self.generation.load(Ordering::SeqCst) == generation
    }

    fn lock_phase(&self) -> MutexGuard<'_, SchedulerPhase> {
        self.phase.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn enter(&self, generation: u64, next: SchedulerPhase) -> bool {
        let mut phase = self.lock_phase();
        if !self.is_current(generation) {
            return false;
        }
        *phase = next;
        true
    }

    async fn run_cycle(&self, generation: u64) {
        if !self.enter(generation, SchedulerPhase::Fetching) {
            return;
        }
        let sequence = self.issued.fetch_add(1, Ordering::SeqCst) + 1;
        debug!(sequence, "fetch cycle started");

        let result = self.source.fetch_latest().await;

        // `stop()` takes the phase lock before clearing the running flag, so the
        // flag only flips once an apply that already passed this check is done.
        let mut phase = self.lock_phase();
        if !self.is_current(generation) || !self.store.is_running() {
            debug!(sequence, "discarding completion after stop");
            return;
        }
        *phase = SchedulerPhase::Applying;
        match result {
            Ok(batch) => {
                let points = batch.len();
                if self.store.apply(sequence, batch) {
                    debug!(sequence, points, "batch applied");
                }
            }
            Err(e) => self.store.record_failure(FeedError::from_error(sequence, &e)),
        }
        *phase = SchedulerPhase::Idle;
    }
}

async fn run_loop(shared: Arc<Shared>, generation: u64) {
    let mut ticker = interval(shared.period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    loop {
        // The first tick completes immediately, giving the fetch at start time.
        ticker.tick().await;
        if !shared.is_current(generation) {
            break;
        }
        shared.run_cycle(generation).await;
    }
}

/// Start/stop controller for the poll loop of one feed.
///
/// Dropping the scheduler stops it, so no task outlives the view that owns it.
pub struct PollingScheduler {
    shared: Arc<Shared>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl PollingScheduler {
    pub fn new(source: Arc<dyn PredictionSource>, store: PredictionStore, period: Duration) -> Self {
        Self {
            shared: Arc::new(Shared {
                source,
                store,
                period,
                issued: AtomicU64::new(0),
                generation: AtomicU64::new(0),
                phase: Mutex::new(SchedulerPhase::Idle),
            }),
            task: Mutex::new(None),
        }
    }

    pub fn from_config(source: Arc<dyn PredictionSource>, store: PredictionStore, cfg: &PollConfig) -> Self {
        Self::new(source, store, cfg.interval())
    }

    fn lock_task(&self) -> MutexGuard<'_, Option<JoinHandle<()>>> {
        self.task.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Fetch once now, then once per period. No-op if already running.
    /// Outside a Tokio runtime nothing starts and `false` is returned.
    pub fn start(&self) -> bool {
        let mut task = self.lock_task();
        self.start_locked(&mut task)
    }

    /// Disarm the timer and drop any in-flight fetch. No-op if not running.
    pub fn stop(&self) -> bool {
        let mut task = self.lock_task();
        self.stop_locked(&mut task)
    }

    /// Stop if running, start otherwise. Returns the new running state.
    pub fn toggle(&self) -> bool {
        let mut task = self.lock_task();
        if task.is_some() {
            self.stop_locked(&mut task);
        } else {
            self.start_locked(&mut task);
        }
        task.is_some()
    }

    fn start_locked(&self, task: &mut Option<JoinHandle<()>>) -> bool {
        if task.is_some() {
            return false;
        }
        let Ok(runtime) = Handle::try_current() else {
            warn!("prediction polling not started: no Tokio runtime");
            return false;
        };
        let generation = self.shared.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.shared.store.set_running(true);
        info!(generation, period_ms = self.shared.period.as_millis() as u64, "prediction polling started");
        *task = Some(runtime.spawn(run_loop(self.shared.clone(), generation)));
        true
    }

    fn stop_locked(&self, task: &mut Option<JoinHandle<()>>) -> bool {
        let Some(handle) = task.take() else {
            return false;
        };
        self.shared.generation.fetch_add(1, Ordering::SeqCst);
        handle.abort();
        *self.shared.lock_phase() = SchedulerPhase::Idle;
        self.shared.store.set_running(false);
        info!(issued = self.issued(), "prediction polling stopped");
        true
    }

    pub fn is_running(&self) -> bool {
        self.lock_task().is_some()
    }

    pub fn phase(&self) -> SchedulerPhase {
        *self.shared.lock_phase()
    }

    /// Number of fetch cycles issued so far, across all starts.
    pub fn issued(&self) -> u64 {
        self.shared.issued.load(Ordering::SeqCst)
    }

    pub fn period(&self) -> Duration {
        self.shared.period
    }

    pub fn store(&self) -> &PredictionStore {
        &self.shared.store
    }
}

impl Drop for PollingScheduler {
    fn drop(&mut self) {
        self.stop();
    }
}
