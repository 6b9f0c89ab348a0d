//! Live feed: one scheduler/store pair plus the map settings used to render it.
//!
//! Each mounted feed view owns exactly one `LiveFeed`; nothing is shared between
//! instances. Dropping it stops polling.

use quakefeed_common::Result;
use quakefeed_config::{Config, MapConfig};
use std::sync::Arc;
use tokio::sync::broadcast;

use crate::scheduler::{PollingScheduler, SchedulerPhase};
use crate::snapshot::FeedSnapshot;
use crate::source::{HttpPredictionSource, PredictionSource};
use crate::store::{FeedEvent, PredictionStore};

pub struct LiveFeed {
    scheduler: PollingScheduler,
    map: MapConfig,
}

impl LiveFeed {
    pub fn new(source: Arc<dyn PredictionSource>, config: &Config) -> Self {
        let store = PredictionStore::with_error_tolerance(config.poll.error_tolerance);
        Self {
            scheduler: PollingScheduler::from_config(source, store, &config.poll),
            map: config.map.clone(),
        }
    }

    /// Build a feed polling the HTTP source named in `config.source`.
    pub fn from_config(config: &Config) -> Result<Self> {
        let source = HttpPredictionSource::new(&config.source)?;
        Ok(Self::new(Arc::new(source), config))
    }

    pub fn start(&self) -> bool { self.scheduler.start() }

    pub fn stop(&self) -> bool { self.scheduler.stop() }

    /// The single user-facing control. Returns the new running state.
    pub fn toggle(&self) -> bool { self.scheduler.toggle() }

    pub fn is_running(&self) -> bool { self.scheduler.is_running() }

    pub fn phase(&self) -> SchedulerPhase { self.scheduler.phase() }

    pub fn store(&self) -> &PredictionStore { self.scheduler.store() }

    pub fn subscribe(&self) -> broadcast::Receiver<FeedEvent> {
        self.store().subscribe()
    }

    /// Current render model. Geometry is derived fresh on every call.
    pub fn snapshot(&self) -> FeedSnapshot {
        self.store().read(|state| FeedSnapshot::from_state(state, &self.map))
    }
}
