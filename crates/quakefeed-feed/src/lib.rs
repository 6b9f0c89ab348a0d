//! quakefeed-feed — Live earthquake-prediction feed controller.
//! Covers the whole polling core:
//! - Prediction source clients (HTTP `/predict_data`)
//! - Prediction store (latest batch, running flag, last error, events)
//! - Geometry derivation (bounds, recency weights, marker styling, view fit)
//! - Polling scheduler (start/stop/toggle, non-overlapping sequenced cycles)

pub mod models;
pub mod source;
pub mod store;
pub mod geometry;
pub mod snapshot;
pub mod scheduler;
pub mod controller;

pub use controller::LiveFeed;
pub use models::{PredictionBatch, PredictionPoint, TimeStep};
pub use scheduler::{PollingScheduler, SchedulerPhase};
pub use source::{HttpPredictionSource, PredictionSource};
pub use snapshot::{FeedSnapshot, Marker};
pub use store::{FailureKind, FeedError, FeedEvent, FeedState, PredictionStore};
