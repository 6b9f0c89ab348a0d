//! Read model handed to the render adapter.

use quakefeed_config::MapConfig;
use serde::Serialize;

use crate::geometry::{compute_bounds, compute_weights, fit_view, marker_style, BoundingRegion, MarkerStyle, ViewFit};
use crate::models::PredictionPoint;
use crate::store::{FeedError, FeedState};

/// One map marker: the point, its recency weight and the paint derived from it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Marker {
    pub point: PredictionPoint,
    pub weight: f64,
    pub style: MarkerStyle,
    /// False for points with out-of-range coordinates; renderers skip them on the map.
    pub plottable: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeedSnapshot {
    pub current_prediction: Option<f64>,
    pub current_actual: Option<f64>,
    pub mean_absolute_error: Option<f64>,
    pub running: bool,
    pub toggle_label: &'static str,
    pub last_error: Option<FeedError>,
    pub bounds: Option<BoundingRegion>,
    pub view: ViewFit,
    pub markers: Vec<Marker>,
    pub recent: Vec<PredictionPoint>,
    pub applied_sequence: u64,
    pub error_mismatches: usize,
}

pub fn toggle_label(running: bool) -> &'static str {
    if running { "Pause Predictions" } else { "Start Predictions" }
}

impl FeedSnapshot {
    /// Derive everything the map and summary table need from one state read.
    pub fn from_state(state: &FeedState, map: &MapConfig) -> Self {
        let history = &state.latest_batch.history;
        let bounds = compute_bounds(history);
        let markers = history
            .iter()
            .zip(compute_weights(history))
            .map(|(point, weight)| Marker {
                point: point.clone(),
                weight,
                style: marker_style(weight),
                plottable: point.has_valid_coordinates(),
            })
            .collect();

        Self {
            current_prediction: state.latest_batch.current_prediction,
            current_actual: state.latest_batch.current_actual,
            mean_absolute_error: state.latest_batch.mean_absolute_error,
            running: state.running,
            toggle_label: toggle_label(state.running),
            last_error: state.last_error.clone(),
            bounds,
            view: fit_view(bounds, map),
            markers,
            recent: state.latest_batch.recent(map.recent_rows).to_vec(),
            applied_sequence: state.applied_sequence,
            error_mismatches: state.error_mismatches,
        }
    }
}
