//! Map geometry derived from a batch history.
//!
//! Everything here is a pure function of the history passed in. Nothing is
//! cached between batches, so geometry always matches the batch on screen.

use quakefeed_config::MapConfig;
use serde::{Deserialize, Serialize};

use crate::models::PredictionPoint;

/// Weight of the oldest point.
pub const MIN_WEIGHT: f64 = 0.3;
/// Weight of the most recent point.
pub const MAX_WEIGHT: f64 = 1.0;

/// Minimal lat/lon rectangle containing every point with valid coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingRegion {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lon: f64,
    pub max_lon: f64,
}

impl BoundingRegion {
    fn around(lat: f64, lon: f64) -> Self {
        Self { min_lat: lat, max_lat: lat, min_lon: lon, max_lon: lon }
    }

    fn extend(&mut self, lat: f64, lon: f64) {
        self.min_lat = self.min_lat.min(lat);
        self.max_lat = self.max_lat.max(lat);
        self.min_lon = self.min_lon.min(lon);
        self.max_lon = self.max_lon.max(lon);
    }

    pub fn center(&self) -> [f64; 2] {
        [(self.min_lat + self.max_lat) / 2.0, (self.min_lon + self.max_lon) / 2.0]
    }

    pub fn contains(&self, lat: f64, lon: f64) -> bool {
        (self.min_lat..=self.max_lat).contains(&lat) && (self.min_lon..=self.max_lon).contains(&lon)
    }

    /// Degenerate when all points share one location.
    pub fn is_point(&self) -> bool {
        self.min_lat == self.max_lat && self.min_lon == self.max_lon
    }
}

/// Bounds over the valid points of `history`. `None` for empty or all-invalid input;
/// callers must not fit a view to it.
pub fn compute_bounds(history: &[PredictionPoint]) -> Option<BoundingRegion> {
    history
        .iter()
        .filter(|p| p.has_valid_coordinates())
        .fold(None, |acc: Option<BoundingRegion>, p| match acc {
            None => Some(BoundingRegion::around(p.latitude, p.longitude)),
            Some(mut region) => {
                region.extend(p.latitude, p.longitude);
                Some(region)
            }
        })
}

/// Recency weights, oldest = `MIN_WEIGHT`, newest = `MAX_WEIGHT`, linear in between.
/// A single point gets `MIN_WEIGHT`.
pub fn compute_weights(history: &[PredictionPoint]) -> Vec<f64> {
    let n = history.len();
    let denom = n.saturating_sub(1).max(1) as f64;
    (0..n)
        .map(|i| {
            let ratio = if n > 1 { i as f64 / denom } else { 0.0 };
            MIN_WEIGHT + (MAX_WEIGHT - MIN_WEIGHT) * ratio
        })
        .collect()
}

/// Marker paint derived from a weight.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarkerStyle {
    pub fill: String,
    pub stroke: String,
    pub opacity: f64,
}

pub fn marker_style(weight: f64) -> MarkerStyle {
    let opacity = weight.clamp(MIN_WEIGHT, MAX_WEIGHT);
    MarkerStyle {
        fill: format!("rgba(255, 0, 0, {:.3})", opacity),
        stroke: "#fff".to_string(),
        opacity,
    }
}

/// How the map should frame the current batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum ViewFit {
    /// Fit to the region with padding, never zooming past `max_zoom`.
    Bounds { region: BoundingRegion, padding_px: u32, max_zoom: u8 },
    /// Nothing to fit; keep the configured default view.
    Default { center: [f64; 2], zoom: u8 },
}

pub fn fit_view(bounds: Option<BoundingRegion>, map: &MapConfig) -> ViewFit {
    match bounds {
        Some(region) => ViewFit::Bounds {
            region,
            padding_px: map.fit_padding_px,
            max_zoom: map.fit_max_zoom,
        },
        None => ViewFit::Default {
            center: map.default_center,
            zoom: map.default_zoom,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TimeStep;

    fn at(lat: f64, lon: f64) -> PredictionPoint {
        PredictionPoint {
            time_step: TimeStep::Integer(0),
            latitude: lat,
            longitude: lon,
            predicted: 4.0,
            actual: 4.0,
            absolute_error: 0.0,
        }
    }

    fn history(n: usize) -> Vec<PredictionPoint> {
        (0..n).map(|i| at(30.0 + i as f64 * 0.1, 77.0)).collect()
    }

    #[test]
    fn test_bounds_three_points() {
        let region = compute_bounds(&[at(30.0, 70.0), at(31.0, 71.0), at(29.0, 69.0)]).unwrap();
        assert_eq!(region, BoundingRegion { min_lat: 29.0, max_lat: 31.0, min_lon: 69.0, max_lon: 71.0 });
        assert_eq!(region.center(), [30.0, 70.0]);
    }

    #[test]
    fn test_bounds_skip_invalid_points() {
        let region = compute_bounds(&[at(30.0, 70.0), at(95.0, 200.0), at(31.0, 71.0)]).unwrap();
        assert_eq!(region.max_lat, 31.0);
        assert_eq!(region.max_lon, 71.0);
        assert!(!region.contains(95.0, 200.0));
    }

    #[test]
    fn test_bounds_undefined_for_empty_or_invalid() {
        assert!(compute_bounds(&[]).is_none());
        assert!(compute_bounds(&[at(95.0, 0.0), at(0.0, -190.0)]).is_none());
    }

    #[test]
    fn test_bounds_single_point_is_degenerate() {
        let region = compute_bounds(&[at(30.0, 70.0)]).unwrap();
        assert!(region.is_point());
    }

    #[test]
    fn test_weights_empty_and_single() {
        assert!(compute_weights(&[]).is_empty());
        assert_eq!(compute_weights(&history(1)), vec![0.3]);
    }

    #[test]
    fn test_weights_gradient() {
        for n in 2..=12 {
            let w = compute_weights(&history(n));
            assert_eq!(w.len(), n);
            assert!((w[0] - 0.3).abs() < 1e-12);
            assert!((w[n - 1] - 1.0).abs() < 1e-12);
            assert!(w.windows(2).all(|pair| pair[0] <= pair[1]), "not monotone for n={}", n);
        }
        let w = compute_weights(&history(3));
        assert!((w[1] - 0.65).abs() < 1e-12);
    }

    #[test]
    fn test_weights_count_invalid_points() {
        let w = compute_weights(&[at(95.0, 0.0), at(30.0, 77.0)]);
        assert_eq!(w.len(), 2);
        assert!((w[0] - 0.3).abs() < 1e-12 && (w[1] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_marker_style() {
        let style = marker_style(1.0);
        assert_eq!(style.fill, "rgba(255, 0, 0, 1.000)");
        assert_eq!(style.stroke, "#fff");
        assert_eq!(marker_style(0.0).opacity, MIN_WEIGHT);
    }

    #[test]
    fn test_fit_view_falls_back_to_default() {
        let map = MapConfig::default();
        assert_eq!(fit_view(None, &map), ViewFit::Default { center: [31.5, 77.0], zoom: 7 });
        let region = compute_bounds(&history(2));
        match fit_view(region, &map) {
            ViewFit::Bounds { padding_px, max_zoom, .. } => {
                assert_eq!(padding_px, 50);
                assert_eq!(max_zoom, 10);
            }
            other => panic!("expected bounds fit, got {:?}", other),
        }
    }
}
