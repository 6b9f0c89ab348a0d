//! Data models for the prediction feed.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// Sequence position of a prediction as reported by the source.
/// Opaque to the feed; only used for display and ordering.
/// Numeric steps compare by value whatever their variant and sort before text.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TimeStep {
    Integer(i64),
    Float(f64),
    Text(String),
}

impl fmt::Display for TimeStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimeStep::Integer(n) => write!(f, "{}", n),
            TimeStep::Float(x)   => write!(f, "{}", x),
            TimeStep::Text(s)    => f.write_str(s),
        }
    }
}

impl TimeStep {
    fn as_number(&self) -> Option<f64> {
        match self {
            TimeStep::Integer(n) => Some(*n as f64),
            TimeStep::Float(x)   => Some(*x),
            TimeStep::Text(_)    => None,
        }
    }
}

impl PartialEq for TimeStep {
    fn eq(&self, other: &Self) -> bool {
        self.partial_cmp(other) == Some(Ordering::Equal)
    }
}

impl PartialOrd for TimeStep {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (TimeStep::Integer(a), TimeStep::Integer(b)) => Some(a.cmp(b)),
            (TimeStep::Text(a), TimeStep::Text(b))       => Some(a.cmp(b)),
            (TimeStep::Text(_), _)                       => Some(Ordering::Greater),
            (_, TimeStep::Text(_))                       => Some(Ordering::Less),
            _ => self.as_number()?.partial_cmp(&other.as_number()?),
        }
    }
}

impl From<i64> for TimeStep {
    fn from(n: i64) -> Self { TimeStep::Integer(n) }
}

/// One historical sample in a batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionPoint {
    pub time_step: TimeStep,
    pub latitude: f64,
    pub longitude: f64,
    pub predicted: f64,
    pub actual: f64,
    /// Reported by the source as `|predicted - actual|`; never recomputed.
    pub absolute_error: f64,
}

impl PredictionPoint {
    /// Whether the point may take part in geometry (bounds, view fitting).
    /// Out-of-range points are still stored and shown in tables.
    pub fn has_valid_coordinates(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }

    pub fn recomputed_error(&self) -> f64 {
        (self.predicted - self.actual).abs()
    }

    /// Gap between the reported and the recomputed absolute error.
    pub fn error_divergence(&self) -> f64 {
        (self.absolute_error - self.recomputed_error()).abs()
    }
}

/// The result of one poll. Each batch is authoritative and complete.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PredictionBatch {
    pub current_prediction: Option<f64>,
    pub current_actual: Option<f64>,
    pub mean_absolute_error: Option<f64>,
    /// Chronological, oldest first, exactly as delivered.
    pub history: Vec<PredictionPoint>,
}

impl PredictionBatch {
    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }

    pub fn len(&self) -> usize {
        self.history.len()
    }

    pub fn latest_point(&self) -> Option<&PredictionPoint> {
        self.history.last()
    }

    /// The last `k` points, oldest first.
    pub fn recent(&self, k: usize) -> &[PredictionPoint] {
        let start = self.history.len().saturating_sub(k);
        &self.history[start..]
    }

    pub fn valid_points(&self) -> impl Iterator<Item = &PredictionPoint> {
        self.history.iter().filter(|p| p.has_valid_coordinates())
    }

    /// Indices of points whose reported absolute error is off from
    /// `|predicted - actual|` by more than `tolerance`.
    pub fn error_mismatches(&self, tolerance: f64) -> Vec<usize> {
        self.history
            .iter()
            .enumerate()
            .filter(|(_, p)| p.error_divergence() > tolerance)
            .map(|(i, _)| i)
            .collect()
    }
}
