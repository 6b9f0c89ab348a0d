//! `/predict_data` JSON fixtures.

use serde_json::{json, Value};

/// One history entry; `absolute_error` is computed from `predicted` and `actual`.
pub fn point_json(time_step: i64, latitude: f64, longitude: f64, predicted: f64, actual: f64) -> Value {
    json!({
        "time_step": time_step,
        "latitude": latitude,
        "longitude": longitude,
        "predicted": predicted,
        "actual": actual,
        "absolute_error": (predicted - actual).abs(),
    })
}

/// A full response body for the given coordinates, oldest first.
/// Magnitudes are fixed at predicted 4.5 / actual 4.25, so the MAE is 0.25.
pub fn batch_json(coords: &[(f64, f64)]) -> Value {
    let history: Vec<Value> = coords
        .iter()
        .enumerate()
        .map(|(i, &(lat, lon))| point_json(i as i64 + 1, lat, lon, 4.5, 4.25))
        .collect();
    let last = coords.last().copied();
    json!({
        "prediction": if history.is_empty() { Value::Null } else { json!(4.5) },
        "actual": if history.is_empty() { Value::Null } else { json!(4.25) },
        "latitude": last.map(|c| c.0),
        "longitude": last.map(|c| c.1),
        "mae": if history.is_empty() { Value::Null } else { json!(0.25) },
        "predictions_data": history,
    })
}
