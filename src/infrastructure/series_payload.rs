// Decoder for the broker's series payload
//
// Expected shape: { "series": [ { "name": "...", "points": [[ts, value], ...] } ] }
use crate::domain::series::{Sample, Series, SeriesSet};
use serde_json::Value;

/// Tolerant decode: anything that does not fit the shape is dropped rather
/// than reported. A payload with no `series` array decodes to an empty set.
pub fn decode_series_set(payload: &Value) -> SeriesSet {
    let Some(entries) = payload.get("series").and_then(Value::as_array) else {
        tracing::debug!("Series payload has no series array");
        return SeriesSet::new();
    };

    entries.iter().filter_map(decode_series).collect()
}

fn decode_series(entry: &Value) -> Option<Series> {
    let Some(name) = entry.get("name").and_then(Value::as_str) else {
        tracing::debug!("Skipping series entry without a name");
        return None;
    };

    let points = entry
        .get("points")
        .and_then(Value::as_array)
        .map(|points| points.iter().filter_map(decode_point).collect())
        .unwrap_or_default();

    Some(Series::new(name, points))
}

fn decode_point(point: &Value) -> Option<Sample> {
    match point.as_array()?.as_slice() {
        [timestamp, value, ..] => Some(Sample::new(decode_timestamp(timestamp)?, decode_value(value)?)),
        _ => None,
    }
}

/// Integer seconds. Floats are accepted only when they carry no fraction.
fn decode_timestamp(value: &Value) -> Option<i64> {
    value.as_i64().or_else(|| {
        value
            .as_f64()
            .filter(|f| f.is_finite() && f.fract() == 0.0)
            .map(|f| f as i64)
    })
}

/// JSON numbers, or numeric strings as Prometheus-style backends send them.
fn decode_value(value: &Value) -> Option<f64> {
    let number = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    number.filter(|f| f.is_finite())
}
