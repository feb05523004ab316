//! Sampling grid enumeration.

use forecast_common::{Bounds, Coordinate};

/// Slack added to the step count so a span that is an exact multiple of the
/// increment keeps its final value despite float error (e.g. 59.2 to 60.6 by 0.2).
const STEP_EPSILON: f64 = 1e-9;

/// Inclusive range from `start` towards `stop` at `step` increments.
///
/// The last value never exceeds `stop`. Returns no values when `stop < start`
/// or `step` is not positive. Each value is rounded to one decimal.
pub fn step_range(start: f64, stop: f64, step: f64) -> Vec<f64> {
    if step.is_nan() || step <= 0.0 || stop < start || !start.is_finite() || !stop.is_finite() {
        return Vec::new();
    }

    let count = ((stop - start) / step + STEP_EPSILON).floor() as usize + 1;
    (0..count)
        .map(|i| round_to_1_decimal(start + i as f64 * step))
        .collect()
}

pub fn round_to_1_decimal(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Every sampling location inside `bounds`, latitude-major.
pub fn sampling_coordinates(bounds: &Bounds, lat_increment: f64, lng_increment: f64) -> Vec<Coordinate> {
    let sw = bounds.sw_corner();
    let ne = bounds.ne_corner();
    let lats = step_range(sw.latitude, ne.latitude, lat_increment);
    let lngs = step_range(sw.longitude, ne.longitude, lng_increment);

    lats.iter()
        .flat_map(|&lat| lngs.iter().map(move |&lng| Coordinate::new(lat, lng)))
        .collect()
}
