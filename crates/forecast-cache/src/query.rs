//! Bounded-area, time-windowed views of a snapshot.

use chrono::{DateTime, Utc};
use forecast_common::{point_in_polygon, AreaForecast, Bounds, PointForecast};

/// Points of `snapshot` inside (or on the edge of) `bounds`, each without
/// items before `start_time`.
///
/// Points outside the bounds are removed rather than emptied. A missing
/// `start_time` keeps every item.
pub fn bounded_view(
    snapshot: &AreaForecast,
    bounds: &Bounds,
    start_time: Option<DateTime<Utc>>,
) -> AreaForecast {
    let polygon = bounds.corners();

    let point_forecasts = snapshot
        .point_forecasts
        .iter()
        .filter(|pf| point_in_polygon(&pf.coordinate, &polygon))
        .map(|pf| trim_items(pf, start_time))
        .collect();

    AreaForecast::new(snapshot.publish_time, point_forecasts)
}

fn trim_items(forecast: &PointForecast, start_time: Option<DateTime<Utc>>) -> PointForecast {
    match start_time {
        Some(start) => forecast.items_from(start),
        None => forecast.clone(),
    }
}
