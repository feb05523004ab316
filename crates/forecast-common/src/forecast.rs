//! Forecast series types served by the proxy.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::geo::Coordinate;

/// A single hourly forecast sample at one location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForecastItem {
    /// Precipitation rate as decoded, unrounded
    pub prate: Option<f64>,
    /// Wind speed in m/s, one decimal
    pub wind_speed_ms: f64,
    /// Direction the wind blows from, degrees 0-359
    pub wind_dir: u16,
    /// Mean sea level pressure in millibars, one decimal
    pub pressure_mbar: f64,
    pub time: DateTime<Utc>,
}

/// An ordered forecast series for one location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PointForecast {
    pub publish_time: DateTime<Utc>,
    #[serde(flatten)]
    pub coordinate: Coordinate,
    pub forecast_items: Vec<ForecastItem>,
}

impl PointForecast {
    /// Build a series from unordered items.
    ///
    /// Items are sorted ascending by time and the publish time is the earliest
    /// item's time. Returns `None` when there are no items.
    pub fn from_items(coordinate: Coordinate, mut items: Vec<ForecastItem>) -> Option<Self> {
        items.sort_by_key(|item| item.time);
        let publish_time = items.first()?.time;
        Some(Self {
            publish_time,
            coordinate,
            forecast_items: items,
        })
    }

    /// Copy of this forecast without items strictly before `start`.
    pub fn items_from(&self, start: DateTime<Utc>) -> PointForecast {
        PointForecast {
            publish_time: self.publish_time,
            coordinate: self.coordinate,
            forecast_items: self
                .forecast_items
                .iter()
                .filter(|item| item.time >= start)
                .cloned()
                .collect(),
        }
    }
}

/// A full-area snapshot: one forecast series per sampled grid location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AreaForecast {
    pub publish_time: DateTime<Utc>,
    pub point_forecasts: Vec<PointForecast>,
}

impl AreaForecast {
    pub fn new(publish_time: DateTime<Utc>, point_forecasts: Vec<PointForecast>) -> Self {
        Self {
            publish_time,
            point_forecasts,
        }
    }

    pub fn len(&self) -> usize {
        self.point_forecasts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.point_forecasts.is_empty()
    }
}
