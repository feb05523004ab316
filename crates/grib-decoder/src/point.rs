//! Point forecast construction from raw decoded samples.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use forecast_common::{Coordinate, ForecastItem, PointForecast};
use serde::{Deserialize, Serialize};

use crate::error::{DecodeError, DecodeResult};
use crate::records::RawSample;

/// GRIB short names of the parameters a forecast item is built from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParameterNames {
    /// Northward wind component
    pub wind_v: String,
    /// Eastward wind component
    pub wind_u: String,
    /// Mean sea level pressure in Pa
    pub pressure: String,
    /// Precipitation rate
    pub precipitation: String,
}

impl Default for ParameterNames {
    fn default() -> Self {
        Self {
            wind_v: "10v".to_string(),
            wind_u: "10u".to_string(),
            pressure: "msl".to_string(),
            precipitation: "prate".to_string(),
        }
    }
}

/// Groups raw samples by time and derives one [`ForecastItem`] per hour.
#[derive(Debug, Clone, Default)]
pub struct PointForecastBuilder {
    names: ParameterNames,
}

impl PointForecastBuilder {
    pub fn new(names: ParameterNames) -> Self {
        Self { names }
    }

    pub fn names(&self) -> &ParameterNames {
        &self.names
    }

    /// Build an ascending forecast series for `coordinate`.
    ///
    /// Fails with [`DecodeError::MalformedForecastData`] when there are no
    /// samples or when any hour lacks a wind component or pressure.
    pub fn build(&self, samples: Vec<RawSample>, coordinate: Coordinate) -> DecodeResult<PointForecast> {
        let mut by_time: BTreeMap<DateTime<Utc>, HashMap<String, f64>> = BTreeMap::new();
        for sample in samples {
            by_time
                .entry(sample.time)
                .or_default()
                .insert(sample.name, sample.value);
        }

        let items = by_time
            .into_iter()
            .map(|(time, values)| self.build_item(time, &values))
            .collect::<DecodeResult<Vec<_>>>()?;

        PointForecast::from_items(coordinate, items).ok_or_else(|| {
            DecodeError::MalformedForecastData(format!(
                "no samples decoded for ({}, {})",
                coordinate.latitude, coordinate.longitude
            ))
        })
    }

    fn build_item(&self, time: DateTime<Utc>, values: &HashMap<String, f64>) -> DecodeResult<ForecastItem> {
        let field = |name: &str| {
            values.get(name).copied().ok_or_else(|| {
                DecodeError::MalformedForecastData(format!("missing '{}' at {}", name, time))
            })
        };

        let v = field(&self.names.wind_v)?;
        let u = field(&self.names.wind_u)?;
        let msl = field(&self.names.pressure)?;

        Ok(ForecastItem {
            prate: values.get(&self.names.precipitation).copied(),
            wind_speed_ms: wind_speed(v, u),
            wind_dir: wind_direction(v, u),
            pressure_mbar: pressure_mbar(msl),
            time,
        })
    }
}

/// Magnitude of the (v, u) wind vector, one decimal.
pub fn wind_speed(v: f64, u: f64) -> f64 {
    round_to_1_decimal(v.hypot(u))
}

/// Meteorological wind direction in whole degrees.
///
/// The component vector is taken as (x = v, y = u); its angle is rotated by
/// 180 degrees so the result is the direction the wind blows from.
pub fn wind_direction(v: f64, u: f64) -> u16 {
    let angle = u.atan2(v).to_degrees();
    ((angle + 180.0).round() as i64).rem_euclid(360) as u16
}

/// Pascals to millibars, one decimal.
pub fn pressure_mbar(msl_pa: f64) -> f64 {
    round_to_1_decimal(msl_pa / 100.0)
}

fn round_to_1_decimal(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
