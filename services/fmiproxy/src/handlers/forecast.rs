//! GET /hirlam-forecast

use std::sync::Arc;

use axum::extract::{Extension, Query};
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{DateTime, Utc};
use forecast_common::{parse_query_time, Bounds, Coordinate, ForecastError};
use metrics::counter;
use serde::Deserialize;
use tracing::debug;

use crate::error::ApiError;
use crate::state::AppState;

/// Query parameters. Empty values count as absent.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForecastQuery {
    /// `swLat,swLng,neLat,neLng`
    pub bounds: Option<String>,
    pub lat: Option<String>,
    pub lon: Option<String>,
    pub start_time: Option<String>,
}

impl ForecastQuery {
    fn bounds(&self) -> Option<&str> {
        present(&self.bounds)
    }

    fn lat(&self) -> Option<&str> {
        present(&self.lat)
    }

    fn lon(&self) -> Option<&str> {
        present(&self.lon)
    }

    fn start_time(&self) -> Result<Option<DateTime<Utc>>, ApiError> {
        present(&self.start_time)
            .map(|s| parse_query_time(s).map_err(ForecastError::from))
            .transpose()
            .map_err(ApiError::from)
    }
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

/// Whole-area, bounded-area or single-point forecast depending on the
/// parameters given.
pub async fn hirlam_forecast_handler(
    Extension(state): Extension<Arc<AppState>>,
    Query(query): Query<ForecastQuery>,
) -> Result<Response, ApiError> {
    if query.bounds().is_some() && (query.lat().is_some() || query.lon().is_some()) {
        return Err(ApiError::BadRequest(
            "Use either bounds or lat & lon, not both!".to_string(),
        ));
    }

    let start_time = query.start_time()?;

    if let Some(bounds) = query.bounds() {
        counter!("forecast_requests_total", "kind" => "bounds").increment(1);
        let bounds = Bounds::from_query(bounds)?;
        let forecast = state.cache.bounded_area_forecast(&bounds, start_time).await?;
        debug!(points = forecast.len(), "Bounded forecast");
        return Ok(Json(forecast).into_response());
    }

    match (query.lat(), query.lon()) {
        (Some(lat), Some(lon)) => {
            counter!("forecast_requests_total", "kind" => "point").increment(1);
            let coordinate = Coordinate::parse(lat, lon)?;
            if !tokio::fs::try_exists(state.grid_file()).await.unwrap_or(false) {
                return Err(ApiError::NotReady);
            }

            let forecast = match start_time {
                Some(start) => {
                    state
                        .decoder
                        .point_forecast_from(state.grid_file(), coordinate, start)
                        .await?
                }
                None => state.decoder.point_forecast(state.grid_file(), coordinate).await?,
            };
            Ok(Json(forecast).into_response())
        }
        (None, None) => {
            counter!("forecast_requests_total", "kind" => "area").increment(1);
            let forecast = state.cache.area_forecast().await?;
            Ok(Json(&*forecast).into_response())
        }
        _ => Err(ApiError::BadRequest(
            "Both lat and lon must be given".to_string(),
        )),
    }
}
