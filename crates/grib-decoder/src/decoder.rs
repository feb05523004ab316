//! Grid queries built on top of a [`DecodeCommand`].

use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use forecast_common::{Bounds, Coordinate, PointForecast};
use tracing::{debug, instrument};

use crate::command::{DecodeCommand, GribGet};
use crate::error::DecodeResult;
use crate::point::{ParameterNames, PointForecastBuilder};
use crate::records::{self, RawSample};

const POINT_KEYS: &str = "shortName,dataDate,dataTime,forecastTime";
const BOUNDS_KEYS: &str = "latitudeOfFirstGridPointInDegrees,longitudeOfFirstGridPointInDegrees,latitudeOfLastGridPointInDegrees,longitudeOfLastGridPointInDegrees";
const TIMESTAMP_KEYS: &str = "dataDate,dataTime";

/// Decodes locations, extent and reference time out of a grid file.
///
/// Cheap to clone; clones share the underlying command.
#[derive(Clone)]
pub struct GridDecoder {
    command: Arc<dyn DecodeCommand>,
    builder: PointForecastBuilder,
}

impl GridDecoder {
    pub fn new(command: Arc<dyn DecodeCommand>, names: ParameterNames) -> Self {
        Self {
            command,
            builder: PointForecastBuilder::new(names),
        }
    }

    /// Decoder running `grib_get` (or a compatible program) as a subprocess.
    pub fn grib_get(program: impl Into<std::path::PathBuf>, names: ParameterNames) -> Self {
        Self::new(Arc::new(GribGet::new(program)), names)
    }

    pub fn builder(&self) -> &PointForecastBuilder {
        &self.builder
    }

    /// Raw samples of every message at the grid point nearest to `coordinate`.
    #[instrument(level = "debug", skip(self, grid_file), fields(lat = coordinate.latitude, lng = coordinate.longitude))]
    pub async fn decode_point(&self, grid_file: &Path, coordinate: Coordinate) -> DecodeResult<Vec<RawSample>> {
        let args = vec![
            "-p".to_string(),
            POINT_KEYS.to_string(),
            "-l".to_string(),
            format!("{},{},1", coordinate.latitude, coordinate.longitude),
            grid_file.display().to_string(),
        ];
        let output = self.command.run(&args).await?;
        records::parse_records(&output)
    }

    /// Decode and build the forecast series for one location.
    pub async fn point_forecast(&self, grid_file: &Path, coordinate: Coordinate) -> DecodeResult<PointForecast> {
        let samples = self.decode_point(grid_file, coordinate).await?;
        self.builder.build(samples, coordinate)
    }

    /// Like [`point_forecast`](Self::point_forecast) without items before `start_time`.
    pub async fn point_forecast_from(
        &self,
        grid_file: &Path,
        coordinate: Coordinate,
        start_time: DateTime<Utc>,
    ) -> DecodeResult<PointForecast> {
        let forecast = self.point_forecast(grid_file, coordinate).await?;
        Ok(forecast.items_from(start_time))
    }

    /// Geographic extent of the grid, corners sorted.
    pub async fn decode_bounds(&self, grid_file: &Path) -> DecodeResult<Bounds> {
        let args = vec![
            "-p".to_string(),
            BOUNDS_KEYS.to_string(),
            grid_file.display().to_string(),
        ];
        let output = self.command.run(&args).await?;
        records::parse_bounds(&output)
    }

    /// Reference time of the grid.
    ///
    /// A missing or unreadable file and any decode failure all yield `None`,
    /// which callers treat as "needs refresh".
    pub async fn decode_timestamp(&self, grid_file: &Path) -> Option<DateTime<Utc>> {
        if let Err(e) = tokio::fs::metadata(grid_file).await {
            debug!(path = %grid_file.display(), error = %e, "Grid file not readable, no timestamp");
            return None;
        }

        let args = vec![
            "-p".to_string(),
            TIMESTAMP_KEYS.to_string(),
            grid_file.display().to_string(),
        ];

        match self.command.run(&args).await {
            Ok(output) => match records::parse_timestamp(&output) {
                Ok(timestamp) => Some(timestamp),
                Err(e) => {
                    debug!(path = %grid_file.display(), error = %e, "Unparseable grid timestamp");
                    None
                }
            },
            Err(e) => {
                debug!(path = %grid_file.display(), error = %e, "Failed to decode grid timestamp");
                None
            }
        }
    }
}

impl std::fmt::Debug for GridDecoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GridDecoder")
            .field("names", self.builder.names())
            .finish_non_exhaustive()
    }
}
