//! Full-area snapshot construction.

use std::path::Path;
use std::time::Instant;

use forecast_common::AreaForecast;
use futures::stream::{self, StreamExt, TryStreamExt};
use grib_decoder::GridDecoder;
use metrics::{counter, histogram};
use tracing::{debug, info, instrument, warn};

use crate::error::{SnapshotError, SnapshotResult};
use crate::sampling::sampling_coordinates;

/// Sampling and fan-out settings for a snapshot build.
#[derive(Debug, Clone)]
pub struct SnapshotConfig {
    /// Latitude step between sampled locations, degrees
    pub lat_increment: f64,
    /// Longitude step between sampled locations, degrees
    pub lng_increment: f64,
    /// Maximum concurrent decode processes, 0 = logical core count
    pub max_concurrent: usize,
}

impl Default for SnapshotConfig {
    fn default() -> Self {
        Self {
            lat_increment: 0.2,
            lng_increment: 0.5,
            max_concurrent: 0,
        }
    }
}

impl SnapshotConfig {
    /// Worker limit actually applied to the decode fan-out.
    pub fn effective_concurrency(&self) -> usize {
        if self.max_concurrent > 0 {
            return self.max_concurrent;
        }
        std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(4)
    }
}

/// Decodes every sampling location of a grid file into an [`AreaForecast`].
#[derive(Debug, Clone)]
pub struct SnapshotBuilder {
    decoder: GridDecoder,
    config: SnapshotConfig,
}

impl SnapshotBuilder {
    pub fn new(decoder: GridDecoder, config: SnapshotConfig) -> Self {
        Self { decoder, config }
    }

    pub fn decoder(&self) -> &GridDecoder {
        &self.decoder
    }

    pub fn config(&self) -> &SnapshotConfig {
        &self.config
    }

    /// Build a complete snapshot of `grid_file`.
    ///
    /// Any failed location fails the whole build; the remaining in-flight
    /// decodes are dropped.
    #[instrument(skip(self, grid_file), fields(grid = %grid_file.display()))]
    pub async fn build_snapshot(&self, grid_file: &Path) -> SnapshotResult<AreaForecast> {
        let start = Instant::now();
        let result = self.build(grid_file).await;
        let elapsed = start.elapsed();

        match &result {
            Ok(snapshot) => {
                counter!("snapshot_builds_total", "outcome" => "success").increment(1);
                histogram!("snapshot_build_duration_seconds").record(elapsed.as_secs_f64());
                info!(
                    points = snapshot.len(),
                    publish_time = %snapshot.publish_time,
                    elapsed_ms = elapsed.as_millis() as u64,
                    "Snapshot built"
                );
            }
            Err(e) => {
                counter!("snapshot_builds_total", "outcome" => "failure").increment(1);
                warn!(error = %e, elapsed_ms = elapsed.as_millis() as u64, "Snapshot build failed");
            }
        }

        result
    }

    async fn build(&self, grid_file: &Path) -> SnapshotResult<AreaForecast> {
        let bounds = self.decoder.decode_bounds(grid_file).await?;
        let publish_time = self
            .decoder
            .decode_timestamp(grid_file)
            .await
            .ok_or_else(|| SnapshotError::MissingTimestamp(grid_file.display().to_string()))?;

        let coordinates =
            sampling_coordinates(&bounds, self.config.lat_increment, self.config.lng_increment);
        let workers = self.config.effective_concurrency();

        info!(
            points = coordinates.len(),
            workers = workers,
            publish_time = %publish_time,
            "Decoding sampling grid"
        );

        let point_forecasts = stream::iter(coordinates)
            .map(|coordinate| self.decoder.point_forecast(grid_file, coordinate))
            .buffer_unordered(workers)
            .try_collect::<Vec<_>>()
            .await?;

        debug!(points = point_forecasts.len(), "All sampling locations decoded");

        Ok(AreaForecast::new(publish_time, point_forecasts))
    }
}
