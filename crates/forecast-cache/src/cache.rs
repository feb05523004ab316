//! The installed forecast snapshot and its read queries.

use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use forecast_common::{AreaForecast, Bounds};
use metrics::gauge;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::error::{CacheError, CacheResult, SnapshotResult};
use crate::query::bounded_view;
use crate::snapshot::SnapshotBuilder;

/// Holds the current immutable [`AreaForecast`].
///
/// Installing replaces the whole snapshot by swapping an `Arc`; readers clone
/// the `Arc` under a short read lock and filter outside it, so they always
/// see one complete snapshot and never wait on a build.
#[derive(Debug, Default)]
pub struct ForecastCache {
    snapshot: RwLock<Option<Arc<AreaForecast>>>,
}

impl ForecastCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the current snapshot, returning the superseded one.
    pub async fn install(&self, snapshot: AreaForecast) -> Option<Arc<AreaForecast>> {
        let points = snapshot.len();
        let publish_time = snapshot.publish_time;
        let next = Arc::new(snapshot);

        let previous = {
            let mut guard = self.snapshot.write().await;
            guard.replace(next)
        };

        gauge!("forecast_cache_points").set(points as f64);
        info!(points = points, publish_time = %publish_time, "Forecast snapshot installed");
        previous
    }

    /// The whole current snapshot.
    pub async fn area_forecast(&self) -> CacheResult<Arc<AreaForecast>> {
        self.snapshot.read().await.clone().ok_or(CacheError::NotReady)
    }

    /// Points inside `bounds`, without items before `start_time`.
    pub async fn bounded_area_forecast(
        &self,
        bounds: &Bounds,
        start_time: Option<DateTime<Utc>>,
    ) -> CacheResult<AreaForecast> {
        let snapshot = self.area_forecast().await?;
        let view = bounded_view(&snapshot, bounds, start_time);
        debug!(
            total = snapshot.len(),
            matched = view.len(),
            "Bounded forecast query"
        );
        Ok(view)
    }

    pub async fn is_populated(&self) -> bool {
        self.snapshot.read().await.is_some()
    }

    pub async fn publish_time(&self) -> Option<DateTime<Utc>> {
        self.snapshot.read().await.as_ref().map(|s| s.publish_time)
    }

    /// Build a snapshot of `grid_file` and install it.
    ///
    /// On failure the current snapshot stays in place. Returns the number of
    /// installed points.
    pub async fn refresh_from(&self, builder: &SnapshotBuilder, grid_file: &Path) -> SnapshotResult<usize> {
        let snapshot = builder.build_snapshot(grid_file).await?;
        let points = snapshot.len();
        self.install(snapshot).await;
        Ok(points)
    }
}
