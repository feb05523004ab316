//! Shared application state for request handlers.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use forecast_cache::ForecastCache;
use grib_decoder::GridDecoder;
use metrics_exporter_prometheus::PrometheusHandle;

use crate::scheduler::RefreshStatus;

pub struct AppState {
    pub cache: Arc<ForecastCache>,
    /// Decoder for single-point queries against the live grid file
    pub decoder: GridDecoder,
    grid_file: PathBuf,
    pub refresh_status: Arc<RefreshStatus>,
    prometheus: Option<PrometheusHandle>,
}

impl AppState {
    pub fn new(
        cache: Arc<ForecastCache>,
        decoder: GridDecoder,
        grid_file: impl Into<PathBuf>,
        refresh_status: Arc<RefreshStatus>,
    ) -> Self {
        Self {
            cache,
            decoder,
            grid_file: grid_file.into(),
            refresh_status,
            prometheus: None,
        }
    }

    pub fn with_prometheus(mut self, handle: PrometheusHandle) -> Self {
        self.prometheus = Some(handle);
        self
    }

    pub fn grid_file(&self) -> &Path {
        &self.grid_file
    }

    /// Prometheus text exposition, empty when no recorder is installed.
    pub fn render_metrics(&self) -> String {
        self.prometheus
            .as_ref()
            .map(PrometheusHandle::render)
            .unwrap_or_default()
    }
}
