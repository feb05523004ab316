//! Prometheus recorder setup and metric descriptions.

use anyhow::{Context, Result};
use metrics::{describe_counter, describe_gauge, describe_histogram, Unit};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use tracing::info;

/// Install the global Prometheus recorder and describe the service metrics.
pub fn install_recorder() -> Result<PrometheusHandle> {
    let handle = PrometheusBuilder::new()
        .install_recorder()
        .context("Failed to install Prometheus recorder")?;
    describe_metrics();
    info!("Prometheus metrics exporter initialized");
    Ok(handle)
}

fn describe_metrics() {
    describe_counter!("grib_checks_total", "Staleness checks against the upstream grid");
    describe_counter!("grib_downloads_total", "Grid download attempts");
    describe_counter!("grib_empty_payloads_total", "Grid downloads that returned an empty body");
    describe_counter!("snapshot_builds_total", "Forecast snapshot builds by outcome");
    describe_counter!("refresh_failures_total", "Refresh ticks that ended in an error");
    describe_counter!("forecast_requests_total", "Forecast requests by query kind");
    describe_histogram!(
        "snapshot_build_duration_seconds",
        Unit::Seconds,
        "Time to decode a full forecast snapshot"
    );
    describe_gauge!("forecast_cache_points", "Locations in the installed forecast snapshot");
}
