//! Background refresh loop keeping the forecast snapshot in step with upstream.

use std::sync::Arc;

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use forecast_cache::{ForecastCache, SnapshotBuilder};
use metrics::counter;
use serde::Serialize;
use tokio::sync::{broadcast, RwLock};
use tokio::task::JoinHandle;
use tracing::{error, info, instrument, warn};

use crate::config::ScheduleConfig;
use crate::download::GridInstaller;
use crate::upstream::GridSource;

/// Phase of the refresh loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RefreshState {
    #[default]
    Idle,
    CheckingStaleness,
    UpToDate,
    Downloading,
    Rebuilding,
}

/// What a successful tick did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TickOutcome {
    /// Local grid current and snapshot installed, nothing to do
    UpToDate,
    /// A new grid was downloaded and the snapshot rebuilt
    Refreshed,
    /// The local grid was current but had no snapshot yet
    Rebuilt,
}

/// Point-in-time view of the refresh loop, served at `/status`.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RefreshSnapshot {
    pub state: RefreshState,
    pub ticks: u64,
    pub last_check: Option<DateTime<Utc>>,
    pub last_outcome: Option<TickOutcome>,
    /// Last time a snapshot was installed by the loop
    pub last_refresh: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
    pub local_grid_time: Option<DateTime<Utc>>,
    pub published_grid_time: Option<DateTime<Utc>>,
}

/// Shared, observable refresh loop status.
#[derive(Debug, Default)]
pub struct RefreshStatus {
    inner: RwLock<RefreshSnapshot>,
}

impl RefreshStatus {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn snapshot(&self) -> RefreshSnapshot {
        self.inner.read().await.clone()
    }

    pub async fn state(&self) -> RefreshState {
        self.inner.read().await.state
    }

    async fn set_state(&self, state: RefreshState) {
        self.inner.write().await.state = state;
    }

    async fn begin_tick(&self) {
        let mut inner = self.inner.write().await;
        inner.ticks += 1;
        inner.last_check = Some(Utc::now());
        inner.state = RefreshState::CheckingStaleness;
    }

    async fn record_timestamps(&self, local: Option<DateTime<Utc>>, published: DateTime<Utc>) {
        let mut inner = self.inner.write().await;
        inner.local_grid_time = local;
        inner.published_grid_time = Some(published);
    }

    async fn finish_tick(&self, result: &Result<TickOutcome>) {
        let mut inner = self.inner.write().await;
        inner.state = RefreshState::Idle;
        match result {
            Ok(outcome) => {
                inner.last_outcome = Some(*outcome);
                inner.last_error = None;
                if *outcome != TickOutcome::UpToDate {
                    inner.last_refresh = Some(Utc::now());
                }
            }
            Err(e) => inner.last_error = Some(format!("{:#}", e)),
        }
    }
}

/// A local grid is current when its timestamp is known and not older than
/// the published one.
pub fn is_up_to_date(local: Option<DateTime<Utc>>, published: DateTime<Utc>) -> bool {
    matches!(local, Some(local) if local >= published)
}

/// Periodically compares the local grid with upstream, downloads newer grids
/// and rebuilds the forecast snapshot.
pub struct RefreshScheduler {
    source: Arc<dyn GridSource>,
    installer: GridInstaller,
    builder: SnapshotBuilder,
    cache: Arc<ForecastCache>,
    status: Arc<RefreshStatus>,
    schedule: ScheduleConfig,
}

impl RefreshScheduler {
    pub fn new(
        source: Arc<dyn GridSource>,
        installer: GridInstaller,
        builder: SnapshotBuilder,
        cache: Arc<ForecastCache>,
        status: Arc<RefreshStatus>,
        schedule: ScheduleConfig,
    ) -> Self {
        Self {
            source,
            installer,
            builder,
            cache,
            status,
            schedule,
        }
    }

    pub fn status(&self) -> Arc<RefreshStatus> {
        self.status.clone()
    }

    /// First tick at startup.
    ///
    /// When upstream cannot be reached but a grid is already on disk, the
    /// snapshot is built from that grid so the service can still answer.
    pub async fn init(&self) -> Result<TickOutcome> {
        info!(grid = %self.installer.grid_file().display(), "Initializing grid refresh");

        match self.tick().await {
            Ok(outcome) => Ok(outcome),
            Err(e) => {
                let grid_file = self.installer.grid_file();
                let grid_exists = tokio::fs::try_exists(grid_file).await.unwrap_or(false);
                if !self.cache.is_populated().await && grid_exists {
                    let cause = format!("{:#}", e);
                    warn!(error = %cause, "Initial refresh failed, building from existing grid");
                    self.rebuild().await?;
                    return Ok(TickOutcome::Rebuilt);
                }
                Err(e)
            }
        }
    }

    /// One staleness check, downloading and rebuilding as needed.
    #[instrument(skip(self))]
    pub async fn tick(&self) -> Result<TickOutcome> {
        counter!("grib_checks_total").increment(1);
        self.status.begin_tick().await;

        let result = self.check_and_refresh().await;

        if let Err(e) = &result {
            counter!("refresh_failures_total").increment(1);
            let cause = format!("{:#}", e);
            error!(error = %cause, "Grid refresh failed");
        }
        self.status.finish_tick(&result).await;
        result
    }

    async fn check_and_refresh(&self) -> Result<TickOutcome> {
        info!("Checking for new grid");
        let grid_file = self.installer.grid_file();

        let (local, published) = tokio::join!(
            self.builder.decoder().decode_timestamp(grid_file),
            self.source.latest_published()
        );
        let published = published.context("Failed to fetch latest published grid time")?;
        self.status.record_timestamps(local, published).await;

        info!(
            local = ?local,
            published = %published,
            "Downloaded grid timestamp vs latest published"
        );

        if is_up_to_date(local, published) {
            info!("Downloaded grid is already up to date");
            if self.cache.is_populated().await {
                self.status.set_state(RefreshState::UpToDate).await;
                return Ok(TickOutcome::UpToDate);
            }
            self.rebuild().await?;
            return Ok(TickOutcome::Rebuilt);
        }

        self.download().await?;
        self.rebuild().await?;
        Ok(TickOutcome::Refreshed)
    }

    /// Download and install the newest grid, retrying empty payloads.
    #[instrument(skip(self))]
    async fn download(&self) -> Result<u64> {
        self.status.set_state(RefreshState::Downloading).await;
        let mut empty_payloads = 0u32;

        loop {
            counter!("grib_downloads_total").increment(1);
            let payload = self
                .source
                .fetch_grid()
                .await
                .context("Failed to download grid")?;

            if !payload.is_empty() {
                return self.installer.install(&payload).await;
            }

            counter!("grib_empty_payloads_total").increment(1);
            empty_payloads += 1;
            if empty_payloads > self.schedule.max_empty_payload_retries {
                bail!("Upstream returned an empty grid {} times", empty_payloads);
            }

            warn!(
                attempt = empty_payloads,
                retry_in_secs = self.schedule.empty_payload_retry_secs,
                "Got empty grid payload, retrying"
            );
            tokio::time::sleep(self.schedule.empty_payload_retry()).await;
        }
    }

    async fn rebuild(&self) -> Result<usize> {
        self.status.set_state(RefreshState::Rebuilding).await;
        let grid_file = self.installer.grid_file();
        let points = self
            .cache
            .refresh_from(&self.builder, grid_file)
            .await
            .with_context(|| format!("Failed to build snapshot from {}", grid_file.display()))?;
        info!(points = points, "Forecast cache refreshed");
        Ok(points)
    }

    /// Tick every check interval until `shutdown` fires. A running tick is
    /// always allowed to finish.
    pub async fn run_forever(&self, mut shutdown: broadcast::Receiver<()>) {
        let interval = self.schedule.check_interval();
        info!(interval_secs = interval.as_secs(), "Starting grid refresh loop");

        loop {
            tokio::select! {
                _ = shutdown.recv() => {
                    info!("Shutting down grid refresh loop");
                    break;
                }
                _ = tokio::time::sleep(interval) => {}
            }

            // Errors are logged and recorded by tick; the loop carries on
            let _ = self.tick().await;
        }
    }

    /// Run `init` and then the refresh loop on a background task.
    pub fn spawn(self: Arc<Self>, shutdown: broadcast::Receiver<()>) -> JoinHandle<()> {
        tokio::spawn(async move {
            if let Err(e) = self.init().await {
                let cause = format!("{:#}", e);
                error!(error = %cause, "Initial grid refresh failed");
            }
            self.run_forever(shutdown).await;
        })
    }
}
