//! Refresh scheduler ticks against stub upstream and decode program.

use std::collections::VecDeque;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, TimeZone, Utc};
use forecast_cache::{ForecastCache, SnapshotBuilder, SnapshotConfig};
use grib_decoder::{DecodeCommand, DecodeError, DecodeResult, GridDecoder, ParameterNames};
use tokio::sync::broadcast;
use tokio_test::{assert_err, assert_ok};

use fmiproxy::config::ScheduleConfig;
use fmiproxy::download::GridInstaller;
use fmiproxy::scheduler::{RefreshScheduler, RefreshState, RefreshStatus, TickOutcome};
use fmiproxy::upstream::{GridSource, UpstreamError};

// ============================================================================
// Stubs
// ============================================================================

/// Decode program whose grid "files" are plain text holding `dataDate dataTime`.
struct TextGridDecoder;

#[async_trait]
impl DecodeCommand for TextGridDecoder {
    async fn run(&self, args: &[String]) -> DecodeResult<String> {
        let grid_file = args.last().cloned().unwrap_or_default();

        if args.iter().any(|a| a == "-l") {
            return Ok("\
10v 20150827 1200 0 3.72291
10u 20150827 1200 0 4.61555
msl 20150827 1200 0 101325
"
            .to_string());
        }
        if args[1].starts_with("latitudeOfFirstGridPoint") {
            return Ok("60.4 24 60 25\n".to_string());
        }
        tokio::fs::read_to_string(&grid_file)
            .await
            .map_err(|_| DecodeError::ExitStatus {
                code: Some(1),
                stderr: format!("cannot open {}", grid_file),
            })
    }
}

#[derive(Default)]
struct StubSource {
    published: Mutex<Option<DateTime<Utc>>>,
    payloads: Mutex<VecDeque<Bytes>>,
    fetches: AtomicUsize,
}

impl StubSource {
    fn new(published: DateTime<Utc>, payloads: Vec<Bytes>) -> Arc<Self> {
        Arc::new(Self {
            published: Mutex::new(Some(published)),
            payloads: Mutex::new(payloads.into()),
            fetches: AtomicUsize::new(0),
        })
    }

    fn publish(&self, published: Option<DateTime<Utc>>, payloads: Vec<Bytes>) {
        *self.published.lock().unwrap() = published;
        *self.payloads.lock().unwrap() = payloads.into();
    }

    fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl GridSource for StubSource {
    async fn latest_published(&self) -> Result<DateTime<Utc>, UpstreamError> {
        self.published
            .lock()
            .unwrap()
            .ok_or_else(|| UpstreamError::Metadata("metadata service down".to_string()))
    }

    async fn fetch_grid(&self) -> Result<Bytes, UpstreamError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        Ok(self.payloads.lock().unwrap().pop_front().unwrap_or_default())
    }
}

// ============================================================================
// Fixtures
// ============================================================================

fn at(hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2015, 8, 27, hour, 0, 0).unwrap()
}

fn grid(hour: u32) -> Bytes {
    Bytes::from(format!("20150827 {}00\n", hour))
}

struct Harness {
    _dir: tempfile::TempDir,
    source: Arc<StubSource>,
    cache: Arc<ForecastCache>,
    status: Arc<RefreshStatus>,
    installer: GridInstaller,
    scheduler: Arc<RefreshScheduler>,
}

fn harness(source: Arc<StubSource>, max_empty_payload_retries: u32) -> Harness {
    let dir = tempfile::tempdir().unwrap();
    let installer = GridInstaller::new(dir.path().join("gribs"));
    let cache = Arc::new(ForecastCache::new());
    let status = Arc::new(RefreshStatus::new());
    let builder = SnapshotBuilder::new(
        GridDecoder::new(Arc::new(TextGridDecoder), ParameterNames::default()),
        SnapshotConfig {
            max_concurrent: 2,
            ..Default::default()
        },
    );
    let schedule = ScheduleConfig {
        check_interval_secs: 3600,
        empty_payload_retry_secs: 0,
        max_empty_payload_retries,
    };

    let scheduler = Arc::new(RefreshScheduler::new(
        source.clone(),
        installer.clone(),
        builder,
        cache.clone(),
        status.clone(),
        schedule,
    ));

    Harness {
        _dir: dir,
        source,
        cache,
        status,
        installer,
        scheduler,
    }
}

fn write_local_grid(installer: &GridInstaller, hour: u32) {
    let path: &Path = installer.grid_file();
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, grid(hour)).unwrap();
}

// ============================================================================
// Tests
// ============================================================================

#[tokio::test]
async fn test_missing_grid_is_downloaded_and_rebuilt() {
    let h = harness(StubSource::new(at(12), vec![grid(12)]), 3);

    let outcome = h.scheduler.tick().await.unwrap();

    assert_eq!(outcome, TickOutcome::Refreshed);
    assert_eq!(h.source.fetches(), 1);
    assert_eq!(std::fs::read(h.installer.grid_file()).unwrap(), grid(12).to_vec());

    let snapshot = h.cache.area_forecast().await.unwrap();
    assert_eq!(snapshot.len(), 9);
    assert_eq!(snapshot.publish_time, at(12));

    let status = h.status.snapshot().await;
    assert_eq!(status.state, RefreshState::Idle);
    assert_eq!(status.ticks, 1);
    assert_eq!(status.last_outcome, Some(TickOutcome::Refreshed));
    assert_eq!(status.local_grid_time, None);
    assert_eq!(status.published_grid_time, Some(at(12)));
}

#[tokio::test]
async fn test_current_grid_without_snapshot_is_rebuilt_once() {
    let h = harness(StubSource::new(at(12), vec![]), 3);
    write_local_grid(&h.installer, 12);

    assert_eq!(h.scheduler.tick().await.unwrap(), TickOutcome::Rebuilt);
    assert_eq!(h.scheduler.tick().await.unwrap(), TickOutcome::UpToDate);

    assert_eq!(h.source.fetches(), 0);
    assert_eq!(h.cache.publish_time().await, Some(at(12)));
}

#[tokio::test]
async fn test_equal_timestamp_triggers_no_download() {
    let h = harness(StubSource::new(at(12), vec![grid(12)]), 3);
    assert_ok!(h.scheduler.tick().await);

    assert_eq!(h.scheduler.tick().await.unwrap(), TickOutcome::UpToDate);
    assert_eq!(h.source.fetches(), 1);
}

#[tokio::test]
async fn test_one_second_newer_upstream_triggers_download() {
    let h = harness(StubSource::new(at(12), vec![grid(12)]), 3);
    h.scheduler.tick().await.unwrap();

    h.source
        .publish(Some(at(12) + chrono::Duration::seconds(1)), vec![grid(13)]);
    let outcome = h.scheduler.tick().await.unwrap();

    assert_eq!(outcome, TickOutcome::Refreshed);
    assert_eq!(h.source.fetches(), 2);
    assert_eq!(h.cache.publish_time().await, Some(at(13)));
}

#[tokio::test]
async fn test_empty_payloads_are_retried() {
    let h = harness(
        StubSource::new(at(12), vec![Bytes::new(), Bytes::new(), grid(12)]),
        3,
    );

    assert_eq!(h.scheduler.tick().await.unwrap(), TickOutcome::Refreshed);
    assert_eq!(h.source.fetches(), 3);
    assert!(h.cache.is_populated().await);
}

#[tokio::test]
async fn test_empty_payload_retries_are_capped() {
    let h = harness(StubSource::new(at(12), vec![]), 2);

    let err = assert_err!(h.scheduler.tick().await);

    assert!(err.to_string().contains("empty grid"), "{err:#}");
    assert_eq!(h.source.fetches(), 3);
    assert!(!h.installer.grid_file().exists());
    assert!(!h.cache.is_populated().await);

    let status = h.status.snapshot().await;
    assert_eq!(status.state, RefreshState::Idle);
    assert!(status.last_error.is_some());
}

#[tokio::test]
async fn test_failed_refresh_keeps_previous_snapshot() {
    let h = harness(StubSource::new(at(12), vec![grid(12)]), 0);
    h.scheduler.tick().await.unwrap();

    h.source.publish(Some(at(18)), vec![]);
    assert_err!(h.scheduler.tick().await);

    let snapshot = h.cache.area_forecast().await.unwrap();
    assert_eq!(snapshot.publish_time, at(12));
    assert_eq!(snapshot.len(), 9);
}

#[tokio::test]
async fn test_metadata_failure_fails_tick() {
    let h = harness(StubSource::new(at(12), vec![grid(12)]), 3);
    h.source.publish(None, vec![grid(12)]);

    let err = h.scheduler.tick().await.unwrap_err();

    assert!(format!("{:#}", err).contains("metadata service down"));
    assert_eq!(h.source.fetches(), 0);
}

#[tokio::test]
async fn test_init_falls_back_to_existing_grid() {
    let h = harness(StubSource::new(at(12), vec![]), 3);
    h.source.publish(None, vec![]);
    write_local_grid(&h.installer, 6);

    assert_eq!(h.scheduler.init().await.unwrap(), TickOutcome::Rebuilt);
    assert_eq!(h.cache.publish_time().await, Some(at(6)));
}

#[tokio::test]
async fn test_init_without_grid_or_upstream_fails() {
    let h = harness(StubSource::new(at(12), vec![]), 3);
    h.source.publish(None, vec![]);

    assert_err!(h.scheduler.init().await);
    assert!(!h.cache.is_populated().await);
}

#[tokio::test]
async fn test_run_forever_stops_on_shutdown() {
    let h = harness(StubSource::new(at(12), vec![grid(12)]), 3);
    let (tx, rx) = broadcast::channel(1);

    let scheduler = h.scheduler.clone();
    let handle = tokio::spawn(async move { scheduler.run_forever(rx).await });
    tx.send(()).unwrap();

    tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .expect("refresh loop did not stop")
        .unwrap();
    assert_eq!(h.status.snapshot().await.ticks, 0);
}

#[tokio::test(start_paused = true)]
async fn test_loop_keeps_ticking_after_failures() {
    let h = harness(StubSource::new(at(12), vec![]), 0);
    h.source.publish(None, vec![]);
    let interval = Duration::from_secs(3600);
    let (tx, rx) = broadcast::channel(1);

    let scheduler = h.scheduler.clone();
    let handle = tokio::spawn(async move { scheduler.run_forever(rx).await });

    tokio::time::sleep(interval * 2 + interval / 2).await;
    let status = h.status.snapshot().await;
    assert!(status.ticks >= 2, "ticks = {}", status.ticks);
    assert!(status
        .last_error
        .as_deref()
        .is_some_and(|e| e.contains("metadata service down")));
    assert!(!h.cache.is_populated().await);

    h.source.publish(Some(at(12)), vec![grid(12)]);
    tokio::time::sleep(interval).await;

    assert!(h.cache.is_populated().await);
    let status = h.status.snapshot().await;
    assert!(status.ticks >= 3);
    assert!(status.last_error.is_none());
    assert_eq!(status.last_outcome, Some(TickOutcome::Refreshed));

    tx.send(()).unwrap();
    handle.await.unwrap();
}
