//! fmiproxy server binary.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use forecast_cache::{ForecastCache, SnapshotBuilder};
use grib_decoder::GridDecoder;
use tokio::sync::broadcast;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, EnvFilter};

use fmiproxy::config::AppConfig;
use fmiproxy::download::GridInstaller;
use fmiproxy::handlers;
use fmiproxy::scheduler::{RefreshScheduler, RefreshStatus};
use fmiproxy::state::AppState;
use fmiproxy::upstream::FmiClient;

/// HIRLAM forecast proxy
#[derive(Parser, Debug)]
#[command(name = "fmiproxy")]
#[command(about = "Serves bounded-area HIRLAM forecasts from a periodically refreshed grid")]
struct Args {
    /// Listen address (defaults to 0.0.0.0:$PORT, or 0.0.0.0:8000)
    #[arg(short, long, env = "FMIPROXY_LISTEN")]
    listen: Option<String>,

    /// YAML configuration file
    #[arg(long, env = "FMIPROXY_CONFIG", default_value = "config/fmiproxy.yaml")]
    config: PathBuf,

    /// Directory holding the downloaded grid
    #[arg(long, env = "GRIB_DIR", default_value = "gribs")]
    grib_dir: PathBuf,

    /// FMI open data API key
    #[arg(long, env = "FMI_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Path prefix for all routes
    #[arg(long, env = "MOUNT_PREFIX", default_value = "")]
    mount_prefix: String,

    /// Log level
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Number of worker threads
    #[arg(long, env = "FMIPROXY_WORKER_THREADS")]
    worker_threads: Option<usize>,

    /// Serve the existing grid without polling upstream
    #[arg(long)]
    no_refresh: bool,
}

impl Args {
    fn listen_addr(&self) -> Result<SocketAddr> {
        let addr = match (&self.listen, std::env::var("PORT")) {
            (Some(listen), _) => listen.clone(),
            (None, Ok(port)) => format!("0.0.0.0:{}", port),
            (None, Err(_)) => "0.0.0.0:8000".to_string(),
        };
        addr.parse()
            .with_context(|| format!("Invalid listen address '{}'", addr))
    }
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let args = Args::parse();

    let mut runtime_builder = tokio::runtime::Builder::new_multi_thread();
    runtime_builder.enable_all();
    if let Some(threads) = args.worker_threads {
        runtime_builder.worker_threads(threads);
    }
    let runtime = runtime_builder
        .build()
        .context("Failed to create Tokio runtime")?;

    runtime.block_on(run(args))
}

async fn run(args: Args) -> Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));
    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_level(true)
        .json()
        .init();

    info!("Starting fmiproxy");

    let prometheus = fmiproxy::metrics::install_recorder()?;
    let config = AppConfig::load(&args.config)?;

    tokio::fs::create_dir_all(&args.grib_dir)
        .await
        .with_context(|| format!("Failed to create grid directory {}", args.grib_dir.display()))?;
    let installer = GridInstaller::new(&args.grib_dir);

    let decoder = GridDecoder::grib_get(&config.decoder.program, config.decoder.parameters.clone());
    let builder = SnapshotBuilder::new(decoder.clone(), config.snapshot_config());
    let cache = Arc::new(ForecastCache::new());
    let status = Arc::new(RefreshStatus::new());

    info!(
        grid = %installer.grid_file().display(),
        decoder = %config.decoder.program,
        workers = builder.config().effective_concurrency(),
        "Forecast pipeline configured"
    );

    let (shutdown_tx, _) = broadcast::channel::<()>(1);

    let refresh_task = if args.no_refresh {
        info!("Upstream refresh disabled, serving existing grid");
        if let Err(e) = cache.refresh_from(&builder, installer.grid_file()).await {
            warn!(error = %e, "No snapshot could be built from the existing grid");
        }
        None
    } else {
        let api_key = args
            .api_key
            .as_deref()
            .context("FMI_API_KEY is required unless --no-refresh is given")?;
        let source = Arc::new(FmiClient::new(&config.source, api_key)?);
        let scheduler = Arc::new(RefreshScheduler::new(
            source,
            installer.clone(),
            builder,
            cache.clone(),
            status.clone(),
            config.schedule.clone(),
        ));
        Some(scheduler.spawn(shutdown_tx.subscribe()))
    };

    let state = Arc::new(
        AppState::new(cache, decoder, installer.grid_file(), status).with_prometheus(prometheus),
    );
    let app = handlers::router(state, &args.mount_prefix);

    let mut server_shutdown = shutdown_tx.subscribe();
    let shutdown_signal = shutdown_tx.clone();
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("Received shutdown signal");
        shutdown_signal.send(()).ok();
    });

    let addr = args.listen_addr()?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!(addr = %addr, prefix = %args.mount_prefix, "fmiproxy listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            server_shutdown.recv().await.ok();
        })
        .await
        .context("Server failed")?;

    if let Some(task) = refresh_task {
        if let Err(e) = task.await {
            error!(error = %e, "Refresh task panicked");
        }
    }

    info!("fmiproxy stopped");
    Ok(())
}
