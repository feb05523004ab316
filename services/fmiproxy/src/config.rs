//! Service configuration loaded from YAML.
//!
//! Every section is optional; missing keys take the built-in HIRLAM defaults.

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use forecast_cache::SnapshotConfig;
use grib_decoder::ParameterNames;
use serde::Deserialize;
use tracing::{info, warn};

const API_KEY_PLACEHOLDER: &str = "{api_key}";

/// Root of `fmiproxy.yaml`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub grid: GridConfig,
    pub schedule: ScheduleConfig,
    pub decoder: DecoderConfig,
    pub source: SourceConfig,
}

/// Sampling increments of the forecast snapshot.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GridConfig {
    pub lat_increment: f64,
    pub lng_increment: f64,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            lat_increment: 0.2,
            lng_increment: 0.5,
        }
    }
}

/// Refresh loop timing.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    /// Seconds between staleness checks
    pub check_interval_secs: u64,
    /// Delay before re-downloading after an empty payload
    pub empty_payload_retry_secs: u64,
    pub max_empty_payload_retries: u32,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            check_interval_secs: 600,
            empty_payload_retry_secs: 5,
            max_empty_payload_retries: 12,
        }
    }
}

impl ScheduleConfig {
    pub fn check_interval(&self) -> Duration {
        Duration::from_secs(self.check_interval_secs)
    }

    pub fn empty_payload_retry(&self) -> Duration {
        Duration::from_secs(self.empty_payload_retry_secs)
    }
}

/// External decode program settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DecoderConfig {
    pub program: String,
    /// Concurrent decode processes per snapshot build, 0 = logical core count
    pub max_concurrent: usize,
    pub parameters: ParameterNames,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            program: "grib_get".to_string(),
            max_concurrent: 0,
            parameters: ParameterNames::default(),
        }
    }
}

/// Upstream grid product. URLs may contain an `{api_key}` placeholder.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    pub metadata_url: String,
    pub download_url: String,
    pub request_timeout_secs: u64,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            metadata_url: "http://data.fmi.fi/fmi-apikey/{api_key}/wfs?request=GetFeature&storedquery_id=fmi::forecast::hirlam::surface::finland::grid".to_string(),
            download_url: "http://data.fmi.fi/fmi-apikey/{api_key}/download?param=windvms,windums,pressure,precipitation1h&format=grib2&bbox=19.4,59.2,27,60.6&projection=EPSG:4326".to_string(),
            request_timeout_secs: 300,
        }
    }
}

impl SourceConfig {
    pub fn metadata_url(&self, api_key: &str) -> String {
        self.metadata_url.replace(API_KEY_PLACEHOLDER, api_key)
    }

    pub fn download_url(&self, api_key: &str) -> String {
        self.download_url.replace(API_KEY_PLACEHOLDER, api_key)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl AppConfig {
    /// Load configuration from `path`, falling back to defaults when the file
    /// does not exist.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            warn!(path = %path.display(), "Config file not found, using defaults");
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        let config = Self::from_yaml(&content)
            .with_context(|| format!("Failed to parse config {}", path.display()))?;

        info!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        anyhow::ensure!(
            self.grid.lat_increment > 0.0 && self.grid.lng_increment > 0.0,
            "grid increments must be positive"
        );
        anyhow::ensure!(
            self.schedule.check_interval_secs > 0,
            "schedule.check_interval_secs must be positive"
        );
        Ok(())
    }

    pub fn snapshot_config(&self) -> SnapshotConfig {
        SnapshotConfig {
            lat_increment: self.grid.lat_increment,
            lng_increment: self.grid.lng_increment,
            max_concurrent: self.decoder.max_concurrent,
        }
    }
}
