//! Upstream grid product: publication metadata and grid download.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use reqwest::{Client, StatusCode};
use thiserror::Error;
use tracing::{debug, info, instrument};

use crate::config::SourceConfig;
use crate::metadata::GridMetadata;

#[derive(Debug, Error)]
pub enum UpstreamError {
    /// Transport or body error, request URL stripped
    #[error("HTTP request failed")]
    Http(#[source] reqwest::Error),

    #[error("Upstream returned {status} for {url}")]
    Status { status: StatusCode, url: String },

    /// A download completed with a zero-length body
    #[error("Upstream returned an empty grid payload")]
    EmptyPayload,

    #[error("Invalid grid metadata: {0}")]
    Metadata(String),
}

/// reqwest errors embed the request URL, which carries the API key.
impl From<reqwest::Error> for UpstreamError {
    fn from(err: reqwest::Error) -> Self {
        UpstreamError::Http(err.without_url())
    }
}

/// Where new grids come from.
#[async_trait]
pub trait GridSource: Send + Sync {
    /// Publication time of the newest grid upstream.
    async fn latest_published(&self) -> Result<DateTime<Utc>, UpstreamError>;

    /// Download the newest grid. An empty body is returned as-is; the caller
    /// decides whether to retry.
    async fn fetch_grid(&self) -> Result<Bytes, UpstreamError>;
}

/// FMI open data client for the HIRLAM surface grid.
pub struct FmiClient {
    client: Client,
    metadata_url: String,
    download_url: String,
}

impl FmiClient {
    pub fn new(source: &SourceConfig, api_key: &str) -> Result<Self, UpstreamError> {
        let client = Client::builder()
            .timeout(source.request_timeout())
            .connect_timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            client,
            metadata_url: source.metadata_url(api_key),
            download_url: source.download_url(api_key),
        })
    }

    async fn get(&self, url: &str) -> Result<reqwest::Response, UpstreamError> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(UpstreamError::Status {
                status,
                url: redact(url),
            });
        }
        Ok(response)
    }
}

#[async_trait]
impl GridSource for FmiClient {
    async fn latest_published(&self) -> Result<DateTime<Utc>, UpstreamError> {
        let xml = self.get(&self.metadata_url).await?.text().await?;
        let metadata = GridMetadata::parse(&xml)?;
        debug!(members = metadata.result_times.len(), "Fetched grid metadata");

        metadata
            .latest()
            .ok_or_else(|| UpstreamError::Metadata("no published grids".to_string()))
    }

    #[instrument(skip(self))]
    async fn fetch_grid(&self) -> Result<Bytes, UpstreamError> {
        info!("Downloading latest grid");
        let body = self.get(&self.download_url).await?.bytes().await?;
        debug!(bytes = body.len(), "Grid download finished");
        Ok(body)
    }
}

/// Strip the API key path segment from FMI URLs before they reach logs.
fn redact(url: &str) -> String {
    const MARKER: &str = "/fmi-apikey/";
    match url.find(MARKER) {
        Some(start) => {
            let key_start = start + MARKER.len();
            let key_end = url[key_start..]
                .find('/')
                .map(|i| key_start + i)
                .unwrap_or(url.len());
            format!("{}***{}", &url[..key_start], &url[key_end..])
        }
        None => url.to_string(),
    }
}
