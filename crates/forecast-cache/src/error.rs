//! Error types for snapshot construction and cache reads.

use grib_decoder::DecodeError;
use thiserror::Error;

pub type SnapshotResult<T> = Result<T, SnapshotError>;
pub type CacheResult<T> = Result<T, CacheError>;

/// A snapshot build failed; nothing was installed.
#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("Snapshot decode failed: {0}")]
    Decode(#[from] DecodeError),

    /// The grid's reference time could not be decoded
    #[error("Grid file {0} has no decodable timestamp")]
    MissingTimestamp(String),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CacheError {
    /// No snapshot has been installed yet
    #[error("Forecast cache is not populated yet")]
    NotReady,
}
