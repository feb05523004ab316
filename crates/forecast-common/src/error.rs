//! Error types shared by the forecast proxy crates.

use thiserror::Error;

use crate::time::TimeParseError;

/// Result type alias using ForecastError.
pub type ForecastResult<T> = Result<T, ForecastError>;

/// Errors raised while constructing or parsing domain values.
#[derive(Debug, Error)]
pub enum ForecastError {
    #[error("Invalid bounds: {0}")]
    InvalidBounds(String),

    #[error("Invalid coordinate: {0}")]
    InvalidCoordinate(String),

    #[error(transparent)]
    InvalidTime(#[from] TimeParseError),
}

impl ForecastError {
    /// Get the HTTP status code for this error.
    pub fn http_status_code(&self) -> u16 {
        match self {
            ForecastError::InvalidBounds(_)
            | ForecastError::InvalidCoordinate(_)
            | ForecastError::InvalidTime(_) => 400,
        }
    }
}
