//! Error types for grid decoding.

use forecast_common::TimeParseError;
use thiserror::Error;

/// Result type for decode operations.
pub type DecodeResult<T> = Result<T, DecodeError>;

/// Errors raised while running the decode program or reading its output.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The decode program could not be started
    #[error("Failed to run decode program '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The decode program ran but exited unsuccessfully
    #[error("Decode program exited with {}: {stderr}", describe_exit(.code))]
    ExitStatus { code: Option<i32>, stderr: String },

    /// A line of decode output did not have the expected shape
    #[error("Malformed decode output line '{line}': {reason}")]
    MalformedRecord { line: String, reason: String },

    /// Decode output parsed but lacks fields needed for a forecast item
    #[error("Malformed forecast data: {0}")]
    MalformedForecastData(String),

    #[error("Decode program produced no output")]
    EmptyOutput,

    #[error(transparent)]
    InvalidTime(#[from] TimeParseError),
}

fn describe_exit(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("status {}", code),
        None => "no status (terminated by signal)".to_string(),
    }
}
