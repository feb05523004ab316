//! HTTP error responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use forecast_cache::CacheError;
use forecast_common::ForecastError;
use grib_decoder::DecodeError;
use serde::Serialize;
use thiserror::Error;
use tracing::error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error(transparent)]
    InvalidInput(#[from] ForecastError),

    /// No snapshot or grid file yet
    #[error("Forecast data is not available yet")]
    NotReady,

    #[error("Failed to decode forecast: {0}")]
    Decode(#[from] DecodeError),
}

impl From<CacheError> for ApiError {
    fn from(err: CacheError) -> Self {
        match err {
            CacheError::NotReady => ApiError::NotReady,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub message: String,
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::InvalidInput(e) => {
                StatusCode::from_u16(e.http_status_code()).unwrap_or(StatusCode::BAD_REQUEST)
            }
            ApiError::NotReady => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Decode(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() && status != StatusCode::SERVICE_UNAVAILABLE {
            error!(error = %self, "Forecast request failed");
        }

        let body = ErrorBody {
            message: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}
