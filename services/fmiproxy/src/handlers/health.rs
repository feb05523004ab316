//! Health, readiness, refresh status and metrics.

use std::sync::Arc;

use axum::extract::Extension;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::scheduler::RefreshSnapshot;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
}

#[derive(Debug, Serialize)]
pub struct ReadyResponse {
    pub ready: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub publish_time: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub service: String,
    pub refresh: RefreshSnapshot,
    pub cache_points: usize,
    pub cache_publish_time: Option<DateTime<Utc>>,
}

/// GET /health
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

/// GET /ready - 503 until a forecast snapshot is installed
pub async fn ready_handler(Extension(state): Extension<Arc<AppState>>) -> Response {
    let publish_time = state.cache.publish_time().await;
    let ready = publish_time.is_some();
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status, Json(ReadyResponse { ready, publish_time })).into_response()
}

/// GET /status - refresh loop state
pub async fn status_handler(Extension(state): Extension<Arc<AppState>>) -> Json<StatusResponse> {
    let (cache_points, cache_publish_time) = match state.cache.area_forecast().await {
        Ok(snapshot) => (snapshot.len(), Some(snapshot.publish_time)),
        Err(_) => (0, None),
    };

    Json(StatusResponse {
        service: "fmiproxy".to_string(),
        refresh: state.refresh_status.snapshot().await,
        cache_points,
        cache_publish_time,
    })
}

/// GET /metrics - Prometheus text exposition
pub async fn metrics_handler(Extension(state): Extension<Arc<AppState>>) -> Response {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.render_metrics(),
    )
        .into_response()
}
