//! HTTP handlers and routing.

pub mod forecast;
pub mod health;

use std::sync::Arc;

use axum::routing::get;
use axum::{Extension, Router};
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Normalise a mount prefix to `""` or `/segment[/segment..]`.
pub fn normalize_prefix(prefix: &str) -> String {
    let trimmed = prefix.trim().trim_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("/{}", trimmed)
    }
}

/// All routes, mounted under `mount_prefix`.
pub fn router(state: Arc<AppState>, mount_prefix: &str) -> Router {
    let prefix = normalize_prefix(mount_prefix);
    let path = |p: &str| format!("{}{}", prefix, p);

    Router::new()
        .route(
            &path("/hirlam-forecast"),
            get(forecast::hirlam_forecast_handler),
        )
        .route(&path("/health"), get(health::health_handler))
        .route(&path("/ready"), get(health::ready_handler))
        .route(&path("/status"), get(health::status_handler))
        .route(&path("/metrics"), get(health::metrics_handler))
        .layer(Extension(state))
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_prefix() {
        assert_eq!(normalize_prefix(""), "");
        assert_eq!(normalize_prefix("/"), "");
        assert_eq!(normalize_prefix("api"), "/api");
        assert_eq!(normalize_prefix("/api/v1/"), "/api/v1");
    }
}
