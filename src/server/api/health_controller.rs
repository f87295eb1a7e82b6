use axum::Extension;
use axum::Json;
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use chrono::Utc;
use tracing::warn;

use crate::server::dtos::health_dto::{HealthResponse, HealthStatus};
use crate::server::services::RelayServices;
use crate::server::{get_app_version, get_uptime_seconds};

/// health endpoint - there's nothing stateful behind the relay so this only checks that every
/// provider in the priority list actually has an adapter registered
/// if this isn't wanted comment out the health endpoint in ../mod.rs
pub async fn health_endpoint(
    Extension(services): Extension<RelayServices>,
) -> (StatusCode, Json<HealthResponse>) {
    let providers = services.providers.kinds();
    let priority = services.router.priority().order().to_vec();

    let missing = priority
        .iter()
        .filter(|p| !providers.contains(*p))
        .count();

    // a missing adapter just means one less fallback, only all of them gone is fatal
    let overall_status = if providers.is_empty() {
        HealthStatus::Unhealthy
    } else if missing > 0 {
        warn!("{} provider(s) in the priority list have no adapter", missing);
        HealthStatus::Degraded
    } else {
        HealthStatus::Healthy
    };

    let response = HealthResponse {
        status: overall_status,
        timestamp: Utc::now(),
        uptime_seconds: get_uptime_seconds(),
        version: get_app_version().to_string(),
        environment: format!("{:?}", services.config.cargo_env).to_lowercase(),
        providers,
        provider_priority: priority,
    };

    let http_status = match overall_status {
        HealthStatus::Healthy => StatusCode::OK,
        HealthStatus::Degraded => StatusCode::OK,
        HealthStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };

    (http_status, Json(response))
}

/// prometheus text format, 404 when the recorder couldn't be installed
pub async fn metrics_endpoint(Extension(services): Extension<RelayServices>) -> Response {
    match &services.metrics {
        Some(handle) => (
            StatusCode::OK,
            [(
                header::CONTENT_TYPE,
                HeaderValue::from_static("text/plain; version=0.0.4"),
            )],
            handle.render(),
        )
            .into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}
