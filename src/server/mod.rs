pub mod api;
pub mod dtos;
pub mod error;
pub mod extractors;
pub mod services;
pub mod utils;

use std::sync::{Arc, OnceLock};
use std::time::Instant;

use anyhow::Context;
use axum::{
    Extension, Router, ServiceExt,
    extract::Request,
    http::{HeaderValue, Method},
    routing::get,
};
use metrics_exporter_prometheus::PrometheusBuilder;
use tower::{Layer, ServiceBuilder};
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    normalize_path::NormalizePathLayer,
    trace::TraceLayer,
};
use tracing::{info, warn};

use crate::config::AppConfig;
use api::{
    health_controller::{health_endpoint, metrics_endpoint},
    provider_controller::ProviderController,
    proxy_controller::ProxyController,
    route_controller::RouteController,
};
use services::RelayServices;

static STARTED_AT: OnceLock<Instant> = OnceLock::new();

pub fn get_app_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

pub fn get_uptime_seconds() -> u64 {
    STARTED_AT.get_or_init(Instant::now).elapsed().as_secs()
}

pub struct RelayApplicationServer;

impl RelayApplicationServer {
    fn cors_layer(cors_origin: &str) -> CorsLayer {
        let cors = CorsLayer::new()
            .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
            .allow_headers(Any);

        if cors_origin.trim() == "*" {
            return cors.allow_origin(Any);
        }

        let origins = cors_origin
            .split(',')
            .map(str::trim)
            .filter(|o| !o.is_empty())
            .filter_map(|o| HeaderValue::from_str(o).ok())
            .collect::<Vec<_>>();

        cors.allow_origin(AllowOrigin::list(origins))
    }

    /// every route with its layers, minus path normalization which has to wrap the router from
    /// the outside
    pub fn router(services: RelayServices) -> Router {
        let cors = Self::cors_layer(&services.config.cors_origin);

        // the proxy sets its own wide open cors headers, it stays out of the cors layer so they
        // don't get doubled up
        let api = Router::new()
            .route("/health", get(health_endpoint))
            .route("/metrics", get(metrics_endpoint))
            .merge(RouteController::app())
            .merge(ProviderController::app())
            .layer(cors);

        api.merge(ProxyController::app()).layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(Extension(services)),
        )
    }

    pub async fn serve(config: Arc<AppConfig>) -> anyhow::Result<()> {
        STARTED_AT.get_or_init(Instant::now);

        // counters are still recorded without it, they just can't be scraped
        let metrics = match PrometheusBuilder::new().install_recorder() {
            Ok(handle) => Some(handle),
            Err(e) => {
                warn!("prometheus recorder not installed: {}", e);
                None
            }
        };

        let services = RelayServices::new(config.clone(), metrics);
        let app = NormalizePathLayer::trim_trailing_slash().layer(Self::router(services));

        let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", config.port))
            .await
            .context("failed to bind listener")?;

        info!("relay listening on {}", listener.local_addr()?);

        axum::serve(listener, ServiceExt::<Request>::into_make_service(app))
            .await
            .context("server error")?;

        Ok(())
    }
}
