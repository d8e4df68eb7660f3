// HTTP routes

mod auth;
mod http;

use axum::http::HeaderValue;
use axum::{Router, middleware, routing::get};
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};

use crate::config::AppConfig;
use crate::federation::Aggregator;
use crate::resolver::StatusResolver;
use crate::sysinfo_repo::SysinfoRepo;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) resolver: Arc<StatusResolver>,
    pub(crate) aggregator: Arc<Aggregator>,
    pub(crate) sysinfo_repo: Arc<SysinfoRepo>,
    pub(crate) api_token: Arc<str>,
    pub(crate) host_name: Arc<str>,
}

pub fn app(
    resolver: Arc<StatusResolver>,
    aggregator: Arc<Aggregator>,
    sysinfo_repo: Arc<SysinfoRepo>,
    config: &AppConfig,
) -> Router {
    let state = AppState {
        resolver,
        aggregator,
        sysinfo_repo,
        api_token: Arc::from(config.auth.api_token.as_str()),
        host_name: Arc::from(host_name().as_str()),
    };

    let federation = Router::new()
        .route("/federation/services", get(http::federation_services_handler)) // GET /federation/services
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_bearer,
        ));

    Router::new()
        .route("/health", get(http::health_handler)) // GET /health
        .route("/version", get(http::version_handler)) // GET /version
        .route("/api/services", get(http::list_services_handler)) // GET /api/services
        .route("/api/services/{id}", get(http::get_service_handler)) // GET /api/services/:id
        .route(
            "/api/services/{id}/configs/{index}",
            get(http::get_config_handler),
        ) // GET /api/services/:id/configs/:index
        .route("/api/host/stats", get(http::host_stats_handler)) // GET /api/host/stats
        .merge(federation)
        .layer(cors_layer(&config.server.cors_allow_origin))
        .with_state(state)
}

fn cors_layer(allow_origin: &str) -> CorsLayer {
    if allow_origin == "*" {
        return CorsLayer::new().allow_origin(Any);
    }
    match allow_origin.parse::<HeaderValue>() {
        Ok(origin) => CorsLayer::new().allow_origin(AllowOrigin::exact(origin)),
        Err(e) => {
            tracing::warn!(origin = %allow_origin, error = %e, "invalid cors_allow_origin; allowing any origin");
            CorsLayer::new().allow_origin(Any)
        }
    }
}

/// Kernel host name this instance reports to peers.
pub fn host_name() -> String {
    sysinfo::System::host_name()
        .filter(|h| !h.is_empty())
        .unwrap_or_else(|| "unknown".into())
}
