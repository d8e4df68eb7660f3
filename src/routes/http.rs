// GET handlers: health, version, services, configs, host stats, federation

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};

use super::AppState;
use crate::models::{FederationResponse, ServiceState};
use crate::resolver::ResolveError;
use crate::version::{NAME, VERSION};

impl IntoResponse for ResolveError {
    fn into_response(self) -> Response {
        let status = match &self {
            ResolveError::NotFound(_) => StatusCode::NOT_FOUND,
            ResolveError::OutOfRange { .. } => StatusCode::BAD_REQUEST,
            ResolveError::Io { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let body = Json(serde_json::json!({
            "success": false,
            "error": self.to_string(),
        }));
        (status, body).into_response()
    }
}

/// GET /health — liveness probe, no auth.
pub(super) async fn health_handler() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

/// GET /version — service name and version (from Cargo.toml at build time).
pub(super) async fn version_handler() -> impl IntoResponse {
    Json(serde_json::json!({
        "name": NAME,
        "version": VERSION,
    }))
}

/// GET /api/services — local and federated services with running count.
pub(super) async fn list_services_handler(State(state): State<AppState>) -> impl IntoResponse {
    let services = state.aggregator.get_all_services().await;
    let running = services
        .iter()
        .filter(|s| s.status == ServiceState::Running)
        .count();
    tracing::debug!(total = services.len(), running, "Listed all services");
    Json(serde_json::json!({
        "total": services.len(),
        "running": running,
        "services": services,
    }))
}

/// GET /api/services/{id} — one local service.
pub(super) async fn get_service_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ResolveError> {
    let svc = state.resolver.get_by_id(&id).await.inspect_err(|e| {
        tracing::warn!(service_id = %id, error = %e, "Service lookup failed");
    })?;
    Ok(Json(svc))
}

/// GET /api/services/{id}/configs/{index} — config file content.
pub(super) async fn get_config_handler(
    State(state): State<AppState>,
    Path((id, index)): Path<(String, usize)>,
) -> Result<impl IntoResponse, ResolveError> {
    let config = state
        .resolver
        .get_config_content(&id, index)
        .await
        .inspect_err(|e| {
            tracing::warn!(service_id = %id, index, error = %e, "Failed to get config content");
        })?;
    Ok(Json(config))
}

/// GET /api/host/stats — CPU, memory and root filesystem usage of this host.
pub(super) async fn host_stats_handler(State(state): State<AppState>) -> Response {
    match state.sysinfo_repo.get_host_stats().await {
        Ok(stats) => Json(stats).into_response(),
        Err(e) => {
            tracing::warn!(error = %e, "host stats failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({ "success": false, "error": e.to_string() })),
            )
                .into_response()
        }
    }
}

/// GET /federation/services — this host's services for peers (never federated further).
pub(super) async fn federation_services_handler(
    State(state): State<AppState>,
) -> Json<FederationResponse> {
    Json(FederationResponse {
        services: state.aggregator.get_local_services().await,
        host: state.host_name.to_string(),
    })
}
