//! HTTP request handlers

use crate::api::models::{BackendHealthSummary, BackendListResponse, HealthResponse};
use crate::error::AppError;
use crate::AppState;
use axum::{
    extract::{Request, State},
    response::Response,
    Json,
};
use std::sync::Arc;

/// Catch-all handler: every backend-bound request goes through the gateway router
pub async fn proxy_request(
    State(state): State<Arc<AppState>>,
    request: Request,
) -> Result<Response, AppError> {
    state.router.route(request).await
}

/// Gateway health endpoint
pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let (total, healthy, unhealthy) = state.health_manager.get_health_summary();

    Json(HealthResponse {
        status: if healthy > 0 { "healthy" } else { "degraded" }.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        backends: BackendHealthSummary {
            total,
            healthy,
            unhealthy,
        },
    })
}

/// List all configured backends with their current health
pub async fn list_backends(State(state): State<Arc<AppState>>) -> Json<BackendListResponse> {
    Json(BackendListResponse {
        backends: state.registry.snapshots(),
    })
}
