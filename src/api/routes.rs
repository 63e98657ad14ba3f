//! HTTP route definitions

use crate::api::handlers;
use axum::{routing::get, Router};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// Create the main application router.
///
/// Gateway introspection lives under `/gateway`; every other path is
/// routed to the backends.
pub fn create_router(state: Arc<crate::AppState>) -> Router {
    let gateway_routes = Router::new()
        .route("/health", get(handlers::health_check))
        .route("/backends", get(handlers::list_backends));

    Router::new()
        .nest("/gateway", gateway_routes)
        .fallback(handlers::proxy_request)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}
