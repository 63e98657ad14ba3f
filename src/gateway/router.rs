//! Request classification and dispatch

use axum::{
    body::{to_bytes, Body, HttpBody},
    extract::Request,
    http::Method,
    response::Response,
};
use std::sync::Arc;
use tracing::{debug, info};

use crate::error::{AppError, Result};
use crate::gateway::aggregation::{AggregateEndpoint, Aggregator};
use crate::gateway::load_balancer::LoadBalancer;
use crate::gateway::proxy::ProxyForwarder;

/// Optional API-version prefix accepted in front of every endpoint
const API_PREFIX: &str = "/api";

/// Endpoints whose JSON body names the model to route on
const MODEL_BEARING_ENDPOINTS: &[&str] = &["/generate", "/chat", "/embed"];

/// How an inbound request is handled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteKind {
    /// Merge answers from every healthy backend
    Aggregate(AggregateEndpoint),
    /// Route on the `model` field of the JSON body
    ModelBearing,
    /// Route to the best healthy backend regardless of model
    Passthrough,
}

/// Trim surrounding whitespace and one trailing slash
pub fn normalize_path(path: &str) -> &str {
    let path = path.trim();
    path.strip_suffix('/').unwrap_or(path)
}

/// Endpoint suffix with the optional version prefix removed
fn endpoint_suffix(path: &str) -> &str {
    match path.strip_prefix(API_PREFIX) {
        Some(rest) if rest.starts_with('/') => rest,
        _ => path,
    }
}

/// Classify a request by method and normalized path
pub fn classify(method: &Method, path: &str) -> RouteKind {
    let suffix = endpoint_suffix(normalize_path(path));

    match suffix {
        "/tags" => RouteKind::Aggregate(AggregateEndpoint::Tags),
        "/ps" => RouteKind::Aggregate(AggregateEndpoint::Ps),
        _ if *method == Method::POST && MODEL_BEARING_ENDPOINTS.contains(&suffix) => {
            RouteKind::ModelBearing
        }
        _ => RouteKind::Passthrough,
    }
}

/// Pull the requested model name out of a JSON request body.
///
/// The body must be a JSON object whose `model` field is a non-empty string.
pub fn extract_model(body: &[u8]) -> Result<String> {
    let object: serde_json::Map<String, serde_json::Value> = serde_json::from_slice(body)
        .map_err(|_| AppError::BadRequest("Invalid JSON in request body".to_string()))?;

    match object.get("model") {
        Some(serde_json::Value::String(model)) if !model.trim().is_empty() => Ok(model.clone()),
        _ => Err(AppError::BadRequest(
            "Model name is required in the request body".to_string(),
        )),
    }
}

/// Routes each inbound request to one backend or to the aggregator
pub struct RequestRouter {
    load_balancer: Arc<LoadBalancer>,
    forwarder: ProxyForwarder,
    aggregator: Aggregator,
    max_body_bytes: usize,
}

impl RequestRouter {
    pub fn new(
        load_balancer: Arc<LoadBalancer>,
        forwarder: ProxyForwarder,
        aggregator: Aggregator,
        max_body_bytes: usize,
    ) -> Self {
        Self {
            load_balancer,
            forwarder,
            aggregator,
            max_body_bytes,
        }
    }

    pub async fn route(&self, request: Request) -> Result<Response> {
        let (parts, body) = request.into_parts();
        let kind = classify(&parts.method, parts.uri.path());
        debug!(method = %parts.method, path = %parts.uri.path(), ?kind, "Routing request");

        match kind {
            RouteKind::Aggregate(endpoint) => self.aggregator.aggregate(&parts, endpoint).await,
            RouteKind::ModelBearing => {
                // Fails on oversized bodies as well as broken streams
                let bytes = to_bytes(body, self.max_body_bytes)
                    .await
                    .map_err(|_| AppError::BadRequest("Failed to read request body".to_string()))?;
                let model = extract_model(&bytes)?;

                let node = self.load_balancer.select(Some(&model))?;
                info!(model = %model, backend = %node.address(), "Routing model request");
                self.forwarder.forward(&node, &parts, Some(bytes.into())).await
            }
            RouteKind::Passthrough => {
                let node = self.load_balancer.select(None)?;
                debug!(backend = %node.address(), "Routing model-agnostic request");
                let body = (body.size_hint().exact() != Some(0))
                    .then(|| reqwest::Body::wrap_stream(Body::into_data_stream(body)));
                self.forwarder.forward(&node, &parts, body).await
            }
        }
    }
}
