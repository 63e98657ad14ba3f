//! Single-backend reverse proxying with failure-driven demotion

use axum::{
    body::Body,
    http::{request::Parts, HeaderMap, Uri},
    response::Response,
};
use reqwest::{Client, Url};
use std::time::Duration;
use tracing::{debug, warn};

use crate::backend::BackendNode;
use crate::config::ProxyConfig;
use crate::error::{AppError, Result};

/// Headers that are never forwarded in either direction.
const HOP_BY_HOP_HEADERS: &[&str] = &[
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "proxy-connection",
    "te",
    "trailers",
    "transfer-encoding",
    "upgrade",
    // The outbound client sets its own from the target URL
    "host",
];

/// Check if a header should be forwarded.
pub(crate) fn should_forward_header(name: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    !HOP_BY_HOP_HEADERS.contains(&lower.as_str())
}

pub(crate) fn forwardable_headers(headers: &HeaderMap) -> HeaderMap {
    let mut out = HeaderMap::with_capacity(headers.len());
    for (name, value) in headers {
        if should_forward_header(name.as_str()) {
            out.append(name.clone(), value.clone());
        }
    }
    out
}

/// Target URL on `address` for the original request path and query
pub fn target_url(address: &str, uri: &Uri) -> Result<Url> {
    let path_and_query = uri.path_and_query().map(|pq| pq.as_str()).unwrap_or("/");
    let raw = format!("{}{}", address.trim_end_matches('/'), path_and_query);

    Url::parse(&raw).map_err(|e| AppError::InvalidBackendAddress {
        address: address.to_string(),
        reason: e.to_string(),
    })
}

/// Forwards requests to one selected backend and relays its response
pub struct ProxyForwarder {
    client: Client,
}

impl ProxyForwarder {
    pub fn new(config: &ProxyConfig) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;

        Ok(Self { client })
    }

    /// Forward the request to `node` and stream its response back.
    ///
    /// `body` is `None` for requests that carry no payload.
    ///
    /// A transport failure or a 5xx answer demotes `node` immediately. The
    /// 5xx answer itself is still relayed; a transport failure becomes 502.
    pub async fn forward(
        &self,
        node: &BackendNode,
        parts: &Parts,
        body: Option<reqwest::Body>,
    ) -> Result<Response> {
        let url = target_url(node.address(), &parts.uri)?;
        debug!(backend = %node.address(), method = %parts.method, path = %parts.uri.path(), "Forwarding request");

        let mut request = self
            .client
            .request(parts.method.clone(), url)
            .headers(forwardable_headers(&parts.headers));
        if let Some(body) = body {
            request = request.body(body);
        }

        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => {
                warn!(backend = %node.address(), error = %e, "Forwarding failed");
                node.demote();
                return Err(AppError::BadGateway(e.to_string()));
            }
        };

        let status = response.status();
        if status.is_server_error() {
            warn!(backend = %node.address(), status = status.as_u16(), "Backend returned server error");
            node.demote();
        }

        let mut builder = Response::builder().status(status);
        if let Some(headers) = builder.headers_mut() {
            *headers = forwardable_headers(response.headers());
        }

        builder
            .body(Body::from_stream(response.bytes_stream()))
            .map_err(|e| AppError::Internal(format!("Failed to build response: {}", e)))
    }
}
