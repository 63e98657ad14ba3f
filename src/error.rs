//! Error types for the gateway

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

/// Result type used throughout the gateway
pub type Result<T> = std::result::Result<T, AppError>;

/// Application error type
#[derive(Debug, Error)]
pub enum AppError {
    /// Malformed or incomplete client request
    #[error("{0}")]
    BadRequest(String),

    /// No backend is currently healthy
    #[error("No healthy backends available")]
    NoHealthyBackends,

    /// Backends are healthy but none serves the requested model
    #[error("No healthy backend has model {0}")]
    ModelUnavailable(String),

    /// Forwarding to the selected backend failed
    #[error("Backend request failed: {0}")]
    BadGateway(String),

    /// Every backend contacted for an aggregated call failed
    #[error("All {0} backends failed to respond")]
    AllBackendsFailed(usize),

    /// A configured backend address could not be turned into a URL
    #[error("Invalid backend address '{address}': {reason}")]
    InvalidBackendAddress { address: String, reason: String },

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// HTTP status code reported to the client
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::NoHealthyBackends | AppError::ModelUnavailable(_) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            AppError::BadGateway(_) | AppError::AllBackendsFailed(_) | AppError::HttpClient(_) => {
                StatusCode::BAD_GATEWAY
            }
            AppError::InvalidBackendAddress { .. }
            | AppError::Config(_)
            | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Short reason string safe to hand to clients.
    ///
    /// Backend addresses and transport details stay in the logs.
    pub fn client_message(&self) -> String {
        match self {
            AppError::BadRequest(msg) => msg.clone(),
            AppError::NoHealthyBackends => "No healthy backends available".to_string(),
            AppError::ModelUnavailable(model) => {
                format!("No healthy backend has model {}", model)
            }
            AppError::BadGateway(_) | AppError::HttpClient(_) => {
                "Backend request failed".to_string()
            }
            AppError::AllBackendsFailed(_) => "All backends failed to respond".to_string(),
            AppError::InvalidBackendAddress { .. } => "Invalid backend address".to_string(),
            AppError::Config(_) | AppError::Internal(_) => "Internal gateway error".to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(status = status.as_u16(), error = %self, "Request failed");
        } else {
            tracing::debug!(status = status.as_u16(), error = %self, "Request rejected");
        }

        (status, self.client_message()).into_response()
    }
}
