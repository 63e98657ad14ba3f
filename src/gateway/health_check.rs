//! Background health polling, one task per backend

use reqwest::Client;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::api::models::TagsResponse;
use crate::backend::{BackendNode, BackendRegistry, ModelReference};
use crate::config::HealthCheckConfig;
use crate::error::{AppError, Result};

/// Periodically probes every backend's model listing and records the outcome
pub struct HealthCheckManager {
    registry: Arc<BackendRegistry>,
    client: Client,
    path: String,
    interval: Duration,
}

impl HealthCheckManager {
    /// Create a manager using the configured probe path, timeout and interval
    pub fn new(registry: Arc<BackendRegistry>, config: &HealthCheckConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            registry,
            client,
            path: config.path.clone(),
            interval: Duration::from_secs(config.interval_secs),
        })
    }

    /// Spawn one polling task per backend.
    ///
    /// Each task probes immediately, then once per interval, until `cancel` fires.
    pub fn start(self: &Arc<Self>, cancel: CancellationToken) -> Vec<JoinHandle<()>> {
        info!(
            backends = self.registry.len(),
            interval_secs = self.interval.as_secs(),
            "Starting health checks"
        );

        self.registry
            .list_all()
            .iter()
            .map(|node| {
                let manager = Arc::clone(self);
                let node = Arc::clone(node);
                let cancel = cancel.clone();
                tokio::spawn(async move { manager.poll(node, cancel).await })
            })
            .collect()
    }

    async fn poll(&self, node: Arc<BackendNode>, cancel: CancellationToken) {
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = self.probe_once(&node) => {}
            }

            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(self.interval) => {}
            }
        }

        debug!(backend = %node.address(), "Health check task stopped");
    }

    /// Run a single probe cycle against `node` and record the result.
    ///
    /// Returns whether the node ended up healthy.
    pub async fn probe_once(&self, node: &BackendNode) -> bool {
        match self.fetch_models(node).await {
            Ok(models) => {
                debug!(backend = %node.address(), models = models.len(), "Health check passed");
                node.record_success(models);
                true
            }
            Err(e) => {
                debug!(backend = %node.address(), error = %e, "Health check failed");
                node.record_failure();
                false
            }
        }
    }

    async fn fetch_models(&self, node: &BackendNode) -> Result<HashSet<ModelReference>> {
        let url = format!("{}{}", node.address(), self.path);
        let response = self.client.get(&url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::BadGateway(format!("health check returned {}", status)));
        }

        let tags: TagsResponse = response.json().await?;
        Ok(tags
            .models
            .iter()
            .map(|m| ModelReference::parse(&m.name))
            .collect())
    }

    /// Returns `(total, healthy, unhealthy)`
    pub fn get_health_summary(&self) -> (usize, usize, usize) {
        self.registry.health_summary()
    }
}
