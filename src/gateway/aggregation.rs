//! Fan-out/fan-in over every healthy backend for listing endpoints

use axum::{
    http::{header::CONTENT_LENGTH, request::Parts},
    response::{IntoResponse, Response},
    Json,
};
use futures::future::join_all;
use reqwest::Client;
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, warn};

use crate::api::models::{ModelDescriptor, ProcessResponse, TagsResponse};
use crate::backend::BackendNode;
use crate::config::ProxyConfig;
use crate::error::{AppError, Result};
use crate::gateway::load_balancer::LoadBalancer;
use crate::gateway::proxy::{forwardable_headers, target_url};

/// Endpoints whose answer is merged from all healthy backends
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregateEndpoint {
    /// Model listing
    Tags,
    /// Running-process listing
    Ps,
}

/// Sends one request to every healthy backend and merges the answers
pub struct Aggregator {
    load_balancer: Arc<LoadBalancer>,
    client: Client,
}

impl Aggregator {
    pub fn new(load_balancer: Arc<LoadBalancer>, config: &ProxyConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.aggregation_timeout_secs))
            .build()?;

        Ok(Self {
            load_balancer,
            client,
        })
    }

    /// Aggregate `endpoint` across all currently healthy backends.
    ///
    /// Succeeds as long as at least one backend answered; the rest are logged
    /// and left out of the merge.
    pub async fn aggregate(&self, parts: &Parts, endpoint: AggregateEndpoint) -> Result<Response> {
        let nodes = self.load_balancer.list_healthy();
        if nodes.is_empty() {
            return Err(AppError::NoHealthyBackends);
        }

        let response = match endpoint {
            AggregateEndpoint::Tags => {
                let listings = self.fan_out::<TagsResponse>(&nodes, parts).await?;
                Json(merge_tags(listings)).into_response()
            }
            AggregateEndpoint::Ps => {
                let listings = self.fan_out::<ProcessResponse>(&nodes, parts).await?;
                Json(merge_ps(listings)).into_response()
            }
        };

        Ok(response)
    }

    /// Issue the request to every node concurrently and wait for all of them.
    ///
    /// Results come back in registry order.
    async fn fan_out<T: DeserializeOwned>(
        &self,
        nodes: &[Arc<BackendNode>],
        parts: &Parts,
    ) -> Result<Vec<T>> {
        let calls = nodes.iter().map(|node| self.fetch::<T>(node, parts));
        let results = join_all(calls).await;

        let mut successes = Vec::with_capacity(nodes.len());
        let mut failures = 0;
        for (node, result) in nodes.iter().zip(results) {
            match result {
                Ok(body) => successes.push(body),
                Err(e) => {
                    warn!(backend = %node.address(), error = %e, "Aggregation call failed");
                    failures += 1;
                }
            }
        }

        if successes.is_empty() {
            error!(backends = nodes.len(), path = %parts.uri.path(), "All aggregation calls failed");
            return Err(AppError::AllBackendsFailed(nodes.len()));
        }

        debug!(succeeded = successes.len(), failed = failures, "Aggregation complete");
        Ok(successes)
    }

    async fn fetch<T: DeserializeOwned>(&self, node: &BackendNode, parts: &Parts) -> Result<T> {
        let url = target_url(node.address(), &parts.uri)?;

        let mut headers = forwardable_headers(&parts.headers);
        // Sub-requests carry no body
        headers.remove(CONTENT_LENGTH);

        let response = self
            .client
            .request(parts.method.clone(), url)
            .headers(headers)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::BadGateway(format!("backend returned {}", status)));
        }

        Ok(response.json::<T>().await?)
    }
}

/// Merge model listings by name; later listings overwrite earlier ones.
///
/// The merged list is ordered by model name.
pub fn merge_tags(listings: Vec<TagsResponse>) -> TagsResponse {
    let mut by_name: BTreeMap<String, ModelDescriptor> = BTreeMap::new();
    for listing in listings {
        for model in listing.models {
            by_name.insert(model.name.clone(), model);
        }
    }

    TagsResponse {
        models: by_name.into_values().collect(),
    }
}

/// Concatenate process listings without deduplication
pub fn merge_ps(listings: Vec<ProcessResponse>) -> ProcessResponse {
    ProcessResponse {
        models: listings.into_iter().flat_map(|l| l.models).collect(),
    }
}
