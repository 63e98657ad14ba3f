//! Backend registry holding every configured inference server

use std::sync::Arc;
use tracing::info;

use crate::backend::node::{BackendNode, NodeSnapshot};
use crate::config::BackendConfig;

/// Ordered, fixed-size collection of backends.
///
/// Built once from configuration; only the nodes' health groups change
/// afterwards, each under its own lock.
#[derive(Debug, Default)]
pub struct BackendRegistry {
    nodes: Vec<Arc<BackendNode>>,
}

impl BackendRegistry {
    /// Build the registry from configuration, keeping configuration order
    pub fn from_config(configs: &[BackendConfig]) -> Self {
        let nodes = configs
            .iter()
            .map(|config| {
                info!(backend = %config.address, priority = config.priority, "Registered backend");
                Arc::new(BackendNode::from_config(config))
            })
            .collect();

        Self { nodes }
    }

    /// All nodes in registry order
    pub fn list_all(&self) -> &[Arc<BackendNode>] {
        &self.nodes
    }

    /// Consistent per-node views, in registry order
    pub fn snapshots(&self) -> Vec<NodeSnapshot> {
        self.nodes.iter().map(|n| n.snapshot()).collect()
    }

    /// Returns `(total, healthy, unhealthy)`
    pub fn health_summary(&self) -> (usize, usize, usize) {
        let total = self.nodes.len();
        let healthy = self.nodes.iter().filter(|n| n.is_healthy()).count();
        (total, healthy, total - healthy)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}
