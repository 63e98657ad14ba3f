//! A single inference server and its live health state

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::Serialize;
use std::collections::HashSet;
use tracing::{info, warn};

use crate::backend::model_ref::ModelReference;
use crate::config::BackendConfig;

/// Mutable health state of a node, always read and written as one group
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeHealth {
    pub healthy: bool,
    pub last_checked: Option<DateTime<Utc>>,
    pub models: HashSet<ModelReference>,
}

impl NodeHealth {
    fn initial() -> Self {
        Self {
            healthy: true,
            last_checked: None,
            models: HashSet::new(),
        }
    }
}

/// Serializable view of a node taken under a single read lock
#[derive(Debug, Clone, Serialize)]
pub struct NodeSnapshot {
    pub address: String,
    pub priority: i64,
    pub healthy: bool,
    pub last_checked: Option<DateTime<Utc>>,
    pub models: Vec<ModelReference>,
}

/// One configured backend.
///
/// `address` and `priority` are fixed at construction. The health group sits
/// behind a per-node reader/writer lock that is never held across I/O.
#[derive(Debug)]
pub struct BackendNode {
    address: String,
    priority: i64,
    health: RwLock<NodeHealth>,
}

impl BackendNode {
    pub fn new(address: impl Into<String>, priority: i64) -> Self {
        Self {
            address: address.into(),
            priority,
            health: RwLock::new(NodeHealth::initial()),
        }
    }

    pub fn from_config(config: &BackendConfig) -> Self {
        Self::new(config.address.trim_end_matches('/'), config.priority)
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn priority(&self) -> i64 {
        self.priority
    }

    /// Run `f` with shared access to the health group
    pub fn with_read<R>(&self, f: impl FnOnce(&NodeHealth) -> R) -> R {
        let guard = self.health.read();
        f(&guard)
    }

    /// Run `f` with exclusive access to the health group
    pub fn with_write<R>(&self, f: impl FnOnce(&mut NodeHealth) -> R) -> R {
        let mut guard = self.health.write();
        f(&mut guard)
    }

    pub fn is_healthy(&self) -> bool {
        self.with_read(|h| h.healthy)
    }

    /// Copy of the whole health group
    pub fn health(&self) -> NodeHealth {
        self.with_read(NodeHealth::clone)
    }

    /// Whether the node is healthy and currently serves `model`, read atomically
    pub fn serves(&self, model: &ModelReference) -> bool {
        self.with_read(|h| h.healthy && h.models.contains(model))
    }

    /// Record a successful probe: healthy, new model set, fresh timestamp
    pub fn record_success(&self, models: HashSet<ModelReference>) {
        let (was_healthy, count) = self.with_write(|h| {
            let was_healthy = h.healthy;
            h.healthy = true;
            h.models = models;
            h.last_checked = Some(Utc::now());
            (was_healthy, h.models.len())
        });

        if !was_healthy {
            info!(backend = %self.address, models = count, "Backend recovered");
        }
    }

    /// Record a failed probe: unhealthy, no models, fresh timestamp
    pub fn record_failure(&self) {
        let was_healthy = self.with_write(|h| {
            let was_healthy = h.healthy;
            h.healthy = false;
            h.models.clear();
            h.last_checked = Some(Utc::now());
            was_healthy
        });

        if was_healthy {
            warn!(backend = %self.address, "Backend marked unhealthy by health check");
        }
    }

    /// Demote the node after a failed forward, outside the polling cycle.
    ///
    /// The model set is cleared with the flag; the next successful probe
    /// restores both.
    pub fn demote(&self) {
        self.with_write(|h| {
            h.healthy = false;
            h.models.clear();
        });
        warn!(backend = %self.address, "Backend demoted after request failure");
    }

    pub fn snapshot(&self) -> NodeSnapshot {
        let health = self.health();
        let mut models: Vec<ModelReference> = health.models.into_iter().collect();
        models.sort();

        NodeSnapshot {
            address: self.address.clone(),
            priority: self.priority,
            healthy: health.healthy,
            last_checked: health.last_checked,
            models,
        }
    }
}
