//! Priority- and model-aware backend selection

use std::sync::Arc;
use tracing::debug;

use crate::backend::{BackendNode, BackendRegistry, ModelReference};
use crate::error::{AppError, Result};

/// Picks backends from the registry.
///
/// Lower priority values win; ties go to the node listed first in the registry.
pub struct LoadBalancer {
    registry: Arc<BackendRegistry>,
}

impl LoadBalancer {
    pub fn new(registry: Arc<BackendRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &Arc<BackendRegistry> {
        &self.registry
    }

    /// Every currently healthy node, in registry order
    pub fn list_healthy(&self) -> Vec<Arc<BackendNode>> {
        self.registry
            .list_all()
            .iter()
            .filter(|node| node.is_healthy())
            .cloned()
            .collect()
    }

    /// Best eligible node for an optional model.
    ///
    /// Without a model every healthy node is eligible. With one, only healthy
    /// nodes currently reporting that exact normalized reference are.
    pub fn select_best(&self, model: Option<&ModelReference>) -> Option<Arc<BackendNode>> {
        let mut best: Option<&Arc<BackendNode>> = None;

        for node in self.registry.list_all() {
            let eligible = match model {
                Some(model) => node.serves(model),
                None => node.is_healthy(),
            };
            if !eligible {
                continue;
            }

            // Strict comparison keeps the earliest node on ties.
            if best.map_or(true, |b| node.priority() < b.priority()) {
                best = Some(node);
            }
        }

        best.cloned()
    }

    /// Like [`select_best`](Self::select_best), but explains an empty result.
    ///
    /// `NoHealthyBackends` when nothing is healthy at all, `ModelUnavailable`
    /// when healthy nodes exist but none serves the model.
    pub fn select(&self, requested: Option<&str>) -> Result<Arc<BackendNode>> {
        let model = requested.map(ModelReference::parse);
        if let Some(node) = self.select_best(model.as_ref()) {
            debug!(backend = %node.address(), model = ?model, "Selected backend");
            return Ok(node);
        }

        match requested {
            Some(name) if self.registry.list_all().iter().any(|n| n.is_healthy()) => {
                Err(AppError::ModelUnavailable(name.to_string()))
            }
            _ => Err(AppError::NoHealthyBackends),
        }
    }
}
