//! Inference Gateway
//!
//! A gateway fronting a pool of interchangeable inference servers. It tracks
//! which backends are reachable and which models they host, routes each
//! request to the best eligible backend, and merges listing endpoints across
//! every healthy backend.

pub mod api;
pub mod backend;
pub mod config;
pub mod error;
pub mod gateway;

pub use error::{AppError, Result};

use std::sync::Arc;

use backend::BackendRegistry;
use gateway::{
    aggregation::Aggregator, health_check::HealthCheckManager, load_balancer::LoadBalancer,
    proxy::ProxyForwarder, router::RequestRouter,
};

/// Application state shared across all handlers
pub struct AppState {
    pub settings: Arc<config::Settings>,
    pub registry: Arc<BackendRegistry>,
    pub load_balancer: Arc<LoadBalancer>,
    pub health_manager: Arc<HealthCheckManager>,
    pub router: Arc<RequestRouter>,
}

impl AppState {
    /// Wire every component from validated settings.
    ///
    /// Health checks are not started here; see [`HealthCheckManager::start`].
    pub fn from_settings(settings: config::Settings) -> Result<Self> {
        let registry = Arc::new(BackendRegistry::from_config(&settings.backends));
        let load_balancer = Arc::new(LoadBalancer::new(registry.clone()));
        let health_manager = Arc::new(HealthCheckManager::new(
            registry.clone(),
            &settings.health_check,
        )?);

        let forwarder = ProxyForwarder::new(&settings.proxy)?;
        let aggregator = Aggregator::new(load_balancer.clone(), &settings.proxy)?;
        let router = Arc::new(RequestRouter::new(
            load_balancer.clone(),
            forwarder,
            aggregator,
            settings.proxy.max_body_bytes,
        ));

        Ok(Self {
            settings: Arc::new(settings),
            registry,
            load_balancer,
            health_manager,
            router,
        })
    }
}
