//! Gateway core - health checking, selection, proxying and aggregation

pub mod aggregation;
pub mod health_check;
pub mod load_balancer;
pub mod proxy;
pub mod router;
