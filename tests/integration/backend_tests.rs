//! Backend integration tests

use inference_gateway::backend::{BackendRegistry, ModelReference};
use inference_gateway::config::BackendConfig;
use std::collections::HashSet;
use std::sync::Arc;

fn create_registry() -> BackendRegistry {
    BackendRegistry::from_config(&[
        BackendConfig::new("http://gpu-1:11434", 2),
        BackendConfig::new("http://gpu-2:11434/", 1),
        BackendConfig::new("http://gpu-3:11434", 2),
    ])
}

#[test]
fn test_registry_creation() {
    let registry = BackendRegistry::default();
    assert!(registry.is_empty());
    assert_eq!(registry.len(), 0);
}

#[test]
fn test_registry_from_config() {
    let registry = create_registry();

    assert_eq!(registry.len(), 3);
    let addresses: Vec<_> = registry.list_all().iter().map(|b| b.address()).collect();
    assert_eq!(
        addresses,
        vec!["http://gpu-1:11434", "http://gpu-2:11434", "http://gpu-3:11434"]
    );
}

#[test]
fn test_registry_shares_nodes() {
    let registry = create_registry();

    let node = registry.list_all()[1].clone();
    node.demote();

    assert!(!registry.list_all()[1].is_healthy());
    assert_eq!(registry.health_summary(), (3, 2, 1));
}

#[test]
fn test_registry_snapshots() {
    let registry = BackendRegistry::from_config(&[BackendConfig::new("http://gpu-1:11434", 7)]);
    let models: HashSet<_> = ["b", "a:7b"].iter().map(|n| ModelReference::parse(n)).collect();
    registry.list_all()[0].record_success(models);

    let snapshots = registry.snapshots();

    assert_eq!(snapshots.len(), 1);
    assert_eq!(snapshots[0].priority, 7);
    assert!(snapshots[0].healthy);
    assert!(snapshots[0].last_checked.is_some());
    let models: Vec<_> = snapshots[0].models.iter().map(|m| m.as_str()).collect();
    assert_eq!(models, vec!["a:7b", "b:latest"]);
}

#[test]
fn test_parallel_readers_and_writers() {
    let registry = Arc::new(create_registry());
    let models: HashSet<_> = std::iter::once(ModelReference::parse("llama3")).collect();
    for node in registry.list_all() {
        node.record_success(models.clone());
    }

    let writers: Vec<_> = (0..registry.len())
        .map(|i| {
            let registry = registry.clone();
            let models = models.clone();
            std::thread::spawn(move || {
                let node = &registry.list_all()[i];
                for round in 0..500 {
                    if round % 2 == 0 {
                        node.record_failure();
                    } else {
                        node.record_success(models.clone());
                    }
                }
            })
        })
        .collect();

    for _ in 0..500 {
        for snapshot in registry.snapshots() {
            assert_eq!(snapshot.healthy, !snapshot.models.is_empty());
        }
    }

    for writer in writers {
        writer.join().unwrap();
    }
}
