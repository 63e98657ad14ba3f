//! Backend module - backend nodes, model references and the registry

pub mod model_ref;
pub mod node;
pub mod registry;

pub use model_ref::ModelReference;
pub use node::{BackendNode, NodeHealth, NodeSnapshot};
pub use registry::BackendRegistry;
