//! API request/response models

use serde::{Deserialize, Deserializer, Serialize};

use crate::backend::NodeSnapshot;

/// One entry of a backend's model listing.
///
/// Only `name` is interpreted; every other field is carried through untouched.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ModelDescriptor {
    pub name: String,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Backends report an empty listing as `null` or leave the key out
fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

/// Model listing response (`/api/tags`)
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TagsResponse {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub models: Vec<ModelDescriptor>,
}

/// One running model as reported by a backend's process listing.
///
/// Nothing here is interpreted, so no field is required.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProcessDescriptor {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Process listing response (`/api/ps`)
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ProcessResponse {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub models: Vec<ProcessDescriptor>,
}

/// Gateway health response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub backends: BackendHealthSummary,
}

/// Backend health summary
#[derive(Debug, Serialize, Deserialize)]
pub struct BackendHealthSummary {
    pub total: usize,
    pub healthy: usize,
    pub unhealthy: usize,
}

/// Backend list response
#[derive(Debug, Serialize)]
pub struct BackendListResponse {
    pub backends: Vec<NodeSnapshot>,
}
