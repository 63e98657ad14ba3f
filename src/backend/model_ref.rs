//! Normalized `name:tag` model identifiers

use serde::{Deserialize, Serialize};
use std::fmt;

/// Tag assumed when a model name carries none
pub const DEFAULT_TAG: &str = "latest";

/// A model identifier normalized to `name:tag`.
///
/// Equality is exact, case-sensitive string equality of the normalized form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct ModelReference(String);

impl ModelReference {
    /// Normalize a raw model name, appending `:latest` when untagged.
    ///
    /// Only the final path segment is inspected for a tag, so registry
    /// hosts with ports (`host:5000/model`) are not mistaken for tags.
    pub fn parse(raw: &str) -> Self {
        let last_segment = raw.rsplit('/').next().unwrap_or(raw);
        if last_segment.contains(':') {
            Self(raw.to_string())
        } else {
            Self(format!("{}:{}", raw, DEFAULT_TAG))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ModelReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for ModelReference {
    fn from(raw: String) -> Self {
        Self::parse(&raw)
    }
}

impl From<&str> for ModelReference {
    fn from(raw: &str) -> Self {
        Self::parse(raw)
    }
}

impl From<ModelReference> for String {
    fn from(model: ModelReference) -> Self {
        model.0
    }
}
