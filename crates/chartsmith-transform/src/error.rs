//! Transformation error types

use chartsmith_core::CoreError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TransformError {
    #[error("wrong image format: '{image}'")]
    ImageFormat { image: String },

    #[error("not a kubernetes object: {reason}")]
    InvalidObject { reason: String },

    #[error("unable to cast {kind} '{name}': {source}")]
    Cast {
        kind: String,
        name: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("volume claim template '{claim}' must specify resources.requests")]
    ClaimMissingRequests { claim: String },

    #[error("volume claim template '{claim}' must specify at least one access mode")]
    ClaimMissingAccessModes { claim: String },

    #[error("processing {kind} '{name}' failed: {source}")]
    Resource {
        kind: String,
        name: String,
        #[source]
        source: Box<TransformError>,
    },

    #[error("interrupted, chart generation aborted")]
    Cancelled,

    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("YAML serialization failed: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON conversion failed: {0}")]
    Json(#[from] serde_json::Error),
}

impl TransformError {
    /// Wrap with the kind/name of the resource being processed so the
    /// offending input can be located.
    pub fn for_resource(self, kind: &str, name: &str) -> Self {
        TransformError::Resource {
            kind: kind.to_string(),
            name: name.to_string(),
            source: Box::new(self),
        }
    }
}

pub type Result<T> = std::result::Result<T, TransformError>;
