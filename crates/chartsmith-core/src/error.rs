//! Core error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("values path conflict at '{path}': a scalar and a nested map cannot share a path")]
    PathConflict { path: String },

    #[error("values merge conflict at '{path}': subtrees disagree")]
    MergeConflict { path: String },

    #[error("empty values path")]
    EmptyPath,

    #[error("invalid chart name '{name}': must match [a-z0-9]([-a-z0-9]*[a-z0-9])?")]
    InvalidChartName { name: String },

    #[error("YAML serialization failed: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON conversion failed: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, CoreError>;
