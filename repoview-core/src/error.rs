//! Error types for decoding diagram input.
//!
//! Only input decoding can fail. Once a tree has been decoded, processing,
//! packing and stabilization always produce a diagram.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DiagramError {
    #[error("invalid tree JSON: {0}")]
    InvalidTree(#[source] serde_json::Error),

    #[error("invalid config JSON: {0}")]
    InvalidConfig(#[source] serde_json::Error),

    #[error("tree node is not a JSON object")]
    NotAnObject,

    #[error("node at {path:?} is missing `{field}`")]
    MissingField { field: &'static str, path: String },

    #[error("node at {path:?} has a non-numeric size")]
    InvalidSize { path: String },

    #[error("node at {path:?} has a malformed `{field}` field")]
    InvalidField { field: &'static str, path: String },
}
