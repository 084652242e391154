// src/error.rs
//! Typed errors for the storage and model layers. Neither escapes `Analyzer::analyze`;
//! both are logged and recovered from where they occur.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to serialize value for key '{key}': {source}")]
    Serialize {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("corrupt value stored under key '{key}': {source}")]
    Corrupt {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("model inference is disabled")]
    Disabled,

    #[error("model unavailable: {0}")]
    Unavailable(String),

    #[error("inference request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("inference endpoint returned HTTP {0}")]
    Status(u16),

    #[error("could not decode classifier output: {0}")]
    Decode(String),

    #[error("classifier returned no labels")]
    EmptyOutput,
}
