//! Domain-specific error types for chip-gate

use thiserror::Error;

/// Main error type for the relevance gating pipeline
#[derive(Error, Debug)]
pub enum ChipGateError {
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Storage error: {message}")]
    Storage { message: String },

    #[error("Snapshot error: {message}")]
    Snapshot { message: String },

    #[error("Serialization error: {message}")]
    Serialization { message: String },

    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl ChipGateError {
    pub fn storage(message: impl Into<String>) -> Self {
        ChipGateError::Storage {
            message: message.into(),
        }
    }

    pub fn snapshot(message: impl Into<String>) -> Self {
        ChipGateError::Snapshot {
            message: message.into(),
        }
    }
}

impl From<anyhow::Error> for ChipGateError {
    fn from(err: anyhow::Error) -> Self {
        ChipGateError::Internal {
            message: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for ChipGateError {
    fn from(err: serde_json::Error) -> Self {
        ChipGateError::Serialization {
            message: err.to_string(),
        }
    }
}

impl From<toml::de::Error> for ChipGateError {
    fn from(err: toml::de::Error) -> Self {
        ChipGateError::Config {
            message: err.to_string(),
        }
    }
}

/// Result type alias for chip-gate operations
pub type Result<T> = std::result::Result<T, ChipGateError>;
