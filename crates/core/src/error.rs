//! Error types for the paralegal orchestrator.

use thiserror::Error;

use crate::types::ParseError;

/// Result type alias using the orchestrator's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type shared by every layer.
#[derive(Error, Debug)]
pub enum Error {
    // =========================================================================
    // Configuration & Session Errors
    // =========================================================================
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Storage error: {0}")]
    Storage(String),

    // =========================================================================
    // Orchestration Errors
    // =========================================================================
    #[error("Agent registration failed for {role}: {reason}")]
    Registration { role: String, reason: String },

    #[error("Controller error: {0}")]
    Controller(String),

    #[error("Message parse error: {0}")]
    Parse(#[from] ParseError),

    // =========================================================================
    // External Service Errors
    // =========================================================================
    #[error("Model provider error: {0}")]
    ModelProvider(String),

    #[error("Retrieval error: {0}")]
    Retrieval(String),

    // =========================================================================
    // Generic Errors
    // =========================================================================
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl Error {
    /// Create a configuration error.
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// Create a storage error.
    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }

    /// Create a registration error for a role.
    pub fn registration(role: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Registration {
            role: role.into(),
            reason: reason.into(),
        }
    }

    /// Create a controller error.
    pub fn controller(msg: impl Into<String>) -> Self {
        Self::Controller(msg.into())
    }

    /// Create a model provider error.
    pub fn model_provider(msg: impl Into<String>) -> Self {
        Self::ModelProvider(msg.into())
    }

    /// Create a retrieval error.
    pub fn retrieval(msg: impl Into<String>) -> Self {
        Self::Retrieval(msg.into())
    }

    /// Create an internal error.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}
