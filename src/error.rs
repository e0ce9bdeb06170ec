//! Error types for Restartr
//!
//! Centralized error handling using thiserror. Terminal workflow exit codes are
//! not errors: they travel as [`crate::domain::ExitCode`] values inside
//! [`crate::domain::LoopOutcome`]. This enum covers infrastructure faults only.

use thiserror::Error;

/// All error types that can occur in Restartr
#[derive(Debug, Error)]
pub enum RestartrError {
    /// Workflow record not found in storage
    #[error("Workflow not found: {0}")]
    WorkflowNotFound(String),

    /// Invalid state transition or operation
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Host engine transport or bookkeeping failure
    #[error("Engine error: {0}")]
    Engine(String),

    /// Storage/persistence error
    #[error("Storage error: {0}")]
    Storage(String),

    /// Handler registry misuse
    #[error("Registry error: {0}")]
    Registry(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML serialization/deserialization error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Result type alias for Restartr operations
pub type Result<T> = std::result::Result<T, RestartrError>;
