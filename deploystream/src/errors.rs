//! Error types for the deployment stream service

use thiserror::Error;

/// Main error type for the deployment stream service
#[derive(Error, Debug)]
pub enum StreamError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Server error: {0}")]
    ServerError(String),

    #[error("Shutdown error: {0}")]
    ShutdownError(String),

    #[error("Deployment already tracked: {0}")]
    DuplicateDeploymentId(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Log streaming server is closed")]
    StreamClosed,
}

/// Failure reported by a producer when a deployment phase does not succeed.
///
/// Its type name and rendered text end up in the `error_code` and
/// `stack_trace` metadata of the synthesized error entry.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct PhaseError(pub String);
