//! Error types for dockhand

use thiserror::Error;

/// Main error type for dockhand
#[derive(Error, Debug)]
pub enum DeployError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    YamlError(#[from] serde_yaml_ng::Error),

    #[error("Prompt error: {0}")]
    PromptError(#[from] dialoguer::Error),

    #[error("Not configured: {0} (run `dockhand config` first)")]
    NotConfigured(String),

    #[error("Missing required field: {0}")]
    MissingRequiredField(String),

    #[error("Invalid value for {key}: {reason}")]
    InvalidValue { key: String, reason: String },

    #[error("Source sync failed: {0}")]
    SyncFailure(String),

    #[error("Image build failed: {0}")]
    BuildFailure(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Missing dependency: {0}")]
    DependencyMissing(String),

    #[error("Command `{command}` failed: {reason}")]
    CommandFailed { command: String, reason: String },

    #[error("Invalid transition: {0}")]
    InvalidTransition(String),

    #[error("Another dockhand operation is in progress: {0}")]
    Busy(String),

    #[error("Logging error: {0}")]
    LoggingError(String),
}
