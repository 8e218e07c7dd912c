//! Cloud provider error types

use homelab_core::{CoreError, ErrorKind};
use thiserror::Error;

/// Errors raised while provisioning
#[derive(Error, Debug)]
pub enum CloudError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("Provider not found: {0}")]
    ProviderNotFound(String),

    #[error("Provider already registered: {0}")]
    DuplicateProvider(String),

    #[error("API error: {0}")]
    ApiError(String),

    #[error("{binary} not found. {hint}")]
    DependencyMissing { binary: String, hint: String },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("{0}")]
    Operational(String),

    #[error("Command execution failed: {0}")]
    CommandFailed(String),

    #[error("unknown return status from {0}")]
    UnknownStatus(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CloudError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CloudError::Core(e) => e.kind(),
            CloudError::ProviderNotFound(_)
            | CloudError::DuplicateProvider(_)
            | CloudError::ApiError(_) => ErrorKind::Api,
            CloudError::DependencyMissing { .. } => ErrorKind::Dependency,
            CloudError::AuthenticationFailed(_) => ErrorKind::Authentication,
            CloudError::Operational(_)
            | CloudError::CommandFailed(_)
            | CloudError::UnknownStatus(_)
            | CloudError::Io(_)
            | CloudError::Json(_) => ErrorKind::Operational,
        }
    }

    pub fn dependency(binary: impl Into<String>, hint: impl Into<String>) -> Self {
        CloudError::DependencyMissing {
            binary: binary.into(),
            hint: hint.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, CloudError>;
