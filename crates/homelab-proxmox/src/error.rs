//! Proxmox provider error types

use homelab_cloud::CloudError;
use homelab_core::{CoreError, ErrorKind};
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProxmoxError {
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("No session cached at {0}. Run `lab proxmox login` first")]
    NotLoggedIn(String),

    #[error("{method} {path} failed with status {status}: {body}")]
    RequestFailed {
        method: &'static str,
        path: String,
        status: u16,
        body: String,
    },

    #[error("No storage on node {node} accepts {format} content")]
    NoMatchingStorage { node: String, format: String },

    #[error("Image {image} is unattended but vm {vm} has no answer file parameters")]
    MissingAnswers { vm: String, image: String },

    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON parse error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Cloud(#[from] CloudError),
}

impl ProxmoxError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ProxmoxError::AuthenticationFailed(_) | ProxmoxError::NotLoggedIn(_) => {
                ErrorKind::Authentication
            }
            ProxmoxError::MissingAnswers { .. } => ErrorKind::Parse,
            ProxmoxError::Core(e) => e.kind(),
            ProxmoxError::Cloud(e) => e.kind(),
            ProxmoxError::RequestFailed { .. }
            | ProxmoxError::NoMatchingStorage { .. }
            | ProxmoxError::FileNotFound(_)
            | ProxmoxError::Http(_)
            | ProxmoxError::JsonError(_)
            | ProxmoxError::IoError(_) => ErrorKind::Operational,
        }
    }
}

impl From<ProxmoxError> for CloudError {
    fn from(err: ProxmoxError) -> Self {
        match err {
            ProxmoxError::Cloud(e) => e,
            ProxmoxError::Core(e) => CloudError::Core(e),
            ProxmoxError::IoError(e) => CloudError::Io(e),
            e @ ProxmoxError::MissingAnswers { .. } => {
                CloudError::Core(CoreError::Parse(e.to_string()))
            }
            other if other.kind() == ErrorKind::Authentication => {
                CloudError::AuthenticationFailed(other.to_string())
            }
            other => CloudError::Operational(other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, ProxmoxError>;
