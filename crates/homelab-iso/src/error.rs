use homelab_cloud::CloudError;
use homelab_core::ErrorKind;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum IsoError {
    #[error("flavor {0} not supported")]
    UnsupportedFlavor(String),

    #[error("flavor {0} cannot be remastered")]
    NotRemasterable(String),

    #[error("{binary} not found. {hint}")]
    DependencyMissing { binary: String, hint: String },

    #[error("download file {url} to {} failed: {message}", .path.display())]
    DownloadFailed {
        url: String,
        path: PathBuf,
        message: String,
    },

    #[error("Command execution failed: {0}")]
    CommandFailed(String),

    #[error("Input image not found: {0}")]
    InputNotFound(PathBuf),

    #[error("Template error: {0}")]
    Template(#[from] tera::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl IsoError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            IsoError::UnsupportedFlavor(_) | IsoError::NotRemasterable(_) => ErrorKind::Api,
            IsoError::DependencyMissing { .. } => ErrorKind::Dependency,
            IsoError::DownloadFailed { .. }
            | IsoError::CommandFailed(_)
            | IsoError::InputNotFound(_)
            | IsoError::Template(_)
            | IsoError::Io(_) => ErrorKind::Operational,
        }
    }
}

impl From<IsoError> for CloudError {
    fn from(err: IsoError) -> Self {
        match err {
            IsoError::DependencyMissing { binary, hint } => {
                CloudError::DependencyMissing { binary, hint }
            }
            IsoError::Io(e) => CloudError::Io(e),
            IsoError::CommandFailed(message) => CloudError::CommandFailed(message),
            other if other.kind() == ErrorKind::Api => CloudError::ApiError(other.to_string()),
            other => CloudError::Operational(other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, IsoError>;
