use homelab_core::ErrorKind;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Config directory not found")]
    ConfigDirNotFound,

    #[error(
        "Config file not found. Looked in:\n\
        - current directory: lab.local.yaml, lab.yaml, lab.yml, .lab.yaml\n\
        - ./.homelab/ directory\n\
        - <config dir>/homelab/lab.yaml\n\
        Set HOMELAB_CONFIG_PATH or pass --config to point at a file"
    )]
    ConfigFileNotFound,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ConfigError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ConfigError::ConfigFileNotFound => ErrorKind::Api,
            ConfigError::ConfigDirNotFound | ConfigError::Io(_) => ErrorKind::Operational,
        }
    }
}

pub type Result<T> = std::result::Result<T, ConfigError>;
