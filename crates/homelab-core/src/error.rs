use serde::{Serialize, Serializer};
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Error classification shared by every homelab crate.
///
/// The CLI turns the kind of the first error it sees into the process exit code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Config document malformed or failed schema/regex validation
    Parse,
    /// Unsupported provider/archetype/version, or an unresolvable reference
    Api,
    /// A required external binary is missing
    Dependency,
    /// The remote platform rejected the credential
    Authentication,
    /// Anything else that failed while running a stage
    Operational,
}

impl ErrorKind {
    pub fn exit_code(self) -> i32 {
        match self {
            ErrorKind::Operational => 1,
            ErrorKind::Api => 2,
            ErrorKind::Parse => 3,
            ErrorKind::Dependency => 4,
            ErrorKind::Authentication => 10,
        }
    }

    /// Event tag used when the error is reported as a structured record
    pub fn event(self) -> &'static str {
        match self {
            ErrorKind::Parse => "parse_error",
            ErrorKind::Api => "api_error",
            ErrorKind::Dependency => "dependency_error",
            ErrorKind::Authentication => "auth_error",
            ErrorKind::Operational => "operation_error",
        }
    }
}

impl Serialize for ErrorKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.event())
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.event())
    }
}

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Malformed config: {0}")]
    Parse(String),

    #[error("Failed to decode {path}: {message}")]
    Decode { path: PathBuf, message: String },

    #[error("Malformed {field}: {value}")]
    Invalid { field: &'static str, value: String },

    #[error("missing required {0}")]
    Missing(&'static str),

    #[error("api version {0} not supported")]
    UnsupportedVersion(String),

    #[error("unsupported provider {0}")]
    UnsupportedProvider(String),

    #[error("unsupported {provider} archetype {archetype}")]
    UnsupportedArchetype { provider: String, archetype: String },

    #[error("no provider by name {0}")]
    ProviderNotFound(String),

    #[error("no image by name {0}")]
    ImageNotFound(String),

    #[error("archetype {0} is already registered")]
    DuplicateArchetype(String),

    #[error("Failed to open {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl CoreError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CoreError::Parse(_)
            | CoreError::Decode { .. }
            | CoreError::Invalid { .. }
            | CoreError::Missing(_) => ErrorKind::Parse,
            CoreError::UnsupportedVersion(_)
            | CoreError::UnsupportedProvider(_)
            | CoreError::UnsupportedArchetype { .. }
            | CoreError::ProviderNotFound(_)
            | CoreError::ImageNotFound(_)
            | CoreError::DuplicateArchetype(_) => ErrorKind::Api,
            CoreError::Io { .. } => ErrorKind::Operational,
        }
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes_are_distinct() {
        let kinds = [
            ErrorKind::Parse,
            ErrorKind::Api,
            ErrorKind::Dependency,
            ErrorKind::Authentication,
            ErrorKind::Operational,
        ];
        let mut codes: Vec<i32> = kinds.iter().map(|k| k.exit_code()).collect();
        codes.sort();
        codes.dedup();
        assert_eq!(codes.len(), kinds.len());
    }

    #[test]
    fn test_kind_of_core_errors() {
        assert_eq!(
            CoreError::UnsupportedVersion("2".into()).kind(),
            ErrorKind::Api
        );
        assert_eq!(
            CoreError::Invalid {
                field: "memory size",
                value: "2T".into()
            }
            .kind(),
            ErrorKind::Parse
        );
    }
}
