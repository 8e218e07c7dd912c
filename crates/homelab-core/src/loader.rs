//! Config file loading

use crate::archetype::ArchetypeRegistry;
use crate::error::{CoreError, Result};
use crate::model::Config;
use crate::resolver;
use std::path::Path;
use tracing::{debug, info, instrument};

/// Read, decode and resolve a bootstrap document from disk.
#[instrument(skip(archetypes), fields(path = %path.display()))]
pub fn load_config_file(path: &Path, archetypes: &ArchetypeRegistry) -> Result<Config> {
    info!("Loading config");
    let content = std::fs::read_to_string(path).map_err(|e| CoreError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;
    debug!("Read {} bytes", content.len());

    let document: serde_yaml::Value =
        serde_yaml::from_str(&content).map_err(|e| CoreError::Decode {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
    resolver::resolve(document, archetypes)
}

/// Decode and resolve a bootstrap document held in memory.
pub fn parse_config_str(content: &str, archetypes: &ArchetypeRegistry) -> Result<Config> {
    let document: serde_yaml::Value =
        serde_yaml::from_str(content).map_err(|e| CoreError::Parse(e.to_string()))?;
    resolver::resolve(document, archetypes)
}
