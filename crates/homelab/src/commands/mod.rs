pub mod bootstrap;
pub mod iso;
pub mod proxmox;
pub mod validate;

use homelab_core::{ArchetypeRegistry, Config};
use std::path::{Path, PathBuf};

/// `explicit`, or the discovered config document
pub fn config_path(explicit: Option<PathBuf>) -> anyhow::Result<PathBuf> {
    match explicit {
        Some(path) => Ok(path),
        None => Ok(homelab_config::find_config_file()?),
    }
}

pub fn load_config(path: &Path, archetypes: &ArchetypeRegistry) -> anyhow::Result<Config> {
    tracing::debug!("Loading config from {}", path.display());
    Ok(homelab_core::load_config_file(path, archetypes)?)
}
