pub mod error;

pub use error::*;

use std::path::PathBuf;
use tracing::debug;

/// Env var pointing directly at a bootstrap document
pub const CONFIG_PATH_ENV: &str = "HOMELAB_CONFIG_PATH";
/// Env var overriding the session cache location
pub const SESSION_CACHE_ENV: &str = "HOMELAB_SESSION_CACHE";
/// Env var overriding where images are downloaded and remastered
pub const WORK_DIR_ENV: &str = "HOMELAB_WORK_DIR";

const CONFIG_CANDIDATES: [&str; 4] = ["lab.local.yaml", "lab.yaml", "lab.yml", ".lab.yaml"];
const SESSION_CACHE_FILE: &str = ".proxmox";

/// homelab's own config directory, created on demand
pub fn get_config_dir() -> Result<PathBuf> {
    let config_dir = dirs::config_dir()
        .ok_or(ConfigError::ConfigDirNotFound)?
        .join("homelab");

    if !config_dir.exists() {
        std::fs::create_dir_all(&config_dir)?;
    }

    Ok(config_dir)
}

/// Locate the bootstrap document.
///
/// Search order:
/// 1. `HOMELAB_CONFIG_PATH`
/// 2. current directory: lab.local.yaml, lab.yaml, lab.yml, .lab.yaml
/// 3. the same names under `./.homelab/`
/// 4. `<config dir>/homelab/lab.yaml`
pub fn find_config_file() -> Result<PathBuf> {
    if let Ok(config_path) = std::env::var(CONFIG_PATH_ENV) {
        let path = PathBuf::from(config_path);
        if path.exists() {
            return Ok(path);
        }
        debug!("{} points at missing file {}", CONFIG_PATH_ENV, path.display());
    }

    let current_dir = std::env::current_dir()?;

    for filename in &CONFIG_CANDIDATES {
        let path = current_dir.join(filename);
        if path.exists() {
            return Ok(path);
        }
    }

    let lab_dir = current_dir.join(".homelab");
    if lab_dir.is_dir() {
        for filename in &CONFIG_CANDIDATES {
            let path = lab_dir.join(filename);
            if path.exists() {
                return Ok(path);
            }
        }
    }

    if let Some(config_dir) = dirs::config_dir() {
        let global_config = config_dir.join("homelab").join("lab.yaml");
        if global_config.exists() {
            return Ok(global_config);
        }
    }

    Err(ConfigError::ConfigFileNotFound)
}

/// Where the authenticated session is cached, `~/.proxmox` by default
pub fn session_cache_path() -> PathBuf {
    if let Ok(path) = std::env::var(SESSION_CACHE_ENV)
        && !path.is_empty()
    {
        return PathBuf::from(path);
    }
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(SESSION_CACHE_FILE)
}

/// Directory for downloaded and remastered images
pub fn work_dir() -> PathBuf {
    match std::env::var(WORK_DIR_ENV) {
        Ok(dir) if !dir.is_empty() => PathBuf::from(dir),
        _ => std::env::temp_dir(),
    }
}
