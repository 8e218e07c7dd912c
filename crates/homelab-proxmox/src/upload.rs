//! Image upload

use crate::api::PlatformApi;
use crate::error::{ProxmoxError, Result};
use homelab_cloud::Session;
use std::path::Path;

/// Content type of installation media
pub const ISO_FORMAT: &str = "iso";

/// `requested`, or the first storage on `node` accepting `format`
pub async fn resolve_storage<A: PlatformApi + ?Sized>(
    api: &A,
    session: &Session,
    node: &str,
    format: &str,
    requested: Option<&str>,
) -> Result<String> {
    if let Some(storage) = requested.map(str::trim).filter(|s| !s.is_empty()) {
        return Ok(storage.to_string());
    }

    let storages = api.list_storage(session, node).await?;
    storages
        .into_iter()
        .find(|s| s.accepts(format))
        .map(|s| {
            tracing::debug!("Matched storage {} for {} content", s.storage, format);
            s.storage
        })
        .ok_or_else(|| ProxmoxError::NoMatchingStorage {
            node: node.to_string(),
            format: format.to_string(),
        })
}

/// Upload `file` and return the storage it landed on
pub async fn upload_file<A: PlatformApi + ?Sized>(
    api: &A,
    session: &Session,
    node: &str,
    storage: Option<&str>,
    format: &str,
    file: &Path,
) -> Result<String> {
    if !file.is_file() {
        return Err(ProxmoxError::FileNotFound(file.to_path_buf()));
    }

    let storage = resolve_storage(api, session, node, format, storage).await?;
    tracing::info!("Uploading {} to {}/{}", file.display(), node, storage);
    api.upload(session, node, &storage, format, file).await?;
    Ok(storage)
}
