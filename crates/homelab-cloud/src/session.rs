//! Session cache
//!
//! Persists one authenticated session to a per-user JSON file
//! (`~/.proxmox` by default). Writes go to a temp file in the same
//! directory which is then renamed over the cache, so concurrent readers
//! see either the old or the new record, never a torn one.

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;

/// Authenticated credential bundle. Valid until the platform rejects it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub username: String,
    pub ticket: String,
    pub csrf_token: String,
    pub api_server: String,
}

#[derive(Debug, Clone)]
pub struct SessionCache {
    path: PathBuf,
}

impl SessionCache {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Cached session, or `None` when nothing was cached yet
    pub async fn load(&self) -> Result<Option<Session>> {
        if !self.path.exists() {
            tracing::debug!("No session cached at {}", self.path.display());
            return Ok(None);
        }

        let content = fs::read_to_string(&self.path).await?;
        let session: Session = serde_json::from_str(&content)?;
        tracing::debug!("Loaded session for {}", session.username);
        Ok(Some(session))
    }

    /// Overwrite the cache. The file is readable by the owner only.
    pub async fn save(&self, session: &Session) -> Result<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            fs::create_dir_all(parent).await?;
        }

        let tmp = self.temp_path();
        let content = serde_json::to_vec_pretty(session)?;

        let mut options = fs::OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        options.mode(0o600);

        let mut file = options.open(&tmp).await?;
        file.write_all(&content).await?;
        file.sync_all().await?;
        drop(file);

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&tmp, std::fs::Permissions::from_mode(0o600)).await?;
        }

        fs::rename(&tmp, &self.path).await?;
        tracing::debug!("Saved session to {}", self.path.display());
        Ok(())
    }

    /// Forget the cached session
    pub async fn clear(&self) -> Result<()> {
        if self.path.exists() {
            fs::remove_file(&self.path).await?;
            tracing::debug!("Cleared session cache");
        }
        Ok(())
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "session".into());
        name.push(format!(".{}.tmp", std::process::id()));
        self.path.with_file_name(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn session() -> Session {
        Session {
            username: "root@pam".to_string(),
            ticket: "PVE:root@pam:5C1F0A2B::sig".to_string(),
            csrf_token: "5C1F0A2B:token".to_string(),
            api_server: "https://192.168.1.2:8006".to_string(),
        }
    }

    #[tokio::test]
    async fn test_session_round_trip() {
        let temp_dir = tempdir().unwrap();
        let cache = SessionCache::new(temp_dir.path().join(".proxmox"));

        cache.save(&session()).await.unwrap();
        let loaded = cache.load().await.unwrap();
        assert_eq!(loaded, Some(session()));
    }

    #[tokio::test]
    async fn test_missing_cache() {
        let temp_dir = tempdir().unwrap();
        let cache = SessionCache::new(temp_dir.path().join(".proxmox"));
        assert_eq!(cache.load().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_overwrite_and_clear() {
        let temp_dir = tempdir().unwrap();
        let cache = SessionCache::new(temp_dir.path().join("nested/.proxmox"));

        cache.save(&session()).await.unwrap();
        let mut newer = session();
        newer.ticket = "PVE:root@pam:5C1F0FFF::sig".to_string();
        cache.save(&newer).await.unwrap();
        assert_eq!(cache.load().await.unwrap(), Some(newer));

        // no temp files left behind
        let entries = std::fs::read_dir(temp_dir.path().join("nested")).unwrap().count();
        assert_eq!(entries, 1);

        cache.clear().await.unwrap();
        assert_eq!(cache.load().await.unwrap(), None);
        cache.clear().await.unwrap();
    }

    #[tokio::test]
    async fn test_wire_format() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join(".proxmox");
        std::fs::write(
            &path,
            r#"{"username":"root@pam","ticket":"t","csrf_token":"c","api_server":"https://pve:8006"}"#,
        )
        .unwrap();

        let loaded = SessionCache::new(&path).load().await.unwrap().unwrap();
        assert_eq!(loaded.csrf_token, "c");
        assert_eq!(loaded.api_server, "https://pve:8006");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_owner_only_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join(".proxmox");
        SessionCache::new(&path).save(&session()).await.unwrap();

        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}
