//! Base image fetch

use crate::error::{IsoError, Result};
use crate::flavor::Flavor;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;

/// Fails with a dependency error unless `binary` can be executed.
///
/// Bare names are looked up on `PATH`; anything with a separator must exist.
pub async fn require_binary(binary: &Path, hint: &str) -> Result<()> {
    let missing = || IsoError::DependencyMissing {
        binary: binary.display().to_string(),
        hint: hint.to_string(),
    };

    if binary.components().count() > 1 {
        return if binary.is_file() { Ok(()) } else { Err(missing()) };
    }

    let which = Command::new("which")
        .arg(binary)
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .await
        .map_err(|_| missing())?;
    if !which.success() {
        return Err(missing());
    }
    Ok(())
}

#[async_trait]
pub trait Downloader: Send + Sync {
    async fn download(&self, url: &str, dest: &Path) -> Result<()>;
}

/// Downloads through `wget -O <dest> <url>`
#[derive(Debug, Clone)]
pub struct Wget {
    program: PathBuf,
}

impl Default for Wget {
    fn default() -> Self {
        Self {
            program: PathBuf::from("wget"),
        }
    }
}

impl Wget {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_program(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

#[async_trait]
impl Downloader for Wget {
    async fn download(&self, url: &str, dest: &Path) -> Result<()> {
        require_binary(&self.program, "Install wget to download images").await?;

        tracing::debug!("Running: {} -O {} {}", self.program.display(), dest.display(), url);
        let output = Command::new(&self.program)
            .arg("-O")
            .arg(dest)
            .arg(url)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await?;

        if !output.status.success() {
            // wget leaves an empty file behind on failure
            let _ = tokio::fs::remove_file(dest).await;
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(IsoError::DownloadFailed {
                url: url.to_string(),
                path: dest.to_path_buf(),
                message: stderr.lines().last().unwrap_or("").trim().to_string(),
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchOutcome {
    pub path: PathBuf,
    /// An existing file was returned without downloading
    pub reused: bool,
}

pub struct IsoFetcher<D = Wget> {
    downloader: D,
}

impl IsoFetcher<Wget> {
    pub fn wget() -> Self {
        Self::new(Wget::new())
    }
}

impl<D: Downloader> IsoFetcher<D> {
    pub fn new(downloader: D) -> Self {
        Self { downloader }
    }

    /// Download `flavor` into `target_dir`.
    ///
    /// With `reuse`, an existing file at the target path is returned as is,
    /// without any integrity check.
    pub async fn fetch(&self, flavor: &str, target_dir: &Path, reuse: bool) -> Result<FetchOutcome> {
        let flavor = Flavor::lookup(flavor)?;
        let path = flavor.target_path(target_dir);

        if reuse && path.exists() {
            tracing::info!("Reusing file at {}, no download is executed", path.display());
            return Ok(FetchOutcome { path, reused: true });
        }

        if !target_dir.exists() {
            tokio::fs::create_dir_all(target_dir).await?;
        }

        tracing::info!("Downloading {} to {}", flavor.url, path.display());
        self.downloader.download(flavor.url, &path).await?;
        Ok(FetchOutcome {
            path,
            reused: false,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::tempdir;

    /// Writes a placeholder file and counts calls
    #[derive(Default, Clone)]
    struct Counting {
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl Downloader for Counting {
        async fn download(&self, _url: &str, dest: &Path) -> Result<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::fs::write(dest, b"iso").await?;
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_reuse_downloads_at_most_once() {
        let dir = tempdir().unwrap();
        let downloader = Counting::default();
        let fetcher = IsoFetcher::new(downloader.clone());

        let first = fetcher.fetch("ubuntu/bionic64", dir.path(), true).await.unwrap();
        let second = fetcher.fetch("ubuntu/bionic64", dir.path(), true).await.unwrap();

        assert_eq!(downloader.calls.load(Ordering::SeqCst), 1);
        assert_eq!(first.path, second.path);
        assert!(!first.reused);
        assert!(second.reused);
    }

    #[tokio::test]
    async fn test_preexisting_file_reused() {
        let dir = tempdir().unwrap();
        let expected = dir.path().join("ubuntu-16.04.5-server-amd64.iso");
        std::fs::write(&expected, b"cached").unwrap();

        let downloader = Counting::default();
        let fetcher = IsoFetcher::new(downloader.clone());
        let outcome = fetcher.fetch("ubuntu/xenial64", dir.path(), true).await.unwrap();

        assert_eq!(outcome.path, expected);
        assert_eq!(downloader.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_without_reuse_downloads_again() {
        let dir = tempdir().unwrap();
        let downloader = Counting::default();
        let fetcher = IsoFetcher::new(downloader.clone());

        fetcher.fetch("ubuntu/xenial64", dir.path(), false).await.unwrap();
        fetcher.fetch("ubuntu/xenial64", dir.path(), false).await.unwrap();
        assert_eq!(downloader.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_creates_target_dir() {
        let dir = tempdir().unwrap();
        let target = dir.path().join("isos/cache");
        let fetcher = IsoFetcher::new(Counting::default());
        let outcome = fetcher.fetch("ubuntu/xenial64", &target, false).await.unwrap();
        assert!(outcome.path.starts_with(&target));
        assert!(outcome.path.exists());
    }

    #[tokio::test]
    async fn test_unknown_flavor() {
        let dir = tempdir().unwrap();
        let fetcher = IsoFetcher::new(Counting::default());
        let err = fetcher.fetch("arch/latest", dir.path(), true).await.unwrap_err();
        assert!(matches!(err, IsoError::UnsupportedFlavor(_)));
    }

    #[tokio::test]
    async fn test_missing_wget() {
        let dir = tempdir().unwrap();
        let fetcher = IsoFetcher::new(Wget::with_program("/nonexistent/wget"));
        let err = fetcher.fetch("ubuntu/xenial64", dir.path(), false).await.unwrap_err();
        assert!(matches!(err, IsoError::DependencyMissing { .. }));
    }
}
