//! In-process media gateway

use crate::fetch::{Downloader, IsoFetcher, Wget};
use crate::remaster::{Remaster, RemasterRequest};
use async_trait::async_trait;
use homelab_cloud::{MediaGateway, Result};
use homelab_core::{AnswerFile, Image};
use std::path::{Path, PathBuf};

/// Fetches and remasters media directly, without a helper process.
pub struct IsoGateway<D = Wget> {
    fetcher: IsoFetcher<D>,
    remaster: Remaster,
    work_dir: PathBuf,
    debug: bool,
}

impl IsoGateway<Wget> {
    pub fn new(work_dir: impl Into<PathBuf>) -> Self {
        Self::with_downloader(Wget::new(), work_dir)
    }
}

impl<D: Downloader> IsoGateway<D> {
    pub fn with_downloader(downloader: D, work_dir: impl Into<PathBuf>) -> Self {
        Self {
            fetcher: IsoFetcher::new(downloader),
            remaster: Remaster::new(),
            work_dir: work_dir.into(),
            debug: false,
        }
    }

    pub fn with_remaster(mut self, remaster: Remaster) -> Self {
        self.remaster = remaster;
        self
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }
}

#[async_trait]
impl<D: Downloader> MediaGateway for IsoGateway<D> {
    async fn ensure_base_image(&self, image: &Image) -> Result<PathBuf> {
        let outcome = self
            .fetcher
            .fetch(&image.flavor, &self.work_dir, image.reuse)
            .await?;
        Ok(outcome.path)
    }

    async fn remaster(&self, image: &Image, base: &Path, answers: &AnswerFile) -> Result<PathBuf> {
        let request = RemasterRequest {
            flavor: image.flavor.clone(),
            input: base.to_path_buf(),
            output: None,
            workspace: self.work_dir.clone(),
            usb_boot: image.usb_boot,
            reuse: image.reuse,
            debug: self.debug,
            answers: answers.clone(),
        };
        Ok(self.remaster.run(&request).await?)
    }
}
