//! External gateway
//!
//! Acquires and remasters installation media on behalf of a provider.
//! [`HelperGateway`] shells out to a helper speaking the [`protocol`];
//! in-process implementations live in the media crates.

mod helper;
pub mod protocol;

pub use helper::HelperGateway;
pub use protocol::{Level, ResultRecord};

use crate::error::Result;
use async_trait::async_trait;
use homelab_core::{AnswerFile, Image};
use std::path::{Path, PathBuf};

#[async_trait]
pub trait MediaGateway: Send + Sync {
    /// Local path of the base medium for `image.flavor`, downloading it
    /// unless `image.reuse` is set and the file already exists
    async fn ensure_base_image(&self, image: &Image) -> Result<PathBuf>;

    /// Build an unattended-install medium from `base`
    async fn remaster(&self, image: &Image, base: &Path, answers: &AnswerFile) -> Result<PathBuf>;
}
