//! Flavor catalog

use crate::error::{IsoError, Result};
use std::path::{Path, PathBuf};

/// A downloadable OS medium
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Flavor {
    pub id: &'static str,
    pub url: &'static str,
    /// Codename understood by the remaster script, if the medium can be remastered
    pub seed: Option<&'static str>,
}

pub const CATALOG: &[Flavor] = &[
    Flavor {
        id: "ubuntu/bionic64.live",
        url: "http://releases.ubuntu.com/bionic/ubuntu-18.04.1-live-server-amd64.iso",
        seed: None,
    },
    Flavor {
        id: "ubuntu/bionic64",
        url: "http://cdimage.ubuntu.com/ubuntu/releases/18.04/release/ubuntu-18.04.1-server-amd64.iso",
        seed: Some("bionic64"),
    },
    Flavor {
        id: "ubuntu/xenial64",
        url: "http://releases.ubuntu.com/xenial/ubuntu-16.04.5-server-amd64.iso",
        seed: Some("xenial64"),
    },
];

impl Flavor {
    pub fn lookup(id: &str) -> Result<&'static Flavor> {
        CATALOG
            .iter()
            .find(|f| f.id.eq_ignore_ascii_case(id))
            .ok_or_else(|| IsoError::UnsupportedFlavor(id.to_string()))
    }

    /// Last segment of the download URL
    pub fn file_name(&self) -> &'static str {
        self.url.rsplit('/').next().unwrap_or(self.url)
    }

    pub fn target_path(&self, dir: &Path) -> PathBuf {
        dir.join(self.file_name())
    }

    pub fn seed_codename(&self) -> Result<&'static str> {
        self.seed
            .ok_or_else(|| IsoError::NotRemasterable(self.id.to_string()))
    }
}

/// Flavor ids, as listed in `lab iso` help
pub fn flavor_ids() -> Vec<&'static str> {
    CATALOG.iter().map(|f| f.id).collect()
}
