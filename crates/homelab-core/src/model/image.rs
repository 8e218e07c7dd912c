use serde::{Deserialize, Serialize};

/// OS image definition. Immutable once parsed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Image {
    pub name: String,
    pub flavor: String,
    /// Remaster into an unattended-install medium
    #[serde(default)]
    pub auto: bool,
    #[serde(default, rename = "usb-boot")]
    pub usb_boot: bool,
    /// Skip the download when the file is already on disk
    #[serde(default)]
    pub reuse: bool,
}

impl Image {
    pub fn matches(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
    }
}

/// Case-insensitive lookup by image name.
pub fn find_image<'a>(images: &'a [Image], name: &str) -> Option<&'a Image> {
    images.iter().find(|i| i.matches(name))
}
