use super::image::{Image, find_image};
use super::provider::ProviderConfig;
use super::vm::Vm;
use serde::Serialize;

/// Fully resolved bootstrap document.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Config {
    pub providers: Vec<ProviderConfig>,
    pub images: Vec<Image>,
    pub vms: Vec<Vm>,
}

impl Config {
    pub fn provider(&self, name: &str) -> Option<&ProviderConfig> {
        self.providers.iter().find(|p| p.matches(name))
    }

    pub fn image(&self, name: &str) -> Option<&Image> {
        find_image(&self.images, name)
    }
}
