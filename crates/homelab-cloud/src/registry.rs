//! Provider registry

use crate::error::{CloudError, Result};
use crate::provider::{Provider, ProvisionContext};
use homelab_core::ProviderConfig;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Builds a provider from its declaration
pub type ProviderFactory =
    Arc<dyn Fn(&ProviderConfig, &ProvisionContext) -> Result<Box<dyn Provider>> + Send + Sync>;

/// Provider type name to factory map, built once at start-up.
#[derive(Default, Clone)]
pub struct ProviderRegistry {
    factories: BTreeMap<String, ProviderFactory>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fails when `name` is already registered.
    pub fn register(&mut self, name: &str, factory: ProviderFactory) -> Result<()> {
        let key = name.to_ascii_lowercase();
        if self.factories.contains_key(&key) {
            return Err(CloudError::DuplicateProvider(name.to_string()));
        }
        tracing::debug!("Registered provider {}", key);
        self.factories.insert(key, factory);
        Ok(())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(&name.to_ascii_lowercase())
    }

    /// Instantiate the provider matching the declaration's type
    pub fn create(
        &self,
        config: &ProviderConfig,
        ctx: &ProvisionContext,
    ) -> Result<Box<dyn Provider>> {
        let kind = config.kind();
        let factory = self
            .factories
            .get(kind.as_str())
            .ok_or_else(|| CloudError::ProviderNotFound(kind.to_string()))?;
        factory(config, ctx)
    }
}
