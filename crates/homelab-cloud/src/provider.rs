//! Provider trait definition

use crate::error::Result;
use crate::gateway::MediaGateway;
use crate::session::SessionCache;
use async_trait::async_trait;
use homelab_core::{ArchetypeRegistry, Image, Vm};
use std::sync::Arc;

/// Infrastructure provider abstraction trait
///
/// A provider turns one declared VM into a running machine on its platform.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Returns the provider type name (e.g., "proxmox")
    fn name(&self) -> &str;

    /// Returns the provider display name for UI
    fn display_name(&self) -> &str;

    /// Provision `vm`, resolving its image from `images`
    async fn create_vm(&self, vm: &Vm, images: &[Image]) -> Result<()>;
}

/// Collaborators shared by every provider of a run
#[derive(Clone)]
pub struct ProvisionContext {
    pub session: SessionCache,
    pub gateway: Arc<dyn MediaGateway>,
    pub archetypes: Arc<ArchetypeRegistry>,
}

impl ProvisionContext {
    pub fn new(
        session: SessionCache,
        gateway: Arc<dyn MediaGateway>,
        archetypes: Arc<ArchetypeRegistry>,
    ) -> Self {
        Self {
            session,
            gateway,
            archetypes,
        }
    }
}
