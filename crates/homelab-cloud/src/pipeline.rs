//! Provisioning pipeline
//!
//! Runs declared VMs one after another through their provider. Nothing runs
//! concurrently and nothing is retried. Side effects of a failed VM
//! (uploaded media, a half-configured VM) are left in place.

use crate::error::{CloudError, Result};
use crate::provider::ProvisionContext;
use crate::registry::ProviderRegistry;
use crate::report::RunReport;
use homelab_core::{Config, CoreError, Vm};
use std::time::Instant;
use tracing::{error, info, warn};

/// What to do with the remaining VMs once one fails
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Stop the run and return the error
    #[default]
    Abort,
    /// Record the failure and carry on
    Continue,
}

pub struct Pipeline {
    providers: ProviderRegistry,
    ctx: ProvisionContext,
    policy: FailurePolicy,
}

impl Pipeline {
    pub fn new(providers: ProviderRegistry, ctx: ProvisionContext) -> Self {
        Self {
            providers,
            ctx,
            policy: FailurePolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: FailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Provision every VM of `config`.
    ///
    /// With [`FailurePolicy::Abort`] the first failure is returned as is;
    /// with [`FailurePolicy::Continue`] failures are collected in the report.
    pub async fn run(&self, config: &Config) -> Result<RunReport> {
        let started = Instant::now();
        let mut report = RunReport::new();

        if config.vms.is_empty() {
            warn!("No vms declared, nothing to do");
        }

        for vm in &config.vms {
            info!("Provisioning vm {} ({})", vm.id, vm.name);
            match self.provision(vm, config).await {
                Ok(()) => {
                    info!("Provisioned vm {}", vm.id);
                    report.add_success(&vm.id, &vm.name);
                }
                Err(e) => {
                    error!("Failed to provision vm {}: {}", vm.id, e);
                    if self.policy == FailurePolicy::Abort {
                        return Err(e);
                    }
                    report.add_failure(&vm.id, &vm.name, e.kind(), e.to_string());
                }
            }
        }

        report.duration_ms = started.elapsed().as_millis() as u64;
        Ok(report)
    }

    async fn provision(&self, vm: &Vm, config: &Config) -> Result<()> {
        let declared = config
            .provider(&vm.provider.name)
            .ok_or_else(|| CoreError::ProviderNotFound(vm.provider.name.clone()))?;
        let provider = self.providers.create(declared, &self.ctx)?;
        tracing::debug!("Dispatching vm {} to {}", vm.id, provider.display_name());
        provider.create_vm(vm, &config.images).await
    }
}
