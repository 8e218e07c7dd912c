use super::{config_path, load_config};
use crate::output::Reporter;
use homelab_cloud::{
    FailurePolicy, HelperGateway, Level, MediaGateway, Pipeline, ProviderRegistry,
    ProvisionContext, ResultRecord, RunReport, SessionCache,
};
use homelab_core::{ArchetypeRegistry, ErrorKind};
use homelab_iso::IsoGateway;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;

pub struct Options {
    pub config: Option<PathBuf>,
    pub keep_going: bool,
    pub force_login: bool,
    pub helper: Option<PathBuf>,
    pub debug: bool,
}

/// Some VMs of a `--keep-going` run failed
#[derive(Error, Debug)]
#[error("{failed} of {total} vms failed to provision")]
pub struct RunFailed {
    pub kind: ErrorKind,
    pub failed: usize,
    pub total: usize,
}

fn media_gateway(options: &Options, work_dir: PathBuf) -> Arc<dyn MediaGateway> {
    match &options.helper {
        Some(program) => {
            tracing::debug!("Using helper {} for media", program.display());
            Arc::new(HelperGateway::new(program, work_dir).with_debug(options.debug))
        }
        None => Arc::new(IsoGateway::new(work_dir).with_debug(options.debug)),
    }
}

fn provider_registry() -> anyhow::Result<ProviderRegistry> {
    let mut registry = ProviderRegistry::new();
    homelab_proxmox::register(&mut registry)?;
    Ok(registry)
}

pub async fn handle(options: Options, reporter: &Reporter) -> anyhow::Result<()> {
    let path = config_path(options.config.clone())?;
    let archetypes = Arc::new(ArchetypeRegistry::builtin()?);
    let config = load_config(&path, &archetypes)?;

    let session = SessionCache::new(homelab_config::session_cache_path());
    if options.force_login {
        session.clear().await?;
    }

    let work_dir = homelab_config::work_dir();
    tokio::fs::create_dir_all(&work_dir).await?;

    let ctx = ProvisionContext::new(session, media_gateway(&options, work_dir), archetypes);
    let policy = if options.keep_going {
        FailurePolicy::Continue
    } else {
        FailurePolicy::Abort
    };
    let pipeline = Pipeline::new(provider_registry()?, ctx).with_policy(policy);

    let report = pipeline.run(&config).await?;
    summarize(&report, reporter)
}

fn summarize(report: &RunReport, reporter: &Reporter) -> anyhow::Result<()> {
    for vm in &report.provisioned {
        let record = ResultRecord::new(
            Level::Info,
            "vm_provisioned",
            format!("VM {} ({}) provisioned", vm.id, vm.name),
        )
        .with("id", vm.id.clone());
        reporter.success(&record)?;
    }
    for vm in &report.failed {
        let record = ResultRecord::new(
            Level::Error,
            vm.kind.event(),
            format!("VM {} ({}): {}", vm.id, vm.name, vm.error),
        )
        .with("id", vm.id.clone());
        reporter.emit(&record)?;
    }

    match report.first_failure_kind() {
        Some(kind) => Err(RunFailed {
            kind,
            failed: report.failed.len(),
            total: report.failed.len() + report.provisioned.len(),
        }
        .into()),
        None => {
            reporter.info(
                "bootstrap_success",
                format!(
                    "{} vms provisioned in {} ms",
                    report.provisioned.len(),
                    report.duration_ms
                ),
            )?;
            Ok(())
        }
    }
}
