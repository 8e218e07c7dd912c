use super::{config_path, load_config};
use crate::output::Reporter;
use colored::Colorize;
use homelab_cloud::{Level, ResultRecord};
use homelab_core::ArchetypeRegistry;
use std::path::PathBuf;

pub async fn handle(config: Option<PathBuf>, reporter: &Reporter) -> anyhow::Result<()> {
    let path = config_path(config)?;
    let archetypes = ArchetypeRegistry::builtin()?;
    let config = load_config(&path, &archetypes)?;

    let record = ResultRecord::new(
        Level::Info,
        "config_valid",
        format!("Config {} is valid", path.display()),
    )
    .with("providers", config.providers.len())
    .with("images", config.images.len())
    .with("vms", config.vms.len());
    reporter.success(&record)?;

    if reporter.is_json() {
        return Ok(());
    }

    println!();
    println!("Providers: {}", config.providers.len());
    for provider in &config.providers {
        println!("  - {} ({})", provider.name().cyan(), provider.kind());
    }
    println!("Images: {}", config.images.len());
    for image in &config.images {
        let mode = if image.auto { "unattended" } else { "plain" };
        println!("  - {} ({}, {})", image.name.cyan(), image.flavor, mode);
    }
    println!("VMs: {}", config.vms.len());
    for vm in &config.vms {
        println!(
            "  - {} {} [{} on {}, image {}]",
            vm.id,
            vm.name.cyan(),
            vm.archetype,
            vm.provider.name,
            vm.image.name
        );
    }
    Ok(())
}
