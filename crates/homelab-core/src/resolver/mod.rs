//! Config resolver
//!
//! Turns a decoded bootstrap document into typed [`Config`] entities.
//! Decoding is schema-first: the version header is checked, then the whole
//! document is decoded into versioned types that reject unknown fields.
//! The first failure aborts the whole document.

use crate::archetype::ArchetypeRegistry;
use crate::error::{CoreError, Result};
use crate::model::{
    Config, Image, ProviderConfig, ProviderKind, ProxmoxConfig, Vm, VmImage, VmProvider,
    scalar_string,
};
use serde::Deserialize;
use std::collections::HashSet;
use tracing::debug;

/// The only document version understood
pub const SUPPORTED_VERSION: &str = "1";

#[derive(Debug, Deserialize)]
struct Header {
    #[serde(deserialize_with = "scalar_string")]
    version: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct DocumentV1 {
    #[allow(dead_code)]
    #[serde(deserialize_with = "scalar_string")]
    version: String,
    #[serde(alias = "providers")]
    infra: Vec<serde_yaml::Value>,
    images: Vec<Image>,
    vms: Vec<VmEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct VmEntry {
    #[serde(deserialize_with = "scalar_string")]
    id: String,
    name: String,
    provider: VmProvider,
    image: VmImage,
    archetype: String,
    #[serde(default)]
    params: serde_yaml::Value,
    #[serde(default)]
    start: bool,
}

/// Resolve a decoded document.
pub fn resolve(document: serde_yaml::Value, archetypes: &ArchetypeRegistry) -> Result<Config> {
    let header: Header = serde_yaml::from_value(document.clone())
        .map_err(|e| CoreError::Parse(format!("unable to read version: {}", e)))?;
    if header.version != SUPPORTED_VERSION {
        return Err(CoreError::UnsupportedVersion(header.version));
    }

    let doc: DocumentV1 = serde_yaml::from_value(document)
        .map_err(|e| CoreError::Parse(e.to_string()))?;

    let providers = resolve_providers(doc.infra)?;
    let images = resolve_images(doc.images)?;

    let mut config = Config {
        providers,
        images,
        vms: Vec::with_capacity(doc.vms.len()),
    };

    let mut ids = HashSet::new();
    for entry in doc.vms {
        if !ids.insert(entry.id.clone()) {
            return Err(CoreError::Parse(format!("duplicate vm id {}", entry.id)));
        }
        let vm = resolve_vm(entry, &config, archetypes)?;
        config.vms.push(vm);
    }

    debug!(
        "Resolved {} providers, {} images, {} vms",
        config.providers.len(),
        config.images.len(),
        config.vms.len()
    );
    Ok(config)
}

fn resolve_providers(raw: Vec<serde_yaml::Value>) -> Result<Vec<ProviderConfig>> {
    if raw.is_empty() {
        return Err(CoreError::Parse("no infra providers declared".to_string()));
    }

    let mut providers: Vec<ProviderConfig> = Vec::with_capacity(raw.len());
    for value in raw {
        let name = match &value {
            serde_yaml::Value::Mapping(map) => map
                .get("name")
                .and_then(|n| n.as_str())
                .map(str::to_string)
                .ok_or_else(|| CoreError::Parse("expect each provider to have a name".into()))?,
            _ => {
                return Err(CoreError::Parse(
                    "expect each provider to be a map".to_string(),
                ));
            }
        };

        let kind = ProviderKind::from_name(&name)
            .ok_or_else(|| CoreError::UnsupportedProvider(name.clone()))?;

        let provider = match kind {
            ProviderKind::Proxmox => {
                let cfg: ProxmoxConfig = serde_yaml::from_value(value).map_err(|e| {
                    CoreError::Parse(format!("unable to decode provider {}: {}", name, e))
                })?;
                ProviderConfig::Proxmox(cfg)
            }
        };

        if providers.iter().any(|p| p.matches(&name)) {
            return Err(CoreError::Parse(format!("duplicate provider {}", name)));
        }
        providers.push(provider);
    }
    Ok(providers)
}

fn resolve_images(images: Vec<Image>) -> Result<Vec<Image>> {
    for (i, image) in images.iter().enumerate() {
        if images[..i].iter().any(|other| other.matches(&image.name)) {
            return Err(CoreError::Parse(format!("duplicate image {}", image.name)));
        }
    }
    Ok(images)
}

fn resolve_vm(entry: VmEntry, config: &Config, archetypes: &ArchetypeRegistry) -> Result<Vm> {
    let provider = match config.provider(&entry.provider.name) {
        Some(p) => p,
        None if ProviderKind::from_name(&entry.provider.name).is_none() => {
            return Err(CoreError::UnsupportedProvider(entry.provider.name));
        }
        None => return Err(CoreError::ProviderNotFound(entry.provider.name)),
    };

    match provider.kind() {
        // qemu vmids are integers
        ProviderKind::Proxmox if entry.id.parse::<u32>().is_err() => {
            return Err(CoreError::Invalid {
                field: "vm id",
                value: entry.id,
            });
        }
        ProviderKind::Proxmox => {}
    }

    if config.image(&entry.image.name).is_none() {
        return Err(CoreError::ImageNotFound(entry.image.name));
    }

    let archetype = archetypes.resolve(provider.kind(), &entry.archetype)?;
    let params = archetype.parse_params(entry.params).map_err(|e| match e {
        CoreError::Invalid { field, value } => CoreError::Parse(format!(
            "unable to parse {} params of vm {}: malformed {} {}",
            archetype.name(),
            entry.id,
            field,
            value
        )),
        other => other,
    })?;

    Ok(Vm {
        id: entry.id,
        name: entry.name,
        provider: entry.provider,
        image: entry.image,
        archetype: archetype.name().to_string(),
        params,
        start: entry.start,
    })
}
