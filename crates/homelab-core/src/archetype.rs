//! VM archetypes
//!
//! An archetype is a named, fixed VM shape exposing a small parameter surface.
//! It owns the schema of its `params` block and the flags of its
//! `vm create <archetype>` command, and turns either into a [`VmPlan`].
//! Archetypes never talk to a platform themselves.

use crate::error::{CoreError, Result};
use crate::model::{AnswerFile, ArchetypeParams, BasicParams, DrivePlan, ProviderKind, VmPlan};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

/// Flag values collected from a command line, keyed by flag name.
pub type FlagValues = BTreeMap<String, String>;

/// Description of one command-line flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlagSpec {
    pub name: &'static str,
    pub default: Option<&'static str>,
    pub help: &'static str,
    pub required: bool,
    /// Boolean switch taking no value
    pub switch: bool,
}

impl FlagSpec {
    pub const fn value(name: &'static str, default: &'static str, help: &'static str) -> Self {
        Self {
            name,
            default: Some(default),
            help,
            required: false,
            switch: false,
        }
    }

    pub const fn required(name: &'static str, help: &'static str) -> Self {
        Self {
            name,
            default: None,
            help,
            required: true,
            switch: false,
        }
    }

    pub const fn switch(name: &'static str, help: &'static str) -> Self {
        Self {
            name,
            default: Some("false"),
            help,
            required: false,
            switch: true,
        }
    }
}

/// Value of `name`, falling back to the flag's default.
pub fn flag_value<'a>(
    specs: &'a [FlagSpec],
    values: &'a FlagValues,
    name: &'static str,
) -> Result<&'a str> {
    if let Some(v) = values.get(name) {
        return Ok(v.as_str());
    }
    specs
        .iter()
        .find(|s| s.name == name)
        .and_then(|s| s.default)
        .ok_or(CoreError::Missing(name))
}

pub fn parse_flag<T: std::str::FromStr>(name: &'static str, raw: &str) -> Result<T> {
    raw.parse::<T>().map_err(|_| CoreError::Invalid {
        field: name,
        value: raw.to_string(),
    })
}

pub trait Archetype: Send + Sync {
    /// Unique name, also the `vm create` subcommand
    fn name(&self) -> &str;

    fn short(&self) -> &str;

    fn long(&self) -> &str;

    fn supports(&self, provider: ProviderKind) -> bool;

    /// Flags specific to this archetype
    fn flags(&self) -> &[FlagSpec];

    /// Decode and validate the `params` block of a VM entry
    fn parse_params(&self, raw: serde_yaml::Value) -> Result<ArchetypeParams>;

    fn plan(&self, params: &ArchetypeParams) -> Result<VmPlan>;

    fn plan_from_flags(&self, values: &FlagValues) -> Result<VmPlan>;
}

/// Name to archetype catalog, built once at start-up and passed down.
#[derive(Default, Clone)]
pub struct ArchetypeRegistry {
    archetypes: BTreeMap<String, Arc<dyn Archetype>>,
}

impl ArchetypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding every archetype shipped with homelab
    pub fn builtin() -> Result<Self> {
        let mut registry = Self::new();
        registry.register(Arc::new(BasicArchetype))?;
        Ok(registry)
    }

    /// Fails when the name is already taken.
    pub fn register(&mut self, archetype: Arc<dyn Archetype>) -> Result<()> {
        let key = archetype.name().to_ascii_lowercase();
        if self.archetypes.contains_key(&key) {
            return Err(CoreError::DuplicateArchetype(archetype.name().to_string()));
        }
        debug!("Registered archetype {}", key);
        self.archetypes.insert(key, archetype);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Archetype>> {
        self.archetypes.get(&name.to_ascii_lowercase()).cloned()
    }

    /// Archetype `name` usable with the given provider type
    pub fn resolve(&self, provider: ProviderKind, name: &str) -> Result<Arc<dyn Archetype>> {
        self.get(name)
            .filter(|a| a.supports(provider))
            .ok_or_else(|| CoreError::UnsupportedArchetype {
                provider: provider.to_string(),
                archetype: name.to_string(),
            })
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn Archetype>> {
        self.archetypes.values()
    }

    pub fn len(&self) -> usize {
        self.archetypes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.archetypes.is_empty()
    }
}

const FLAG_DRIVE_STORAGE: &str = "drive-storage";
const FLAG_DRIVE_SIZE: &str = "drive-size";
const FLAG_CORE: &str = "core";
const FLAG_MEMORY: &str = "memory";
const FLAG_IFACE: &str = "iface";
const FLAG_START: &str = "start";

const BASIC_FLAGS: &[FlagSpec] = &[
    FlagSpec::required(FLAG_DRIVE_STORAGE, "The storage device name for the hard drive"),
    FlagSpec::value(FLAG_DRIVE_SIZE, "64", "The size in GB of the hard drive"),
    FlagSpec::value(FLAG_CORE, "2", "Number of virtual CPU cores"),
    FlagSpec::value(FLAG_MEMORY, "2048", "Amount of virtual memory in MB"),
    FlagSpec::value(FLAG_IFACE, "vmbr0", "Host interface to bridge the network to"),
    FlagSpec::switch(FLAG_START, "Start the VM after successful creation"),
];

/// Linux guest, one socket, one SCSI disk, one bridged VirtIO NIC,
/// installed from a CD-ROM image.
#[derive(Debug, Clone, Copy, Default)]
pub struct BasicArchetype;

impl Archetype for BasicArchetype {
    fn name(&self) -> &str {
        "basic"
    }

    fn short(&self) -> &str {
        "Basic archetype to create a VM"
    }

    fn long(&self) -> &str {
        "Creates a Linux (2.6/3.x or later kernel) VM with one CPU socket and a \
         configurable number of cores, NUMA enabled, one SCSI hard drive on the \
         VirtIO PCI controller and a VirtIO network card bridged to a host \
         interface. The OS is installed from an ISO image mounted as CD-ROM."
    }

    fn supports(&self, provider: ProviderKind) -> bool {
        matches!(provider, ProviderKind::Proxmox)
    }

    fn flags(&self) -> &[FlagSpec] {
        BASIC_FLAGS
    }

    fn parse_params(&self, raw: serde_yaml::Value) -> Result<ArchetypeParams> {
        let params: BasicParams = serde_yaml::from_value(raw)
            .map_err(|e| CoreError::Parse(format!("invalid basic params: {}", e)))?;
        params.validate()?;
        Ok(ArchetypeParams::Basic(params))
    }

    fn plan(&self, params: &ArchetypeParams) -> Result<VmPlan> {
        let ArchetypeParams::Basic(p) = params;
        Ok(VmPlan {
            cores: p.cpu,
            memory_mb: p.memory_mb()?,
            drive: DrivePlan {
                store: p.drive.store.clone(),
                size_gb: p.drive_gb()?,
            },
            bridge: p.network.interface.clone(),
            start: p.start,
            answers: Some(AnswerFile {
                timezone: p.system.timezone.clone(),
                username: p.system.username.clone(),
                password: p.system.password.clone(),
                hostname: p.system.hostname.clone(),
                domain: p.system.domain.clone(),
                ip_address: p.network.ip.clone(),
                net_mask: p.network.mask.clone(),
                gateway: p.network.gateway.clone(),
                name_servers: p.network.dns.clone(),
            }),
        })
    }

    fn plan_from_flags(&self, values: &FlagValues) -> Result<VmPlan> {
        let get = |name: &'static str| flag_value(BASIC_FLAGS, values, name);

        let memory_mb = parse_flag::<u64>(FLAG_MEMORY, get(FLAG_MEMORY)?)?;
        let size_gb = parse_flag::<u64>(FLAG_DRIVE_SIZE, get(FLAG_DRIVE_SIZE)?)?;

        Ok(VmPlan {
            cores: parse_flag(FLAG_CORE, get(FLAG_CORE)?)?,
            memory_mb,
            drive: DrivePlan {
                store: get(FLAG_DRIVE_STORAGE)?.to_string(),
                size_gb,
            },
            bridge: get(FLAG_IFACE)?.to_string(),
            start: parse_flag(FLAG_START, get(FLAG_START)?)?,
            answers: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn values(pairs: &[(&str, &str)]) -> FlagValues {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_builtin_registry() {
        let registry = ArchetypeRegistry::builtin().unwrap();
        assert_eq!(registry.len(), 1);
        assert!(registry.get("BASIC").is_some());
        assert!(registry.resolve(ProviderKind::Proxmox, "Basic").is_ok());
    }

    #[test]
    fn test_duplicate_registration_rejected() {
        let mut registry = ArchetypeRegistry::builtin().unwrap();
        let err = registry.register(Arc::new(BasicArchetype)).err().unwrap();
        assert!(matches!(err, CoreError::DuplicateArchetype(name) if name == "basic"));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_resolve_unknown() {
        let registry = ArchetypeRegistry::builtin().unwrap();
        let err = registry.resolve(ProviderKind::Proxmox, "gpu").err().unwrap();
        assert_eq!(err.to_string(), "unsupported proxmox archetype gpu");
    }

    #[test]
    fn test_plan_from_flags_defaults() {
        let plan = BasicArchetype
            .plan_from_flags(&values(&[("drive-storage", "local-lvm")]))
            .unwrap();
        assert_eq!(plan.cores, 2);
        assert_eq!(plan.memory_mb, 2048);
        assert_eq!(plan.drive.size_gb, 64);
        assert_eq!(plan.drive.store, "local-lvm");
        assert_eq!(plan.bridge, "vmbr0");
        assert!(!plan.start);
        assert!(plan.answers.is_none());
    }

    #[test]
    fn test_plan_from_flags_overrides() {
        let plan = BasicArchetype
            .plan_from_flags(&values(&[
                ("drive-storage", "ssd"),
                ("core", "8"),
                ("memory", "16384"),
                ("start", "true"),
            ]))
            .unwrap();
        assert_eq!(plan.cores, 8);
        assert_eq!(plan.memory_mb, 16384);
        assert!(plan.start);
    }

    #[test]
    fn test_plan_from_flags_errors() {
        let err = BasicArchetype.plan_from_flags(&values(&[])).unwrap_err();
        assert!(matches!(err, CoreError::Missing("drive-storage")));

        let err = BasicArchetype
            .plan_from_flags(&values(&[("drive-storage", "ssd"), ("core", "two")]))
            .unwrap_err();
        assert!(matches!(err, CoreError::Invalid { field: "core", .. }));
    }
}
