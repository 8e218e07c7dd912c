use serde::{Deserialize, Serialize};
use std::fmt;

/// Provider types known to the resolver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    Proxmox,
}

impl ProviderKind {
    pub const ALL: &'static [ProviderKind] = &[ProviderKind::Proxmox];

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|k| k.as_str().eq_ignore_ascii_case(name))
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ProviderKind::Proxmox => "proxmox",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A declared infrastructure provider.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ProviderConfig {
    Proxmox(ProxmoxConfig),
}

impl ProviderConfig {
    pub fn kind(&self) -> ProviderKind {
        match self {
            ProviderConfig::Proxmox(_) => ProviderKind::Proxmox,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            ProviderConfig::Proxmox(p) => &p.name,
        }
    }

    pub fn matches(&self, name: &str) -> bool {
        self.name().eq_ignore_ascii_case(name)
    }

    pub fn as_proxmox(&self) -> Option<&ProxmoxConfig> {
        match self {
            ProviderConfig::Proxmox(p) => Some(p),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProxmoxConfig {
    pub name: String,
    /// Base URL of the API, e.g. `https://192.168.1.2:8006`
    pub api: String,
    pub identity: Identity,
    #[serde(default)]
    pub datastores: Vec<Datastore>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Identity {
    #[serde(default = "default_realm")]
    pub realm: String,
    #[serde(default = "default_username")]
    pub username: String,
    pub password: String,
}

fn default_realm() -> String {
    "pam".to_string()
}

fn default_username() -> String {
    "root".to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Datastore {
    pub name: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl ProxmoxConfig {
    /// First datastore carrying the given tag (case-insensitive).
    pub fn datastore_tagged(&self, tag: &str) -> Option<&Datastore> {
        self.datastores
            .iter()
            .find(|d| d.tags.iter().any(|t| t.eq_ignore_ascii_case(tag)))
    }
}
