use super::size::{Size, validate_ipv4_syntax};
use crate::error::Result;
use serde::{Deserialize, Serialize};

/// Archetype-specific parameter payload attached to a VM.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "archetype", rename_all = "lowercase")]
pub enum ArchetypeParams {
    Basic(BasicParams),
}

impl ArchetypeParams {
    pub fn as_basic(&self) -> Option<&BasicParams> {
        match self {
            ArchetypeParams::Basic(p) => Some(p),
        }
    }
}

/// Parameters of the `basic` archetype.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BasicParams {
    pub cpu: u32,
    pub memory: String,
    pub drive: DriveParams,
    pub network: NetworkParams,
    pub system: SystemParams,
    /// Start the VM once created, in addition to the VM-level flag
    #[serde(default)]
    pub start: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DriveParams {
    pub store: String,
    pub size: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NetworkParams {
    #[serde(default = "default_interface")]
    pub interface: String,
    pub ip: String,
    #[serde(default = "default_mask")]
    pub mask: String,
    pub gateway: String,
    #[serde(default = "default_dns")]
    pub dns: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SystemParams {
    #[serde(default = "default_timezone")]
    pub timezone: String,
    pub username: String,
    pub password: String,
    pub hostname: String,
    #[serde(default = "default_domain")]
    pub domain: String,
}

fn default_interface() -> String {
    "vmbr0".to_string()
}

fn default_mask() -> String {
    "255.255.255.0".to_string()
}

fn default_dns() -> Vec<String> {
    vec!["8.8.8.8".to_string()]
}

fn default_timezone() -> String {
    "America/Toronto".to_string()
}

fn default_domain() -> String {
    "home.local".to_string()
}

impl BasicParams {
    /// Check size strings and every address-shaped network field.
    pub fn validate(&self) -> Result<()> {
        Size::parse("memory size", &self.memory)?;
        Size::parse("drive size", &self.drive.size)?;

        validate_ipv4_syntax("ip address", &self.network.ip)?;
        validate_ipv4_syntax("net mask", &self.network.mask)?;
        validate_ipv4_syntax("gateway", &self.network.gateway)?;
        for dns in &self.network.dns {
            validate_ipv4_syntax("name server", dns)?;
        }
        Ok(())
    }

    pub fn memory_mb(&self) -> Result<u64> {
        Ok(Size::parse("memory size", &self.memory)?.to_mb())
    }

    pub fn drive_gb(&self) -> Result<u64> {
        Ok(Size::parse("drive size", &self.drive.size)?.to_gb())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CoreError;

    const PARAMS: &str = r#"
cpu: 2
memory: 2G
drive:
  store: local-lvm
  size: 32G
network:
  ip: 192.168.1.20
  gateway: 192.168.1.1
system:
  username: ops
  password: secret
  hostname: node1
"#;

    fn params() -> BasicParams {
        serde_yaml::from_str(PARAMS).unwrap()
    }

    #[test]
    fn test_defaults_applied() {
        let p = params();
        assert_eq!(p.network.interface, "vmbr0");
        assert_eq!(p.network.mask, "255.255.255.0");
        assert_eq!(p.network.dns, vec!["8.8.8.8"]);
        assert_eq!(p.system.timezone, "America/Toronto");
        assert_eq!(p.system.domain, "home.local");
        assert!(!p.start);
        p.validate().unwrap();
    }

    #[test]
    fn test_size_conversions() {
        let mut p = params();
        assert_eq!(p.memory_mb().unwrap(), 2048);
        assert_eq!(p.drive_gb().unwrap(), 32);

        p.memory = "512M".into();
        p.drive.size = "2048M".into();
        assert_eq!(p.memory_mb().unwrap(), 512);
        assert_eq!(p.drive_gb().unwrap(), 2);
    }

    #[test]
    fn test_rejects_bad_memory() {
        let mut p = params();
        p.memory = "2TB".into();
        let err = p.validate().unwrap_err();
        assert!(matches!(err, CoreError::Invalid { field: "memory size", .. }));
    }

    #[test]
    fn test_rejects_bad_dns() {
        let mut p = params();
        p.network.dns.push("dns.google".into());
        let err = p.validate().unwrap_err();
        assert!(matches!(err, CoreError::Invalid { field: "name server", .. }));
    }

    #[test]
    fn test_rejects_unknown_field() {
        let yaml = format!("{PARAMS}\nsockets: 2\n");
        assert!(serde_yaml::from_str::<BasicParams>(&yaml).is_err());
    }
}
