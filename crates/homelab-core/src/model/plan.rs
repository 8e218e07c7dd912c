use serde::{Deserialize, Serialize};

/// Provider-neutral description of the VM an archetype wants created.
///
/// Archetypes only produce plans; the provider owns the remote calls.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VmPlan {
    pub cores: u32,
    pub memory_mb: u64,
    pub drive: DrivePlan,
    /// Host interface the virtual NIC is bridged to
    pub bridge: String,
    pub start: bool,
    /// Present when the archetype can drive an unattended install
    pub answers: Option<AnswerFile>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DrivePlan {
    pub store: String,
    pub size_gb: u64,
}

/// Values fed to the installer of a remastered image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerFile {
    pub timezone: String,
    pub username: String,
    pub password: String,
    pub hostname: String,
    pub domain: String,
    pub ip_address: String,
    pub net_mask: String,
    pub gateway: String,
    pub name_servers: Vec<String>,
}

impl AnswerFile {
    pub const NAME_SERVER_DELIMITER: &'static str = ",";

    pub fn joined_name_servers(&self) -> String {
        self.name_servers.join(Self::NAME_SERVER_DELIMITER)
    }
}
