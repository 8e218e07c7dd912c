//! Run report

use homelab_core::ErrorKind;
use serde::Serialize;

/// Outcome of one bootstrap run
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunReport {
    /// VMs provisioned successfully
    pub provisioned: Vec<VmOutcome>,

    /// VMs whose provisioning failed
    pub failed: Vec<VmFailure>,

    /// Total execution time in milliseconds
    pub duration_ms: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct VmOutcome {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct VmFailure {
    pub id: String,
    pub name: String,
    pub kind: ErrorKind,
    pub error: String,
}

impl RunReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn add_success(&mut self, id: &str, name: &str) {
        self.provisioned.push(VmOutcome {
            id: id.to_string(),
            name: name.to_string(),
        });
    }

    pub fn add_failure(&mut self, id: &str, name: &str, kind: ErrorKind, error: String) {
        self.failed.push(VmFailure {
            id: id.to_string(),
            name: name.to_string(),
            kind,
            error,
        });
    }

    /// Kind of the first failure, which decides the exit code
    pub fn first_failure_kind(&self) -> Option<ErrorKind> {
        self.failed.first().map(|f| f.kind)
    }
}
