//! VM creation
//!
//! The single create/start code path, shared by the bootstrap pipeline and
//! `lab proxmox vm create`.

use crate::api::PlatformApi;
use crate::error::Result;
use homelab_cloud::Session;
use homelab_core::archetype::{FlagSpec, FlagValues, flag_value};
use homelab_core::{Archetype, CoreError, VmPlan};

pub const DEFAULT_NODE: &str = "pve";

pub const FLAG_NODE: &str = "node";
pub const FLAG_ID: &str = "id";
pub const FLAG_NAME: &str = "name";
pub const FLAG_ISO_STORAGE: &str = "iso-storage";
pub const FLAG_ISO_IMAGE: &str = "iso-image";

/// Flags every `vm create <archetype>` command takes
pub const COMMON_CREATE_FLAGS: &[FlagSpec] = &[
    FlagSpec::value(FLAG_NODE, DEFAULT_NODE, "The node which VM will be created on"),
    FlagSpec::required(FLAG_ID, "The ID number of the new VM. Must be unique"),
    FlagSpec::required(FLAG_NAME, "The name of the new VM"),
    FlagSpec::value(FLAG_ISO_STORAGE, "local", "The storage holding the ISO installation media"),
    FlagSpec::required(FLAG_ISO_IMAGE, "File name of the ISO installation media"),
];

/// ISO file already present on a storage
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IsoRef {
    pub storage: String,
    pub file: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateVmRequest {
    pub vmid: String,
    pub name: String,
    pub iso: IsoRef,
    pub plan: VmPlan,
}

impl CreateVmRequest {
    /// Form body of `POST /nodes/{node}/qemu`
    pub fn form(&self) -> Vec<(&'static str, String)> {
        vec![
            ("vmid", self.vmid.clone()),
            ("name", self.name.clone()),
            (
                "ide2",
                format!("{}:iso/{},media=cdrom", self.iso.storage, self.iso.file),
            ),
            ("ostype", "l26".to_string()),
            ("scsihw", "virtio-scsi-pci".to_string()),
            (
                "scsi0",
                format!("{}:{}", self.plan.drive.store, self.plan.drive.size_gb),
            ),
            ("sockets", "1".to_string()),
            ("cores", self.plan.cores.to_string()),
            ("numa", "1".to_string()),
            ("memory", self.plan.memory_mb.to_string()),
            ("net0", format!("virtio,bridge={}", self.plan.bridge)),
        ]
    }
}

/// Node and request described by `vm create <archetype>` flags
pub fn request_from_flags(
    archetype: &dyn Archetype,
    values: &FlagValues,
) -> Result<(String, CreateVmRequest)> {
    let get = |name: &'static str| flag_value(COMMON_CREATE_FLAGS, values, name);

    let plan = archetype.plan_from_flags(values)?;
    let request = CreateVmRequest {
        vmid: get(FLAG_ID)?.to_string(),
        name: get(FLAG_NAME)?.to_string(),
        iso: IsoRef {
            storage: get(FLAG_ISO_STORAGE)?.to_string(),
            file: get(FLAG_ISO_IMAGE)?.to_string(),
        },
        plan,
    };
    if request.vmid.parse::<u32>().is_err() {
        return Err(CoreError::Invalid {
            field: "vm id",
            value: request.vmid,
        }
        .into());
    }
    Ok((get(FLAG_NODE)?.to_string(), request))
}

/// Create the VM, then start it when `start` is set
pub async fn create_and_start<A: PlatformApi + ?Sized>(
    api: &A,
    session: &Session,
    node: &str,
    request: &CreateVmRequest,
    start: bool,
) -> Result<()> {
    tracing::info!("Creating vm {} ({}) on {}", request.vmid, request.name, node);
    api.create_vm(session, node, request).await?;

    if start {
        tracing::info!("Starting vm {}", request.vmid);
        api.start_vm(session, node, &request.vmid).await?;
    }
    Ok(())
}
