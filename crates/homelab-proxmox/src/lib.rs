//! Proxmox VE provider for homelab
//!
//! Implements the [`Provider`](homelab_cloud::Provider) trait on top of the
//! Proxmox VE HTTP API.
//!
//! # Features
//!
//! - Ticket login with a cached session (`~/.proxmox`)
//! - ISO upload with automatic storage matching
//! - VM creation and start from an archetype plan
//!
//! # Example
//!
//! ```ignore
//! use homelab_cloud::ProviderRegistry;
//!
//! let mut registry = ProviderRegistry::new();
//! homelab_proxmox::register(&mut registry)?;
//! ```

pub mod api;
pub mod auth;
pub mod error;
pub mod provider;
pub mod upload;
pub mod vm;

pub use api::{Credentials, PlatformApi, ProxmoxClient, StorageInfo};
pub use auth::{cached_session, ensure_session};
pub use error::{ProxmoxError, Result};
pub use provider::{ProxmoxProvider, factory, register};
pub use upload::{ISO_FORMAT, upload_file};
pub use vm::{COMMON_CREATE_FLAGS, CreateVmRequest, IsoRef, create_and_start, request_from_flags};
