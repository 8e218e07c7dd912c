//! homelab cloud layer
//!
//! Provider abstraction and the provisioning pipeline that drives it.
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │                 lab bootstrap                │
//! └──────────────────────┬───────────────────────┘
//!                        │
//! ┌──────────────────────▼───────────────────────┐
//! │                homelab-cloud                 │
//! │  Pipeline ─▶ ProviderRegistry ─▶ Provider    │
//! │  SessionCache        MediaGateway + protocol │
//! └───────────┬──────────────────────┬───────────┘
//!             │                      │
//! ┌───────────▼──────────┐ ┌─────────▼──────────┐
//! │   homelab-proxmox    │ │    homelab-iso     │
//! └──────────────────────┘ └────────────────────┘
//! ```

pub mod error;
pub mod gateway;
pub mod pipeline;
pub mod provider;
pub mod registry;
pub mod report;
pub mod session;

// Re-exports
pub use error::{CloudError, Result};
pub use gateway::{HelperGateway, Level, MediaGateway, ResultRecord};
pub use pipeline::{FailurePolicy, Pipeline};
pub use provider::{Provider, ProvisionContext};
pub use registry::{ProviderFactory, ProviderRegistry};
pub use report::{RunReport, VmFailure, VmOutcome};
pub use session::{Session, SessionCache};
