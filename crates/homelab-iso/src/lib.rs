//! homelab-iso
//!
//! Installation media handling:
//! - [`flavor`]: catalog of downloadable media
//! - [`fetch`]: download with reuse of cached files
//! - [`remaster`]: unattended-install media built from a preseed answer file
//! - [`gateway`]: [`MediaGateway`](homelab_cloud::MediaGateway) running all of the above in-process

pub mod error;
pub mod fetch;
pub mod flavor;
pub mod gateway;
pub mod remaster;

pub use error::{IsoError, Result};
pub use fetch::{Downloader, FetchOutcome, IsoFetcher, Wget};
pub use flavor::{Flavor, flavor_ids};
pub use gateway::IsoGateway;
pub use remaster::{Remaster, RemasterRequest};
