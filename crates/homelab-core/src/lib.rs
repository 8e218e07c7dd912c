//! # homelab-core
//!
//! Data model and config resolution for homelab.
//!
//! - [`model`]: providers, images, VMs and archetype parameters
//! - [`archetype`]: archetype trait and registry
//! - [`resolver`]: schema-first resolution of a bootstrap document
//! - [`loader`]: file loading

pub mod archetype;
pub mod error;
pub mod loader;
pub mod model;
pub mod resolver;

pub use archetype::{Archetype, ArchetypeRegistry, BasicArchetype, FlagSpec, FlagValues};
pub use error::{CoreError, ErrorKind, Result};
pub use loader::{load_config_file, parse_config_str};
pub use model::*;
