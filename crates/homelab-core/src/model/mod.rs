//! Data model
//!
//! Typed entities produced by the config resolver. Each concern lives in its
//! own module and is re-exported here.

mod config;
mod image;
mod params;
mod plan;
mod provider;
mod size;
mod vm;

// Re-exports
pub use config::*;
pub use image::*;
pub use params::*;
pub use plan::*;
pub use provider::*;
pub use size::*;
pub use vm::*;
