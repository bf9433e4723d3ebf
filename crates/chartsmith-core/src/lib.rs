//! Chartsmith Core - foundational types for the manifest-to-chart converter
//!
//! This crate provides the building blocks shared by every processor:
//! - `Values`: the chart values tree with collision-checked insertion and
//!   deep merge
//! - `MetaService`: chart-scoped name derivation and templating
//! - `Config`: the read-only chart configuration surface
//! - `yamlfmt`: YAML emission that keeps `{{ }}` expressions intact

pub mod cluster;
pub mod config;
pub mod error;
pub mod metadata;
pub mod strings;
pub mod values;
pub mod yamlfmt;

pub use config::Config;
pub use error::{CoreError, Result};
pub use metadata::MetaService;
pub use strings::to_lower_camel;
pub use values::Values;
