//! sysgather run configuration loading and validation.
//!
//! This crate provides:
//! - Typed Rust structs for the run configuration file
//! - Config resolution (CLI → XDG → defaults)
//! - Plugin option override parsing (`plugin.option=value`)

pub mod resolve;
pub mod runconfig;

pub use resolve::{resolve_config, ConfigSource};
pub use runconfig::{OptionOverride, RunConfig, RunConfigError};
