//! sysgather collection engine.
//!
//! A support-data gathering tool: independent collector plugins declare
//! which files to copy and which diagnostic commands to capture; a
//! synchronous driver decides enablement, runs each plugin's lifecycle,
//! and writes everything into a staging tree with a run manifest.

pub mod address;
pub mod collect;
pub mod driver;
pub mod exec;
pub mod exit_codes;
pub mod plugin;
pub mod plugins;
pub mod statedump;
pub mod subtarget;
