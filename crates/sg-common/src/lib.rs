//! sysgather common types, IDs, and errors.
//!
//! This crate provides foundational types shared across sg-core modules:
//! - Run identifiers for collection runs
//! - Manifest schema versioning
//! - Common error types

pub mod error;
pub mod id;
pub mod schema;

pub use error::{Error, Result};
pub use id::RunId;
pub use schema::SCHEMA_VERSION;
