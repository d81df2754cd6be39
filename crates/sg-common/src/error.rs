//! Error types for sysgather.

use thiserror::Error;

/// Result type alias for sysgather operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Unified error type for sysgather.
#[derive(Error, Debug)]
pub enum Error {
    // Configuration errors (10-19)
    #[error("configuration error: {0}")]
    Config(String),

    #[error("invalid plugin option: {0}")]
    InvalidOption(String),

    #[error("unknown plugin: {name}")]
    UnknownPlugin { name: String },

    // Collection errors (20-29)
    #[error("staging directory unusable: {0}")]
    Staging(String),

    // I/O errors (60-69)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Returns the error code for this error type.
    /// Used for detailed error reporting and exit-code mapping.
    pub fn code(&self) -> u32 {
        match self {
            Error::Config(_) => 10,
            Error::InvalidOption(_) => 11,
            Error::UnknownPlugin { .. } => 12,
            Error::Staging(_) => 21,
            Error::Io(_) => 60,
            Error::Json(_) => 61,
        }
    }
}
