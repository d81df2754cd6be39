//! Exit codes for the sysgather CLI.
//!
//! Exit codes communicate run outcome without requiring output parsing.

use sg_common::Error;

/// Exit codes for sysgather operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    /// Everything enabled was collected
    Clean = 0,

    /// Run finished but at least one plugin failed
    PartialFail = 3,

    /// Configuration error
    ConfigError = 10,

    /// Collection/staging error
    CollectionError = 11,

    /// I/O error
    IoError = 13,

    /// Internal/unknown error
    InternalError = 99,
}

impl ExitCode {
    /// Convert to i32 for process exit.
    pub fn as_i32(self) -> i32 {
        self as i32
    }
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> Self {
        code as i32
    }
}

impl From<&Error> for ExitCode {
    fn from(err: &Error) -> Self {
        match err.code() {
            10..=19 => ExitCode::ConfigError,
            20..=29 => ExitCode::CollectionError,
            60..=69 => ExitCode::IoError,
            _ => ExitCode::InternalError,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_codes_map_to_exit_codes() {
        assert_eq!(
            ExitCode::from(&Error::Config("bad".into())),
            ExitCode::ConfigError
        );
        assert_eq!(
            ExitCode::from(&Error::Staging("bad".into())),
            ExitCode::CollectionError
        );
        assert_eq!(
            ExitCode::from(&Error::Io(std::io::Error::other("x"))),
            ExitCode::IoError
        );
    }

    #[test]
    fn exit_values_are_stable() {
        assert_eq!(ExitCode::Clean.as_i32(), 0);
        assert_eq!(ExitCode::PartialFail.as_i32(), 3);
        assert_eq!(ExitCode::ConfigError.as_i32(), 10);
    }
}
