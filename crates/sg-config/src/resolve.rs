//! Config file resolution.
//!
//! Resolution order: explicit CLI path, then the XDG config directory
//! (`~/.config/sysgather/config.json`), then built-in defaults.

use crate::runconfig::{RunConfig, RunConfigError};
use std::path::{Path, PathBuf};

const CONFIG_FILE_NAME: &str = "config.json";

/// Where the effective config came from, for logs and `check` output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    /// Explicit path passed on the command line.
    Explicit(PathBuf),
    /// XDG config directory.
    Xdg(PathBuf),
    /// No config file found; built-in defaults.
    Defaults,
}

impl ConfigSource {
    pub fn is_defaults(&self) -> bool {
        matches!(self, ConfigSource::Defaults)
    }
}

/// Resolve the run configuration.
///
/// An explicit path that does not exist still resolves (to defaults) so
/// that pointing at an empty directory behaves like a fresh install;
/// malformed content at any location is an error.
pub fn resolve_config(
    explicit: Option<&Path>,
) -> Result<(RunConfig, ConfigSource), RunConfigError> {
    if let Some(path) = explicit {
        let cfg = RunConfig::load(path)?;
        let source = if path.exists() {
            ConfigSource::Explicit(path.to_path_buf())
        } else {
            ConfigSource::Defaults
        };
        return Ok((cfg, source));
    }

    if let Some(base) = dirs::config_dir() {
        let path = base.join("sysgather").join(CONFIG_FILE_NAME);
        if path.exists() {
            let cfg = RunConfig::load(&path)?;
            return Ok((cfg, ConfigSource::Xdg(path)));
        }
    }

    Ok((RunConfig::default(), ConfigSource::Defaults))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn explicit_path_wins() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"batch": true}"#).unwrap();
        let (cfg, source) = resolve_config(Some(&path)).unwrap();
        assert!(cfg.batch);
        assert_eq!(source, ConfigSource::Explicit(path));
    }

    #[test]
    fn explicit_missing_path_uses_defaults() {
        let dir = tempdir().unwrap();
        let (cfg, source) = resolve_config(Some(&dir.path().join("absent.json"))).unwrap();
        assert!(!cfg.batch);
        assert!(source.is_defaults());
    }

    #[test]
    fn explicit_malformed_is_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "][").unwrap();
        assert!(resolve_config(Some(&path)).is_err());
    }
}
