//! Run configuration types.
//!
//! A `RunConfig` captures everything resolved before the first plugin
//! runs: profile selection, explicit plugin enables/skips, per-plugin
//! option overrides, the staging directory, and batch mode. Option
//! values are resolved once per run and are immutable afterwards.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors from run configuration loading and parsing.
#[derive(Debug, Error)]
pub enum RunConfigError {
    #[error("I/O error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid JSON in {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("malformed option override {0:?}: expected plugin.option=value")]
    MalformedOverride(String),
}

/// A single `plugin.option=value` override.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptionOverride {
    pub plugin: String,
    pub option: String,
    pub value: String,
}

impl OptionOverride {
    /// Parse the `plugin.option=value` form used on the command line.
    pub fn parse(raw: &str) -> Result<Self, RunConfigError> {
        let (key, value) = raw
            .split_once('=')
            .ok_or_else(|| RunConfigError::MalformedOverride(raw.to_string()))?;
        let (plugin, option) = key
            .split_once('.')
            .ok_or_else(|| RunConfigError::MalformedOverride(raw.to_string()))?;
        if plugin.is_empty() || option.is_empty() {
            return Err(RunConfigError::MalformedOverride(raw.to_string()));
        }
        Ok(OptionOverride {
            plugin: plugin.to_string(),
            option: option.to_string(),
            value: value.to_string(),
        })
    }
}

/// Complete configuration for one collection run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    /// Profile tags to collect for. Empty means all profiles.
    #[serde(default)]
    pub profiles: Vec<String>,

    /// Plugins to run regardless of their trigger files/packages.
    #[serde(default)]
    pub enable_plugins: Vec<String>,

    /// Plugins to skip even when their triggers match.
    #[serde(default)]
    pub skip_plugins: Vec<String>,

    /// Per-plugin option overrides.
    #[serde(default)]
    pub options: Vec<OptionOverride>,

    /// Root of the staging tree collected files are copied into.
    #[serde(default = "default_staging_dir")]
    pub staging_dir: PathBuf,

    /// Batch mode: never prompt the operator.
    #[serde(default)]
    pub batch: bool,

    /// Collect unrotated and rotated logs alike.
    #[serde(default)]
    pub all_logs: bool,

    /// Per-command timeout in seconds.
    #[serde(default = "default_command_timeout")]
    pub command_timeout_secs: u64,
}

fn default_staging_dir() -> PathBuf {
    std::env::temp_dir().join("sysgather")
}

fn default_command_timeout() -> u64 {
    300
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            profiles: Vec::new(),
            enable_plugins: Vec::new(),
            skip_plugins: Vec::new(),
            options: Vec::new(),
            staging_dir: default_staging_dir(),
            batch: false,
            all_logs: false,
            command_timeout_secs: default_command_timeout(),
        }
    }
}

impl RunConfig {
    /// Load a run config from a JSON file.
    ///
    /// A missing file is not an error: defaults are returned, matching
    /// the resolution contract (absent config never aborts a run).
    /// Malformed JSON is an error.
    pub fn load(path: &Path) -> Result<Self, RunConfigError> {
        let raw = match std::fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(Self::default());
            }
            Err(e) => {
                return Err(RunConfigError::Io {
                    path: path.to_path_buf(),
                    source: e,
                })
            }
        };
        serde_json::from_str(&raw).map_err(|e| RunConfigError::Parse {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// True when the named plugin was explicitly skipped.
    pub fn is_skipped(&self, plugin: &str) -> bool {
        self.skip_plugins.iter().any(|p| p == plugin)
    }

    /// True when the named plugin was explicitly enabled.
    pub fn is_enabled(&self, plugin: &str) -> bool {
        self.enable_plugins.iter().any(|p| p == plugin)
    }

    /// True when the profile filter admits the given plugin profiles.
    pub fn profile_matches(&self, plugin_profiles: &[&str]) -> bool {
        if self.profiles.is_empty() {
            return true;
        }
        plugin_profiles
            .iter()
            .any(|p| self.profiles.iter().any(|sel| sel == p))
    }

    /// Overrides declared for one plugin, in declaration order.
    pub fn overrides_for<'a>(
        &'a self,
        plugin: &'a str,
    ) -> impl Iterator<Item = &'a OptionOverride> + 'a {
        self.options.iter().filter(move |o| o.plugin == plugin)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::tempdir;

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let dir = tempdir().unwrap();
        let cfg = RunConfig::load(&dir.path().join("nope.json")).unwrap();
        assert!(cfg.profiles.is_empty());
        assert_eq!(cfg.command_timeout_secs, 300);
        assert!(!cfg.batch);
    }

    #[test]
    fn malformed_json_is_an_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bad.json");
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(b"{ not json").unwrap();
        assert!(matches!(
            RunConfig::load(&path),
            Err(RunConfigError::Parse { .. })
        ));
    }

    #[test]
    fn partial_config_fills_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("cfg.json");
        std::fs::write(&path, r#"{"profiles": ["storage"], "batch": true}"#).unwrap();
        let cfg = RunConfig::load(&path).unwrap();
        assert_eq!(cfg.profiles, vec!["storage"]);
        assert!(cfg.batch);
        assert_eq!(cfg.command_timeout_secs, 300);
    }

    #[test]
    fn override_parse_accepts_well_formed() {
        let o = OptionOverride::parse("gluster.dump=true").unwrap();
        assert_eq!(o.plugin, "gluster");
        assert_eq!(o.option, "dump");
        assert_eq!(o.value, "true");
    }

    #[test]
    fn override_parse_keeps_equals_in_value() {
        let o = OptionOverride::parse("navicli.ipaddrs=10.0.0.1 10.0.0.2").unwrap();
        assert_eq!(o.value, "10.0.0.1 10.0.0.2");
    }

    #[test]
    fn override_parse_rejects_malformed() {
        assert!(OptionOverride::parse("gluster.dump").is_err());
        assert!(OptionOverride::parse("dump=true").is_err());
        assert!(OptionOverride::parse(".dump=true").is_err());
        assert!(OptionOverride::parse("gluster.=true").is_err());
    }

    #[test]
    fn profile_filter_empty_admits_all() {
        let cfg = RunConfig::default();
        assert!(cfg.profile_matches(&["storage", "virt"]));
    }

    #[test]
    fn profile_filter_matches_any_tag() {
        let cfg = RunConfig {
            profiles: vec!["hardware".to_string()],
            ..Default::default()
        };
        assert!(cfg.profile_matches(&["storage", "hardware"]));
        assert!(!cfg.profile_matches(&["storage", "virt"]));
    }

    #[test]
    fn overrides_for_filters_by_plugin() {
        let cfg = RunConfig {
            options: vec![
                OptionOverride::parse("gluster.dump=true").unwrap(),
                OptionOverride::parse("navicli.ipaddrs=10.0.0.1").unwrap(),
            ],
            ..Default::default()
        };
        let names: Vec<_> = cfg.overrides_for("gluster").map(|o| o.option.as_str()).collect();
        assert_eq!(names, vec!["dump"]);
    }

    #[test]
    fn overrides_for_borrows_the_plugin_name() {
        let cfg = RunConfig {
            options: vec![OptionOverride::parse("navicli.ipaddrs=10.0.0.1").unwrap()],
            ..Default::default()
        };
        let name = String::from("navicli");
        let found: Vec<&OptionOverride> = cfg.overrides_for(&name).collect();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].value, "10.0.0.1");
    }
}
