//! The collection driver.
//!
//! Iterates plugins in name order, decides enablement, resolves options,
//! runs every enabled plugin's `setup`, then every enabled plugin's
//! `postproc` (even when `setup` failed), and writes a run manifest to
//! the staging root. One plugin's failure never stops the run.

use crate::address::PromptSource;
use crate::collect::Staging;
use crate::exec::CommandRunner;
use crate::plugin::options::ResolvedOptions;
use crate::plugin::{EnableContext, Plugin, PluginContext};
use serde::Serialize;
use sg_common::{Error, RunId, SCHEMA_VERSION};
use sg_config::RunConfig;
use std::collections::HashSet;
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// Source of the host's installed-package set. Package queries belong
/// to the packaging layer; the default provider reports nothing and
/// enablement falls to file triggers and `check_enabled` overrides.
pub trait PackageProvider {
    fn name(&self) -> &str;
    fn installed(&self) -> HashSet<String>;
}

/// Provider used when no packaging integration is wired in.
#[derive(Debug, Default)]
pub struct NoPackages;

impl PackageProvider for NoPackages {
    fn name(&self) -> &str {
        "none"
    }

    fn installed(&self) -> HashSet<String> {
        HashSet::new()
    }
}

/// Static package set, for tests and host inventories loaded elsewhere.
#[derive(Debug, Default)]
pub struct StaticPackageProvider {
    packages: HashSet<String>,
}

impl StaticPackageProvider {
    pub fn with_package(mut self, name: impl Into<String>) -> Self {
        self.packages.insert(name.into());
        self
    }
}

impl PackageProvider for StaticPackageProvider {
    fn name(&self) -> &str {
        "static"
    }

    fn installed(&self) -> HashSet<String> {
        self.packages.clone()
    }
}

/// Why a plugin did not run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// No selected profile matches the plugin's profiles.
    ProfileExcluded,
    /// Explicitly skipped in the run config.
    ExplicitSkip,
    /// `check_enabled` returned false.
    NotTriggered,
}

/// Outcome of one plugin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "status")]
pub enum PluginStatus {
    Collected,
    Skipped { reason: SkipReason },
    Failed { error: String },
}

/// Per-plugin result with timing.
#[derive(Debug, Clone, Serialize)]
pub struct PluginOutcome {
    pub plugin: String,
    #[serde(flatten)]
    pub status: PluginStatus,
    pub time_ms: u128,
}

/// Aggregate counts for the run.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub plugins_considered: usize,
    pub plugins_collected: usize,
    pub plugins_skipped: usize,
    pub plugins_failed: usize,
    pub files_collected: usize,
}

/// Full run report; also written as `manifest.json` in the staging root.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub run_id: RunId,
    pub schema_version: &'static str,
    pub generated_at: String,
    pub summary: RunSummary,
    pub outcomes: Vec<PluginOutcome>,
}

/// Drives one collection run.
pub struct Driver<'a> {
    runner: &'a dyn CommandRunner,
    packages: &'a dyn PackageProvider,
    prompt: &'a mut dyn PromptSource,
    config: &'a RunConfig,
}

impl<'a> Driver<'a> {
    pub fn new(
        runner: &'a dyn CommandRunner,
        packages: &'a dyn PackageProvider,
        prompt: &'a mut dyn PromptSource,
        config: &'a RunConfig,
    ) -> Self {
        Self {
            runner,
            packages,
            prompt,
            config,
        }
    }

    /// Run the full collection lifecycle over `plugins`.
    pub fn run(&mut self, plugins: &[Box<dyn Plugin>]) -> Result<RunReport, Error> {
        let run_id = RunId::new();
        let mut staging = Staging::new(&self.config.staging_dir)
            .map_err(|e| Error::Staging(e.to_string()))?;

        let mut order: Vec<&dyn Plugin> = plugins.iter().map(|p| p.as_ref()).collect();
        order.sort_by_key(|p| p.descriptor().name);

        // Options are resolved for every plugin before any setup runs;
        // a bad override is a config error, not a plugin failure.
        let mut resolved: Vec<ResolvedOptions> = Vec::with_capacity(order.len());
        for plugin in &order {
            let name = plugin.descriptor().name;
            let opts = ResolvedOptions::resolve(
                name,
                plugin.descriptor().options,
                self.config.overrides_for(name),
            )
            .map_err(|e| Error::InvalidOption(e.to_string()))?;
            resolved.push(opts);
        }
        self.check_override_targets(&order)?;

        let installed = self.packages.installed();
        let enable_ctx = EnableContext::new(&installed);
        let timeout = Duration::from_secs(self.config.command_timeout_secs);

        let mut outcomes = Vec::with_capacity(order.len());
        let mut enabled = vec![false; order.len()];

        for (idx, plugin) in order.iter().enumerate() {
            let d = plugin.descriptor();
            let start = Instant::now();

            let skip = if !self.config.profile_matches(d.profiles) {
                Some(SkipReason::ProfileExcluded)
            } else if self.config.is_skipped(d.name) {
                Some(SkipReason::ExplicitSkip)
            } else if !self.config.is_enabled(d.name) && !plugin.check_enabled(&enable_ctx) {
                Some(SkipReason::NotTriggered)
            } else {
                None
            };

            if let Some(reason) = skip {
                info!(plugin = d.name, ?reason, "skipping");
                outcomes.push(PluginOutcome {
                    plugin: d.name.to_string(),
                    status: PluginStatus::Skipped { reason },
                    time_ms: start.elapsed().as_millis(),
                });
                continue;
            }

            enabled[idx] = true;
            info!(plugin = d.name, "collecting");
            let mut ctx = PluginContext::new(
                d.name,
                self.runner,
                &mut staging,
                self.prompt,
                resolved[idx].clone(),
                timeout,
                self.config.batch,
                self.config.all_logs,
            );
            let status = match plugin.setup(&mut ctx) {
                Ok(()) => PluginStatus::Collected,
                Err(e) => {
                    warn!(plugin = d.name, error = %e, "setup failed");
                    PluginStatus::Failed {
                        error: e.to_string(),
                    }
                }
            };
            outcomes.push(PluginOutcome {
                plugin: d.name.to_string(),
                status,
                time_ms: start.elapsed().as_millis(),
            });
        }

        // Cleanup phase: every enabled plugin, including those whose
        // setup failed or collected nothing. Errors are suppressed.
        for (idx, plugin) in order.iter().enumerate() {
            if !enabled[idx] {
                continue;
            }
            let d = plugin.descriptor();
            let mut ctx = PluginContext::new(
                d.name,
                self.runner,
                &mut staging,
                self.prompt,
                resolved[idx].clone(),
                timeout,
                self.config.batch,
                self.config.all_logs,
            );
            if let Err(e) = plugin.postproc(&mut ctx) {
                warn!(plugin = d.name, error = %e, "postproc failed");
            }
        }

        let summary = RunSummary {
            plugins_considered: outcomes.len(),
            plugins_collected: outcomes
                .iter()
                .filter(|o| o.status == PluginStatus::Collected)
                .count(),
            plugins_skipped: outcomes
                .iter()
                .filter(|o| matches!(o.status, PluginStatus::Skipped { .. }))
                .count(),
            plugins_failed: outcomes
                .iter()
                .filter(|o| matches!(o.status, PluginStatus::Failed { .. }))
                .count(),
            files_collected: staging.files_collected(),
        };

        let report = RunReport {
            run_id,
            schema_version: SCHEMA_VERSION,
            generated_at: chrono::Utc::now().to_rfc3339(),
            summary,
            outcomes,
        };

        let manifest = staging.root().join("manifest.json");
        std::fs::write(&manifest, serde_json::to_vec_pretty(&report)?)?;
        info!(manifest = %manifest.display(), "run complete");
        Ok(report)
    }

    /// Overrides and enables naming a plugin that does not exist point
    /// at an operator typo; fail fast instead of silently ignoring.
    fn check_override_targets(&self, order: &[&dyn Plugin]) -> Result<(), Error> {
        let known: HashSet<&str> = order.iter().map(|p| p.descriptor().name).collect();
        for name in self
            .config
            .options
            .iter()
            .map(|o| o.plugin.as_str())
            .chain(self.config.enable_plugins.iter().map(String::as_str))
            .chain(self.config.skip_plugins.iter().map(String::as_str))
        {
            if !known.contains(name) {
                return Err(Error::UnknownPlugin {
                    name: name.to_string(),
                });
            }
        }
        Ok(())
    }
}
