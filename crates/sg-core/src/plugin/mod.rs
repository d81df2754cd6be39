//! The collector plugin contract.
//!
//! A plugin is an independent collection unit: static descriptor
//! metadata plus three lifecycle hooks. The driver resolves options,
//! decides enablement, runs every enabled plugin's `setup`, then every
//! enabled plugin's `postproc`. Plugins never depend on each other
//! having run.
//!
//! Error policy: a `false` from `check_enabled` skips the plugin; an
//! error from `setup` aborts that plugin's remaining work only; errors
//! from `postproc` are logged and suppressed.

pub mod options;

use crate::address::PromptSource;
use crate::collect::{CollectError, Staging};
use crate::exec::{is_executable, Cmd, CommandOutput, CommandRunner, ExecError};
use crate::statedump::StatedumpError;
use options::{OptionDecl, ResolvedOptions};
use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

/// Errors raised from plugin lifecycle hooks.
#[derive(Debug, Error)]
pub enum PluginError {
    #[error("command execution failed: {0}")]
    Exec(#[from] ExecError),

    #[error("file collection failed: {0}")]
    Collect(#[from] CollectError),

    #[error("statedump collection failed: {0}")]
    Statedump(#[from] StatedumpError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Immutable plugin metadata.
#[derive(Debug, Clone, Copy)]
pub struct PluginDescriptor {
    /// Unique across the plugin set.
    pub name: &'static str,
    /// Profile tags this plugin belongs to.
    pub profiles: &'static [&'static str],
    /// Package names that trigger enablement.
    pub packages: &'static [&'static str],
    /// Filesystem paths that trigger enablement.
    pub files: &'static [&'static str],
    /// Declared collection options.
    pub options: &'static [OptionDecl],
}

/// Host facts available to `check_enabled`. Cheap lookups only.
pub struct EnableContext<'a> {
    packages: &'a HashSet<String>,
}

impl<'a> EnableContext<'a> {
    pub fn new(packages: &'a HashSet<String>) -> Self {
        Self { packages }
    }

    pub fn has_package(&self, name: &str) -> bool {
        self.packages.contains(name)
    }

    pub fn file_exists(&self, path: &str) -> bool {
        Path::new(path).exists()
    }

    pub fn is_executable(&self, name: &str) -> bool {
        is_executable(name)
    }
}

/// A collection unit.
pub trait Plugin {
    fn descriptor(&self) -> &'static PluginDescriptor;

    /// Side-effect-free enablement predicate. The default matches the
    /// descriptor's trigger files and packages; plugins with neither
    /// (or with an executable to look for) override this.
    fn check_enabled(&self, ctx: &EnableContext) -> bool {
        let d = self.descriptor();
        if d.files.is_empty() && d.packages.is_empty() {
            return true;
        }
        d.files.iter().any(|f| ctx.file_exists(f))
            || d.packages.iter().any(|p| ctx.has_package(p))
    }

    /// The main collection action.
    fn setup(&self, ctx: &mut PluginContext) -> Result<(), PluginError>;

    /// Optional cleanup of transient artifacts; idempotent, and must
    /// tolerate `setup` never having produced anything.
    fn postproc(&self, _ctx: &mut PluginContext) -> Result<(), PluginError> {
        Ok(())
    }
}

/// Per-plugin execution context handed to `setup` and `postproc`.
pub struct PluginContext<'a> {
    plugin_name: &'static str,
    runner: &'a dyn CommandRunner,
    staging: &'a mut Staging,
    prompt: &'a mut dyn PromptSource,
    options: ResolvedOptions,
    command_timeout: Duration,
    /// Batch mode: the operator cannot be prompted.
    pub batch: bool,
    /// Collect all logs, not just unrotated ones.
    pub all_logs: bool,
}

impl<'a> PluginContext<'a> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        plugin_name: &'static str,
        runner: &'a dyn CommandRunner,
        staging: &'a mut Staging,
        prompt: &'a mut dyn PromptSource,
        options: ResolvedOptions,
        command_timeout: Duration,
        batch: bool,
        all_logs: bool,
    ) -> Self {
        Self {
            plugin_name,
            runner,
            staging,
            prompt,
            options,
            command_timeout,
            batch,
            all_logs,
        }
    }

    /// The command runner, with the context's full lifetime so callers
    /// can hold it across later mutable context use.
    pub fn runner(&self) -> &'a dyn CommandRunner {
        self.runner
    }

    pub fn command_timeout(&self) -> Duration {
        self.command_timeout
    }

    pub fn prompt(&mut self) -> &mut dyn PromptSource {
        self.prompt
    }

    // ── Options ─────────────────────────────────────────────────────

    pub fn option_flag(&self, name: &str) -> bool {
        self.options.flag(name)
    }

    pub fn option_value(&self, name: &str) -> Option<&str> {
        self.options.value(name)
    }

    pub fn option_as_list(&self, name: &str, delimiter: char) -> Vec<String> {
        self.options.as_list(name, delimiter)
    }

    // ── File collection ─────────────────────────────────────────────

    pub fn add_forbidden_path(&mut self, pattern: &str) {
        self.staging.add_forbidden_path(pattern);
    }

    /// Collect literal paths and glob patterns; missing paths are
    /// silently skipped.
    pub fn add_copy_spec<'s, I>(&mut self, specs: I) -> usize
    where
        I: IntoIterator<Item = &'s str>,
    {
        self.staging.copy_spec(specs)
    }

    // ── Command capture ─────────────────────────────────────────────

    /// Run one command and store its captured output in the staging
    /// tree. Soft failure: spawn errors and timeouts are logged and
    /// yield `None`; collection continues.
    pub fn add_cmd_output(&mut self, cmd: &Cmd) -> Option<CommandOutput> {
        let rendered = cmd.to_string();
        match self.runner.run(cmd, self.command_timeout) {
            Ok(out) => {
                if let Err(e) =
                    self.staging
                        .write_command_output(self.plugin_name, &rendered, &out.stdout)
                {
                    warn!(command = %rendered, error = %e, "could not store command output");
                }
                debug!(command = %rendered, status = ?out.status, "captured");
                Some(out)
            }
            Err(e) => {
                warn!(command = %rendered, error = %e, "command failed");
                None
            }
        }
    }

    /// Run a battery of commands. Each command is attempted
    /// independently; one failure never prevents the rest.
    pub fn add_cmd_outputs(&mut self, cmds: &[Cmd]) {
        for cmd in cmds {
            self.add_cmd_output(cmd);
        }
    }

    /// Run a command for its exit status only; nothing is captured.
    pub fn check_ext_prog(&self, cmd: &Cmd) -> bool {
        matches!(self.runner.run(cmd, self.command_timeout), Ok(out) if out.success())
    }
}
