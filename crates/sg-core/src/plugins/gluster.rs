//! GlusterFS storage collector.

use crate::exec::Cmd;
use crate::plugin::options::{OptionDecl, OptionKind, OptionTier};
use crate::plugin::{Plugin, PluginContext, PluginDescriptor, PluginError};
use crate::statedump::{signal_processes_by_name, wait_for_statedumps, WaitPolicy};
use crate::subtarget::extract_identifiers;
use std::path::Path;
use tracing::{info, warn};

const STATEDUMP_DIR: &str = "/var/run/gluster";
const DUMP_OPTIONS_SENTINEL: &str = "/tmp/glusterdump.options";
const GLUSTER_DAEMONS: &[&str] = &["glusterfs", "glusterfsd", "glusterd"];
const VOLUME_NAME_PREFIX: &str = "Volume Name: ";

static DESCRIPTOR: PluginDescriptor = PluginDescriptor {
    name: "gluster",
    profiles: &["storage", "virt"],
    packages: &["glusterfs", "glusterfs-core"],
    files: &["/etc/glusterd", "/var/lib/glusterd"],
    options: &[
        OptionDecl {
            name: "dump",
            description: "enable glusterdump support",
            tier: OptionTier::Slow,
            kind: OptionKind::Flag,
            default: "false",
        },
        OptionDecl {
            name: "statedump-timeout",
            description: "seconds to wait for statedump files to complete",
            tier: OptionTier::Fast,
            kind: OptionKind::Value,
            default: "60",
        },
    ],
};

/// GlusterFS storage plugin.
#[derive(Debug, Default)]
pub struct Gluster;

impl Gluster {
    fn wait_policy(ctx: &PluginContext) -> WaitPolicy {
        match ctx.option_value("statedump-timeout").map(str::parse::<u64>) {
            Some(Ok(secs)) => WaitPolicy::with_budget_secs(secs),
            Some(Err(_)) => {
                warn!("statedump-timeout is not a number; using the default budget");
                WaitPolicy::default()
            }
            None => WaitPolicy::default(),
        }
    }

    /// Signal the daemons, wait for every dump to reach its terminal
    /// marker, and collect the directory. A timeout skips dump
    /// collection; it never fails the whole plugin.
    fn collect_statedumps(&self, ctx: &mut PluginContext) {
        let dump_dir = Path::new(STATEDUMP_DIR);
        if !dump_dir.exists() {
            warn!(
                dir = STATEDUMP_DIR,
                "unable to generate statedumps, no such directory"
            );
            return;
        }
        let policy = Self::wait_policy(ctx);
        let signaled = signal_processes_by_name(GLUSTER_DAEMONS, libc::SIGUSR1);
        if signaled == 0 {
            info!("could not send SIGUSR1 to glusterfs/glusterd processes");
            return;
        }
        // Give every signaled process a moment to open its dump file;
        // the directory listing taken inside the wait is authoritative.
        std::thread::sleep(policy.grace);
        match wait_for_statedumps(dump_dir, &policy) {
            Ok(_) => {
                ctx.add_copy_spec([STATEDUMP_DIR]);
            }
            Err(e) => warn!(error = %e, "statedump collection abandoned"),
        }
    }

    fn volume_battery(volume: &str) -> Vec<Cmd> {
        vec![
            Cmd::new("gluster").args(["volume", "get", volume, "all"]),
            Cmd::new("gluster").args(["volume", "geo-replication", volume, "status"]),
            Cmd::new("gluster").args(["volume", "heal", volume, "info"]),
            Cmd::new("gluster").args(["volume", "heal", volume, "info", "split-brain"]),
            Cmd::new("gluster").args(["volume", "status", volume, "clients"]),
            Cmd::new("gluster").args(["snapshot", "list", volume]),
            Cmd::new("gluster").args(["volume", "quota", volume, "list"]),
            Cmd::new("gluster").args(["volume", "rebalance", volume, "status"]),
            Cmd::new("gluster").args(["snapshot", "info", volume]),
            Cmd::new("gluster").args(["snapshot", "status", volume]),
        ]
    }
}

impl Plugin for Gluster {
    fn descriptor(&self) -> &'static PluginDescriptor {
        &DESCRIPTOR
    }

    fn setup(&self, ctx: &mut PluginContext) -> Result<(), PluginError> {
        ctx.add_forbidden_path("/var/lib/glusterd/geo-replication/secret.pem");

        ctx.add_cmd_outputs(&[
            Cmd::new("gluster").args(["peer", "status"]),
            Cmd::new("gluster").args(["pool", "list"]),
            Cmd::new("gluster").args(["volume", "status"]),
        ]);

        ctx.add_copy_spec([
            "/etc/redhat-storage-release",
            // unified file and object storage configuration
            "/etc/swift/",
            // glusterfs-server rpm scripts stash this on migration to 3.3.x
            "/etc/glusterd.rpmsave",
            // common to all versions
            "/etc/glusterfs",
            "/var/lib/glusterd/",
            // nfs-ganesha related configuration
            "/var/run/gluster/shared_storage/nfs-ganesha/",
            "/var/run/gluster/*tier-dht/*",
        ]);

        if ctx.all_logs {
            ctx.add_copy_spec(["/var/log/glusterfs"]);
        } else {
            ctx.add_copy_spec([
                "/var/log/glusterfs/*log",
                "/var/log/glusterfs/*/*log",
                "/var/log/glusterfs/geo-replication/*/*log",
            ]);
        }

        if ctx.option_flag("dump") {
            self.collect_statedumps(ctx);

            if let Some(state) = ctx.add_cmd_output(&Cmd::new("gluster").arg("get-state")) {
                if state.success() {
                    // get-state prints the path of the file it wrote as
                    // the last word of its output.
                    if let Some(state_file) = state.stdout_str().split_whitespace().last() {
                        ctx.add_copy_spec([state_file]);
                    }
                }
            }
        }

        if let Some(info) = ctx.add_cmd_output(&Cmd::new("gluster").args(["volume", "info"])) {
            for volume in extract_identifiers(&info.stdout_str(), VOLUME_NAME_PREFIX) {
                ctx.add_cmd_outputs(&Self::volume_battery(&volume));
            }
        }

        Ok(())
    }

    fn postproc(&self, ctx: &mut PluginContext) -> Result<(), PluginError> {
        // Only clean up what the dump option created; the dump directory
        // holds live runtime state otherwise.
        if !ctx.option_flag("dump") {
            return Ok(());
        }
        remove_statedump_artifacts(Path::new(STATEDUMP_DIR), Path::new(DUMP_OPTIONS_SENTINEL))
    }
}

/// Remove generated dump files, the dump directory, and the sentinel
/// options file. Absent resources are not an error: this may run when
/// `setup` produced nothing at all.
fn remove_statedump_artifacts(dump_dir: &Path, sentinel: &Path) -> Result<(), PluginError> {
    if dump_dir.exists() {
        for entry in std::fs::read_dir(dump_dir)?.flatten() {
            ignore_missing(std::fs::remove_file(entry.path()))?;
        }
        ignore_missing(std::fs::remove_dir(dump_dir))?;
    }
    ignore_missing(std::fs::remove_file(sentinel))?;
    Ok(())
}

fn ignore_missing(result: std::io::Result<()>) -> Result<(), PluginError> {
    match result {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(PluginError::Io(e)),
    }
}
