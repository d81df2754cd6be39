//! EMC Navisphere CLI (CLARiiON) collector.

use crate::address::{resolve_addresses, AddressSource, CommandProbe};
use crate::exec::Cmd;
use crate::plugin::options::{OptionDecl, OptionKind, OptionTier};
use crate::plugin::{EnableContext, Plugin, PluginContext, PluginDescriptor, PluginError};
use tracing::{info, warn};

const PROMPT: &str = "CLARiiON SP IP Address or [Enter] to exit: ";

static DESCRIPTOR: PluginDescriptor = PluginDescriptor {
    name: "navicli",
    profiles: &["storage", "hardware"],
    packages: &[],
    files: &[],
    options: &[OptionDecl {
        name: "ipaddrs",
        description: "list of CLARiiON SP IP addresses separated by spaces",
        tier: OptionTier::Fast,
        kind: OptionKind::Value,
        default: "",
    }],
};

/// EMC Navisphere host agent plugin.
#[derive(Debug, Default)]
pub struct Navicli;

impl Navicli {
    /// Navisphere host agent configuration files.
    fn collect_config(ctx: &mut PluginContext) {
        ctx.add_copy_spec([
            "/etc/Navisphere/agent.config",
            "/etc/Navisphere/Navimon.cfg",
            "/etc/Navisphere/Quietmode.cfg",
            "/etc/Navisphere/messages/[a-z]*",
            "/etc/Navisphere/log/[a-z]*",
        ]);
    }

    /// Per-SP diagnostic battery; the address is always a single argv
    /// element.
    fn sp_battery(addr: &str) -> Vec<Cmd> {
        let h = |rest: &[&str]| Cmd::new("navicli").args(["-h", addr]).args(rest.iter().copied());
        vec![
            h(&["getall"]),
            h(&["getsptime", "-spa"]),
            h(&["getsptime", "-spb"]),
            h(&["getlog"]),
            h(&["getdisk"]),
            h(&["getcache"]),
            h(&["getlun"]),
            h(&[
                "getlun", "-rg", "-type", "-default", "-owner", "-crus", "-capacity",
            ]),
            h(&["lunmapinfo"]),
            h(&["getcrus"]),
            h(&["port", "-list", "-all"]),
            h(&["storagegroup", "-list"]),
            h(&["spportspeed", "-get"]),
        ]
    }
}

impl Plugin for Navicli {
    fn descriptor(&self) -> &'static PluginDescriptor {
        &DESCRIPTOR
    }

    fn check_enabled(&self, ctx: &EnableContext) -> bool {
        ctx.is_executable("navicli")
    }

    fn setup(&self, ctx: &mut PluginContext) -> Result<(), PluginError> {
        Self::collect_config(ctx);

        let option_list = ctx.option_as_list("ipaddrs", ' ');
        let batch = ctx.batch;
        let timeout = ctx.command_timeout();
        let resolved = {
            let probe = CommandProbe {
                runner: ctx.runner(),
                program: "navicli",
                pre_args: &["-h"],
                post_args: &["getsptime"],
                timeout,
            };
            resolve_addresses(&option_list, batch, ctx.prompt(), PROMPT, &probe)
        };

        if resolved.source == AddressSource::BatchSkipped {
            warn!("no CLARiiON SP IP address specified as plugin option and in batch mode: skipping");
            return Ok(());
        }

        for addr in &resolved.addresses {
            info!(address = %addr, "gathering NAVICLI information");
            ctx.add_cmd_outputs(&Self::sp_battery(addr));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::address::ScriptedPrompt;
    use crate::collect::Staging;
    use crate::exec::StaticRunner;
    use crate::plugin::options::ResolvedOptions;
    use sg_config::OptionOverride;
    use std::time::Duration;
    use tempfile::tempdir;

    fn options(ipaddrs: &str) -> ResolvedOptions {
        let overrides = [OptionOverride {
            plugin: "navicli".to_string(),
            option: "ipaddrs".to_string(),
            value: ipaddrs.to_string(),
        }];
        ResolvedOptions::resolve("navicli", DESCRIPTOR.options, overrides.iter()).unwrap()
    }

    fn run_setup(
        runner: &StaticRunner,
        prompt: &mut ScriptedPrompt,
        opts: ResolvedOptions,
        batch: bool,
    ) {
        let dir = tempdir().unwrap();
        let mut staging = Staging::new(dir.path()).unwrap();
        let mut ctx = PluginContext::new(
            "navicli",
            runner,
            &mut staging,
            prompt,
            opts,
            Duration::from_secs(5),
            batch,
            false,
        );
        Navicli.setup(&mut ctx).unwrap();
    }

    #[test]
    fn batch_mode_with_no_option_runs_no_commands() {
        let runner = StaticRunner::new();
        let mut prompt = ScriptedPrompt::default();
        run_setup(&runner, &mut prompt, options(""), true);
        assert!(runner.calls().is_empty());
    }

    #[test]
    fn option_addresses_are_probed_deduped_and_sorted() {
        let runner = StaticRunner::new();
        let mut prompt = ScriptedPrompt::default();
        run_setup(
            &runner,
            &mut prompt,
            options("10.0.0.2 10.0.0.1 10.0.0.1"),
            true,
        );

        let calls = runner.calls();
        // Three probes, then thirteen battery commands per unique
        // address, in sorted order.
        assert_eq!(calls.len(), 3 + 2 * 13);
        let first_getall = calls.iter().position(|c| c.ends_with("getall")).unwrap();
        assert_eq!(calls[first_getall], "navicli -h 10.0.0.1 getall");
        assert!(calls.contains(&"navicli -h 10.0.0.2 spportspeed -get".to_string()));
    }

    #[test]
    fn dead_addresses_are_dropped_with_no_battery() {
        let runner = StaticRunner::new().with_output("navicli -h 10.0.0.9", 1, "");
        let mut prompt = ScriptedPrompt::default();
        run_setup(&runner, &mut prompt, options("10.0.0.9 10.0.0.1"), true);

        let calls = runner.calls();
        assert!(!calls.contains(&"navicli -h 10.0.0.9 getall".to_string()));
        assert!(calls.contains(&"navicli -h 10.0.0.1 getall".to_string()));
    }

    #[test]
    fn interactive_prompting_collects_until_empty_line() {
        let runner = StaticRunner::new();
        let mut prompt = ScriptedPrompt::new(["10.0.0.2", "10.0.0.1", ""]);
        run_setup(&runner, &mut prompt, options(""), false);

        let calls = runner.calls();
        // Two probes plus both batteries.
        assert_eq!(calls.len(), 2 + 2 * 13);
    }

    #[test]
    fn interactive_rejection_is_reported_and_loop_continues() {
        let runner = StaticRunner::new().with_output("navicli -h 10.0.0.9", 1, "");
        let mut prompt = ScriptedPrompt::new(["10.0.0.9", "10.0.0.1", ""]);
        run_setup(&runner, &mut prompt, options(""), false);

        assert_eq!(prompt.notices.len(), 1);
        assert!(prompt.notices[0].contains("10.0.0.9"));
        assert!(runner
            .calls()
            .contains(&"navicli -h 10.0.0.1 getall".to_string()));
    }

    #[test]
    fn battery_is_thirteen_commands() {
        assert_eq!(Navicli::sp_battery("10.0.0.1").len(), 13);
    }
}
