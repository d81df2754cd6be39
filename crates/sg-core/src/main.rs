//! sysgather CLI entry point.

use clap::{ArgAction, Parser, Subcommand};
use sg_common::Error;
use sg_config::{resolve_config, OptionOverride, RunConfig};
use sg_core::address::StdinPrompt;
use sg_core::driver::{Driver, NoPackages};
use sg_core::exec::ExecRunner;
use sg_core::exit_codes::ExitCode;
use sg_core::plugin::options::{OptionKind, OptionTier};
use sg_core::plugins::builtin_plugins;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "sysgather", version, about = "Support-data collection tool")]
struct Cli {
    /// Path to the run configuration file
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Increase log verbosity (-v: debug, -vv: trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run a collection
    Collect {
        /// Root of the staging tree
        #[arg(long, value_name = "DIR")]
        staging_dir: Option<PathBuf>,

        /// Batch mode: never prompt the operator
        #[arg(long)]
        batch: bool,

        /// Collect rotated logs as well as current ones
        #[arg(long)]
        all_logs: bool,

        /// Restrict collection to these profiles (repeatable)
        #[arg(long = "profile", value_name = "TAG")]
        profiles: Vec<String>,

        /// Run these plugins regardless of their triggers (repeatable)
        #[arg(long = "enable", value_name = "PLUGIN")]
        enable_plugins: Vec<String>,

        /// Skip these plugins (repeatable)
        #[arg(long = "skip", value_name = "PLUGIN")]
        skip_plugins: Vec<String>,

        /// Plugin option override (repeatable)
        #[arg(short = 'k', long = "plugin-option", value_name = "PLUGIN.OPTION=VALUE")]
        plugin_options: Vec<String>,
    },

    /// List plugins, their profiles, and their options
    Plugins,

    /// Validate the configuration and report its source
    Check,
}

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let code = match run(cli) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("sysgather: error {}: {}", err.code(), err);
            ExitCode::from(&err)
        }
    };
    std::process::exit(code.as_i32());
}

fn run(cli: Cli) -> Result<ExitCode, Error> {
    let (mut config, source) = resolve_config(cli.config.as_deref())
        .map_err(|e| Error::Config(e.to_string()))?;

    match cli.command {
        Commands::Collect {
            staging_dir,
            batch,
            all_logs,
            profiles,
            enable_plugins,
            skip_plugins,
            plugin_options,
        } => {
            if let Some(dir) = staging_dir {
                config.staging_dir = dir;
            }
            config.batch |= batch;
            config.all_logs |= all_logs;
            config.profiles.extend(profiles);
            config.enable_plugins.extend(enable_plugins);
            config.skip_plugins.extend(skip_plugins);
            for raw in &plugin_options {
                let parsed = OptionOverride::parse(raw)
                    .map_err(|e| Error::InvalidOption(e.to_string()))?;
                config.options.push(parsed);
            }
            collect(&config)
        }
        Commands::Plugins => {
            list_plugins();
            Ok(ExitCode::Clean)
        }
        Commands::Check => {
            check(&config, &source);
            Ok(ExitCode::Clean)
        }
    }
}

fn collect(config: &RunConfig) -> Result<ExitCode, Error> {
    let runner = ExecRunner;
    let packages = NoPackages;
    let mut prompt = StdinPrompt;
    let plugins = builtin_plugins();

    let report = Driver::new(&runner, &packages, &mut prompt, config).run(&plugins)?;

    println!(
        "{}: {} collected, {} skipped, {} failed; {} files under {}",
        report.run_id,
        report.summary.plugins_collected,
        report.summary.plugins_skipped,
        report.summary.plugins_failed,
        report.summary.files_collected,
        config.staging_dir.display(),
    );

    if report.summary.plugins_failed > 0 {
        Ok(ExitCode::PartialFail)
    } else {
        Ok(ExitCode::Clean)
    }
}

fn list_plugins() {
    for plugin in builtin_plugins() {
        let d = plugin.descriptor();
        println!("{} (profiles: {})", d.name, d.profiles.join(", "));
        for opt in d.options {
            let kind = match opt.kind {
                OptionKind::Flag => "flag",
                OptionKind::Value => "value",
            };
            let tier = match opt.tier {
                OptionTier::Fast => "fast",
                OptionTier::Slow => "slow",
            };
            println!(
                "    {}.{} [{} {}, default {:?}] {}",
                d.name, opt.name, tier, kind, opt.default, opt.description
            );
        }
    }
}

fn check(config: &RunConfig, source: &sg_config::ConfigSource) {
    println!("config source: {:?}", source);
    println!("staging dir:   {}", config.staging_dir.display());
    println!("batch mode:    {}", config.batch);
    println!(
        "profiles:      {}",
        if config.profiles.is_empty() {
            "all".to_string()
        } else {
            config.profiles.join(", ")
        }
    );
}
