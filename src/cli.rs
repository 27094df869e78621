//! CLI argument parsing and command dispatch

use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};

use nsbuild::defaults;

use crate::commands;

/// nsbuild - Build goog.provide/goog.require JavaScript projects
#[derive(Parser, Debug)]
#[command(name = "nsbuild")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,

    #[command(flatten)]
    global: GlobalArgs,

    /// Colorize output (always, never, auto)
    #[arg(long, global = true, value_name = "WHEN", default_value = "auto")]
    color: String,

    /// Set log level (error, warn, info, debug, trace)
    #[arg(long, global = true, value_name = "LEVEL", default_value = "info")]
    log_level: String,
}

/// Options shared by every command that loads a project
#[derive(Args, Debug, Clone)]
pub struct GlobalArgs {
    /// Path to the project configuration
    #[arg(
        long,
        global = true,
        value_name = "FILE",
        env = "NSBUILD_CONFIG",
        default_value_os_t = defaults::default_config_path()
    )]
    pub config: PathBuf,

    /// Ignore and do not write the persisted build cache
    #[arg(long, global = true)]
    pub no_cache: bool,

    /// Build target name (defaults to the first declared target)
    #[arg(long, global = true, value_name = "NAME")]
    pub target: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Compile stylesheets, templates and scripts, then publish the outputs
    Build(commands::build::BuildArgs),

    /// Resolve entry points for the development loader and write deps.js
    Deps(commands::deps::DepsArgs),

    /// Scan every source and verify the namespace graph
    Check(commands::check::CheckArgs),

    /// List the test pages of the project
    Tests(commands::tests::TestsArgs),

    /// Inspect or clear the persisted build cache
    Cache(commands::cache::CacheArgs),

    /// Generate shell completion scripts
    Completions(commands::completions::CompletionsArgs),
}

impl Cli {
    /// Execute the CLI command
    pub fn execute(self) -> Result<()> {
        init_logging(&self.log_level);

        match self.command {
            Commands::Build(args) => commands::build::execute(args, &self.global, &self.color),
            Commands::Deps(args) => commands::deps::execute(args, &self.global),
            Commands::Check(args) => commands::check::execute(args, &self.global, &self.color),
            Commands::Tests(args) => commands::tests::execute(args, &self.global),
            Commands::Cache(args) => commands::cache::execute(args, &self.global, &self.color),
            Commands::Completions(args) => commands::completions::execute(args),
        }
    }
}

/// `RUST_LOG` wins over `--log-level`.
fn init_logging(level: &str) {
    let env = env_logger::Env::default().default_filter_or(level);
    let _ = env_logger::Builder::from_env(env)
        .format_timestamp(None)
        .format_target(false)
        .try_init();
}
