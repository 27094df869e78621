//! # CLI Command Implementations
//!
//! Each subcommand lives in its own file with an `Args` struct derived with
//! `clap` and an `execute` function. Commands that work on a project share
//! the loading steps below: read and validate the configuration, restore the
//! persisted cache and wire up the orchestrator.

pub mod build;
pub mod cache;
pub mod check;
pub mod completions;
pub mod deps;

use anyhow::{Context, Result};
use log::debug;

use nsbuild::cache::BuildCaches;
use nsbuild::compiler::JavaCompilerRunner;
use nsbuild::config::Config;
use nsbuild::phases::orchestrator::Orchestrator;

use crate::cli::GlobalArgs;

/// Load and validate the configuration named by the global flags.
pub fn load_config(global: &GlobalArgs) -> Result<Config> {
    let config = Config::load(&global.config)
        .with_context(|| format!("Failed to load {}", global.config.display()))?;
    config.validate(global.target.as_deref())?;
    debug!("Loaded configuration from {}", global.config.display());
    Ok(config)
}

/// Build an orchestrator over the persisted cache and the Java runner.
pub fn orchestrator(global: &GlobalArgs, config: Config) -> Result<Orchestrator> {
    let caches = BuildCaches::load_or_cold(&config.cache_file(), global.no_cache)?;
    let runner = JavaCompilerRunner::new(config.java());
    Ok(Orchestrator::new(config, caches, Box::new(runner)).with_target(global.target.clone()))
}
