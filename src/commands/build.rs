//! # Build Command Implementation
//!
//! Runs a production build for the selected target and publishes the
//! results:
//!
//! 1. Stylesheets, templates and scripts are compiled by the orchestrator;
//!    stages whose inputs did not change are skipped.
//! 2. `compiled.css` and `compiled.js` are copied to the target outputs,
//!    with `{hash}` replaced by the content digest.
//! 3. The published names are written to `map.file` when it is configured.

use anyhow::Result;
use clap::Args;

use nsbuild::output::{Marker, OutputConfig};
use nsbuild::publish;

use super::{load_config, orchestrator};
use crate::cli::GlobalArgs;

/// Compile and publish the project
#[derive(Args, Debug)]
pub struct BuildArgs {
    /// Write the JS compiler command line to `<build>/cmd`
    #[arg(long)]
    pub output_cmd: bool,

    /// Compile only; do not copy outputs to the target locations
    #[arg(long)]
    pub no_publish: bool,
}

/// Execute the `build` command.
pub fn execute(args: BuildArgs, global: &GlobalArgs, color_flag: &str) -> Result<()> {
    let out = OutputConfig::from_env_and_flag(color_flag);
    let config = load_config(global)?;
    let orchestrator = orchestrator(global, config)?.with_output_cmd(args.output_cmd);

    let report = orchestrator.compile()?;
    for stage in &report.stages {
        println!("{}", out.stage_line(stage));
    }
    println!(
        "{} {} of {} sources in the build",
        out.marker(Marker::Info),
        report.resolved,
        report.sources
    );

    if args.no_publish {
        return Ok(());
    }

    let config = orchestrator.config();
    let target = orchestrator.target();
    let mapping = publish::publish(config, &config.js_target(target)?, &config.gss_target(target)?)?;
    for (key, path) in &mapping {
        println!("{} {} -> {}", out.marker(Marker::Ok), key, path);
    }
    Ok(())
}
