//! # Check Command Implementation
//!
//! Scans every source under the configured roots and verifies the graph:
//! one base file, no namespace declared twice and every required namespace
//! declared somewhere. Nothing is compiled; templates are refreshed first so
//! their namespaces are part of the check.

use anyhow::Result;
use clap::Args;

use nsbuild::output::{Marker, OutputConfig};

use super::{load_config, orchestrator};
use crate::cli::GlobalArgs;

/// Verify the namespace graph of the project
#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Fail when no base file was found
    #[arg(long)]
    pub require_base: bool,
}

/// Execute the `check` command.
pub fn execute(args: CheckArgs, global: &GlobalArgs, color_flag: &str) -> Result<()> {
    let out = OutputConfig::from_env_and_flag(color_flag);
    let config = load_config(global)?;
    let summary = orchestrator(global, config)?.check()?;

    if args.require_base && !summary.has_base {
        anyhow::bail!("No base file found; configure library.root");
    }

    println!(
        "{} {} sources, {} namespaces",
        out.marker(Marker::Ok),
        summary.sources,
        summary.namespaces
    );
    if !summary.has_base {
        println!("{} No base file in the graph", out.marker(Marker::Info));
    }
    Ok(())
}
