//! # Deps Command Implementation
//!
//! Resolves the configured entry points, tests included, for the
//! development loader. `deps.js` is always rewritten in the build directory;
//! the manifest is also printed to stdout or copied to `--output`.

use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use nsbuild::manifest;

use super::{load_config, orchestrator};
use crate::cli::GlobalArgs;

/// Resolve dependencies and write the loader manifest
#[derive(Args, Debug)]
pub struct DepsArgs {
    /// Also write the manifest to this file instead of stdout
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Print resolved file paths, one per line, instead of the manifest
    #[arg(long)]
    pub paths: bool,
}

/// Execute the `deps` command.
pub fn execute(args: DepsArgs, global: &GlobalArgs) -> Result<()> {
    let config = load_config(global)?;
    let orchestrator = orchestrator(global, config)?;
    let deps = orchestrator.dependencies()?;

    let mut buffer = Vec::new();
    if args.paths {
        for src in &deps {
            writeln!(buffer, "{}", src.path.display())?;
        }
    } else {
        let bases = orchestrator.config().manifest_bases();
        manifest::write_manifest(&mut buffer, &deps, &bases)?;
    }

    match &args.output {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create {}", parent.display()))?;
            }
            fs::write(path, &buffer)
                .with_context(|| format!("Failed to write {}", path.display()))?;
        }
        None => io::stdout().write_all(&buffer)?,
    }
    Ok(())
}
