//! # Cache Command Implementation
//!
//! Manages the build cache snapshot kept in the build directory.
//!
//! ## Subcommands
//!
//! - **`info`**: Show where the snapshot lives and what it holds
//! - **`clear`**: Delete the snapshot so the next build starts cold

use anyhow::Result;
use clap::{Args, Subcommand};
use serde::Serialize;

use nsbuild::cache::snapshot;
use nsbuild::output::{Marker, OutputConfig};

use super::load_config;
use crate::cli::GlobalArgs;

/// Manage the build cache
#[derive(Args, Debug)]
pub struct CacheArgs {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: CacheSubcommand,
}

#[derive(Subcommand, Debug)]
pub enum CacheSubcommand {
    /// Show the snapshot location and entry counts
    Info(InfoArgs),
    /// Delete the snapshot
    Clear,
}

/// Arguments for the cache info command
#[derive(Args, Debug)]
pub struct InfoArgs {
    /// Output in JSON format
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Serialize)]
struct CacheInfo {
    path: String,
    exists: bool,
    modifications: usize,
    descriptors: usize,
    bytes: u64,
}

/// Execute the `cache` command.
pub fn execute(args: CacheArgs, global: &GlobalArgs, color_flag: &str) -> Result<()> {
    let out = OutputConfig::from_env_and_flag(color_flag);
    let config = load_config(global)?;
    let path = config.cache_file();

    match args.command {
        CacheSubcommand::Info(info_args) => {
            let stats = snapshot::stats(&path)?;
            let info = CacheInfo {
                path: path.display().to_string(),
                exists: stats.is_some(),
                modifications: stats.map_or(0, |s| s.modifications),
                descriptors: stats.map_or(0, |s| s.descriptors),
                bytes: stats.map_or(0, |s| s.bytes),
            };
            if info_args.json {
                println!("{}", serde_json::to_string_pretty(&info)?);
            } else if info.exists {
                println!("{} Cache: {}", out.marker(Marker::Info), info.path);
                println!("  timestamps:  {}", info.modifications);
                println!("  descriptors: {}", info.descriptors);
                println!("  size:        {} bytes", info.bytes);
            } else {
                println!("{} No cache at {}", out.marker(Marker::Info), info.path);
            }
        }
        CacheSubcommand::Clear => {
            if snapshot::clear(&path)? {
                println!("{} Removed {}", out.marker(Marker::Ok), path.display());
            } else {
                println!("{} No cache at {}", out.marker(Marker::Skip), path.display());
            }
        }
    }
    Ok(())
}
