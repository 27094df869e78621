//! Stage 5: Manifest
//!
//! Writes the resolved list to `build/deps.js`.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use std::sync::Arc;

use log::debug;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::manifest;
use crate::source::SourceDescriptor;

/// Write the manifest for `deps` and return its path.
pub fn execute(config: &Config, deps: &[Arc<SourceDescriptor>]) -> Result<PathBuf> {
    let path = config.deps_file();
    fs::create_dir_all(&config.build).map_err(|e| Error::filesystem(&config.build, e))?;

    let file = File::create(&path).map_err(|e| Error::filesystem(&path, e))?;
    let mut writer = BufWriter::new(file);
    manifest::write_manifest(&mut writer, deps, &config.manifest_bases())?;
    writer.flush().map_err(|e| Error::filesystem(&path, e))?;

    debug!("Wrote {} entries to {}", deps.len(), path.display());
    Ok(path)
}
