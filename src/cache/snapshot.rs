//! On-disk cache snapshot
//!
//! The modification times and parsed descriptors survive restarts through a
//! single bincode file in the build directory. A missing file is a cold
//! start; a file that cannot be decoded is a [`Error::CacheLoad`], which
//! [`BuildCaches::load_or_cold`] degrades to a cold start with a warning.

use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::SystemTime;

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use super::{BuildCaches, CacheKey};
use crate::error::{Error, Result};
use crate::source::SourceDescriptor;

/// Current snapshot layout; anything else is rejected on load.
pub const FORMAT_VERSION: u32 = 1;

#[derive(Debug, Default, Serialize, Deserialize)]
struct CacheSnapshot {
    format_version: u32,
    modifications: Vec<(CacheKey, SystemTime)>,
    descriptors: Vec<SourceDescriptor>,
}

/// Entry counts of a snapshot, for `cache info`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SnapshotStats {
    pub modifications: usize,
    pub descriptors: usize,
    pub bytes: u64,
}

fn read_snapshot(path: &Path) -> Result<Option<CacheSnapshot>> {
    if !path.exists() {
        return Ok(None);
    }

    let bytes = fs::read(path).map_err(|e| Error::filesystem(path, e))?;
    let snapshot: CacheSnapshot =
        bincode::deserialize(&bytes).map_err(|e| Error::CacheLoad {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;

    if snapshot.format_version != FORMAT_VERSION {
        return Err(Error::CacheLoad {
            path: path.display().to_string(),
            message: format!(
                "incompatible snapshot version: expected {}, got {}",
                FORMAT_VERSION, snapshot.format_version
            ),
        });
    }

    Ok(Some(snapshot))
}

impl BuildCaches {
    /// Load caches from the snapshot at `path`.
    ///
    /// A missing file yields empty caches. In no-cache mode nothing is read.
    pub fn load(path: &Path, no_cache: bool) -> Result<Self> {
        let caches = Self::new(no_cache);
        if no_cache {
            return Ok(caches);
        }

        let Some(snapshot) = read_snapshot(path)? else {
            debug!("No cache snapshot at {}", path.display());
            return Ok(caches);
        };

        info!(
            "Loaded cache snapshot: {} timestamps, {} descriptors",
            snapshot.modifications.len(),
            snapshot.descriptors.len()
        );
        caches.modifications.restore(snapshot.modifications)?;
        caches.descriptors.replace_all(
            snapshot
                .descriptors
                .into_iter()
                .map(|src| (src.path.clone(), Arc::new(src))),
        )?;

        Ok(caches)
    }

    /// Like [`BuildCaches::load`], but an unreadable snapshot starts cold.
    pub fn load_or_cold(path: &Path, no_cache: bool) -> Result<Self> {
        match Self::load(path, no_cache) {
            Err(err @ Error::CacheLoad { .. }) => {
                warn!("{}; starting with an empty cache", err);
                Ok(Self::new(no_cache))
            }
            other => other,
        }
    }

    /// Persist the modification and descriptor caches to `path`.
    ///
    /// The file is written next to its final location and renamed into place,
    /// so a crash mid-write never leaves a truncated snapshot behind.
    pub fn flush(&self, path: &Path) -> Result<()> {
        if self.modifications.is_disabled() {
            return Ok(());
        }

        let snapshot = CacheSnapshot {
            format_version: FORMAT_VERSION,
            modifications: self.modifications.entries()?,
            descriptors: self
                .descriptors
                .entries()?
                .into_iter()
                .map(|(_, src)| (*src).clone())
                .collect(),
        };

        let bytes = bincode::serialize(&snapshot).map_err(|e| Error::Serialization {
            message: format!("failed to encode cache snapshot: {}", e),
        })?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| Error::filesystem(parent, e))?;
        }
        let temp_path = path.with_extension("tmp");
        fs::write(&temp_path, bytes).map_err(|e| Error::filesystem(&temp_path, e))?;
        fs::rename(&temp_path, path).map_err(|e| Error::filesystem(path, e))?;

        debug!(
            "Flushed cache snapshot: {} timestamps, {} descriptors",
            snapshot.modifications.len(),
            snapshot.descriptors.len()
        );
        Ok(())
    }
}

/// Describe the snapshot at `path` without loading it into caches.
pub fn stats(path: &Path) -> Result<Option<SnapshotStats>> {
    let Some(snapshot) = read_snapshot(path)? else {
        return Ok(None);
    };
    let bytes = fs::metadata(path)
        .map_err(|e| Error::filesystem(path, e))?
        .len();
    Ok(Some(SnapshotStats {
        modifications: snapshot.modifications.len(),
        descriptors: snapshot.descriptors.len(),
        bytes,
    }))
}

/// Delete the snapshot at `path`; returns whether a file was removed.
pub fn clear(path: &Path) -> Result<bool> {
    if !path.exists() {
        return Ok(false);
    }
    fs::remove_file(path).map_err(|e| Error::filesystem(path, e))?;
    Ok(true)
}
