//! Modification-time cache
//!
//! Answers "has this file changed since the last time this purpose looked at
//! it?". The answer is recorded as soon as a change is observed, so a second
//! call without touching the file reports no change.

use std::fs;
use std::path::Path;
use std::time::SystemTime;

use super::{CacheKey, SharedCache};
use crate::error::{Error, Result};

/// Last-seen modification time per (purpose tag, path)
#[derive(Debug, Clone)]
pub struct ModificationCache {
    times: SharedCache<CacheKey, SystemTime>,
    no_cache: bool,
}

impl ModificationCache {
    pub fn new(no_cache: bool) -> Self {
        Self {
            times: SharedCache::new("modification"),
            no_cache,
        }
    }

    /// Whether the global no-cache mode is active.
    pub fn is_disabled(&self) -> bool {
        self.no_cache
    }

    /// Report whether `path` changed since `tag` last observed it.
    ///
    /// Unknown keys count as modified. The stat, the comparison and the update
    /// all happen under the cache lock, so two workers asking about the same
    /// key never both see `true` for a single change. In no-cache mode this
    /// always returns `true` and stores nothing.
    pub fn modified(&self, tag: &str, path: &Path) -> Result<bool> {
        if self.no_cache {
            return Ok(true);
        }

        let mut times = self.times.lock()?;

        let current = fs::symlink_metadata(path)
            .and_then(|info| info.modified())
            .map_err(|e| Error::filesystem(path, e))?;

        let key = CacheKey::new(tag, path);
        match times.get(&key) {
            Some(seen) if *seen == current => Ok(false),
            _ => {
                times.insert(key, current);
                Ok(true)
            }
        }
    }

    /// Check several paths, recording every one of them.
    ///
    /// Unlike `iter().any(..)`, this never stops at the first change, so the
    /// remaining paths do not report a stale change on the next build.
    pub fn any_modified<'a, I>(&self, tag: &str, paths: I) -> Result<bool>
    where
        I: IntoIterator<Item = &'a Path>,
    {
        let mut changed = false;
        for path in paths {
            changed |= self.modified(tag, path)?;
        }
        Ok(changed)
    }

    /// Forget what `tag` knows about `path`, forcing the next lookup to
    /// report a change.
    pub fn invalidate(&self, tag: &str, path: &Path) -> Result<()> {
        self.times.remove(&CacheKey::new(tag, path))?;
        Ok(())
    }

    pub fn len(&self) -> Result<usize> {
        self.times.len()
    }

    pub fn is_empty(&self) -> Result<bool> {
        self.times.is_empty()
    }

    pub(crate) fn entries(&self) -> Result<Vec<(CacheKey, SystemTime)>> {
        self.times.entries()
    }

    pub(crate) fn restore(&self, entries: Vec<(CacheKey, SystemTime)>) -> Result<()> {
        self.times.replace_all(entries)
    }
}
