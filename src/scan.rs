//! Recursive file discovery
//!
//! Walks a root directory and collects every file whose name ends with a
//! given suffix. Version-control metadata directories and configured ignore
//! patterns are pruned before descending into them.

use std::path::{Path, PathBuf};

use glob::Pattern;
use log::debug;
use walkdir::{DirEntry, WalkDir};

use crate::cache::{CacheKey, LibraryScanCache};
use crate::error::{Error, Result};

/// Directory names never worth scanning.
pub const VCS_DIRS: [&str; 3] = [".git", ".hg", ".svn"];

/// File walker with an optional list of ignored subtrees
#[derive(Debug, Clone, Default)]
pub struct Scanner {
    ignore: Vec<Pattern>,
}

impl Scanner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Scanner that prunes entries matching any of the glob `patterns`.
    ///
    /// Patterns are matched against the path relative to the scanned root,
    /// using `/` as separator.
    pub fn with_ignore<I, S>(patterns: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let ignore = patterns
            .into_iter()
            .map(|p| Pattern::new(p.as_ref()))
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(Self { ignore })
    }

    /// Collect files under `root` whose name ends with `extension`.
    ///
    /// The suffix match is exact, so `_test.js` only matches test files while
    /// `.js` matches both. Order is unspecified.
    pub fn scan(&self, root: &Path, extension: &str) -> Result<Vec<PathBuf>> {
        let mut results = Vec::new();

        let walker = WalkDir::new(root)
            .follow_links(true)
            .into_iter()
            .filter_entry(|entry| self.should_visit(root, entry));

        for entry in walker {
            let entry = entry.map_err(|e| {
                let path = e.path().unwrap_or(root).to_path_buf();
                Error::filesystem(&path, e)
            })?;

            if !entry.file_type().is_file() {
                continue;
            }
            if entry.file_name().to_string_lossy().ends_with(extension) {
                results.push(entry.into_path());
            }
        }

        debug!(
            "Found {} {} files in {}",
            results.len(),
            extension,
            root.display()
        );
        Ok(results)
    }

    /// Like [`Scanner::scan`], but remembers the result for the whole process.
    ///
    /// Used for the trusted library tree, which does not change while the
    /// server runs.
    pub fn scan_cached(
        &self,
        cache: &LibraryScanCache,
        root: &Path,
        extension: &str,
    ) -> Result<Vec<PathBuf>> {
        cache.get_or_process(CacheKey::new(extension, root), || {
            self.scan(root, extension)
        })
    }

    fn should_visit(&self, root: &Path, entry: &DirEntry) -> bool {
        if entry.depth() == 0 {
            return true;
        }
        if entry.file_type().is_dir() {
            let name = entry.file_name().to_string_lossy();
            if VCS_DIRS.contains(&name.as_ref()) {
                return false;
            }
        }
        if self.ignore.is_empty() {
            return true;
        }
        let relative = match entry.path().strip_prefix(root) {
            Ok(rel) => rel.to_string_lossy().replace('\\', "/"),
            Err(_) => return true,
        };
        !self.ignore.iter().any(|p| p.matches(&relative))
    }
}
