//! Source descriptors and the extractor that builds them
//!
//! A descriptor records what a single script declares with `goog.provide`
//! and what it depends on with `goog.require`. Only those two single-line
//! statements are recognised; nothing else in the file is parsed.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

use log::debug;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::cache::{DescriptorCache, ModificationCache};
use crate::error::{Error, Result};

/// Namespace implicitly declared by the base file.
pub const ROOT_NAMESPACE: &str = "goog";

const PROVIDE_PATTERN: &str = r#"^\s*goog\.provide\(\s*['"](.+)['"]\s*\)"#;
const REQUIRE_PATTERN: &str = r#"^\s*goog\.require\(\s*['"](.+)['"]\s*\)"#;

/// Namespaces declared and required by one script
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceDescriptor {
    /// File path, identity of the descriptor
    pub path: PathBuf,
    /// Provided namespaces, in declaration order
    pub declares: Vec<String>,
    /// Required namespaces, in declaration order
    pub depends: Vec<String>,
    /// Whether this is the module-system bootstrap file
    pub is_base: bool,
    /// Modification time of the file when it was parsed
    pub modified: SystemTime,
}

impl SourceDescriptor {
    /// An empty, non-base descriptor for `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            declares: Vec::new(),
            depends: Vec::new(),
            is_base: false,
            modified: SystemTime::UNIX_EPOCH,
        }
    }

    /// Builder-style helper mostly useful in tests and benches.
    pub fn with_namespaces<D, R>(path: impl Into<PathBuf>, declares: D, depends: R) -> Self
    where
        D: IntoIterator,
        D::Item: Into<String>,
        R: IntoIterator,
        R::Item: Into<String>,
    {
        let mut src = Self::new(path);
        for ns in declares {
            push_unique(&mut src.declares, ns.into());
        }
        for ns in depends {
            push_unique(&mut src.depends, ns.into());
        }
        src
    }

    /// The bootstrap descriptor declaring only the root namespace.
    pub fn base(path: impl Into<PathBuf>) -> Self {
        let mut src = Self::new(path);
        src.is_base = true;
        src.declares.push(ROOT_NAMESPACE.to_string());
        src
    }

    /// Whether the file is a test file (`_test.js`).
    pub fn is_test(&self) -> bool {
        is_test_path(&self.path)
    }
}

/// Whether `path` names a test script.
pub fn is_test_path(path: &Path) -> bool {
    path.to_string_lossy().contains("_test")
}

fn push_unique(list: &mut Vec<String>, ns: String) {
    if !list.contains(&ns) {
        list.push(ns);
    }
}

/// Builds descriptors, reusing cached ones for unchanged files
///
/// Cheap to clone: the caches are shared handles and compiled regexes are
/// reference counted internally.
#[derive(Debug, Clone)]
pub struct SourceExtractor {
    provide: Regex,
    require: Regex,
    base_path: Option<PathBuf>,
    modifications: ModificationCache,
    descriptors: DescriptorCache,
}

impl SourceExtractor {
    pub fn new(
        base_path: Option<PathBuf>,
        modifications: ModificationCache,
        descriptors: DescriptorCache,
    ) -> Result<Self> {
        Ok(Self {
            provide: Regex::new(PROVIDE_PATTERN)?,
            require: Regex::new(REQUIRE_PATTERN)?,
            base_path,
            modifications,
            descriptors,
        })
    }

    /// Path of the bootstrap file, if one is configured.
    pub fn base_path(&self) -> Option<&Path> {
        self.base_path.as_deref()
    }

    /// Return the descriptor of `path` and whether it came from the cache.
    ///
    /// Unchanged files with a cached descriptor are never opened. Everything
    /// else is read line by line and the fresh descriptor replaces the cached
    /// one.
    pub fn extract(&self, tag: &str, path: &Path) -> Result<(Arc<SourceDescriptor>, bool)> {
        if !self.modifications.modified(tag, path)? {
            if let Some(cached) = self.descriptors.get(&path.to_path_buf())? {
                return Ok((cached, true));
            }
        }

        debug!("Scanning {}", path.display());
        let src = match self.parse(path) {
            Ok(src) => Arc::new(src),
            Err(err) => {
                self.forget(tag, path)?;
                return Err(err);
            }
        };
        self.descriptors
            .insert(path.to_path_buf(), Arc::clone(&src))?;
        Ok((src, false))
    }

    /// Drop what the caches know about `path`, so the next extraction
    /// parses it again.
    pub fn forget(&self, tag: &str, path: &Path) -> Result<()> {
        self.modifications.invalidate(tag, path)?;
        self.descriptors.remove(&path.to_path_buf())?;
        Ok(())
    }

    /// Parse `path` without consulting any cache.
    pub fn parse(&self, path: &Path) -> Result<SourceDescriptor> {
        let file = File::open(path).map_err(|e| Error::filesystem(path, e))?;
        let modified = file
            .metadata()
            .and_then(|info| info.modified())
            .map_err(|e| Error::filesystem(path, e))?;

        let mut src = SourceDescriptor::new(path);
        src.modified = modified;

        for line in BufReader::new(file).split(b'\n') {
            let line = line.map_err(|e| Error::filesystem(path, e))?;
            let line = String::from_utf8_lossy(&line);

            if let Some(caps) = self.provide.captures(&line) {
                push_unique(&mut src.declares, caps[1].to_string());
                continue;
            }
            if let Some(caps) = self.require.captures(&line) {
                push_unique(&mut src.depends, caps[1].to_string());
            }
        }

        if self.base_path.as_deref() == Some(path) {
            if !src.declares.is_empty() || !src.depends.is_empty() {
                return Err(Error::MalformedSource {
                    path: path.display().to_string(),
                    message: "base files should not provide or require namespaces".to_string(),
                });
            }
            src.is_base = true;
            src.declares.push(ROOT_NAMESPACE.to_string());
        }

        Ok(src)
    }
}
