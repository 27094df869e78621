//! Namespace graph
//!
//! Owns the mapping from every declared namespace to the file declaring it,
//! and from every path to its descriptor. Construction rejects duplicate
//! namespaces immediately; missing namespaces are only detected by the
//! explicit integrity pass ([`NamespaceGraph::check`]) so forward references
//! between files work regardless of scan order.
//!
//! A graph is built per build purpose and never shared between concurrent
//! builds; only the caches underneath it are shared.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::{debug, warn};

use crate::error::{Error, Result};
use crate::source::{SourceDescriptor, SourceExtractor};

/// Dependency tree between scripts
#[derive(Debug)]
pub struct NamespaceGraph {
    tag: String,
    extractor: SourceExtractor,
    library_root: Option<PathBuf>,
    sources: BTreeMap<PathBuf, Arc<SourceDescriptor>>,
    provides: HashMap<String, Arc<SourceDescriptor>>,
    base: Option<Arc<SourceDescriptor>>,
    dirty: bool,
    fresh: Vec<PathBuf>,
}

impl NamespaceGraph {
    /// Empty graph whose staleness checks use the purpose `tag`.
    pub fn new(tag: impl Into<String>, extractor: SourceExtractor) -> Self {
        Self {
            tag: tag.into(),
            extractor,
            library_root: None,
            sources: BTreeMap::new(),
            provides: HashMap::new(),
            base: None,
            dirty: false,
            fresh: Vec::new(),
        }
    }

    /// Mark `root` as the trusted library tree.
    pub fn with_library_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.library_root = Some(root.into());
        self
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Whether `path` lives in the trusted library tree.
    pub fn is_library(&self, path: &Path) -> bool {
        self.library_root
            .as_deref()
            .is_some_and(|root| path.starts_with(root))
    }

    /// Scan `path` (or reuse its cached descriptor) and add it to the graph.
    pub fn add_source(&mut self, path: &Path) -> Result<()> {
        let (src, cached) = self.extractor.extract(&self.tag, path)?;
        self.add_descriptor(src, cached)
    }

    /// Add an already extracted descriptor.
    ///
    /// `cached` tells whether the descriptor was reused without reading the
    /// file; any fresh descriptor marks the graph dirty.
    pub fn add_descriptor(&mut self, src: Arc<SourceDescriptor>, cached: bool) -> Result<()> {
        if let Some(existing) = self.sources.get(&src.path) {
            if Arc::ptr_eq(existing, &src) || **existing == *src {
                debug!("Source already in the graph: {}", src.path.display());
                return Ok(());
            }
        }

        let library = self.is_library(&src.path);

        let replaces_base = self
            .base
            .as_ref()
            .is_some_and(|base| base.path == src.path);
        if src.is_base && !replaces_base {
            match &self.base {
                Some(base) if !library => {
                    return Err(Error::MalformedSource {
                        path: src.path.display().to_string(),
                        message: format!(
                            "only one base file is allowed, already have {}",
                            base.path.display()
                        ),
                    });
                }
                Some(_) => {}
                None => self.base = Some(Arc::clone(&src)),
            }
        }

        let mut owned = Vec::with_capacity(src.declares.len());
        for ns in &src.declares {
            match self.provides.get(ns) {
                Some(owner) if owner.path == src.path => owned.push(ns.clone()),
                Some(owner) if library && self.is_library(&owner.path) => {
                    debug!(
                        "Library namespace {} already provided by {}",
                        ns,
                        owner.path.display()
                    );
                }
                Some(owner) => {
                    return Err(Error::DuplicateNamespace {
                        namespace: ns.clone(),
                        first: owner.path.display().to_string(),
                        second: src.path.display().to_string(),
                    });
                }
                None => owned.push(ns.clone()),
            }
        }

        if let Some(previous) = self.sources.get(&src.path).cloned() {
            self.forget_provides(&previous, &src.declares);
        }
        if replaces_base {
            self.base = src.is_base.then(|| Arc::clone(&src));
        }

        for ns in owned {
            self.provides.insert(ns, Arc::clone(&src));
        }
        if !cached {
            self.dirty = true;
            self.fresh.push(src.path.clone());
        }
        self.sources.insert(src.path.clone(), src);

        Ok(())
    }

    /// Drop the namespaces `previous` declared but `keep` no longer lists.
    fn forget_provides(&mut self, previous: &SourceDescriptor, keep: &[String]) {
        for ns in &previous.declares {
            if keep.contains(ns) {
                continue;
            }
            let owned = self
                .provides
                .get(ns)
                .is_some_and(|owner| owner.path == previous.path);
            if owned {
                self.provides.remove(ns);
            }
        }
    }

    /// Verify that every required namespace is declared by some file.
    pub fn check(&self) -> Result<()> {
        for (path, src) in &self.sources {
            for ns in &src.depends {
                if !self.provides.contains_key(ns) {
                    return Err(Error::UnresolvedNamespace {
                        namespace: ns.clone(),
                        required_by: Some(path.display().to_string()),
                    });
                }
            }
        }
        Ok(())
    }

    /// Namespaces declared by a file previously added to the graph.
    pub fn declared(&self, path: &Path) -> Result<&[String]> {
        self.sources
            .get(path)
            .map(|src| src.declares.as_slice())
            .ok_or_else(|| Error::InputNotScanned {
                path: path.display().to_string(),
            })
    }

    /// The descriptor declaring `namespace`.
    pub fn provider(&self, namespace: &str) -> Option<&Arc<SourceDescriptor>> {
        self.provides.get(namespace)
    }

    /// Descriptor of the file at `path`.
    pub fn source(&self, path: &Path) -> Option<&Arc<SourceDescriptor>> {
        self.sources.get(path)
    }

    /// All descriptors, ordered by path.
    pub fn sources(&self) -> impl Iterator<Item = &Arc<SourceDescriptor>> {
        self.sources.values()
    }

    pub fn base(&self) -> Option<&Arc<SourceDescriptor>> {
        self.base.as_ref()
    }

    /// Whether any added source had to be rescanned.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Paths whose descriptor was parsed rather than reused.
    pub fn fresh_paths(&self) -> &[PathBuf] {
        &self.fresh
    }

    /// Make every freshly parsed file look changed again to the next build
    /// with this tag. Called when a cycle fails after the graph was built,
    /// so the changes it observed are not silently consumed.
    pub fn forget_fresh(&self) {
        forget_all(&self.extractor, &self.tag, &self.fresh);
    }

    /// Number of files in the graph.
    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    /// Number of declared namespaces.
    pub fn namespace_count(&self) -> usize {
        self.provides.len()
    }
}

/// Forget the cached state of `paths`, logging what cannot be forgotten.
pub(crate) fn forget_all(extractor: &SourceExtractor, tag: &str, paths: &[PathBuf]) {
    for path in paths {
        if let Err(err) = extractor.forget(tag, path) {
            warn!("Cannot forget {}: {}", path.display(), err);
        }
    }
}
