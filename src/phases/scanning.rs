//! Stage 3: Scanning
//!
//! Builds the namespace graph for one purpose tag. The library tree is
//! listed once per process; every other root is listed on each call, which
//! is cheap compared with parsing. Descriptors are extracted in parallel
//! (the caches underneath are thread-safe) and then added to the graph
//! sequentially in path order, so duplicate-namespace errors always name the
//! same pair of files.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use log::{debug, info};
use rayon::prelude::*;

use crate::cache::BuildCaches;
use crate::config::Config;
use crate::defaults;
use crate::error::Result;
use crate::graph::{forget_all, NamespaceGraph};
use crate::scan::Scanner;
use crate::source::{SourceDescriptor, SourceExtractor};

/// Scan every script root and build a checked graph for `tag`.
pub fn execute(config: &Config, caches: &BuildCaches, tag: &str) -> Result<NamespaceGraph> {
    let start = Instant::now();

    let extractor = SourceExtractor::new(
        config.base_file(),
        caches.modifications.clone(),
        caches.descriptors.clone(),
    )?;
    let mut graph = NamespaceGraph::new(tag, extractor.clone());
    if let Some(root) = config.library_root() {
        graph = graph.with_library_root(root);
    }

    let paths = collect_paths(config, caches)?;
    debug!("Extracting {} scripts for {}", paths.len(), tag);

    let results: Vec<Result<(Arc<SourceDescriptor>, bool)>> = paths
        .par_iter()
        .map(|path| extractor.extract(tag, path))
        .collect();

    let mut extracted = Vec::with_capacity(results.len());
    let mut failure = None;
    for result in results {
        match result {
            Ok(entry) => extracted.push(entry),
            Err(err) => {
                failure.get_or_insert(err);
            }
        }
    }
    extracted.sort_by(|a, b| a.0.path.cmp(&b.0.path));

    // A failed scan must not consume the changes it observed.
    let fresh: Vec<PathBuf> = extracted
        .iter()
        .filter(|(_, cached)| !cached)
        .map(|(src, _)| src.path.clone())
        .collect();
    if let Some(err) = failure {
        forget_all(&extractor, tag, &fresh);
        return Err(err);
    }

    let built = extracted
        .into_iter()
        .try_for_each(|(src, cached)| graph.add_descriptor(src, cached))
        .and_then(|()| graph.check());
    if let Err(err) = built {
        forget_all(&extractor, tag, &fresh);
        return Err(err);
    }

    info!(
        "Scanned {} scripts ({} changed, {} namespaces) in {:.2}s",
        graph.len(),
        fresh.len(),
        graph.namespace_count(),
        start.elapsed().as_secs_f64()
    );
    Ok(graph)
}

/// Every script path the graph should contain, library first.
fn collect_paths(config: &Config, caches: &BuildCaches) -> Result<Vec<PathBuf>> {
    let mut paths = Vec::new();

    if let Some(root) = config.library_root() {
        paths.extend(Scanner::new().scan_cached(&caches.library, root, defaults::JS_EXT)?);
    }

    let ignore = config
        .js
        .as_ref()
        .map(|js| js.ignore.clone())
        .unwrap_or_default();
    let scanner = Scanner::with_ignore(ignore)?;
    for root in config.js_roots() {
        if !root.exists() && root == config.templates_dir() {
            continue;
        }
        paths.extend(scanner.scan(&root, defaults::JS_EXT)?);
    }

    paths.sort();
    paths.dedup();
    Ok(paths)
}
