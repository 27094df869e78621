//! Stage 4: Resolution
//!
//! Turns the configured entry files into entry namespaces and resolves them
//! against the graph.

use std::path::PathBuf;
use std::sync::Arc;

use log::debug;

use crate::error::Result;
use crate::graph::NamespaceGraph;
use crate::resolver;
use crate::source::{is_test_path, SourceDescriptor};

/// Namespaces declared by `inputs`.
///
/// Test inputs are dropped unless `include_tests` is set, and namespaces
/// listed in `ignored` are never used as entry points. Every input must be
/// part of the graph.
pub fn entry_namespaces(
    graph: &NamespaceGraph,
    inputs: &[PathBuf],
    include_tests: bool,
    ignored: &[String],
) -> Result<Vec<String>> {
    let mut namespaces = Vec::new();
    for input in inputs {
        if !include_tests && is_test_path(input) {
            continue;
        }
        for ns in graph.declared(input)? {
            if ignored.contains(ns) {
                debug!("Ignoring entry namespace {}", ns);
                continue;
            }
            if !namespaces.contains(ns) {
                namespaces.push(ns.clone());
            }
        }
    }
    Ok(namespaces)
}

/// Resolve the entry files into the ordered list of files they need.
pub fn execute(
    graph: &NamespaceGraph,
    inputs: &[PathBuf],
    include_tests: bool,
    ignored: &[String],
) -> Result<Vec<Arc<SourceDescriptor>>> {
    let namespaces = entry_namespaces(graph, inputs, include_tests, ignored)?;
    let deps = resolver::resolve(graph, &namespaces)?;
    debug!(
        "Resolved {} namespaces into {} files",
        namespaces.len(),
        deps.len()
    );
    Ok(deps)
}
