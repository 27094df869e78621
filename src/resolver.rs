//! Ordered dependency resolution
//!
//! Given a set of requested namespaces, produces every file needed to run
//! them, dependencies first. The ordering comes straight out of a depth-first
//! post-order traversal: a descriptor is appended only after everything it
//! requires has been appended, so no separate topological sort is needed.
//!
//! ## Process
//!
//! 1.  **Base first**: the graph's base descriptor, if any, seeds the result.
//! 2.  **Memoization**: a descriptor already in the result is skipped. This is
//!     keyed by path, since one file can declare several namespaces.
//! 3.  **Cycle detection**: the namespaces currently being resolved form an
//!     explicit stack; meeting one of them (or another namespace of a file in
//!     progress) again is a cycle.

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::graph::NamespaceGraph;
use crate::source::SourceDescriptor;

/// Bookkeeping for one top-level resolution call
#[derive(Debug, Default)]
struct TraversalState {
    resolved: Vec<Arc<SourceDescriptor>>,
    seen: HashSet<PathBuf>,
    /// (namespace, owning file) pairs currently being resolved
    stack: Vec<(String, PathBuf)>,
}

impl TraversalState {
    fn push_resolved(&mut self, src: &Arc<SourceDescriptor>) {
        if self.seen.insert(src.path.clone()) {
            self.resolved.push(Arc::clone(src));
        }
    }
}

/// Resolve `namespaces` into the ordered list of files they need.
///
/// Every descriptor in the result appears after all descriptors its
/// `depends` map to, the base file (if the graph has one) is first, and no
/// descriptor appears twice.
pub fn resolve<S: AsRef<str>>(
    graph: &NamespaceGraph,
    namespaces: &[S],
) -> Result<Vec<Arc<SourceDescriptor>>> {
    let mut state = TraversalState::default();

    if let Some(base) = graph.base() {
        state.push_resolved(base);
    }

    for ns in namespaces {
        visit(graph, ns.as_ref(), &mut state)?;
    }

    debug_assert!(state.stack.is_empty());
    Ok(state.resolved)
}

fn visit(graph: &NamespaceGraph, ns: &str, state: &mut TraversalState) -> Result<()> {
    let src = graph
        .provider(ns)
        .ok_or_else(|| Error::UnresolvedNamespace {
            namespace: ns.to_string(),
            required_by: state
                .stack
                .last()
                .map(|(_, path)| path.display().to_string()),
        })?;

    if state.seen.contains(&src.path) {
        return Ok(());
    }

    if let Some(start) = state
        .stack
        .iter()
        .position(|(name, owner)| name == ns || *owner == src.path)
    {
        let mut cycle: Vec<String> = state.stack[start..]
            .iter()
            .map(|(name, _)| name.clone())
            .collect();
        cycle.push(ns.to_string());
        return Err(Error::CircularDependency { cycle });
    }

    state.stack.push((ns.to_string(), src.path.clone()));
    for dep in &src.depends {
        visit(graph, dep, state)?;
    }
    state.stack.pop();

    state.push_resolved(src);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{DescriptorCache, ModificationCache};
    use crate::source::SourceExtractor;
    use proptest::prelude::*;
    use std::collections::HashMap;

    fn graph() -> NamespaceGraph {
        let extractor = SourceExtractor::new(
            None,
            ModificationCache::new(false),
            DescriptorCache::new("descriptor"),
        )
        .unwrap();
        NamespaceGraph::new("test", extractor)
    }

    fn add(g: &mut NamespaceGraph, path: &str, declares: &[&str], depends: &[&str]) {
        g.add_descriptor(
            Arc::new(SourceDescriptor::with_namespaces(
                path,
                declares.iter().copied(),
                depends.iter().copied(),
            )),
            false,
        )
        .unwrap();
    }

    fn paths(list: &[Arc<SourceDescriptor>]) -> Vec<String> {
        list.iter()
            .map(|s| s.path.to_string_lossy().to_string())
            .collect()
    }

    #[test]
    fn test_base_then_dependencies_then_dependent() {
        let mut g = graph();
        g.add_descriptor(Arc::new(SourceDescriptor::base("base.js")), false)
            .unwrap();
        add(&mut g, "a.js", &["ns.a"], &[]);
        add(&mut g, "b.js", &["ns.b"], &["ns.a"]);

        let deps = resolve(&g, &["ns.b"]).unwrap();
        assert_eq!(paths(&deps), vec!["base.js", "a.js", "b.js"]);
    }

    #[test]
    fn test_two_node_cycle_reports_both_namespaces() {
        let mut g = graph();
        add(&mut g, "x.js", &["ns.x"], &["ns.y"]);
        add(&mut g, "y.js", &["ns.y"], &["ns.x"]);

        match resolve(&g, &["ns.x"]).unwrap_err() {
            Error::CircularDependency { cycle } => {
                assert_eq!(cycle, vec!["ns.x", "ns.y", "ns.x"]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_cycle_through_second_namespace_of_same_file() {
        let mut g = graph();
        add(&mut g, "x.js", &["ns.x1", "ns.x2"], &["ns.y"]);
        add(&mut g, "y.js", &["ns.y"], &["ns.x2"]);

        match resolve(&g, &["ns.x1"]).unwrap_err() {
            Error::CircularDependency { cycle } => {
                assert_eq!(cycle, vec!["ns.x1", "ns.y", "ns.x2"]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_diamond_is_deduplicated() {
        let mut g = graph();
        add(&mut g, "d.js", &["ns.d"], &[]);
        add(&mut g, "b.js", &["ns.b"], &["ns.d"]);
        add(&mut g, "c.js", &["ns.c"], &["ns.d"]);
        add(&mut g, "a.js", &["ns.a"], &["ns.b", "ns.c"]);

        let deps = resolve(&g, &["ns.a", "ns.c"]).unwrap();
        assert_eq!(paths(&deps), vec!["d.js", "b.js", "c.js", "a.js"]);
    }

    #[test]
    fn test_file_with_several_namespaces_appears_once() {
        let mut g = graph();
        add(&mut g, "multi.js", &["ns.one", "ns.two"], &[]);
        add(&mut g, "user.js", &["ns.user"], &["ns.one", "ns.two"]);

        let deps = resolve(&g, &["ns.user", "ns.two"]).unwrap();
        assert_eq!(paths(&deps), vec!["multi.js", "user.js"]);
    }

    #[test]
    fn test_unknown_requested_namespace() {
        let g = graph();
        match resolve(&g, &["ns.nowhere"]).unwrap_err() {
            Error::UnresolvedNamespace {
                namespace,
                required_by,
            } => {
                assert_eq!(namespace, "ns.nowhere");
                assert!(required_by.is_none());
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_missing_transitive_namespace_names_requirer() {
        let mut g = graph();
        add(&mut g, "a.js", &["ns.a"], &["ns.gone"]);

        match resolve(&g, &["ns.a"]).unwrap_err() {
            Error::UnresolvedNamespace { required_by, .. } => {
                assert_eq!(required_by.as_deref(), Some("a.js"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_requesting_root_namespace_keeps_base_once() {
        let mut g = graph();
        g.add_descriptor(Arc::new(SourceDescriptor::base("base.js")), false)
            .unwrap();
        add(&mut g, "a.js", &["ns.a"], &["goog"]);

        let deps = resolve(&g, &["goog", "ns.a"]).unwrap();
        assert_eq!(paths(&deps), vec!["base.js", "a.js"]);
    }

    #[test]
    fn test_empty_request_yields_only_base() {
        let mut g = graph();
        g.add_descriptor(Arc::new(SourceDescriptor::base("base.js")), false)
            .unwrap();
        let deps = resolve::<&str>(&g, &[]).unwrap();
        assert_eq!(paths(&deps), vec!["base.js"]);
    }

    /// Random DAG: node `i` may only depend on nodes with a smaller index.
    fn dag_strategy() -> impl Strategy<Value = Vec<Vec<usize>>> {
        (1usize..30).prop_flat_map(|n| {
            (0..n)
                .map(|i| proptest::collection::vec(0..i.max(1), 0..4usize.min(i + 1)))
                .collect::<Vec<_>>()
        })
    }

    proptest! {
        /// Property: every file comes after all files it depends on, base first
        #[test]
        fn resolve_orders_dependencies_first(edges in dag_strategy(), pick in any::<prop::sample::Index>()) {
            let mut g = graph();
            g.add_descriptor(Arc::new(SourceDescriptor::base("base.js")), false).unwrap();

            let n = edges.len();
            for (i, deps) in edges.iter().enumerate() {
                let declares = vec![format!("ns.n{i}")];
                let depends: Vec<String> = deps
                    .iter()
                    .filter(|d| **d < i)
                    .map(|d| format!("ns.n{d}"))
                    .collect();
                g.add_descriptor(
                    Arc::new(SourceDescriptor::with_namespaces(format!("n{i}.js"), declares, depends)),
                    false,
                ).unwrap();
            }

            let root = pick.index(n);
            let deps = resolve(&g, &[format!("ns.n{}", root)]).unwrap();

            prop_assert_eq!(&deps[0].path, &PathBuf::from("base.js"));

            let position: HashMap<PathBuf, usize> = deps
                .iter()
                .enumerate()
                .map(|(i, s)| (s.path.clone(), i))
                .collect();
            prop_assert_eq!(position.len(), deps.len(), "duplicate descriptors");

            for src in &deps {
                for ns in &src.depends {
                    let owner = &g.provider(ns).unwrap().path;
                    prop_assert!(position[owner] < position[&src.path]);
                }
            }
            let root_path = PathBuf::from(format!("n{}.js", root));
            prop_assert!(position.contains_key(&root_path));
        }
    }
}
