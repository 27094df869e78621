//! # nsbuild
//!
//! This library builds JavaScript projects that use the `goog.provide` /
//! `goog.require` namespace convention. It finds every script under the
//! configured roots, extracts the namespaces each file declares and depends
//! on, resolves entry points into a correctly ordered file list and drives
//! the external stylesheet, template and script compilers over it.
//!
//! ## Quick Example
//!
//! ```
//! use std::sync::Arc;
//! use nsbuild::cache::{DescriptorCache, ModificationCache};
//! use nsbuild::graph::NamespaceGraph;
//! use nsbuild::resolver;
//! use nsbuild::source::{SourceDescriptor, SourceExtractor};
//!
//! let extractor = SourceExtractor::new(
//!     None,
//!     ModificationCache::new(false),
//!     DescriptorCache::new("descriptor"),
//! )
//! .unwrap();
//! let mut graph = NamespaceGraph::new("compile", extractor);
//!
//! let none: Vec<String> = Vec::new();
//! let sources = [
//!     SourceDescriptor::base("/lib/base.js"),
//!     SourceDescriptor::with_namespaces("/src/app.js", ["app"], ["app.util"]),
//!     SourceDescriptor::with_namespaces("/src/util.js", ["app.util"], none),
//! ];
//! for src in sources {
//!     graph.add_descriptor(Arc::new(src), false).unwrap();
//! }
//! graph.check().unwrap();
//!
//! let order = resolver::resolve(&graph, &["app"]).unwrap();
//! let paths: Vec<_> = order.iter().map(|s| s.path.display().to_string()).collect();
//! assert_eq!(paths, ["/lib/base.js", "/src/util.js", "/src/app.js"]);
//! ```
//!
//! ## Core Concepts
//!
//! - **Sources (`source`, `scan`)**: Finding script files and extracting the
//!   namespaces they declare and depend on.
//! - **Caches (`cache`)**: Modification times and parsed descriptors shared
//!   across build cycles and persisted between process runs.
//! - **Graph (`graph`, `resolver`)**: The namespace graph with its integrity
//!   checks, and the depth-first resolution of entry points.
//! - **Compilers (`compiler`)**: External compiler invocations behind a
//!   runner trait.
//! - **Phases (`phases`)**: The stages of a build, sequenced by the
//!   orchestrator.
//!
//! ## Execution Flow
//!
//! A production build runs these stages in order:
//!
//! 1.  **Stylesheets**: Compile GSS files into `compiled.css` and the
//!     renaming map.
//! 2.  **Templates**: Compile changed Soy templates into JavaScript.
//! 3.  **Scanning**: Build the namespace graph from every script.
//! 4.  **Resolution**: Order the files the entry points need.
//! 5.  **Manifest**: Write `deps.js` for the development loader.
//! 6.  **Scripts**: Hand the ordered files to the JS compiler.

pub mod cache;
pub mod compiler;
pub mod config;
pub mod defaults;
pub mod error;
pub mod graph;
pub mod manifest;
pub mod output;
pub mod phases;
pub mod publish;
pub mod resolver;
pub mod scan;
pub mod source;
pub mod testing;
