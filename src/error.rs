//! # Error Handling
//!
//! This module defines the centralized error type for `nsbuild`. It uses the
//! `thiserror` library to create a single `Error` enum covering every failure
//! mode of the namespace engine and the build pipeline around it.
//!
//! ## Key Components
//!
//! - **`Error`**: One variant per failure kind. Structural source problems
//!   (duplicate or missing namespaces, cycles, malformed base files) carry the
//!   offending files and namespaces so they can be rendered straight back to
//!   the developer.
//!
//! - **`Error::status`**: An HTTP-like severity used when an error is shown to
//!   whoever requested the build. Source problems the developer must fix map
//!   to 400, missing inputs to 404, and everything environmental (I/O, external
//!   compilers, cache snapshots) to 500.
//!
//! - **`Result<T>`**: A type alias for `std::result::Result<T, Error>`.
//!
//! Graph and resolver errors are never retried internally; they describe a
//! problem in the sources, not a transient condition.

use std::path::Path;

use thiserror::Error;

/// Main error type for nsbuild operations
#[derive(Error, Debug)]
pub enum Error {
    /// A stat, open, read or directory listing failed.
    #[error("Filesystem error: {path}: {message}")]
    Filesystem { path: String, message: String },

    /// A source file has declarations it is not allowed to have, such as a
    /// base file that provides or requires namespaces.
    #[error("Malformed source {path}: {message}")]
    MalformedSource { path: String, message: String },

    /// Two different files declare the same namespace.
    #[error("Multiple provide {namespace}: {first} and {second}")]
    DuplicateNamespace {
        namespace: String,
        first: String,
        second: String,
    },

    /// A namespace is required (or requested) but no file declares it.
    #[error("Namespace not found {namespace}{}", required_by.as_ref().map(|p| format!(": required by {}", p)).unwrap_or_default())]
    UnresolvedNamespace {
        namespace: String,
        /// The file whose `goog.require` could not be satisfied, if any.
        required_by: Option<String>,
    },

    /// The namespace graph contains a cycle.
    ///
    /// `cycle` starts at the first repeated namespace and ends with its
    /// repetition.
    #[error("Circular dependency detected: {}", cycle.join(" -> "))]
    CircularDependency { cycle: Vec<String> },

    /// An external compiler could not be spawned or exited unsuccessfully.
    #[error("Compiler error: {compiler} {status}\n{output}")]
    CompilerExec {
        compiler: String,
        status: String,
        /// Everything the compiler printed, verbatim.
        output: String,
    },

    /// The persisted cache snapshot exists but cannot be decoded.
    #[error("Cache load error: {path}: {message}")]
    CacheLoad { path: String, message: String },

    /// No configured base directory contains a file listed in the manifest.
    #[error("Cannot generate the relative filename for {path}")]
    PathResolution { path: String },

    /// The configuration file is invalid.
    #[error("Configuration parsing error: {message}{}", hint.as_ref().map(|h| format!("\n  hint: {}", h)).unwrap_or_default())]
    ConfigParse {
        message: String,
        /// Optional hint for how to fix the configuration issue
        hint: Option<String>,
    },

    /// An input file was requested that is not part of the scanned graph.
    #[error("Input not present in the sources: {path}")]
    InputNotScanned { path: String },

    /// An error indicating that a mutex has been poisoned.
    #[error("Lock poisoned: {context}")]
    LockPoisoned { context: String },

    /// An error occurred while encoding the cache snapshot.
    #[error("Serialization error: {message}")]
    Serialization { message: String },

    /// An I/O error, wrapped from `std::io::Error`.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A YAML parsing error, wrapped from `serde_yaml::Error`.
    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// A JSON encoding error, wrapped from `serde_json::Error`.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A regular expression error, wrapped from `regex::Error`.
    #[error("Regex error: {0}")]
    Regex(#[from] regex::Error),

    /// A glob pattern error, wrapped from `glob::PatternError`.
    #[error("Glob pattern error: {0}")]
    Glob(#[from] glob::PatternError),
}

impl Error {
    /// Build a `Filesystem` error for `path` from an I/O failure.
    pub fn filesystem(path: &Path, err: impl std::fmt::Display) -> Self {
        Error::Filesystem {
            path: path.display().to_string(),
            message: err.to_string(),
        }
    }

    /// HTTP-like status describing who has to act on this error.
    pub fn status(&self) -> u16 {
        match self {
            Error::MalformedSource { .. }
            | Error::DuplicateNamespace { .. }
            | Error::UnresolvedNamespace { .. }
            | Error::CircularDependency { .. }
            | Error::ConfigParse { .. }
            | Error::Yaml(_)
            | Error::Glob(_) => 400,
            Error::InputNotScanned { .. } => 404,
            _ => 500,
        }
    }

    /// Whether the error describes the project sources rather than the
    /// environment the build runs in.
    pub fn is_source_error(&self) -> bool {
        self.status() == 400
    }
}

/// A convenient type alias for `Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;
