//! Dependency manifest
//!
//! The manifest tells the module-loading runtime which file declares which
//! namespace and in which order files must be loaded. It is plain UTF-8
//! text, one statement per resolved file:
//!
//! ```text
//! goog.addDependency('app/main.js', ['app.main'], ['goog.dom', 'app.util']);
//! ```
//!
//! Entries are written in resolution order, so parsing a manifest back gives
//! exactly the `(path, declares, requires)` triples that produced it.

use std::io::Write;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use regex::Regex;

use crate::error::{Error, Result};
use crate::source::SourceDescriptor;

const ENTRY_PATTERN: &str =
    r#"^\s*goog\.addDependency\(\s*'([^']*)'\s*,\s*\[([^\]]*)\]\s*,\s*\[([^\]]*)\]\s*\);\s*$"#;

/// One `addDependency` statement
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestEntry {
    /// Path relative to one of the manifest base directories, `/`-separated
    pub path: String,
    pub declares: Vec<String>,
    pub requires: Vec<String>,
}

impl ManifestEntry {
    /// Entry for `src`, with its path made relative to the first matching
    /// directory of `bases`.
    pub fn from_source(src: &SourceDescriptor, bases: &[PathBuf]) -> Result<Self> {
        Ok(Self {
            path: relative_path(&src.path, bases)?,
            declares: src.declares.clone(),
            requires: src.depends.clone(),
        })
    }

    /// Render the entry as one manifest line, without the trailing newline.
    pub fn to_line(&self) -> String {
        format!(
            "goog.addDependency('{}', [{}], [{}]);",
            self.path,
            quote_list(&self.declares),
            quote_list(&self.requires)
        )
    }
}

fn quote_list(items: &[String]) -> String {
    items
        .iter()
        .map(|item| format!("'{}'", item))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Express `path` relative to the first base directory containing it.
///
/// A base only matches when `path` lies inside it without any `..`
/// component; if none matches the result is [`Error::PathResolution`].
pub fn relative_path(path: &Path, bases: &[PathBuf]) -> Result<String> {
    for base in bases {
        let Ok(rel) = path.strip_prefix(base) else {
            continue;
        };
        if rel.as_os_str().is_empty() {
            continue;
        }
        let mut parts = Vec::new();
        let mut escapes = false;
        for component in rel.components() {
            match component {
                Component::Normal(part) => parts.push(part.to_string_lossy()),
                Component::CurDir => {}
                _ => {
                    escapes = true;
                    break;
                }
            }
        }
        if !escapes {
            return Ok(parts.join("/"));
        }
    }

    Err(Error::PathResolution {
        path: path.display().to_string(),
    })
}

/// Write one manifest line per descriptor of `deps`, in order.
pub fn write_manifest<W: Write>(
    w: &mut W,
    deps: &[Arc<SourceDescriptor>],
    bases: &[PathBuf],
) -> Result<()> {
    for src in deps {
        let entry = ManifestEntry::from_source(src, bases)?;
        writeln!(w, "{}", entry.to_line())?;
    }
    Ok(())
}

/// Parse manifest text back into its entries.
///
/// Blank lines are ignored; any other line that is not an `addDependency`
/// statement is a [`Error::MalformedSource`].
pub fn parse_manifest(text: &str) -> Result<Vec<ManifestEntry>> {
    let pattern = Regex::new(ENTRY_PATTERN)?;
    let mut entries = Vec::new();

    for (number, line) in text.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let caps = pattern
            .captures(line)
            .ok_or_else(|| Error::MalformedSource {
                path: "manifest".to_string(),
                message: format!("line {}: not a dependency statement", number + 1),
            })?;
        entries.push(ManifestEntry {
            path: caps[1].to_string(),
            declares: parse_list(&caps[2]),
            requires: parse_list(&caps[3]),
        });
    }

    Ok(entries)
}

fn parse_list(list: &str) -> Vec<String> {
    list.split(',')
        .map(|item| item.trim().trim_matches('\''))
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}
