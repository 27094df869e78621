//! # Configuration Schema and Parsing
//!
//! This module defines the data structures that represent the `.nsbuild.yaml`
//! configuration file, as well as the logic for loading it.
//!
//! ## Key Components
//!
//! - **`Config`**: The whole file. Every section except `build` is optional;
//!   a project without stylesheets simply omits `gss`.
//!
//! - **Targets**: Named compilation profiles (`JsTarget`, `GssTarget`). A
//!   target may `inherits` a previously declared one, taking every field it
//!   leaves empty and every define it does not set from its parent.
//!
//! ## Loading
//!
//! [`Config::load`] parses the file, applies target inheritance and then
//! normalizes every path: a leading `~` expands to the home directory and
//! relative paths are resolved against the directory holding the config
//! file. The rest of the crate only ever sees absolute-or-cwd paths.
//!
//! ```yaml
//! build: build
//! library:
//!   root: ~/closure-library
//! js:
//!   root: client
//!   compiler: ~/closure-compiler/compiler.jar
//!   inputs: [client/app/main.js]
//!   checks: { visibility: error }
//!   targets:
//!     - name: dev
//!       mode: RAW
//!     - name: prod
//!       inherits: dev
//!       mode: ADVANCED
//!       output: public/app-{hash}.js
//!       defines: { goog.DEBUG: false }
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Component, Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::defaults;
use crate::error::{Error, Result};

/// Compilation mode of a JS target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Mode {
    Advanced,
    #[default]
    Simple,
    Whitespace,
    /// No compilation: sources are loaded one by one through the manifest
    Raw,
}

impl Mode {
    /// Value of `--compilation_level`, `None` for [`Mode::Raw`].
    pub fn compilation_level(&self) -> Option<&'static str> {
        match self {
            Mode::Advanced => Some("ADVANCED_OPTIMIZATIONS"),
            Mode::Simple => Some("SIMPLE_OPTIMIZATIONS"),
            Mode::Whitespace => Some("WHITESPACE_ONLY"),
            Mode::Raw => None,
        }
    }
}

/// Warning level of a JS target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Level {
    Quiet,
    #[default]
    Default,
    Verbose,
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Level::Quiet => "QUIET",
            Level::Default => "DEFAULT",
            Level::Verbose => "VERBOSE",
        })
    }
}

/// Severity of one compiler check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckLevel {
    Error,
    Warning,
    Off,
}

impl CheckLevel {
    /// Compiler flag enabling the check at this severity.
    pub fn flag(&self) -> &'static str {
        match self {
            CheckLevel::Error => "--jscomp_error",
            CheckLevel::Warning => "--jscomp_warning",
            CheckLevel::Off => "--jscomp_off",
        }
    }
}

/// Value of a compile-time define
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DefineValue {
    Bool(bool),
    Integer(i64),
    Text(String),
}

impl DefineValue {
    /// Value as the JS compiler expects it: booleans and numbers bare,
    /// everything else quoted.
    pub fn to_compiler_value(&self) -> String {
        match self {
            DefineValue::Bool(b) => b.to_string(),
            DefineValue::Integer(i) => i.to_string(),
            DefineValue::Text(s) if s == "true" || s == "false" => s.clone(),
            DefineValue::Text(s) => format!("\"{}\"", s),
        }
    }
}

/// A JS compilation profile
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JsTarget {
    pub name: String,
    #[serde(default)]
    pub mode: Option<Mode>,
    #[serde(default)]
    pub level: Option<Level>,
    /// Where the build command publishes `compiled.js`
    #[serde(default)]
    pub output: Option<PathBuf>,
    #[serde(default)]
    pub inherits: Option<String>,
    #[serde(default)]
    pub defines: BTreeMap<String, DefineValue>,
}

impl JsTarget {
    pub fn mode(&self) -> Mode {
        self.mode.unwrap_or_default()
    }

    pub fn level(&self) -> Level {
        self.level.unwrap_or_default()
    }

    fn merge_parent(&mut self, parent: &JsTarget) {
        if self.mode.is_none() {
            self.mode = parent.mode;
        }
        if self.level.is_none() {
            self.level = parent.level;
        }
        if self.output.is_none() {
            self.output = parent.output.clone();
        }
        for (name, value) in &parent.defines {
            self.defines
                .entry(name.clone())
                .or_insert_with(|| value.clone());
        }
    }
}

/// A stylesheet compilation profile
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GssTarget {
    pub name: String,
    /// Whether class names are renamed (and a renaming map emitted)
    #[serde(default)]
    pub rename: Option<bool>,
    /// Where the build command publishes `compiled.css`
    #[serde(default)]
    pub output: Option<PathBuf>,
    #[serde(default)]
    pub inherits: Option<String>,
    /// Names passed to the compiler with `--define`
    #[serde(default)]
    pub defines: Vec<String>,
}

impl GssTarget {
    pub fn rename(&self) -> bool {
        self.rename.unwrap_or(false)
    }

    fn merge_parent(&mut self, parent: &GssTarget) {
        if self.rename.is_none() {
            self.rename = parent.rename;
        }
        if self.output.is_none() {
            self.output = parent.output.clone();
        }
        for define in &parent.defines {
            if !self.defines.contains(define) {
                self.defines.push(define.clone());
            }
        }
    }
}

/// Targets that can inherit from an earlier sibling
trait Inheritable: Sized {
    fn name(&self) -> &str;
    fn inherits(&self) -> Option<&str>;
    fn inherit_from(&mut self, parent: &Self);
}

impl Inheritable for JsTarget {
    fn name(&self) -> &str {
        &self.name
    }
    fn inherits(&self) -> Option<&str> {
        self.inherits.as_deref()
    }
    fn inherit_from(&mut self, parent: &Self) {
        self.merge_parent(parent)
    }
}

impl Inheritable for GssTarget {
    fn name(&self) -> &str {
        &self.name
    }
    fn inherits(&self) -> Option<&str> {
        self.inherits.as_deref()
    }
    fn inherit_from(&mut self, parent: &Self) {
        self.merge_parent(parent)
    }
}

/// Resolve `inherits` in declaration order; parents must come first.
fn apply_inherits<T: Inheritable>(section: &str, targets: &mut [T]) -> Result<()> {
    for i in 0..targets.len() {
        if targets[i].name().is_empty() {
            return Err(Error::ConfigParse {
                message: format!("A {} target has no name", section),
                hint: Some("Every target needs a `name` field".to_string()),
            });
        }
        let Some(parent_name) = targets[i].inherits().map(str::to_string) else {
            continue;
        };

        let (previous, rest) = targets.split_at_mut(i);
        let target = &mut rest[0];
        if parent_name == target.name() {
            return Err(Error::ConfigParse {
                message: format!("Target {} inherits from itself", target.name()),
                hint: None,
            });
        }
        let parent = previous
            .iter()
            .find(|t| t.name() == parent_name)
            .ok_or_else(|| Error::ConfigParse {
                message: format!(
                    "Target {} inherits from unknown target {}",
                    target.name(),
                    parent_name
                ),
                hint: Some("Inherits should reference a previous target".to_string()),
            })?;
        target.inherit_from(parent);
    }
    Ok(())
}

/// The `js` section
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JsConfig {
    pub root: PathBuf,
    /// Compiler jar
    #[serde(default)]
    pub compiler: Option<PathBuf>,
    /// Entry files whose namespaces start the resolution
    #[serde(default)]
    pub inputs: Vec<PathBuf>,
    #[serde(default)]
    pub externs: Vec<PathBuf>,
    #[serde(default)]
    pub checks: BTreeMap<String, CheckLevel>,
    #[serde(default)]
    pub targets: Vec<JsTarget>,
    /// Glob patterns, relative to `root`, of subtrees never scanned
    #[serde(default)]
    pub ignore: Vec<String>,
    /// Namespaces never used as entry points
    #[serde(default)]
    pub ignored_namespaces: Vec<String>,
}

/// The `gss` section
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GssConfig {
    #[serde(default)]
    pub root: Option<PathBuf>,
    pub compiler: PathBuf,
    #[serde(default)]
    pub inputs: Vec<PathBuf>,
    /// Non-standard functions the compiler should accept
    #[serde(default)]
    pub funcs: Vec<String>,
    #[serde(default)]
    pub targets: Vec<GssTarget>,
}

/// The `soy` section
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SoyConfig {
    pub root: PathBuf,
    pub compiler: PathBuf,
}

/// The `library` section
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LibraryConfig {
    pub root: PathBuf,
}

/// The `map` section
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MapConfig {
    pub file: PathBuf,
}

/// The whole configuration file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Directory receiving every intermediate artifact
    pub build: PathBuf,
    #[serde(default)]
    pub java: Option<String>,
    #[serde(default)]
    pub js: Option<JsConfig>,
    #[serde(default)]
    pub gss: Option<GssConfig>,
    #[serde(default)]
    pub soy: Option<SoyConfig>,
    #[serde(default)]
    pub library: Option<LibraryConfig>,
    #[serde(default)]
    pub map: Option<MapConfig>,
    /// File this configuration was loaded from
    #[serde(skip)]
    pub source: Option<PathBuf>,
}

impl Config {
    /// Parse YAML text; paths are kept as written.
    pub fn parse(yaml: &str) -> Result<Self> {
        let mut config: Config = serde_yaml::from_str(yaml)?;
        if let Some(js) = config.js.as_mut() {
            apply_inherits("js", &mut js.targets)?;
        }
        if let Some(gss) = config.gss.as_mut() {
            apply_inherits("gss", &mut gss.targets)?;
        }
        Ok(config)
    }

    /// Read, parse and normalize the configuration file at `path`.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| Error::ConfigParse {
            message: format!("Cannot read {}: {}", path.display(), e),
            hint: Some(format!(
                "Create a {} file or point {} at one",
                defaults::CONFIG_FILE,
                defaults::CONFIG_ENV
            )),
        })?;
        let mut config = Self::parse(&content)?;
        let base = path.parent().unwrap_or_else(|| Path::new(""));
        config.resolve_paths(base);
        config.source = Some(path.to_path_buf());
        Ok(config)
    }

    /// Expand `~` and make every relative path relative to `base`.
    pub fn resolve_paths(&mut self, base: &Path) {
        let fix = |p: &mut PathBuf| *p = resolve_path(base, p);

        fix(&mut self.build);
        if let Some(js) = self.js.as_mut() {
            fix(&mut js.root);
            js.compiler.iter_mut().for_each(fix);
            js.inputs.iter_mut().for_each(fix);
            js.externs.iter_mut().for_each(fix);
            for target in &mut js.targets {
                target.output.iter_mut().for_each(fix);
            }
        }
        if let Some(gss) = self.gss.as_mut() {
            gss.root.iter_mut().for_each(fix);
            fix(&mut gss.compiler);
            gss.inputs.iter_mut().for_each(fix);
            for target in &mut gss.targets {
                target.output.iter_mut().for_each(fix);
            }
        }
        if let Some(soy) = self.soy.as_mut() {
            fix(&mut soy.root);
            fix(&mut soy.compiler);
        }
        if let Some(library) = self.library.as_mut() {
            fix(&mut library.root);
        }
        if let Some(map) = self.map.as_mut() {
            fix(&mut map.file);
        }
    }

    /// Check the semantic constraints serde cannot express.
    pub fn validate(&self, target: Option<&str>) -> Result<()> {
        if self.build.as_os_str().is_empty() {
            return Err(Error::ConfigParse {
                message: "The build directory is required".to_string(),
                hint: Some("Add `build: build` to the configuration".to_string()),
            });
        }
        if let Some(js) = &self.js {
            if js.inputs.is_empty() {
                return Err(Error::ConfigParse {
                    message: "No JS inputs configured".to_string(),
                    hint: Some("List the entry files under js.inputs".to_string()),
                });
            }
        }
        if target.is_some() {
            self.js_target(target)?;
            self.gss_target(target)?;
        }
        Ok(())
    }

    /// The JS target called `name`, or the first one when `name` is `None`.
    ///
    /// A project without a `js` section or without targets gets the default
    /// target.
    pub fn js_target(&self, name: Option<&str>) -> Result<JsTarget> {
        let targets = self.js.as_ref().map(|js| js.targets.as_slice()).unwrap_or(&[]);
        select_target("js", targets, name)
    }

    /// The GSS target called `name`, or the first one when `name` is `None`.
    pub fn gss_target(&self, name: Option<&str>) -> Result<GssTarget> {
        let targets = self.gss.as_ref().map(|gss| gss.targets.as_slice()).unwrap_or(&[]);
        select_target("gss", targets, name)
    }

    pub fn java(&self) -> &str {
        self.java.as_deref().unwrap_or(defaults::JAVA)
    }

    /// The module-system bootstrap file, when a library is configured.
    pub fn base_file(&self) -> Option<PathBuf> {
        self.library
            .as_ref()
            .map(|library| library.root.join(defaults::BASE_FILE))
    }

    pub fn library_root(&self) -> Option<&Path> {
        self.library.as_ref().map(|library| library.root.as_path())
    }

    /// Directory holding compiled templates.
    pub fn templates_dir(&self) -> PathBuf {
        self.build.join(defaults::TEMPLATES_DIR)
    }

    pub fn cache_file(&self) -> PathBuf {
        self.build.join(defaults::CACHE_FILE)
    }

    pub fn deps_file(&self) -> PathBuf {
        self.build.join(defaults::DEPS_NAME)
    }

    /// Directories scanned for scripts, excluding the library tree.
    pub fn js_roots(&self) -> Vec<PathBuf> {
        let mut roots = Vec::new();
        if let Some(js) = &self.js {
            roots.push(js.root.clone());
        }
        if self.soy.is_some() {
            roots.push(self.templates_dir());
        }
        roots
    }

    /// Base directories manifest paths are made relative to, in priority
    /// order.
    pub fn manifest_bases(&self) -> Vec<PathBuf> {
        let mut bases = Vec::new();
        if let Some(library) = &self.library {
            bases.push(library.root.join(defaults::BASE_DIR));
        }
        if let Some(js) = &self.js {
            bases.push(js.root.clone());
        }
        if let Some(soy) = &self.soy {
            bases.push(self.templates_dir());
            bases.push(soy.root.clone());
        }
        if let Some(library) = &self.library {
            bases.push(library.root.clone());
        }
        bases
    }
}

fn select_target<T: Inheritable + Clone + Default>(
    section: &str,
    targets: &[T],
    name: Option<&str>,
) -> Result<T> {
    match name {
        None => Ok(targets.first().cloned().unwrap_or_default()),
        Some(_) if targets.is_empty() => Ok(T::default()),
        Some(name) => targets
            .iter()
            .find(|t| t.name() == name)
            .cloned()
            .ok_or_else(|| Error::ConfigParse {
                message: format!("Unknown {} target: {}", section, name),
                hint: Some(format!(
                    "Available targets: {}",
                    targets
                        .iter()
                        .map(|t| t.name())
                        .collect::<Vec<_>>()
                        .join(", ")
                )),
            }),
    }
}

/// Expand a leading `~` and resolve relative paths against `base`.
pub fn resolve_path(base: &Path, path: &Path) -> PathBuf {
    let mut components = path.components();
    let expanded = match components.next() {
        Some(Component::Normal(first)) if first == "~" => match dirs::home_dir() {
            Some(home) => home.join(components.as_path()),
            None => path.to_path_buf(),
        },
        _ => path.to_path_buf(),
    };

    if expanded.is_absolute() || expanded.as_os_str().is_empty() {
        expanded
    } else {
        base.join(expanded)
    }
}
