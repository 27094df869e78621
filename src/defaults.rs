//! Default values for nsbuild configuration and build artifacts.
//!
//! This module provides centralized names used across commands and build
//! stages, ensuring consistency and avoiding duplication.

use std::path::PathBuf;

/// Configuration file looked up in the working directory.
pub const CONFIG_FILE: &str = ".nsbuild.yaml";

/// Environment variable overriding the configuration file location.
pub const CONFIG_ENV: &str = "NSBUILD_CONFIG";

/// Java executable used when the configuration does not name one.
pub const JAVA: &str = "java";

/// Bootstrap file, relative to the library root.
pub const BASE_FILE: &str = "closure/goog/base.js";

/// Directory of the bootstrap file, relative to the library root.
pub const BASE_DIR: &str = "closure/goog";

pub const JS_EXT: &str = ".js";
pub const SOY_EXT: &str = ".soy";
pub const GSS_EXT: &str = ".gss";
pub const TEST_EXT: &str = "_test.js";

/// Dependency manifest written to the build directory.
pub const DEPS_NAME: &str = "deps.js";
pub const JS_NAME: &str = "compiled.js";
pub const CSS_NAME: &str = "compiled.css";
pub const RENAMING_MAP_NAME: &str = "renaming-map.js";
/// Subdirectory of the build directory holding compiled templates.
pub const TEMPLATES_DIR: &str = "templates";
pub const CACHE_FILE: &str = "nsbuild-cache.bin";
/// File receiving the JS compiler command line with `--output-cmd`.
pub const CMD_FILE: &str = "cmd";

/// Placeholder replaced by the content digest when publishing outputs.
pub const HASH_PLACEHOLDER: &str = "{hash}";

/// Purpose tag of production builds.
pub const COMPILE_TAG: &str = "compile";
/// Purpose tag of dependency listings for the development loader.
pub const INPUT_TAG: &str = "input";
/// Purpose tag of configuration file staleness checks.
pub const CONFIG_TAG: &str = "config";

/// Returns the configuration path used when neither `--config` nor
/// `NSBUILD_CONFIG` is given.
pub fn default_config_path() -> PathBuf {
    PathBuf::from(CONFIG_FILE)
}
