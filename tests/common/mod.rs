//! Shared test utilities for the CLI end-to-end tests.
//!
//! ## Usage
//!
//! ```rust,ignore
//! mod common;
//! use common::prelude::*;
//!
//! #[test]
//! fn test_example() {
//!     let fixture = TestFixture::new().with_project();
//!     fixture.command().arg("check").assert().success();
//! }
//! ```

use assert_fs::prelude::*;
use std::path::{Path, PathBuf};

/// Re-export commonly used test dependencies for convenience.
pub mod prelude {
    #[allow(unused_imports)]
    pub use assert_fs::prelude::*;
    #[allow(unused_imports)]
    pub use predicates::prelude::*;

    #[allow(unused_imports)]
    pub use super::sources;
    pub use super::TestFixture;
}

/// Script sources of the sample project.
#[allow(dead_code)]
pub mod sources {
    pub const BASE: &str = "var goog = goog || {};\n";

    pub const GOOG_STRING: &str = "goog.provide('goog.string');\n";

    pub const MAIN: &str = "\
goog.provide('app.main');

goog.require('app.util');
goog.require('goog.string');
";

    pub const UTIL: &str = "goog.provide('app.util');\n";

    pub const MAIN_TEST: &str = "\
goog.provide('app.mainTest');
goog.require('app.main');
";
}

/// Stand-in for the Java executable.
///
/// Every invocation is appended to `java.log` next to the script. The file
/// following an output flag is created, so stages see their outputs on
/// disk. When `java.fail` exists the script prints an error and exits 3.
#[allow(dead_code)]
const FAKE_JAVA: &str = r#"#!/bin/sh
dir=$(dirname "$0")
echo "$@" >> "$dir/java.log"
if [ -f "$dir/java.fail" ]; then
  echo "ERROR - broken input" >&2
  exit 3
fi
while [ $# -gt 0 ]; do
  case "$1" in
    --js_output_file|--output-file|--outputPathFormat)
      mkdir -p "$(dirname "$2")"
      echo "// compiled" > "$2"
      shift
      ;;
  esac
  shift
done
exit 0
"#;

/// A temporary project directory.
pub struct TestFixture {
    temp_dir: assert_fs::TempDir,
}

#[allow(dead_code)]
impl TestFixture {
    /// Create a new test fixture with an empty temporary directory.
    pub fn new() -> Self {
        Self {
            temp_dir: assert_fs::TempDir::new().expect("Failed to create temp directory"),
        }
    }

    /// Write `.nsbuild.yaml` with the given content.
    pub fn with_config(self, content: &str) -> Self {
        self.with_file(".nsbuild.yaml", content)
    }

    /// Add a file with the given path and content.
    pub fn with_file(self, path: &str, content: &str) -> Self {
        self.temp_dir
            .child(path)
            .write_str(content)
            .expect("Failed to write file");
        self
    }

    /// The sample library and sources, without a configuration.
    pub fn with_sources(self) -> Self {
        self.with_file("lib/closure/goog/base.js", sources::BASE)
            .with_file("lib/closure/goog/string/string.js", sources::GOOG_STRING)
            .with_file("src/app/main.js", sources::MAIN)
            .with_file("src/app/util.js", sources::UTIL)
            .with_file("src/app/main_test.js", sources::MAIN_TEST)
    }

    /// The sample project: sources, the fake Java executable and a
    /// configuration with a `dev` (raw) and a `prod` (advanced) target.
    pub fn with_project(self) -> Self {
        let fixture = self.with_sources().with_fake_java();
        let config = fixture.project_config();
        fixture.with_config(&config)
    }

    /// Configuration of the sample project.
    pub fn project_config(&self) -> String {
        format!(
            r#"build: build
java: {java}
library:
  root: lib
js:
  root: src
  compiler: tools/compiler.jar
  inputs: [src/app/main.js, src/app/main_test.js]
  targets:
    - name: dev
      mode: RAW
    - name: prod
      mode: ADVANCED
      output: public/app-{{hash}}.js
      defines:
        goog.DEBUG: false
"#,
            java = self.java_path().display()
        )
    }

    /// Install the fake Java executable under `bin/`.
    pub fn with_fake_java(self) -> Self {
        let java = self.java_path();
        self.temp_dir
            .child("bin/java")
            .write_str(FAKE_JAVA)
            .expect("Failed to write fake java");
        make_executable(&java);
        self
    }

    /// Make every following Java invocation fail.
    pub fn break_java(&self) {
        self.child("bin/java.fail")
            .touch()
            .expect("Failed to write java.fail");
    }

    pub fn repair_java(&self) {
        std::fs::remove_file(self.path().join("bin/java.fail")).expect("Failed to remove java.fail");
    }

    pub fn java_path(&self) -> PathBuf {
        self.path().join("bin/java")
    }

    /// Lines recorded by the fake Java executable.
    pub fn java_calls(&self) -> Vec<String> {
        std::fs::read_to_string(self.path().join("bin/java.log"))
            .map(|log| log.lines().map(str::to_string).collect())
            .unwrap_or_default()
    }

    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    pub fn child(&self, path: &str) -> assert_fs::fixture::ChildPath {
        self.temp_dir.child(path)
    }

    /// Create a command configured to run in this fixture's directory.
    pub fn command(&self) -> assert_cmd::Command {
        let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("nsbuild");
        cmd.current_dir(self.path())
            .env_remove("NSBUILD_CONFIG")
            .env_remove("RUST_LOG")
            .arg("--color")
            .arg("never");
        cmd
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(unix)]
fn make_executable(path: &Path) {
    use std::os::unix::fs::PermissionsExt;
    let mut perms = std::fs::metadata(path)
        .expect("Failed to stat fake java")
        .permissions();
    perms.set_mode(0o755);
    std::fs::set_permissions(path, perms).expect("Failed to chmod fake java");
}

#[cfg(not(unix))]
fn make_executable(_path: &Path) {}
