//! End-to-end tests for the `build` command.
//!
//! These run the real binary against a fake Java executable that records
//! its arguments and creates the requested output files.

#![cfg(unix)]

mod common;
use common::prelude::*;

use serial_test::serial;
use std::fs;
use std::thread;
use std::time::Duration;

#[test]
#[serial]
fn test_build_default_target_is_raw() {
    let fixture = TestFixture::new().with_project();
    fixture
        .command()
        .arg("build")
        .assert()
        .success()
        .stdout(predicate::str::contains("[SKIP] scripts: unchanged"));

    assert!(fixture.java_calls().is_empty());
    fixture.child("build/deps.js").assert(predicate::path::exists());
    fixture.child("public").assert(predicate::path::missing());
}

#[test]
#[serial]
fn test_build_compiles_and_publishes() {
    let fixture = TestFixture::new().with_project();
    fixture
        .command()
        .args(["build", "--target", "prod"])
        .assert()
        .success()
        .stdout(predicate::str::contains("[OK] scripts: compiled"))
        .stdout(predicate::str::contains("prod-js -> "));

    let calls = fixture.java_calls();
    assert_eq!(calls.len(), 1);
    let call = &calls[0];
    assert!(call.contains("-jar tools/compiler.jar --js_output_file build/compiled.js"));
    assert!(call.contains(
        "--js lib/closure/goog/base.js --js build/deps.js --js src/app/util.js \
         --js lib/closure/goog/string/string.js --js src/app/main.js"
    ));
    assert!(!call.contains("main_test.js"));
    assert!(call.contains("--define goog.DEBUG=false"));
    assert!(call.contains("--compilation_level ADVANCED_OPTIMIZATIONS"));

    let published: Vec<_> = fs::read_dir(fixture.path().join("public"))
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().to_string())
        .collect();
    assert_eq!(published.len(), 1);
    assert!(published[0].starts_with("app-"));
    assert!(!published[0].contains("{hash}"));
}

#[test]
#[serial]
fn test_rebuild_without_changes_skips_compiler() {
    let fixture = TestFixture::new().with_project();
    fixture
        .command()
        .args(["build", "--target", "prod"])
        .assert()
        .success();
    fixture
        .command()
        .args(["build", "--target", "prod"])
        .assert()
        .success()
        .stdout(predicate::str::contains("[SKIP] scripts: unchanged"));

    assert_eq!(fixture.java_calls().len(), 1);
}

#[test]
#[serial]
fn test_modified_source_recompiles() {
    let fixture = TestFixture::new().with_project();
    fixture
        .command()
        .args(["build", "--target", "prod"])
        .assert()
        .success();

    // Leave room for filesystems with coarse timestamps.
    thread::sleep(Duration::from_millis(1100));
    fixture
        .child("src/app/util.js")
        .write_str("goog.provide('app.util');\n// changed\n")
        .unwrap();

    fixture
        .command()
        .args(["build", "--target", "prod"])
        .assert()
        .success()
        .stdout(predicate::str::contains("[OK] scripts: compiled"));
    assert_eq!(fixture.java_calls().len(), 2);
}

#[test]
#[serial]
fn test_failed_compile_is_retried() {
    let fixture = TestFixture::new().with_project();
    fixture.break_java();
    fixture
        .command()
        .args(["build", "--target", "prod"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Compiler error"))
        .stderr(predicate::str::contains("ERROR - broken input"));

    fixture.repair_java();
    fixture
        .command()
        .args(["build", "--target", "prod"])
        .assert()
        .success()
        .stdout(predicate::str::contains("[OK] scripts: compiled"));
    assert_eq!(fixture.java_calls().len(), 2);
}

#[test]
#[serial]
fn test_output_cmd_and_no_publish() {
    let fixture = TestFixture::new().with_project();
    fixture
        .command()
        .args(["build", "--target", "prod", "--output-cmd", "--no-publish"])
        .assert()
        .success();

    let java = fixture.java_path().display().to_string();
    fixture
        .child("build/cmd")
        .assert(predicate::str::starts_with(java))
        .assert(predicate::str::contains("--js_output_file build/compiled.js"));
    fixture.child("public").assert(predicate::path::missing());
}

#[test]
#[serial]
fn test_mapping_file() {
    let fixture = TestFixture::new().with_project();
    let config = format!("{}map:\n  file: public/mapping.js\n", fixture.project_config());
    let fixture = fixture.with_config(&config);

    fixture
        .command()
        .args(["build", "--target", "prod"])
        .assert()
        .success();

    fixture
        .child("public/mapping.js")
        .assert(predicate::str::starts_with("var mapping = {\"prod-js\":\"public/app-"));
}

#[test]
#[serial]
fn test_unknown_target() {
    let fixture = TestFixture::new().with_project();
    fixture
        .command()
        .args(["build", "--target", "staging"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("staging"));
    assert!(fixture.java_calls().is_empty());
}

#[test]
#[serial]
fn test_templates_and_stylesheets_are_compiled() {
    let fixture = TestFixture::new()
        .with_project()
        .with_file("soy/app/view.soy", "{namespace app.view}\n")
        .with_file("styles/main.gss", ".a { color: red; }\n");
    let config = format!(
        "{}soy:\n  root: soy\n  compiler: tools/soy.jar\ngss:\n  compiler: tools/gss.jar\n  inputs: [styles/main.gss]\n",
        fixture.project_config()
    );
    let fixture = fixture.with_config(&config);

    fixture
        .command()
        .args(["build", "--target", "prod", "--no-publish"])
        .assert()
        .success()
        .stdout(predicate::str::contains("[OK] stylesheets: compiled"))
        .stdout(predicate::str::contains("[OK] templates: compiled"))
        .stdout(predicate::str::contains("[OK] scripts: compiled"));

    fixture
        .child("build/templates/app/view.soy.js")
        .assert(predicate::path::exists());
    fixture
        .child("build/compiled.css")
        .assert(predicate::path::exists());

    let calls = fixture.java_calls();
    assert_eq!(calls.len(), 3);
    assert!(calls[0].contains("tools/gss.jar --output-file build/compiled.css"));
    assert!(calls[1].contains("--shouldProvideRequireSoyNamespaces"));
}
