//! Orchestrator for complete build cycles
//!
//! The orchestrator owns the configuration, the process-wide caches and the
//! compiler runner, and exposes one entry point per thing a caller can ask
//! for: a compiled build, the development dependency list, or a plain
//! integrity check.
//!
//! Concurrent callers are serialized by a single-flight gate, so two
//! near-simultaneous requests never compile the same stage twice. The cache
//! snapshot is flushed at the end of every cycle, whether it succeeded or
//! not; a build error takes precedence over a flush error. A failed cycle
//! forgets the timestamps it recorded for the configuration and for freshly
//! scanned scripts, so the next cycle rebuilds what this one could not.

use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};

use log::{debug, info, warn};

use super::{
    manifest, resolution, scanning, scripts, stylesheets, templates, BuildContext, BuildReport,
    GraphSummary,
};
use crate::cache::BuildCaches;
use crate::compiler::CompilerRunner;
use crate::config::Config;
use crate::defaults;
use crate::error::{Error, Result};
use crate::source::SourceDescriptor;

/// Sequences build stages over shared caches
pub struct Orchestrator {
    config: Config,
    caches: BuildCaches,
    runner: Box<dyn CompilerRunner>,
    target: Option<String>,
    output_cmd: bool,
    cache_file: PathBuf,
    gate: Mutex<()>,
}

impl Orchestrator {
    pub fn new(config: Config, caches: BuildCaches, runner: Box<dyn CompilerRunner>) -> Self {
        let cache_file = config.cache_file();
        Self {
            config,
            caches,
            runner,
            target: None,
            output_cmd: false,
            cache_file,
            gate: Mutex::new(()),
        }
    }

    /// Build for the named target instead of the first declared one.
    pub fn with_target(mut self, target: Option<String>) -> Self {
        self.target = target;
        self
    }

    /// Record the JS compiler command line in the build directory.
    pub fn with_output_cmd(mut self, output_cmd: bool) -> Self {
        self.output_cmd = output_cmd;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn caches(&self) -> &BuildCaches {
        &self.caches
    }

    pub fn target(&self) -> Option<&str> {
        self.target.as_deref()
    }

    /// Run every stage for production: stylesheets, templates, graph,
    /// resolution without tests, manifest and JS compilation.
    pub fn compile(&self) -> Result<BuildReport> {
        let _guard = self.enter()?;
        let result = self.compile_cycle();
        self.finish(result)
    }

    /// Resolve the entry points for the development loader, tests included,
    /// and write the manifest.
    pub fn dependencies(&self) -> Result<Vec<Arc<SourceDescriptor>>> {
        let _guard = self.enter()?;
        let result = self.dependencies_cycle();
        self.finish(result)
    }

    /// Build the graph and run the integrity pass.
    pub fn check(&self) -> Result<GraphSummary> {
        let _guard = self.enter()?;
        let result = self.check_cycle();
        self.finish(result)
    }

    fn enter(&self) -> Result<MutexGuard<'_, ()>> {
        self.gate.lock().map_err(|_| Error::LockPoisoned {
            context: "build gate".to_string(),
        })
    }

    fn finish<T>(&self, result: Result<T>) -> Result<T> {
        if result.is_err() {
            self.forget_config();
        }
        if let Err(err) = self.caches.flush(&self.cache_file) {
            if result.is_ok() {
                return Err(err);
            }
            warn!("Cannot flush the cache after a failed build: {}", err);
        }
        result
    }

    /// A failed cycle may have observed a configuration change without
    /// acting on it; the next cycle must still run every stage.
    fn forget_config(&self) {
        let Some(path) = &self.config.source else {
            return;
        };
        if let Err(err) = self
            .caches
            .modifications
            .invalidate(defaults::CONFIG_TAG, path)
        {
            warn!("Cannot forget the configuration timestamp: {}", err);
        }
    }

    fn context(&self) -> Result<BuildContext<'_>> {
        let target = self.target.as_deref();
        let force = match &self.config.source {
            Some(path) => self
                .caches
                .modifications
                .modified(defaults::CONFIG_TAG, path)?,
            None => false,
        };
        if force {
            debug!("Configuration changed, every stage will run");
        }

        Ok(BuildContext {
            config: &self.config,
            caches: &self.caches,
            runner: self.runner.as_ref(),
            js_target: self.config.js_target(target)?,
            gss_target: self.config.gss_target(target)?,
            output_cmd: self.output_cmd,
            force,
        })
    }

    fn compile_cycle(&self) -> Result<BuildReport> {
        let ctx = self.context()?;
        let mut report = BuildReport::default();

        report.stages.push(stylesheets::execute(&ctx)?);
        report.stages.push(templates::execute(&ctx)?);

        let graph = scanning::execute(&self.config, &self.caches, defaults::COMPILE_TAG)?;
        let compiled = resolution::execute(&graph, self.inputs(), false, self.ignored_namespaces())
            .and_then(|deps| {
                let manifest = manifest::execute(&self.config, &deps)?;
                let outcome = scripts::execute(&ctx, &graph, &deps, &manifest)?;
                Ok((deps, outcome))
            });
        let (deps, outcome) = match compiled {
            Ok(compiled) => compiled,
            Err(err) => {
                graph.forget_fresh();
                return Err(err);
            }
        };
        report.stages.push(outcome);

        report.sources = graph.len();
        report.resolved = deps.len();
        info!(
            "Build finished: {} of {} stages compiled",
            report.dirty_stages(),
            report.stages.len()
        );
        Ok(report)
    }

    fn dependencies_cycle(&self) -> Result<Vec<Arc<SourceDescriptor>>> {
        let ctx = self.context()?;
        templates::execute(&ctx)?;

        let graph = scanning::execute(&self.config, &self.caches, defaults::INPUT_TAG)?;
        let written = resolution::execute(&graph, self.inputs(), true, self.ignored_namespaces())
            .and_then(|deps| manifest::execute(&self.config, &deps).map(|_| deps));
        if written.is_err() {
            graph.forget_fresh();
        }
        written
    }

    fn check_cycle(&self) -> Result<GraphSummary> {
        let ctx = self.context()?;
        templates::execute(&ctx)?;

        let graph = scanning::execute(&self.config, &self.caches, defaults::INPUT_TAG)?;
        Ok(GraphSummary {
            sources: graph.len(),
            namespaces: graph.namespace_count(),
            has_base: graph.base().is_some(),
        })
    }

    fn inputs(&self) -> &[PathBuf] {
        self.config
            .js
            .as_ref()
            .map(|js| js.inputs.as_slice())
            .unwrap_or(&[])
    }

    fn ignored_namespaces(&self) -> &[String] {
        self.config
            .js
            .as_ref()
            .map(|js| js.ignored_namespaces.as_slice())
            .unwrap_or(&[])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::{CompilerJob, Stage};
    use crate::config::{JsConfig, JsTarget, LibraryConfig, Mode, SoyConfig};
    use crate::phases::StageOutcome;
    use std::fs;
    use std::path::Path;
    use std::thread;
    use std::time::{Duration, SystemTime};
    use tempfile::TempDir;

    /// Writes every requested output and remembers the stages it ran.
    #[derive(Clone, Default)]
    struct FakeRunner {
        runs: Arc<Mutex<Vec<Stage>>>,
        fail: bool,
        delay: Duration,
    }

    impl CompilerRunner for FakeRunner {
        fn run(&self, job: &CompilerJob) -> Result<String> {
            self.runs.lock().unwrap().push(job.stage);
            thread::sleep(self.delay);
            if self.fail {
                return Err(Error::CompilerExec {
                    compiler: "fake".to_string(),
                    status: "exit status: 1".to_string(),
                    output: "boom".to_string(),
                });
            }
            if job.stage == Stage::Templates {
                let name = job.inputs[0].file_stem().unwrap().to_string_lossy();
                fs::write(
                    &job.output,
                    format!("goog.provide('tpl.{}');\ngoog.require('goog.soy');\n", name),
                )
                .unwrap();
            } else {
                fs::write(&job.output, "compiled").unwrap();
            }
            Ok(String::new())
        }
    }

    impl FakeRunner {
        fn stages(&self) -> Vec<Stage> {
            self.runs.lock().unwrap().clone()
        }
    }

    fn write(path: &Path, content: &str) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn project(temp: &TempDir) -> Config {
        let root = temp.path();
        write(&root.join("lib/closure/goog/base.js"), "var goog = {};\n");
        write(
            &root.join("lib/closure/goog/soy/soy.js"),
            "goog.provide('goog.soy');\n",
        );
        write(
            &root.join("src/app/main.js"),
            "goog.provide('app.main');\ngoog.require('app.util');\ngoog.require('tpl.list');\n",
        );
        write(&root.join("src/app/util.js"), "goog.provide('app.util');\n");
        write(
            &root.join("src/app/main_test.js"),
            "goog.provide('app.main_test');\ngoog.require('app.main');\n",
        );
        write(&root.join("soy/list.soy"), "{namespace tpl.list}\n");

        Config {
            build: root.join("build"),
            js: Some(JsConfig {
                root: root.join("src"),
                compiler: Some(root.join("compiler.jar")),
                inputs: vec![root.join("src/app/main.js"), root.join("src/app/main_test.js")],
                targets: vec![JsTarget {
                    name: "prod".to_string(),
                    mode: Some(Mode::Advanced),
                    ..Default::default()
                }],
                ..Default::default()
            }),
            soy: Some(SoyConfig {
                root: root.join("soy"),
                compiler: root.join("soy.jar"),
            }),
            library: Some(LibraryConfig {
                root: root.join("lib"),
            }),
            ..Default::default()
        }
    }

    /// The project without templates, so only scripts reach the compiler.
    fn script_project(temp: &TempDir) -> Config {
        let mut config = project(temp);
        config.soy = None;
        write(
            &temp.path().join("src/app/main.js"),
            "goog.provide('app.main');\ngoog.require('app.util');\n",
        );
        config
    }

    fn touch(path: &Path) {
        let file = fs::OpenOptions::new().write(true).open(path).unwrap();
        file.set_modified(SystemTime::now() + Duration::from_secs(5))
            .unwrap();
    }

    /// Replace the manifest with a directory so writing it fails.
    fn block_manifest(temp: &TempDir) -> PathBuf {
        let deps = temp.path().join("build/deps.js");
        fs::remove_file(&deps).unwrap();
        fs::create_dir(&deps).unwrap();
        deps
    }

    fn orchestrator(config: Config, runner: &FakeRunner) -> Orchestrator {
        Orchestrator::new(config, BuildCaches::new(false), Box::new(runner.clone()))
    }

    #[test]
    fn test_first_build_compiles_then_rebuild_is_clean() {
        let temp = TempDir::new().unwrap();
        let runner = FakeRunner::default();
        let orchestrator = orchestrator(project(&temp), &runner);

        let first = orchestrator.compile().unwrap();
        assert_eq!(first.outcome(Stage::Templates), Some(StageOutcome::Compiled));
        assert_eq!(first.outcome(Stage::Scripts), Some(StageOutcome::Compiled));
        assert_eq!(first.resolved, 5);

        let second = orchestrator.compile().unwrap();
        assert_eq!(second.dirty_stages(), 0);
        assert_eq!(runner.stages().len(), 2);
    }

    #[test]
    fn test_touched_source_recompiles_scripts_only() {
        let temp = TempDir::new().unwrap();
        let runner = FakeRunner::default();
        let orchestrator = orchestrator(project(&temp), &runner);
        orchestrator.compile().unwrap();

        touch(&temp.path().join("src/app/util.js"));

        let report = orchestrator.compile().unwrap();
        assert_eq!(report.outcome(Stage::Templates), Some(StageOutcome::Skipped));
        assert_eq!(report.outcome(Stage::Scripts), Some(StageOutcome::Compiled));
    }

    #[test]
    fn test_manifest_lists_resolved_files() {
        let temp = TempDir::new().unwrap();
        let runner = FakeRunner::default();
        let orchestrator = orchestrator(project(&temp), &runner);

        let deps = orchestrator.dependencies().unwrap();
        assert!(deps[0].is_base);
        assert!(deps.last().unwrap().is_test());

        let manifest = fs::read_to_string(temp.path().join("build/deps.js")).unwrap();
        assert!(manifest.starts_with("goog.addDependency('base.js', ['goog'], []);"));
        assert!(manifest.contains("goog.addDependency('list.soy.js', ['tpl.list'], ['goog.soy']);"));
        assert!(manifest.contains("goog.addDependency('app/main_test.js'"));
    }

    #[test]
    fn test_failed_compile_is_retried() {
        let temp = TempDir::new().unwrap();
        let config = script_project(&temp);

        let failing = FakeRunner {
            fail: true,
            ..Default::default()
        };
        let caches = BuildCaches::new(false);
        let broken = Orchestrator::new(config.clone(), caches.clone(), Box::new(failing));
        let err = broken.compile().unwrap_err();
        assert!(matches!(err, Error::CompilerExec { .. }));

        let runner = FakeRunner::default();
        let fixed = Orchestrator::new(config, caches, Box::new(runner.clone()));
        let report = fixed.compile().unwrap();
        assert_eq!(report.outcome(Stage::Scripts), Some(StageOutcome::Compiled));
    }

    #[test]
    fn test_failure_after_scanning_keeps_changes_pending() {
        let temp = TempDir::new().unwrap();
        let runner = FakeRunner::default();
        let orchestrator = orchestrator(script_project(&temp), &runner);
        orchestrator.compile().unwrap();

        touch(&temp.path().join("src/app/util.js"));
        let deps = block_manifest(&temp);
        let err = orchestrator.compile().unwrap_err();
        assert!(matches!(err, Error::Filesystem { .. }));

        fs::remove_dir(&deps).unwrap();
        let report = orchestrator.compile().unwrap();
        assert_eq!(report.outcome(Stage::Scripts), Some(StageOutcome::Compiled));
        assert_eq!(runner.stages(), vec![Stage::Scripts, Stage::Scripts]);
    }

    #[test]
    fn test_failed_scan_keeps_changes_pending() {
        let temp = TempDir::new().unwrap();
        let runner = FakeRunner::default();
        let orchestrator = orchestrator(script_project(&temp), &runner);
        orchestrator.compile().unwrap();

        touch(&temp.path().join("src/app/util.js"));
        let dup = temp.path().join("src/app/dup.js");
        write(&dup, "goog.provide('app.util');\n");
        let err = orchestrator.compile().unwrap_err();
        assert!(matches!(err, Error::DuplicateNamespace { .. }));

        fs::remove_file(&dup).unwrap();
        let report = orchestrator.compile().unwrap();
        assert_eq!(report.outcome(Stage::Scripts), Some(StageOutcome::Compiled));
    }

    #[test]
    fn test_config_change_still_forces_after_failed_cycle() {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("nsbuild.yml");
        write(&source, "build: build\n");
        let mut config = script_project(&temp);
        config.source = Some(source.clone());

        let runner = FakeRunner::default();
        let orchestrator = orchestrator(config, &runner);
        orchestrator.compile().unwrap();

        touch(&source);
        let deps = block_manifest(&temp);
        orchestrator.compile().unwrap_err();

        fs::remove_dir(&deps).unwrap();
        let report = orchestrator.compile().unwrap();
        assert_eq!(report.outcome(Stage::Scripts), Some(StageOutcome::Compiled));
    }

    #[test]
    fn test_concurrent_builds_compile_once() {
        let temp = TempDir::new().unwrap();
        let runner = FakeRunner {
            delay: Duration::from_millis(200),
            ..Default::default()
        };
        let orchestrator = orchestrator(project(&temp), &runner);

        let reports: Vec<BuildReport> = thread::scope(|scope| {
            let handles: Vec<_> = (0..2)
                .map(|_| scope.spawn(|| orchestrator.compile().unwrap()))
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        let mut dirty: Vec<usize> = reports.iter().map(BuildReport::dirty_stages).collect();
        dirty.sort();
        assert_eq!(dirty, vec![0, 2]);
        assert_eq!(runner.stages(), vec![Stage::Templates, Stage::Scripts]);
    }

    #[test]
    fn test_cache_is_flushed_after_each_cycle() {
        let temp = TempDir::new().unwrap();
        let runner = FakeRunner::default();
        let orchestrator = orchestrator(project(&temp), &runner);
        orchestrator.check().unwrap();

        let snapshot = temp.path().join("build").join(defaults::CACHE_FILE);
        assert!(snapshot.exists());

        let reloaded = BuildCaches::load(&snapshot, false).unwrap();
        assert!(!reloaded.descriptors.is_empty().unwrap());
    }

    #[test]
    fn test_check_reports_counts() {
        let temp = TempDir::new().unwrap();
        let runner = FakeRunner::default();
        let summary = orchestrator(project(&temp), &runner).check().unwrap();
        assert_eq!(summary.sources, 6);
        assert!(summary.has_base);
    }

    #[test]
    fn test_unknown_target_is_reported() {
        let temp = TempDir::new().unwrap();
        let runner = FakeRunner::default();
        let orchestrator =
            orchestrator(project(&temp), &runner).with_target(Some("staging".to_string()));
        let err = orchestrator.compile().unwrap_err();
        assert!(matches!(err, Error::ConfigParse { .. }));
    }
}
