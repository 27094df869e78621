//! Implementation of the build pipeline stages.
//!
//! ## Overview
//!
//! A compile cycle runs these stages, in this order:
//! 1. Stylesheets - Compile `.gss` inputs into `compiled.css` and the renaming map
//! 2. Templates - Compile every modified `.soy` file into a `.soy.js` script
//! 3. Scanning - Build the namespace graph over the library and script roots
//! 4. Resolution - Order the files needed by the entry-point namespaces
//! 5. Manifest - Write `deps.js` for the development loader
//! 6. Scripts - Hand the ordered file list to the JS compiler
//!
//! Stylesheets and templates always run before scanning: compiled templates
//! are scripts the graph has to see. Each compiling stage decides on its own
//! whether its inputs changed and reports [`StageOutcome::Skipped`] when they
//! did not.
//!
//! The [`orchestrator`] sequences the stages, serializes concurrent callers
//! and flushes the caches at the end of every cycle.

use std::fmt;
use std::time::Duration;

use crate::cache::BuildCaches;
use crate::compiler::{CompilerJob, CompilerRunner, Stage};
use crate::config::{Config, GssTarget, JsTarget};
use crate::error::Result;

pub mod manifest;
pub mod orchestrator;
pub mod resolution;
pub mod scanning;
pub mod scripts;
pub mod stylesheets;
pub mod templates;

/// Everything a stage needs to know about the current cycle
pub struct BuildContext<'a> {
    pub config: &'a Config,
    pub caches: &'a BuildCaches,
    pub runner: &'a dyn CompilerRunner,
    pub js_target: JsTarget,
    pub gss_target: GssTarget,
    /// Record the JS compiler command line in the build directory
    pub output_cmd: bool,
    /// Recompile even if no input changed (the configuration did)
    pub force: bool,
}

impl<'a> BuildContext<'a> {
    /// Run `job`, forgetting the observations about `inputs` if it fails so
    /// that the next cycle tries again.
    pub fn run_job<'p, I>(&self, tag: &str, job: &CompilerJob, inputs: I) -> Result<()>
    where
        I: IntoIterator<Item = &'p std::path::Path>,
    {
        match self.runner.run(job) {
            Ok(_) => Ok(()),
            Err(err) => {
                for input in inputs {
                    self.caches.modifications.invalidate(tag, input)?;
                }
                Err(err)
            }
        }
    }
}

/// Whether a stage did any work
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageOutcome {
    Compiled,
    Skipped,
}

/// Result of one compiling stage
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageReport {
    pub stage: Stage,
    pub outcome: StageOutcome,
    pub elapsed: Duration,
}

impl fmt::Display for StageReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let outcome = match self.outcome {
            StageOutcome::Compiled => "compiled",
            StageOutcome::Skipped => "unchanged",
        };
        write!(
            f,
            "{}: {} ({:.2}s)",
            self.stage,
            outcome,
            self.elapsed.as_secs_f64()
        )
    }
}

/// Summary of a full compile cycle
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildReport {
    pub stages: Vec<StageReport>,
    /// Files in the namespace graph
    pub sources: usize,
    /// Files the entry points need, base included
    pub resolved: usize,
}

impl BuildReport {
    /// Stages that actually invoked a compiler.
    pub fn dirty_stages(&self) -> usize {
        self.stages
            .iter()
            .filter(|s| s.outcome == StageOutcome::Compiled)
            .count()
    }

    pub fn outcome(&self, stage: Stage) -> Option<StageOutcome> {
        self.stages
            .iter()
            .find(|s| s.stage == stage)
            .map(|s| s.outcome)
    }
}

/// Counts reported by the integrity check
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GraphSummary {
    pub sources: usize,
    pub namespaces: usize,
    pub has_base: bool,
}
