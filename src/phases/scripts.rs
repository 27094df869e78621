//! Stage 6: Scripts
//!
//! Hands the resolved file list to the JS compiler. The stage is skipped
//! when the graph is clean, no extern or renaming map changed and the
//! previous output is still there.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use log::{debug, info};

use super::{BuildContext, StageOutcome, StageReport};
use crate::compiler::{CompilerFlag, CompilerJob, Stage};
use crate::config::Mode;
use crate::defaults;
use crate::error::{Error, Result};
use crate::graph::NamespaceGraph;
use crate::source::SourceDescriptor;

const OUTPUT_WRAPPER: &str = "(function(){%output%})();";

/// Compile `deps` (in order) if anything they depend on changed
pub fn execute(
    ctx: &BuildContext<'_>,
    graph: &NamespaceGraph,
    deps: &[Arc<SourceDescriptor>],
    manifest: &Path,
) -> Result<StageReport> {
    let start = Instant::now();
    let outcome = compile(ctx, graph, deps, manifest)?;
    Ok(StageReport {
        stage: Stage::Scripts,
        outcome,
        elapsed: start.elapsed(),
    })
}

fn compile(
    ctx: &BuildContext<'_>,
    graph: &NamespaceGraph,
    deps: &[Arc<SourceDescriptor>],
    manifest: &Path,
) -> Result<StageOutcome> {
    let Some(js) = &ctx.config.js else {
        return Ok(StageOutcome::Skipped);
    };
    let mode = ctx.js_target.mode();
    let Some(level) = mode.compilation_level() else {
        debug!("Target {} is not compiled", ctx.js_target.name);
        return Ok(StageOutcome::Skipped);
    };
    let Some(compiler) = &js.compiler else {
        return Err(Error::ConfigParse {
            message: format!("Target {} needs a JS compiler", ctx.js_target.name),
            hint: Some("Set js.compiler to the compiler jar".to_string()),
        });
    };

    let output = ctx.config.build.join(defaults::JS_NAME);
    let renaming_map = ctx.config.build.join(defaults::RENAMING_MAP_NAME);

    let mut watched: Vec<&Path> = js.externs.iter().map(PathBuf::as_path).collect();
    if renaming_map.exists() {
        watched.push(renaming_map.as_path());
    }
    let externs_changed = ctx
        .caches
        .modifications
        .any_modified(defaults::COMPILE_TAG, watched)?;

    if !graph.is_dirty() && !externs_changed && !ctx.force && output.exists() {
        debug!("Scripts unchanged, skipping");
        return Ok(StageOutcome::Skipped);
    }

    let job = script_job(ctx, compiler, &output, deps, manifest, level);

    if ctx.output_cmd {
        let cmd_file = ctx.config.build.join(defaults::CMD_FILE);
        fs::write(&cmd_file, format!("{}\n", ctx.runner.command_line(&job)))
            .map_err(|e| Error::filesystem(&cmd_file, e))?;
    }

    info!(
        "Compiling {} scripts for target {}",
        job.inputs.len(),
        ctx.js_target.name
    );
    ctx.run_job(
        defaults::COMPILE_TAG,
        &job,
        graph.sources().map(|src| src.path.as_path()),
    )?;
    Ok(StageOutcome::Compiled)
}

/// The compiler job: base file, manifest, then every non-test dependency in
/// resolution order.
fn script_job(
    ctx: &BuildContext<'_>,
    compiler: &Path,
    output: &Path,
    deps: &[Arc<SourceDescriptor>],
    manifest: &Path,
    level: &str,
) -> CompilerJob {
    let mut inputs = Vec::with_capacity(deps.len() + 1);
    let mut rest = deps.iter();
    if let Some(base) = deps.first().filter(|src| src.is_base) {
        inputs.push(base.path.clone());
        rest.next();
    }
    inputs.push(manifest.to_path_buf());
    inputs.extend(
        rest.filter(|src| !src.is_test())
            .map(|src| src.path.clone()),
    );

    let mut job = CompilerJob::new(Stage::Scripts, compiler, output)
        .inputs(inputs)
        .flag(CompilerFlag::new("--output_wrapper", OUTPUT_WRAPPER));

    for (name, value) in &ctx.js_target.defines {
        job = job.flag(CompilerFlag::new(
            "--define",
            format!("{}={}", name, value.to_compiler_value()),
        ));
    }
    if let Some(js) = &ctx.config.js {
        for (check, severity) in &js.checks {
            job = job.flag(CompilerFlag::new(severity.flag(), check));
        }
    }
    job = job
        .flag(CompilerFlag::new("--compilation_level", level))
        .flag(CompilerFlag::new(
            "--warning_level",
            ctx.js_target.level().to_string(),
        ));
    if let Some(js) = &ctx.config.js {
        for extern_file in &js.externs {
            job = job.flag(CompilerFlag::new(
                "--externs",
                extern_file.display().to_string(),
            ));
        }
    }
    job
}

/// Whether the target produces a compiled script at all.
pub fn is_compiled(mode: Mode) -> bool {
    mode.compilation_level().is_some()
}
