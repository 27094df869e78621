//! Stage 1: Stylesheets
//!
//! Compiles the configured `.gss` inputs into `compiled.css` for the selected
//! target. The renaming map is reset before every compilation, and created
//! empty when the project has no stylesheets at all, because the JS compiler
//! always expects to find it.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use log::{debug, info};

use super::{BuildContext, StageOutcome, StageReport};
use crate::compiler::{CompilerFlag, CompilerJob, Stage};
use crate::defaults;
use crate::error::{Error, Result};
use crate::scan::Scanner;

/// Compile the stylesheets if any of them changed
pub fn execute(ctx: &BuildContext<'_>) -> Result<StageReport> {
    let start = Instant::now();
    let outcome = compile(ctx)?;
    Ok(StageReport {
        stage: Stage::Stylesheets,
        outcome,
        elapsed: start.elapsed(),
    })
}

fn compile(ctx: &BuildContext<'_>) -> Result<StageOutcome> {
    let build = &ctx.config.build;
    let renaming_map = build.join(defaults::RENAMING_MAP_NAME);

    let Some(gss) = &ctx.config.gss else {
        if !renaming_map.exists() {
            reset_renaming_map(&renaming_map)?;
        }
        return Ok(StageOutcome::Skipped);
    };

    let inputs = stylesheet_inputs(&gss.inputs, gss.root.as_deref())?;
    if inputs.is_empty() {
        debug!("No stylesheets to compile");
        if !renaming_map.exists() {
            reset_renaming_map(&renaming_map)?;
        }
        return Ok(StageOutcome::Skipped);
    }

    let output = build.join(defaults::CSS_NAME);
    let modified = ctx.caches.modifications.any_modified(
        defaults::COMPILE_TAG,
        inputs.iter().map(PathBuf::as_path),
    )?;
    if !modified && !ctx.force && output.exists() {
        debug!("Stylesheets unchanged, skipping");
        return Ok(StageOutcome::Skipped);
    }

    info!("Compiling stylesheets for target {}", ctx.gss_target.name);
    reset_renaming_map(&renaming_map)?;

    let mut job = CompilerJob::new(Stage::Stylesheets, &gss.compiler, &output)
        .inputs(inputs.iter().cloned())
        .flags(
            gss.funcs
                .iter()
                .map(|f| CompilerFlag::new("--allowed-non-standard-function", f)),
        );
    if ctx.gss_target.rename() {
        job = job
            .flag(CompilerFlag::new("--output-renaming-map-format", "CLOSURE_COMPILED"))
            .flag(CompilerFlag::new("--rename", "CLOSURE"))
            .flag(CompilerFlag::new(
                "--output-renaming-map",
                renaming_map.display().to_string(),
            ));
    }
    job = job.flags(
        ctx.gss_target
            .defines
            .iter()
            .map(|d| CompilerFlag::new("--define", d)),
    );

    ctx.run_job(
        defaults::COMPILE_TAG,
        &job,
        inputs.iter().map(PathBuf::as_path),
    )?;
    Ok(StageOutcome::Compiled)
}

/// Configured inputs, or every `.gss` file under `root` when none are listed.
fn stylesheet_inputs(inputs: &[PathBuf], root: Option<&Path>) -> Result<Vec<PathBuf>> {
    if !inputs.is_empty() {
        return Ok(inputs.to_vec());
    }
    let Some(root) = root else {
        return Ok(Vec::new());
    };
    let mut found = Scanner::new().scan(root, defaults::GSS_EXT)?;
    found.sort();
    Ok(found)
}

/// Create (or truncate) the renaming map file.
pub fn reset_renaming_map(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| Error::filesystem(parent, e))?;
    }
    fs::write(path, "").map_err(|e| Error::filesystem(path, e))
}
