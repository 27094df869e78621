//! Stage 2: Templates
//!
//! Every modified `.soy` file under the template root is compiled to
//! `build/templates/<relative path>.js`. Compiled templates whose source no
//! longer exists are deleted first, so the scanning stage never sees
//! namespaces from removed templates.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use log::{debug, info};

use super::{BuildContext, StageOutcome, StageReport};
use crate::compiler::{CompilerFlag, CompilerJob, Stage};
use crate::defaults;
use crate::error::{Error, Result};
use crate::scan::Scanner;

/// Compile the modified templates
pub fn execute(ctx: &BuildContext<'_>) -> Result<StageReport> {
    let start = Instant::now();
    let outcome = compile(ctx)?;
    Ok(StageReport {
        stage: Stage::Templates,
        outcome,
        elapsed: start.elapsed(),
    })
}

fn compile(ctx: &BuildContext<'_>) -> Result<StageOutcome> {
    let Some(soy) = &ctx.config.soy else {
        return Ok(StageOutcome::Skipped);
    };

    let out_dir = ctx.config.templates_dir();
    fs::create_dir_all(&out_dir).map_err(|e| Error::filesystem(&out_dir, e))?;

    let scanner = Scanner::new();
    let mut sources = scanner.scan(&soy.root, defaults::SOY_EXT)?;
    sources.sort();

    let removed = remove_stale(&scanner, &soy.root, &out_dir)?;
    if removed > 0 {
        info!("Removed {} stale compiled templates", removed);
    }

    let mut outcome = StageOutcome::Skipped;
    for source in &sources {
        let output = compiled_path(&soy.root, &out_dir, source)?;
        let modified = ctx
            .caches
            .modifications
            .modified(defaults::COMPILE_TAG, source)?;
        if !modified && !ctx.force && output.exists() {
            continue;
        }

        if let Some(parent) = output.parent() {
            fs::create_dir_all(parent).map_err(|e| Error::filesystem(parent, e))?;
        }

        debug!("Compiling template {}", source.display());
        let job = CompilerJob::new(Stage::Templates, &soy.compiler, &output)
            .input(source)
            .flag(CompilerFlag::switch("--shouldGenerateJsdoc"))
            .flag(CompilerFlag::switch("--shouldProvideRequireSoyNamespaces"))
            .flag(CompilerFlag::new("--cssHandlingScheme", "goog"));
        ctx.run_job(defaults::COMPILE_TAG, &job, [source.as_path()])?;
        outcome = StageOutcome::Compiled;
    }

    if outcome == StageOutcome::Skipped {
        debug!("Templates unchanged, skipping");
    }
    Ok(outcome)
}

/// Where the compiled version of `source` lives.
pub fn compiled_path(root: &Path, out_dir: &Path, source: &Path) -> Result<PathBuf> {
    let rel = source.strip_prefix(root).map_err(|_| Error::PathResolution {
        path: source.display().to_string(),
    })?;
    let mut name = out_dir.join(rel).into_os_string();
    name.push(defaults::JS_EXT);
    Ok(PathBuf::from(name))
}

/// Delete compiled templates whose `.soy` source is gone.
///
/// Returns the number of removed files.
pub fn remove_stale(scanner: &Scanner, root: &Path, out_dir: &Path) -> Result<usize> {
    let mut removed = 0;
    for compiled in scanner.scan(out_dir, defaults::JS_EXT)? {
        let Ok(rel) = compiled.strip_prefix(out_dir) else {
            continue;
        };
        let rel = rel.to_string_lossy();
        let Some(source_rel) = rel.strip_suffix(defaults::JS_EXT) else {
            continue;
        };
        if !root.join(source_rel).exists() {
            debug!("Removing stale template {}", compiled.display());
            fs::remove_file(&compiled).map_err(|e| Error::filesystem(&compiled, e))?;
            removed += 1;
        }
    }
    Ok(removed)
}
