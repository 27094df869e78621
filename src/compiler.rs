//! External compiler boundary
//!
//! Every compiler stage boils down to a [`CompilerJob`]: an output path, an
//! ordered list of inputs and opaque flags. How the job is executed is
//! behind the [`CompilerRunner`] trait so the orchestrator can be exercised
//! without spawning processes.

use std::fmt;
use std::path::PathBuf;
use std::process::Command;

use log::{debug, info, warn};

use crate::error::{Error, Result};

/// Which external compiler a job is meant for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Stylesheets,
    Templates,
    Scripts,
}

impl Stage {
    pub fn name(&self) -> &'static str {
        match self {
            Stage::Stylesheets => "stylesheets",
            Stage::Templates => "templates",
            Stage::Scripts => "scripts",
        }
    }

    fn output_flag(&self) -> &'static str {
        match self {
            Stage::Stylesheets => "--output-file",
            Stage::Templates => "--outputPathFormat",
            Stage::Scripts => "--js_output_file",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A single command-line flag, with or without a value
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompilerFlag {
    pub name: String,
    pub value: Option<String>,
}

impl CompilerFlag {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: Some(value.into()),
        }
    }

    /// A flag without a value, like `--shouldGenerateJsdoc`.
    pub fn switch(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: None,
        }
    }
}

/// One invocation of an external compiler
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompilerJob {
    pub stage: Stage,
    /// Compiler jar handed to the JVM
    pub compiler: PathBuf,
    pub output: PathBuf,
    /// Inputs in the exact order the compiler must see them
    pub inputs: Vec<PathBuf>,
    pub flags: Vec<CompilerFlag>,
}

impl CompilerJob {
    pub fn new(stage: Stage, compiler: impl Into<PathBuf>, output: impl Into<PathBuf>) -> Self {
        Self {
            stage,
            compiler: compiler.into(),
            output: output.into(),
            inputs: Vec::new(),
            flags: Vec::new(),
        }
    }

    pub fn input(mut self, path: impl Into<PathBuf>) -> Self {
        self.inputs.push(path.into());
        self
    }

    pub fn inputs<I, P>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.inputs.extend(paths.into_iter().map(Into::into));
        self
    }

    pub fn flag(mut self, flag: CompilerFlag) -> Self {
        self.flags.push(flag);
        self
    }

    pub fn flags(mut self, flags: impl IntoIterator<Item = CompilerFlag>) -> Self {
        self.flags.extend(flags);
        self
    }

    /// Arguments for the JVM, starting with `-jar`.
    ///
    /// Script inputs are each preceded by `--js`; stylesheet and template
    /// inputs are positional and come after the flags.
    pub fn command_args(&self) -> Vec<String> {
        let mut args = vec![
            "-jar".to_string(),
            self.compiler.display().to_string(),
            self.stage.output_flag().to_string(),
            self.output.display().to_string(),
        ];

        if self.stage == Stage::Scripts {
            for input in &self.inputs {
                args.push("--js".to_string());
                args.push(input.display().to_string());
            }
        }

        for flag in &self.flags {
            args.push(flag.name.clone());
            if let Some(value) = &flag.value {
                args.push(value.clone());
            }
        }

        if self.stage != Stage::Scripts {
            args.extend(self.inputs.iter().map(|p| p.display().to_string()));
        }

        args
    }
}

/// Executes compiler jobs
///
/// Implementations block until the compiler exits. A successful run returns
/// whatever the compiler printed (usually warnings).
pub trait CompilerRunner: Send + Sync {
    fn run(&self, job: &CompilerJob) -> Result<String>;

    /// Human readable command line for `job`, used by `--output-cmd`.
    fn command_line(&self, job: &CompilerJob) -> String {
        job.command_args().join(" ")
    }
}

/// Runs compilers through a Java executable
#[derive(Debug, Clone)]
pub struct JavaCompilerRunner {
    java: String,
}

impl JavaCompilerRunner {
    pub fn new(java: impl Into<String>) -> Self {
        Self { java: java.into() }
    }
}

impl Default for JavaCompilerRunner {
    fn default() -> Self {
        Self::new("java")
    }
}

impl CompilerRunner for JavaCompilerRunner {
    fn run(&self, job: &CompilerJob) -> Result<String> {
        let args = job.command_args();
        info!("Compiling {} ({} inputs)", job.stage, job.inputs.len());
        debug!("{} {}", self.java, args.join(" "));

        let output = Command::new(&self.java)
            .args(&args)
            .output()
            .map_err(|e| Error::CompilerExec {
                compiler: self.java.clone(),
                status: "failed to start".to_string(),
                output: e.to_string(),
            })?;

        let mut text = String::from_utf8_lossy(&output.stdout).to_string();
        text.push_str(&String::from_utf8_lossy(&output.stderr));

        if !output.status.success() {
            return Err(Error::CompilerExec {
                compiler: format!("{} ({})", self.java, job.stage),
                status: output.status.to_string(),
                output: text,
            });
        }

        if !text.trim().is_empty() {
            warn!("Output from the {} compiler:\n{}", job.stage, text);
        }
        Ok(text)
    }

    fn command_line(&self, job: &CompilerJob) -> String {
        format!("{} {}", self.java, job.command_args().join(" "))
    }
}
