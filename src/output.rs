//! # Terminal Output
//!
//! Status lines printed by the CLI. Colors follow the `--color` flag and the
//! usual environment conventions:
//!
//! - `--color=never|always|auto`
//! - `NO_COLOR` disables colors when set, whatever its value
//! - `CLICOLOR=0` disables colors
//! - `CLICOLOR_FORCE=1` forces colors on a non-TTY stdout
//! - `TERM=dumb` disables colors
//!
//! ```rust,ignore
//! use nsbuild::output::{Marker, OutputConfig};
//!
//! let out = OutputConfig::from_env_and_flag("auto");
//! println!("{} 12 sources", out.marker(Marker::Ok));
//! ```

use std::env;

use console::Style;

use crate::phases::{StageOutcome, StageReport};

/// Kinds of status line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Marker {
    Ok,
    Skip,
    Info,
    Error,
}

impl Marker {
    fn plain(self) -> &'static str {
        match self {
            Marker::Ok => "[OK]",
            Marker::Skip => "[SKIP]",
            Marker::Info => "[INFO]",
            Marker::Error => "[ERR]",
        }
    }

    fn style(self) -> Style {
        match self {
            Marker::Ok => Style::new().green().bold(),
            Marker::Skip => Style::new().dim(),
            Marker::Info => Style::new().cyan(),
            Marker::Error => Style::new().red().bold(),
        }
    }
}

/// Whether status lines are colored.
#[derive(Debug, Clone)]
pub struct OutputConfig {
    pub use_color: bool,
}

impl OutputConfig {
    /// Combine the `--color` flag with the environment.
    ///
    /// `always` overrides `NO_COLOR`; anything other than `always` or
    /// `never` is treated as `auto`.
    pub fn from_env_and_flag(color_flag: &str) -> Self {
        let use_color = match color_flag.to_lowercase().as_str() {
            "always" => true,
            "never" => false,
            _ => Self::detect_color_support(),
        };

        Self { use_color }
    }

    fn detect_color_support() -> bool {
        if env::var_os("NO_COLOR").is_some() {
            return false;
        }
        if env::var("CLICOLOR").is_ok_and(|v| v == "0") {
            return false;
        }
        if env::var("CLICOLOR_FORCE").is_ok_and(|v| v != "0" && !v.is_empty()) {
            return true;
        }
        if env::var("TERM").is_ok_and(|v| v == "dumb") {
            return false;
        }
        console::Term::stdout().features().colors_supported()
    }

    #[cfg(test)]
    pub fn with_color() -> Self {
        Self { use_color: true }
    }

    #[cfg(test)]
    pub fn without_color() -> Self {
        Self { use_color: false }
    }

    /// The bracketed marker, styled when colors are on.
    pub fn marker(&self, marker: Marker) -> String {
        if self.use_color {
            marker
                .style()
                .force_styling(true)
                .apply_to(marker.plain())
                .to_string()
        } else {
            marker.plain().to_string()
        }
    }

    /// One line per build stage.
    pub fn stage_line(&self, report: &StageReport) -> String {
        let marker = match report.outcome {
            StageOutcome::Compiled => Marker::Ok,
            StageOutcome::Skipped => Marker::Skip,
        };
        format!("{} {}", self.marker(marker), report)
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self::from_env_and_flag("auto")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::Stage;
    use std::time::Duration;

    #[test]
    fn test_color_always() {
        assert!(OutputConfig::from_env_and_flag("always").use_color);
    }

    #[test]
    fn test_color_never() {
        assert!(!OutputConfig::from_env_and_flag("NEVER").use_color);
    }

    #[test]
    fn test_plain_markers() {
        let out = OutputConfig::without_color();
        assert_eq!(out.marker(Marker::Ok), "[OK]");
        assert_eq!(out.marker(Marker::Error), "[ERR]");
    }

    #[test]
    fn test_colored_marker_keeps_text() {
        let out = OutputConfig::with_color();
        let marker = out.marker(Marker::Skip);
        assert!(marker.contains("[SKIP]"));
        assert_ne!(marker, "[SKIP]");
    }

    #[test]
    fn test_stage_line() {
        let out = OutputConfig::without_color();
        let report = StageReport {
            stage: Stage::Templates,
            outcome: StageOutcome::Skipped,
            elapsed: Duration::from_millis(5),
        };
        assert!(out.stage_line(&report).starts_with("[SKIP] templates"));
    }
}
