//! Output formatting and report files

use crate::config::{CliConfig, ReportFormat};
use crate::error::{CliError, CliResult};
use console::{style, Term};
use sidebar_probe::reporter::{self, ALL_PASSED, SOME_FAILED};
use sidebar_probe::ScenarioReport;
use std::path::{Path, PathBuf};

/// Text report file name
pub const TEXT_REPORT: &str = "report.txt";

/// JSON report file name
pub const JSON_REPORT: &str = "report.json";

/// Writes reports to the terminal
#[derive(Debug)]
pub struct Printer {
    term: Term,
    /// Whether to use colors
    pub use_color: bool,
    /// Quiet mode
    pub quiet: bool,
    /// Report format
    pub format: ReportFormat,
}

impl Printer {
    /// Printer for `config`
    #[must_use]
    pub fn new(config: &CliConfig) -> Self {
        Self {
            term: Term::stdout(),
            use_color: config.color.should_color(),
            quiet: config.verbosity.is_quiet(),
            format: config.format,
        }
    }

    /// Print the report in the configured format.
    ///
    /// Quiet mode prints only the final verdict line of a text report.
    pub fn report(&self, report: &ScenarioReport) -> CliResult<()> {
        let body = match self.format {
            ReportFormat::Json => {
                reporter::render_json(report).map_err(|e| CliError::report_generation(e.to_string()))?
            }
            ReportFormat::Text if self.quiet => self.paint(
                reporter::render(report)
                    .lines()
                    .last()
                    .unwrap_or_default(),
            ),
            ReportFormat::Text => reporter::render(report)
                .lines()
                .map(|line| self.paint(line))
                .collect::<Vec<_>>()
                .join("\n"),
        };
        self.term.write_line(&body)?;
        Ok(())
    }

    /// Print a plain line unless quiet
    pub fn line(&self, message: &str) -> CliResult<()> {
        if !self.quiet {
            self.term.write_line(message)?;
        }
        Ok(())
    }

    /// Print a success line unless quiet
    pub fn success(&self, message: &str) -> CliResult<()> {
        if self.quiet {
            return Ok(());
        }
        let prefix = if self.use_color {
            style("✓").force_styling(true).green().bold().to_string()
        } else {
            "OK".to_string()
        };
        self.term.write_line(&format!("{prefix} {message}"))?;
        Ok(())
    }

    /// Print a failure line, even in quiet mode
    pub fn failure(&self, message: &str) -> CliResult<()> {
        let prefix = if self.use_color {
            style("✗").force_styling(true).red().bold().to_string()
        } else {
            "FAIL".to_string()
        };
        self.term.write_line(&format!("{prefix} {message}"))?;
        Ok(())
    }

    fn paint(&self, line: &str) -> String {
        if !self.use_color {
            return line.to_string();
        }
        let trimmed = line.trim_start();
        if trimmed.starts_with("PASS:") || line == ALL_PASSED {
            style(line).force_styling(true).green().to_string()
        } else if trimmed.starts_with("FAIL:")
            || trimmed.starts_with("ERROR:")
            || line.starts_with("ABORTED:")
            || line == SOME_FAILED
        {
            style(line).force_styling(true).red().to_string()
        } else if trimmed.starts_with("INFO:") {
            style(line).force_styling(true).yellow().to_string()
        } else {
            line.to_string()
        }
    }
}

/// Write `report.txt` and `report.json` into `dir`, returning their paths
pub fn write_reports(report: &ScenarioReport, dir: &Path) -> CliResult<Vec<PathBuf>> {
    std::fs::create_dir_all(dir)?;
    let text = dir.join(TEXT_REPORT);
    std::fs::write(&text, reporter::render(report))?;
    let json = dir.join(JSON_REPORT);
    let body =
        reporter::render_json(report).map_err(|e| CliError::report_generation(e.to_string()))?;
    std::fs::write(&json, body)?;
    Ok(vec![text, json])
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::config::{ColorChoice, Verbosity};
    use sidebar_probe::{ReportBuilder, StepResult};

    fn report() -> ScenarioReport {
        let mut builder = ReportBuilder::new("sidebar-toggle");
        builder.push(StepResult {
            step_name: "navigate /".into(),
            verdicts: Vec::new(),
            artifacts: Vec::new(),
            duration_ms: 4,
            error: None,
        });
        builder.finish()
    }

    #[test]
    fn test_write_reports() {
        let dir = tempfile::tempdir().unwrap();
        let paths = write_reports(&report(), &dir.path().join("out")).unwrap();
        assert_eq!(paths.len(), 2);
        let text = std::fs::read_to_string(&paths[0]).unwrap();
        assert!(text.contains("Scenario: sidebar-toggle"));
        let json: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&paths[1]).unwrap()).unwrap();
        assert_eq!(json["scenario"], "sidebar-toggle");
    }

    #[test]
    fn test_paint_without_color_is_identity() {
        let printer = Printer::new(&CliConfig::new().with_color(ColorChoice::Never));
        assert_eq!(printer.paint("   FAIL: x - y"), "   FAIL: x - y");
    }

    #[test]
    fn test_paint_with_color_wraps_verdicts() {
        let printer = Printer::new(&CliConfig::new().with_color(ColorChoice::Always));
        assert_ne!(printer.paint("   PASS: x - y"), "   PASS: x - y");
        assert_eq!(printer.paint("1. navigate / (4ms)"), "1. navigate / (4ms)");
    }

    #[test]
    fn test_quiet_printer() {
        let printer = Printer::new(&CliConfig::new().with_verbosity(Verbosity::Quiet));
        assert!(printer.quiet);
    }
}
