//! Report rendering.
//!
//! Pure formatting: turning a [`ScenarioReport`] into text or JSON. Writing
//! the result anywhere is up to the caller.

use crate::result::ProbeResult;
use crate::rules::Status;
use crate::runner::{RunStatus, ScenarioReport};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;

const RULE: &str = "============================================================";

/// Final line when every FAIL-severity rule passed and the run completed
pub const ALL_PASSED: &str = "ALL TESTS PASSED";

/// Final line otherwise
pub const SOME_FAILED: &str = "SOME TESTS FAILED";

/// Verdict counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    /// PASS verdicts
    pub passed: usize,
    /// FAIL verdicts
    pub failed: usize,
    /// INFO verdicts
    pub info: usize,
    /// Screenshots written
    pub artifacts: usize,
}

impl Summary {
    /// Count the verdicts of a report
    #[must_use]
    pub fn of(report: &ScenarioReport) -> Self {
        let mut summary = report.verdicts().fold(Self::default(), |mut acc, v| {
            match v.status {
                Status::Pass => acc.passed += 1,
                Status::Fail => acc.failed += 1,
                Status::Info => acc.info += 1,
            }
            acc
        });
        summary.artifacts = report.artifacts().count();
        summary
    }

    /// Total verdicts
    #[must_use]
    pub const fn total(&self) -> usize {
        self.passed + self.failed + self.info
    }
}

/// Human-readable summary, one line per verdict
#[must_use]
pub fn render(report: &ScenarioReport) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Scenario: {}", report.scenario());
    let _ = writeln!(out, "Run: {}", report.run_id());
    let _ = writeln!(out, "{RULE}");

    for (index, step) in report.steps().iter().enumerate() {
        let _ = writeln!(out, "{}. {} ({}ms)", index + 1, step.step_name, step.duration_ms);
        for verdict in &step.verdicts {
            let _ = writeln!(
                out,
                "   {}: {} - {}",
                verdict.status, verdict.rule, verdict.explanation
            );
        }
        for artifact in &step.artifacts {
            let _ = writeln!(out, "   Screenshot saved: {}", artifact.path.display());
        }
        if let Some(error) = &step.error {
            let _ = writeln!(out, "   ERROR: {error}");
        }
    }

    let summary = Summary::of(report);
    let _ = writeln!(out, "{RULE}");
    if let RunStatus::Aborted { reason } = report.status() {
        let _ = writeln!(out, "ABORTED: {reason}");
    }
    let _ = writeln!(
        out,
        "Verdicts: {} passed, {} failed, {} info",
        summary.passed, summary.failed, summary.info
    );
    if summary.artifacts > 0 {
        let _ = writeln!(out, "Screenshots: {}", summary.artifacts);
    }
    let _ = writeln!(
        out,
        "{}",
        if report.overall_passed() {
            ALL_PASSED
        } else {
            SOME_FAILED
        }
    );
    out
}

/// Pretty JSON form of the report
pub fn render_json(report: &ScenarioReport) -> ProbeResult<String> {
    Ok(serde_json::to_string_pretty(report)?)
}

/// Process exit code: 0 iff no FAIL verdict and the run completed
#[must_use]
pub const fn exit_code(report: &ScenarioReport) -> i32 {
    if report.overall_passed() {
        0
    } else {
        1
    }
}
