//! Scenario runner.
//!
//! Executes steps strictly in order against one page session:
//!
//! 1. Validate the scenario, open a session through the [`SessionProvider`].
//! 2. Run each step. Failed rules become verdicts and execution continues;
//!    a fatal error stops the run and marks the report aborted.
//! 3. Close the session on every path, including the overall timeout.
//!
//! Reports are assembled through [`ReportBuilder`], which only appends;
//! [`ReportBuilder::finish`] hands out the immutable [`ScenarioReport`].

use crate::config::HarnessConfig;
use crate::driver::{SettleStrategy, StateDriver};
use crate::gateway::{BrowserGateway, ElementHandle, SessionProvider};
use crate::locator::locate_one;
use crate::result::{ProbeError, ProbeResult};
use crate::rules::{Evaluator, Rule, Verdict};
use crate::scenario::{Scenario, SettleSpec, Step};
use crate::snapshot::{capture, Baselines};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Instant;
use tracing::{info, warn};
use uuid::Uuid;

/// Screenshot written by a capture step
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotRef {
    /// Capture label (also the baseline key)
    pub label: String,
    /// Screenshot path
    pub path: PathBuf,
}

/// Outcome of one step
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepResult {
    /// Step description
    pub step_name: String,
    /// Verdicts produced by the step
    pub verdicts: Vec<Verdict>,
    /// Artifacts written by the step
    pub artifacts: Vec<SnapshotRef>,
    /// Wall time
    pub duration_ms: u64,
    /// Fatal error that stopped the run at this step
    pub error: Option<String>,
}

/// How the run ended
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RunStatus {
    /// Every step ran
    Completed,
    /// A fatal error or timeout stopped the run
    Aborted {
        /// Why
        reason: String,
    },
}

/// Immutable result of a scenario run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScenarioReport {
    run_id: Uuid,
    scenario: String,
    started_at: DateTime<Utc>,
    finished_at: DateTime<Utc>,
    steps: Vec<StepResult>,
    status: RunStatus,
    overall_passed: bool,
}

impl ScenarioReport {
    /// Unique run id
    #[must_use]
    pub const fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// Scenario name
    #[must_use]
    pub fn scenario(&self) -> &str {
        &self.scenario
    }

    /// Start time
    #[must_use]
    pub const fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// End time
    #[must_use]
    pub const fn finished_at(&self) -> DateTime<Utc> {
        self.finished_at
    }

    /// Step results in execution order
    #[must_use]
    pub fn steps(&self) -> &[StepResult] {
        &self.steps
    }

    /// Completion status
    #[must_use]
    pub const fn status(&self) -> &RunStatus {
        &self.status
    }

    /// True when the run was aborted
    #[must_use]
    pub const fn is_aborted(&self) -> bool {
        matches!(self.status, RunStatus::Aborted { .. })
    }

    /// No FAIL verdict and not aborted
    #[must_use]
    pub const fn overall_passed(&self) -> bool {
        self.overall_passed
    }

    /// Every verdict in order
    pub fn verdicts(&self) -> impl Iterator<Item = &Verdict> {
        self.steps.iter().flat_map(|s| s.verdicts.iter())
    }

    /// Every artifact in order
    pub fn artifacts(&self) -> impl Iterator<Item = &SnapshotRef> {
        self.steps.iter().flat_map(|s| s.artifacts.iter())
    }
}

/// Append-only report under construction
#[derive(Debug)]
pub struct ReportBuilder {
    run_id: Uuid,
    scenario: String,
    started_at: DateTime<Utc>,
    steps: Vec<StepResult>,
    abort: Option<String>,
}

impl ReportBuilder {
    /// Start a report
    #[must_use]
    pub fn new(scenario: impl Into<String>) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            scenario: scenario.into(),
            started_at: Utc::now(),
            steps: Vec::new(),
            abort: None,
        }
    }

    /// Append a step result
    pub fn push(&mut self, step: StepResult) {
        self.steps.push(step);
    }

    /// Mark the run aborted; the first reason wins
    pub fn abort(&mut self, reason: impl Into<String>) {
        if self.abort.is_none() {
            self.abort = Some(reason.into());
        }
    }

    /// Steps recorded so far
    #[must_use]
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// No steps recorded yet
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Freeze into a report
    #[must_use]
    pub fn finish(self) -> ScenarioReport {
        let any_failure = self
            .steps
            .iter()
            .flat_map(|s| &s.verdicts)
            .any(Verdict::is_failure);
        let status = match self.abort {
            Some(reason) => RunStatus::Aborted { reason },
            None => RunStatus::Completed,
        };
        let overall_passed = !any_failure && status == RunStatus::Completed;
        ScenarioReport {
            run_id: self.run_id,
            scenario: self.scenario,
            started_at: self.started_at,
            finished_at: Utc::now(),
            steps: self.steps,
            status,
            overall_passed,
        }
    }
}

/// Run `scenario` in a fresh session from `provider`.
///
/// Always returns a report; problems before the first step (invalid
/// scenario, browser launch failure) produce an aborted report with no steps.
pub async fn run_scenario<P>(provider: &P, scenario: &Scenario, config: &HarnessConfig) -> ScenarioReport
where
    P: SessionProvider + ?Sized,
{
    let mut report = ReportBuilder::new(&scenario.name);

    if let Err(e) = config.validate().and_then(|()| scenario.validate()) {
        report.abort(e.to_string());
        return report.finish();
    }

    let gateway = match provider.open(config).await {
        Ok(gateway) => gateway,
        Err(e) => {
            warn!(scenario = %scenario.name, error = %e, "session not opened");
            report.abort(e.to_string());
            return report.finish();
        }
    };

    info!(scenario = %scenario.name, steps = scenario.steps.len(), "scenario started");
    let mut run = Run::new(&gateway, scenario, config);
    let timeout = config.scenario_timeout();
    if tokio::time::timeout(timeout, run.execute(&mut report))
        .await
        .is_err()
    {
        let e = ProbeError::timeout(format!("scenario '{}'", scenario.name), config.scenario_timeout_ms);
        warn!(scenario = %scenario.name, "{e}");
        report.abort(e.to_string());
    }

    if let Err(e) = gateway.close_session().await {
        warn!(scenario = %scenario.name, error = %e, "session close failed");
    }

    let report = report.finish();
    info!(
        scenario = %scenario.name,
        passed = report.overall_passed(),
        aborted = report.is_aborted(),
        "scenario finished"
    );
    report
}

struct Binding {
    target: String,
    handle: ElementHandle,
}

#[derive(Default)]
struct StepOutput {
    verdicts: Vec<Verdict>,
    artifacts: Vec<SnapshotRef>,
}

struct Run<'a, G: ?Sized> {
    gateway: &'a G,
    scenario: &'a Scenario,
    config: &'a HarnessConfig,
    evaluator: Evaluator,
    bindings: HashMap<String, Binding>,
    baselines: Baselines,
    captures: usize,
}

impl<'a, G> Run<'a, G>
where
    G: BrowserGateway + ?Sized,
{
    fn new(gateway: &'a G, scenario: &'a Scenario, config: &'a HarnessConfig) -> Self {
        Self {
            gateway,
            scenario,
            config,
            evaluator: Evaluator::from_config(config),
            bindings: HashMap::new(),
            baselines: Baselines::new(),
            captures: 0,
        }
    }

    async fn execute(&mut self, report: &mut ReportBuilder) {
        let scenario = self.scenario;
        for (index, step) in scenario.steps.iter().enumerate() {
            let step_name = step.describe();
            info!(step = index + 1, "{step_name}");
            let start = Instant::now();
            let result = self.step(step).await;
            let duration_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);
            match result {
                Ok(output) => report.push(StepResult {
                    step_name,
                    verdicts: output.verdicts,
                    artifacts: output.artifacts,
                    duration_ms,
                    error: None,
                }),
                Err(e) => {
                    warn!(step = index + 1, error = %e, "scenario aborted");
                    report.abort(format!("step {} ({step_name}): {e}", index + 1));
                    report.push(StepResult {
                        step_name,
                        verdicts: Vec::new(),
                        artifacts: Vec::new(),
                        duration_ms,
                        error: Some(e.to_string()),
                    });
                    return;
                }
            }
        }
    }

    async fn step(&mut self, step: &Step) -> ProbeResult<StepOutput> {
        match step {
            Step::Navigate { target } => {
                self.navigate(target.as_deref()).await?;
                Ok(StepOutput::default())
            }
            Step::Wait { ms } => {
                tokio::time::sleep(std::time::Duration::from_millis(*ms)).await;
                Ok(StepOutput::default())
            }
            Step::Locate { query, bind } => {
                let handle = self.resolve(query).await?;
                self.bindings.insert(
                    bind.clone(),
                    Binding {
                        target: query.clone(),
                        handle,
                    },
                );
                Ok(StepOutput::default())
            }
            Step::Act { handle, settle } => {
                self.act(handle, settle.as_ref()).await?;
                Ok(StepOutput::default())
            }
            Step::AssertAll { rules, .. } => Ok(StepOutput {
                verdicts: self.assert_all(rules).await?,
                artifacts: Vec::new(),
            }),
            Step::Capture { label, full_page } => Ok(StepOutput {
                verdicts: Vec::new(),
                artifacts: vec![self.capture(label, *full_page).await?],
            }),
        }
    }

    async fn navigate(&self, target: Option<&str>) -> ProbeResult<()> {
        let url = self.config.resolve_url(target);
        let timeout = self.config.navigation_timeout();
        match tokio::time::timeout(timeout, self.gateway.navigate(&url)).await {
            Ok(result) => result,
            Err(_) => Err(ProbeError::timeout(
                format!("navigation to {url}"),
                self.config.navigation_timeout_ms,
            )),
        }
    }

    async fn resolve(&self, target: &str) -> ProbeResult<ElementHandle> {
        let locator = self
            .scenario
            .targets
            .get(target)
            .ok_or_else(|| ProbeError::config(format!("unknown target '{target}'")))?;
        let found = locate_one(self.gateway, locator, None).await?;
        Ok(found.handle)
    }

    async fn act(&mut self, name: &str, settle: Option<&SettleSpec>) -> ProbeResult<()> {
        let binding = self
            .bindings
            .get(name)
            .ok_or_else(|| ProbeError::UnknownBinding {
                name: name.to_string(),
            })?;
        let driver = StateDriver::new(self.settle_strategy(settle)?);
        let target = binding.target.clone();
        let first = driver.transition(self.gateway, &binding.handle).await;

        match first {
            Err(e) if e.is_stale() => {
                warn!(binding = name, "handle went stale, re-locating");
                let handle = self.resolve(&target).await?;
                driver.transition(self.gateway, &handle).await?;
                self.bindings
                    .insert(name.to_string(), Binding { target, handle });
                Ok(())
            }
            other => other.map(|_| ()),
        }
    }

    fn settle_strategy(&self, settle: Option<&SettleSpec>) -> ProbeResult<SettleStrategy> {
        match settle {
            None => Ok(SettleStrategy::from_config(self.config, None)),
            Some(SettleSpec::Fixed { delay_ms }) => Ok(SettleStrategy::Fixed {
                delay_ms: *delay_ms,
            }),
            Some(SettleSpec::Poll { probe }) => {
                let locator = self
                    .scenario
                    .targets
                    .get(probe)
                    .ok_or_else(|| ProbeError::config(format!("unknown settle probe '{probe}'")))?;
                Ok(SettleStrategy::PollUntilStable {
                    probe: locator.clone(),
                    interval_ms: self.config.poll_interval_ms,
                    timeout_ms: self.config.poll_timeout_ms,
                    tolerance_px: self.config.stability_tolerance_px,
                    fallback_delay_ms: self.config.settle_delay_ms,
                })
            }
        }
    }

    async fn assert_all(&self, rules: &[Rule]) -> ProbeResult<Vec<Verdict>> {
        let names = rules.iter().flat_map(|r| r.check.targets());
        let snapshot = capture(self.gateway, &self.scenario.targets, names).await?;
        let verdicts = self.evaluator.evaluate(rules, &snapshot, &self.baselines);
        for v in &verdicts {
            info!(rule = %v.rule, status = %v.status, "{}", v.explanation);
        }
        Ok(verdicts)
    }

    async fn capture(&mut self, label: &str, full_page: bool) -> ProbeResult<SnapshotRef> {
        self.captures += 1;
        tokio::fs::create_dir_all(&self.config.output_dir).await?;
        let path = self
            .config
            .output_dir
            .join(format!("{:02}_{label}.png", self.captures));
        self.gateway.screenshot(&path, full_page).await?;
        let names = self.scenario.targets.keys().map(String::as_str);
        let snapshot = capture(self.gateway, &self.scenario.targets, names).await?;
        self.baselines.insert(label.to_string(), snapshot);
        info!(label, path = %path.display(), "captured");
        Ok(SnapshotRef {
            label: label.to_string(),
            path,
        })
    }
}
