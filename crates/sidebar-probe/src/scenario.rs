//! Scenario definitions.
//!
//! A scenario is a named list of targets (locators) plus an ordered list of
//! steps. Scenarios can be built in code or loaded from YAML:
//!
//! ```yaml
//! name: sidebar toggle
//! targets:
//!   toggle:
//!     queries:
//!       - selector: button
//!         box: { near_top_left: { max_x: 50, max_y: 60 } }
//!   label:
//!     queries:
//!       - selector: "text=Deep Agent Builder"
//! steps:
//!   - action: navigate
//!   - action: locate
//!     query: toggle
//!     bind: toggle
//!   - action: act
//!     handle: toggle
//!   - action: assert_all
//!     name: collapsed
//!     rules:
//!       - name: label hidden
//!         check: label_visibility
//!         label: label
//!         expect: false
//! ```

use crate::locator::Locator;
use crate::result::{ProbeError, ProbeResult};
use crate::rules::Rule;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::path::Path;

/// Settle override for a single `Act` step
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum SettleSpec {
    /// Fixed delay
    Fixed {
        /// Delay in milliseconds
        delay_ms: u64,
    },
    /// Poll the named target until stable (intervals from config)
    Poll {
        /// Target to watch
        probe: String,
    },
}

/// One scenario step
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Step {
    /// Load a page; relative targets are joined to the configured base URL
    Navigate {
        /// URL or path, base URL when absent
        #[serde(default)]
        target: Option<String>,
    },
    /// Resolve a target and bind the first match under a name
    Locate {
        /// Target name
        query: String,
        /// Binding name
        bind: String,
    },
    /// Click a bound element and wait for the page to settle
    Act {
        /// Binding name
        handle: String,
        /// Overrides the configured settle strategy
        #[serde(default)]
        settle: Option<SettleSpec>,
    },
    /// Measure and evaluate rules
    AssertAll {
        /// Label for the report
        #[serde(default)]
        name: Option<String>,
        /// Rules in evaluation order
        rules: Vec<Rule>,
    },
    /// Screenshot plus a baseline snapshot stored under `label`
    Capture {
        /// Artifact label
        label: String,
        /// Capture beyond the viewport
        #[serde(default = "default_full_page")]
        full_page: bool,
    },
    /// Idle for a fixed time
    Wait {
        /// Milliseconds
        ms: u64,
    },
}

const fn default_full_page() -> bool {
    true
}

impl Step {
    /// Navigate to the base URL
    #[must_use]
    pub const fn navigate() -> Self {
        Self::Navigate { target: None }
    }

    /// Navigate to `target`
    #[must_use]
    pub fn navigate_to(target: impl Into<String>) -> Self {
        Self::Navigate {
            target: Some(target.into()),
        }
    }

    /// Locate `query` and bind it under the same name
    #[must_use]
    pub fn locate(query: impl Into<String>) -> Self {
        let query = query.into();
        Self::Locate {
            bind: query.clone(),
            query,
        }
    }

    /// Act on a binding with the configured settle strategy
    #[must_use]
    pub fn act(handle: impl Into<String>) -> Self {
        Self::Act {
            handle: handle.into(),
            settle: None,
        }
    }

    /// Act on a binding with an explicit settle strategy
    #[must_use]
    pub fn act_with(handle: impl Into<String>, settle: SettleSpec) -> Self {
        Self::Act {
            handle: handle.into(),
            settle: Some(settle),
        }
    }

    /// Evaluate rules
    #[must_use]
    pub fn assert_all(name: impl Into<String>, rules: Vec<Rule>) -> Self {
        Self::AssertAll {
            name: Some(name.into()),
            rules,
        }
    }

    /// Full-page capture
    #[must_use]
    pub fn capture(label: impl Into<String>) -> Self {
        Self::Capture {
            label: label.into(),
            full_page: true,
        }
    }

    /// Idle wait
    #[must_use]
    pub const fn wait(ms: u64) -> Self {
        Self::Wait { ms }
    }

    /// Short description for logs and reports
    #[must_use]
    pub fn describe(&self) -> String {
        match self {
            Self::Navigate { target } => {
                format!("navigate {}", target.as_deref().unwrap_or("/"))
            }
            Self::Locate { query, bind } if query == bind => format!("locate {query}"),
            Self::Locate { query, bind } => format!("locate {query} as {bind}"),
            Self::Act { handle, .. } => format!("act {handle}"),
            Self::AssertAll { name, rules } => match name {
                Some(name) => format!("assert {name}"),
                None => format!("assert {} rule(s)", rules.len()),
            },
            Self::Capture { label, .. } => format!("capture {label}"),
            Self::Wait { ms } => format!("wait {ms}ms"),
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.describe())
    }
}

/// Named target locators plus ordered steps
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    /// Scenario name
    pub name: String,
    /// Free-form description
    #[serde(default)]
    pub description: String,
    /// Target name to locator
    #[serde(default)]
    pub targets: BTreeMap<String, Locator>,
    /// Steps in execution order
    pub steps: Vec<Step>,
}

impl Scenario {
    /// Empty scenario
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            targets: BTreeMap::new(),
            steps: Vec::new(),
        }
    }

    /// Set description
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Register a target; the locator is renamed to `name`
    #[must_use]
    pub fn target(mut self, name: impl Into<String>, mut locator: Locator) -> Self {
        let name = name.into();
        locator.name.clone_from(&name);
        self.targets.insert(name, locator);
        self
    }

    /// Append a step
    #[must_use]
    pub fn step(mut self, step: Step) -> Self {
        self.steps.push(step);
        self
    }

    /// Parse YAML; locator names are taken from their target keys
    pub fn from_yaml(yaml: &str) -> ProbeResult<Self> {
        let mut scenario: Self = serde_yaml_ng::from_str(yaml)?;
        for (name, locator) in &mut scenario.targets {
            locator.name.clone_from(name);
        }
        Ok(scenario)
    }

    /// Load a YAML file
    pub fn from_file(path: &Path) -> ProbeResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_yaml(&text)
    }

    /// Serialize as YAML
    pub fn to_yaml(&self) -> ProbeResult<String> {
        Ok(serde_yaml_ng::to_string(self)?)
    }

    /// Static problems, in step order; empty when the scenario is runnable
    #[must_use]
    pub fn problems(&self) -> Vec<String> {
        let mut problems = Vec::new();
        if self.name.trim().is_empty() {
            problems.push("scenario name is empty".to_string());
        }
        if self.steps.is_empty() {
            problems.push("scenario has no steps".to_string());
        }
        for (name, locator) in &self.targets {
            if name.trim().is_empty() {
                problems.push("target with empty name".to_string());
            }
            if locator.queries.is_empty() {
                problems.push(format!("target '{name}' has no queries"));
            }
            for query in &locator.queries {
                if query.selector.trim().is_empty() {
                    problems.push(format!("target '{name}' has an empty selector"));
                }
                if let Err(e) = query.attribute_filter.validate() {
                    problems.push(format!("target '{name}': {e}"));
                }
            }
        }

        let mut bound: HashSet<&str> = HashSet::new();
        let mut captured: HashSet<&str> = HashSet::new();
        for (index, step) in self.steps.iter().enumerate() {
            let at = format!("step {} ({step})", index + 1);
            match step {
                Step::Navigate { .. } | Step::Wait { .. } => {}
                Step::Locate { query, bind } => {
                    if !self.targets.contains_key(query) {
                        problems.push(format!("{at}: unknown target '{query}'"));
                    }
                    if bind.trim().is_empty() {
                        problems.push(format!("{at}: empty binding name"));
                    }
                    bound.insert(bind.as_str());
                }
                Step::Act { handle, settle } => {
                    if !bound.contains(handle.as_str()) {
                        problems.push(format!("{at}: '{handle}' used before it is located"));
                    }
                    if let Some(SettleSpec::Poll { probe }) = settle {
                        if !self.targets.contains_key(probe) {
                            problems.push(format!("{at}: unknown settle probe '{probe}'"));
                        }
                    }
                }
                Step::AssertAll { rules, .. } => {
                    for rule in rules {
                        if rule.name.trim().is_empty() {
                            problems.push(format!("{at}: rule with empty name"));
                        }
                        for target in rule.check.targets() {
                            if !self.targets.contains_key(target) {
                                problems.push(format!(
                                    "{at}: rule '{}' reads unknown target '{target}'",
                                    rule.name
                                ));
                            }
                        }
                        if let Some(baseline) = rule.check.baseline() {
                            if !captured.contains(baseline) {
                                problems.push(format!(
                                    "{at}: rule '{}' needs baseline '{baseline}' captured earlier",
                                    rule.name
                                ));
                            }
                        }
                    }
                }
                Step::Capture { label, .. } => {
                    if label.trim().is_empty() {
                        problems.push(format!("{at}: empty capture label"));
                    } else if !is_file_safe_label(label) {
                        problems.push(format!(
                            "{at}: capture label '{label}' must not contain path separators or '..'"
                        ));
                    }
                    captured.insert(label.as_str());
                }
            }
        }
        problems
    }

    /// Fail with every static problem
    pub fn validate(&self) -> ProbeResult<()> {
        let problems = self.problems();
        if problems.is_empty() {
            Ok(())
        } else {
            Err(ProbeError::config(problems.join("; ")))
        }
    }
}

/// Whether `label` can be used as a file name inside the output directory
#[must_use]
pub fn is_file_safe_label(label: &str) -> bool {
    !label.is_empty() && !label.contains(['/', '\\']) && !label.contains("..")
}
