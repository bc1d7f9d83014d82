//! Layout invariants and their evaluation.
//!
//! A [`Rule`] names a [`Check`] and a [`Severity`]. Evaluation is total and
//! deterministic: every rule yields exactly one [`Verdict`], in declaration
//! order, and a rule that does not hold is a verdict rather than an error.
//!
//! | Severity | holds | does not hold |
//! |----------|-------|---------------|
//! | `Fail`   | PASS  | FAIL          |
//! | `Info`   | PASS  | INFO          |

use crate::config::HarnessConfig;
use crate::geometry::{is_vertically_aligned, spread, Axis, Bound, BoundingBox};
use crate::snapshot::{Baselines, Measurement, Snapshot};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Layout state of a collapsible component
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LayoutState {
    /// Full width, labels shown
    Expanded,
    /// Icon-only rail
    Collapsed,
}

impl LayoutState {
    /// Classify a measured width; `None` between the two thresholds
    #[must_use]
    pub fn infer(width: f64, thresholds: &Thresholds) -> Option<Self> {
        if width <= thresholds.collapsed_max {
            Some(Self::Collapsed)
        } else if width >= thresholds.expanded_min {
            Some(Self::Expanded)
        } else {
            None
        }
    }
}

impl fmt::Display for LayoutState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Expanded => f.write_str("expanded"),
            Self::Collapsed => f.write_str("collapsed"),
        }
    }
}

/// Width thresholds separating the two layout states
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Thresholds {
    /// Widest collapsed width
    pub collapsed_max: f64,
    /// Narrowest expanded width
    pub expanded_min: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            collapsed_max: 70.0,
            expanded_min: 250.0,
        }
    }
}

/// Consequence of a rule that does not hold
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Fails the run
    #[default]
    Fail,
    /// Informational only
    Info,
}

/// Verdict status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Status {
    /// Rule held
    Pass,
    /// Fail-severity rule did not hold
    Fail,
    /// Info-severity rule did not hold
    Info,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pass => f.write_str("PASS"),
            Self::Fail => f.write_str("FAIL"),
            Self::Info => f.write_str("INFO"),
        }
    }
}

/// Raw result of a check before severity is applied
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckOutcome {
    /// Whether the invariant holds
    pub holds: bool,
    /// Measured values, for the report line
    pub explanation: String,
}

impl CheckOutcome {
    /// Invariant holds
    #[must_use]
    pub fn pass(explanation: impl Into<String>) -> Self {
        Self {
            holds: true,
            explanation: explanation.into(),
        }
    }

    /// Invariant does not hold
    #[must_use]
    pub fn fail(explanation: impl Into<String>) -> Self {
        Self {
            holds: false,
            explanation: explanation.into(),
        }
    }
}

/// Closure check over the current snapshot and recorded baselines
#[derive(Clone)]
pub struct CustomCheck(Arc<dyn Fn(&Snapshot, &Baselines) -> CheckOutcome + Send + Sync>);

impl fmt::Debug for CustomCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("CustomCheck(..)")
    }
}

/// Invariant to check against a snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "check", rename_all = "snake_case")]
pub enum Check {
    /// Component width matches the expected layout state
    WidthClass {
        /// Component target
        target: String,
        /// Expected state
        expect: LayoutState,
        /// Overrides the configured collapsed threshold
        #[serde(default)]
        collapsed_max: Option<f64>,
        /// Overrides the configured expanded threshold
        #[serde(default)]
        expanded_min: Option<f64>,
    },
    /// Label visible (or hidden)
    LabelVisibility {
        /// Label target
        label: String,
        /// Expected visibility
        expect: bool,
    },
    /// No toggle-like element beyond the component's right edge
    SingleToggleLocation {
        /// Owning component; its measured right edge bounds the region
        #[serde(default)]
        component: Option<String>,
        /// Every element carrying the toggle's visual signature
        toggles: String,
        /// Fixed edge, used instead of the component's
        #[serde(default)]
        min_x: Option<f64>,
    },
    /// Visible icons form a vertical column
    Alignment {
        /// Icon targets, pooled
        icons: Vec<String>,
        /// Overrides the configured alignment tolerance
        #[serde(default)]
        tolerance: Option<f64>,
    },
    /// Geometry returned to a recorded baseline
    RoundTrip {
        /// Capture label of the baseline
        baseline: String,
        /// Targets to compare
        targets: Vec<String>,
        /// Pixel tolerance
        #[serde(default = "default_round_trip_tolerance")]
        tolerance: f64,
    },
    /// One box coordinate against a limit
    Position {
        /// Measured target
        target: String,
        /// Coordinate
        axis: Axis,
        /// Comparison
        bound: Bound,
        /// Limit
        limit: f64,
    },
    /// Report the inferred layout state; holds when unambiguous
    InferState {
        /// Component target
        target: String,
    },
    /// Number of matches within `[min, max]`
    Count {
        /// Target
        target: String,
        /// Minimum matches
        #[serde(default)]
        min: usize,
        /// Maximum matches
        #[serde(default)]
        max: Option<usize>,
    },
    /// Programmatic check (not serialisable)
    #[serde(skip)]
    Custom(CustomCheck),
}

const fn default_round_trip_tolerance() -> f64 {
    1.0
}

impl Check {
    /// Wrap a closure
    #[must_use]
    pub fn custom(
        f: impl Fn(&Snapshot, &Baselines) -> CheckOutcome + Send + Sync + 'static,
    ) -> Self {
        Self::Custom(CustomCheck(Arc::new(f)))
    }

    /// Snapshot targets the check reads
    #[must_use]
    pub fn targets(&self) -> Vec<&str> {
        match self {
            Self::WidthClass { target, .. }
            | Self::Position { target, .. }
            | Self::InferState { target }
            | Self::Count { target, .. } => vec![target.as_str()],
            Self::LabelVisibility { label, .. } => vec![label.as_str()],
            Self::SingleToggleLocation {
                component, toggles, ..
            } => component
                .iter()
                .map(String::as_str)
                .chain(std::iter::once(toggles.as_str()))
                .collect(),
            Self::Alignment { icons, .. } => icons.iter().map(String::as_str).collect(),
            Self::RoundTrip { targets, .. } => targets.iter().map(String::as_str).collect(),
            Self::Custom(_) => Vec::new(),
        }
    }

    /// Baseline label the check reads, if any
    #[must_use]
    pub fn baseline(&self) -> Option<&str> {
        match self {
            Self::RoundTrip { baseline, .. } => Some(baseline),
            _ => None,
        }
    }
}

/// A named invariant
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Rule {
    /// Shown in the report
    pub name: String,
    /// What to check
    #[serde(flatten)]
    pub check: Check,
    /// Consequence of not holding
    #[serde(default)]
    pub severity: Severity,
}

impl Rule {
    /// Fail-severity rule
    #[must_use]
    pub fn new(name: impl Into<String>, check: Check) -> Self {
        Self {
            name: name.into(),
            check,
            severity: Severity::Fail,
        }
    }

    /// Info-severity rule
    #[must_use]
    pub fn info(name: impl Into<String>, check: Check) -> Self {
        Self {
            severity: Severity::Info,
            ..Self::new(name, check)
        }
    }
}

/// Evaluation result for one rule
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verdict {
    /// Rule name
    pub rule: String,
    /// Outcome
    pub status: Status,
    /// Severity of the rule
    pub severity: Severity,
    /// Measured values
    pub explanation: String,
}

impl Verdict {
    /// True for a FAIL verdict
    #[must_use]
    pub fn is_failure(&self) -> bool {
        self.status == Status::Fail
    }
}

/// Evaluates rules with configured thresholds
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Evaluator {
    thresholds: Thresholds,
    alignment_tolerance: f64,
}

impl Default for Evaluator {
    fn default() -> Self {
        Self {
            thresholds: Thresholds::default(),
            alignment_tolerance: 30.0,
        }
    }
}

impl Evaluator {
    /// Evaluator using the thresholds in `config`
    #[must_use]
    pub fn from_config(config: &HarnessConfig) -> Self {
        Self {
            thresholds: Thresholds {
                collapsed_max: config.collapsed_max_px,
                expanded_min: config.expanded_min_px,
            },
            alignment_tolerance: config.alignment_tolerance_px,
        }
    }

    /// Configured thresholds
    #[must_use]
    pub const fn thresholds(&self) -> Thresholds {
        self.thresholds
    }

    /// One verdict per rule, in order
    #[must_use]
    pub fn evaluate(&self, rules: &[Rule], snapshot: &Snapshot, baselines: &Baselines) -> Vec<Verdict> {
        rules
            .iter()
            .map(|rule| {
                let outcome = self.check(&rule.check, snapshot, baselines);
                let status = match (outcome.holds, rule.severity) {
                    (true, _) => Status::Pass,
                    (false, Severity::Fail) => Status::Fail,
                    (false, Severity::Info) => Status::Info,
                };
                Verdict {
                    rule: rule.name.clone(),
                    status,
                    severity: rule.severity,
                    explanation: outcome.explanation,
                }
            })
            .collect()
    }

    fn check(&self, check: &Check, snapshot: &Snapshot, baselines: &Baselines) -> CheckOutcome {
        match check {
            Check::WidthClass {
                target,
                expect,
                collapsed_max,
                expanded_min,
            } => {
                let Some(bbox) = first_box(snapshot, target) else {
                    return not_measured(target);
                };
                let (bound, limit) = match expect {
                    LayoutState::Collapsed => (
                        Bound::AtMost,
                        collapsed_max.unwrap_or(self.thresholds.collapsed_max),
                    ),
                    LayoutState::Expanded => (
                        Bound::AtLeast,
                        expanded_min.unwrap_or(self.thresholds.expanded_min),
                    ),
                };
                outcome(
                    bound.holds(bbox.width, limit),
                    format!("{target} width {:.0}px {} {limit:.0}px", bbox.width, bound.symbol()),
                )
            }
            Check::LabelVisibility { label, expect } => {
                let visible = snapshot.get(label).is_some_and(Measurement::any_visible);
                let word = |v: bool| if v { "visible" } else { "hidden" };
                outcome(
                    visible == *expect,
                    format!("{label} is {} (expected {})", word(visible), word(*expect)),
                )
            }
            Check::SingleToggleLocation {
                component,
                toggles,
                min_x,
            } => {
                let edge = match (min_x, component) {
                    (Some(x), _) => *x,
                    (None, Some(c)) => match first_box(snapshot, c) {
                        Some(b) => b.right(),
                        None => return not_measured(c),
                    },
                    (None, None) => {
                        return CheckOutcome::fail("no component or min_x to bound the region")
                    }
                };
                let outside: Vec<f64> = snapshot
                    .get(toggles)
                    .map(|m| m.samples.iter().filter_map(|s| s.bbox).map(|b| b.x))
                    .into_iter()
                    .flatten()
                    .filter(|x| *x > edge)
                    .collect();
                if outside.is_empty() {
                    CheckOutcome::pass(format!("no {toggles} beyond x={edge:.0}"))
                } else {
                    let xs: Vec<String> = outside.iter().map(|x| format!("{x:.0}")).collect();
                    CheckOutcome::fail(format!(
                        "{} {toggles} beyond x={edge:.0} (at x={})",
                        outside.len(),
                        xs.join(", ")
                    ))
                }
            }
            Check::Alignment { icons, tolerance } => {
                let tolerance = tolerance.unwrap_or(self.alignment_tolerance);
                let boxes: Vec<BoundingBox> = icons
                    .iter()
                    .filter_map(|name| snapshot.get(name))
                    .flat_map(Measurement::visible_boxes)
                    .collect();
                if boxes.len() < 2 {
                    return CheckOutcome::fail(format!(
                        "{} visible icon(s), need at least 2",
                        boxes.len()
                    ));
                }
                let x_spread = spread(&boxes, Axis::X);
                let y_spread = spread(&boxes, Axis::Y);
                outcome(
                    is_vertically_aligned(&boxes, tolerance),
                    format!(
                        "{} icons, x spread {x_spread:.0}px, y spread {y_spread:.0}px (tolerance {tolerance:.0}px)",
                        boxes.len()
                    ),
                )
            }
            Check::RoundTrip {
                baseline,
                targets,
                tolerance,
            } => {
                let Some(base) = baselines.get(baseline) else {
                    return CheckOutcome::fail(format!("no baseline '{baseline}' recorded"));
                };
                let moved: Vec<&str> = targets
                    .iter()
                    .filter(|t| !same_boxes(base.get(t), snapshot.get(t), *tolerance))
                    .map(String::as_str)
                    .collect();
                if moved.is_empty() {
                    CheckOutcome::pass(format!(
                        "{} target(s) match '{baseline}' within {tolerance}px",
                        targets.len()
                    ))
                } else {
                    CheckOutcome::fail(format!(
                        "{} differ from '{baseline}'",
                        moved.join(", ")
                    ))
                }
            }
            Check::Position {
                target,
                axis,
                bound,
                limit,
            } => {
                let Some(bbox) = first_box(snapshot, target) else {
                    return not_measured(target);
                };
                let value = bbox.value(*axis);
                outcome(
                    bound.holds(value, *limit),
                    format!(
                        "{target} {axis}={value:.0} (expected {} {limit:.0})",
                        bound.symbol()
                    ),
                )
            }
            Check::InferState { target } => {
                let Some(bbox) = first_box(snapshot, target) else {
                    return not_measured(target);
                };
                match LayoutState::infer(bbox.width, &self.thresholds) {
                    Some(state) => {
                        CheckOutcome::pass(format!("{target} is {state} ({:.0}px)", bbox.width))
                    }
                    None => CheckOutcome::fail(format!(
                        "{target} width {:.0}px is between states",
                        bbox.width
                    )),
                }
            }
            Check::Count { target, min, max } => {
                let n = snapshot.get(target).map_or(0, Measurement::count);
                let within = n >= *min && max.map_or(true, |m| n <= m);
                let range = match max {
                    Some(m) => format!("{min}..={m}"),
                    None => format!(">= {min}"),
                };
                outcome(within, format!("{n} {target} found (expected {range})"))
            }
            Check::Custom(f) => (f.0)(snapshot, baselines),
        }
    }
}

/// Evaluate with default thresholds
#[must_use]
pub fn evaluate(rules: &[Rule], snapshot: &Snapshot, baselines: &Baselines) -> Vec<Verdict> {
    Evaluator::default().evaluate(rules, snapshot, baselines)
}

fn outcome(holds: bool, explanation: String) -> CheckOutcome {
    CheckOutcome { holds, explanation }
}

fn not_measured(target: &str) -> CheckOutcome {
    CheckOutcome::fail(format!("{target} not measured"))
}

fn first_box(snapshot: &Snapshot, target: &str) -> Option<BoundingBox> {
    snapshot.get(target).and_then(Measurement::first_box)
}

fn same_boxes(a: Option<&Measurement>, b: Option<&Measurement>, tolerance: f64) -> bool {
    let (Some(a), Some(b)) = (a, b) else {
        return false;
    };
    let (a, b) = (a.boxes(), b.boxes());
    a.len() == b.len()
        && a.iter().zip(&b).all(|pair| match pair {
            (Some(x), Some(y)) => x.approx_eq(y, tolerance),
            (None, None) => true,
            _ => false,
        })
}
