//! Sidebar-probe: geometry-driven verification of collapsible sidebars
//!
//! Drives a rendered page the way a user would (find the toggle, click it,
//! wait for the animation) and checks layout invariants for each state,
//! using only rendered geometry, visibility and content.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                   SIDEBAR-PROBE Architecture                    │
//! ├─────────────────────────────────────────────────────────────────┤
//! │   ┌────────────┐    ┌────────────┐    ┌────────────┐            │
//! │   │ Scenario   │    │ Runner     │    │ Browser    │            │
//! │   │ (steps +   │───►│ locate/act │───►│ Gateway    │            │
//! │   │  targets)  │    │ /assert    │    │ (CDP/fake) │            │
//! │   └────────────┘    └─────┬──────┘    └────────────┘            │
//! │                           ▼                                     │
//! │   ┌────────────┐    ┌────────────┐    ┌────────────┐            │
//! │   │ Geometry   │◄───│ Rules      │───►│ Reporter   │            │
//! │   └────────────┘    └────────────┘    └────────────┘            │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use sidebar_probe::{builtin, run_scenario, reporter, FakePage, FakeSessionProvider, HarnessConfig};
//!
//! # async fn demo() {
//! let config = HarnessConfig::default();
//! let scenario = builtin::sidebar_toggle(&config);
//! let provider = FakeSessionProvider::new(FakePage::new());
//! let report = run_scenario(&provider, &scenario, &config).await;
//! println!("{}", reporter::render(&report));
//! # }
//! ```

#![warn(missing_docs)]
#![cfg_attr(test, allow(clippy::large_stack_arrays, clippy::large_stack_frames))]

pub mod builtin;
mod config;
mod driver;
mod gateway;
mod geometry;
mod locator;
pub mod reporter;
mod result;
mod rules;
mod runner;
mod scenario;
mod snapshot;

pub use config::{
    HarnessConfig, SettleMode, Viewport, DEFAULT_NAVIGATION_TIMEOUT_MS, DEFAULT_POLL_INTERVAL_MS,
    DEFAULT_POLL_TIMEOUT_MS, DEFAULT_SCENARIO_TIMEOUT_MS, DEFAULT_SETTLE_DELAY_MS,
};
pub use driver::{SettleKind, SettleOutcome, SettleStrategy, StateDriver};
#[cfg(feature = "browser")]
pub use gateway::{CdpGateway, CdpSessionProvider};
pub use gateway::{
    BrowserGateway, ElementHandle, FakeDom, FakeElement, FakePage, FakeSessionProvider,
    SessionProvider,
};
pub use geometry::{is_vertically_aligned, spread, within_threshold, Axis, Bound, BoundingBox, Point};
pub use locator::{
    locate, locate_one, BoxFilter, BoxPredicate, Candidate, ContentFilter, ContentPredicate,
    Located, Locator, LocatorQuery, Strategy,
};
pub use reporter::{exit_code, render, render_json, Summary};
pub use result::{ProbeError, ProbeResult};
pub use rules::{
    evaluate, Check, CheckOutcome, CustomCheck, Evaluator, LayoutState, Rule, Severity, Status,
    Thresholds, Verdict,
};
pub use runner::{run_scenario, ReportBuilder, RunStatus, ScenarioReport, SnapshotRef, StepResult};
pub use scenario::{Scenario, SettleSpec, Step};
pub use snapshot::{capture, measure, Baselines, ElementSample, Measurement, Snapshot};

/// Prelude for convenient imports
pub mod prelude {
    pub use super::builtin;
    pub use super::{
        run_scenario, BoundingBox, BoxFilter, BrowserGateway, Check, ContentFilter, HarnessConfig,
        LayoutState, Locator, ProbeError, ProbeResult, Rule, Scenario, ScenarioReport,
        SessionProvider, Severity, Status, Step,
    };
}
