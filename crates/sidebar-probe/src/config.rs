//! Harness configuration.
//!
//! Defaults reproduce the observed desktop runs: a 1440x900 viewport against
//! a local dev server, 600ms settle delay, collapsed at <= 70px (target 64px)
//! and expanded at >= 250px (target 280px).

use crate::result::{ProbeError, ProbeResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

/// Default settle delay after a toggle click
pub const DEFAULT_SETTLE_DELAY_MS: u64 = 600;

/// Default polling interval for poll-until-stable
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 50;

/// Default upper bound for poll-until-stable
pub const DEFAULT_POLL_TIMEOUT_MS: u64 = 3_000;

/// Default navigation timeout
pub const DEFAULT_NAVIGATION_TIMEOUT_MS: u64 = 30_000;

/// Default whole-scenario timeout
pub const DEFAULT_SCENARIO_TIMEOUT_MS: u64 = 120_000;

/// Browser viewport size
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Viewport {
    /// Width in CSS pixels
    pub width: u32,
    /// Height in CSS pixels
    pub height: u32,
}

impl Viewport {
    /// Create a viewport
    #[must_use]
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new(1440, 900)
    }
}

impl fmt::Display for Viewport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

impl FromStr for Viewport {
    type Err = ProbeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (w, h) = s
            .split_once(['x', 'X'])
            .ok_or_else(|| ProbeError::config(format!("viewport '{s}' is not WIDTHxHEIGHT")))?;
        let parse = |v: &str| {
            v.trim()
                .parse::<u32>()
                .map_err(|e| ProbeError::config(format!("viewport '{s}': {e}")))
        };
        Ok(Self::new(parse(w)?, parse(h)?))
    }
}

/// How the state driver waits for a transition to settle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SettleMode {
    /// Sleep for `settle_delay_ms`
    #[default]
    Fixed,
    /// Re-measure until two consecutive samples agree
    Poll,
}

/// Enumerated harness configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    /// Browser viewport
    pub viewport: Viewport,
    /// Fixed settle delay after an action
    pub settle_delay_ms: u64,
    /// Widest a collapsed component may be
    pub collapsed_max_px: f64,
    /// Narrowest an expanded component may be
    pub expanded_min_px: f64,
    /// Horizontal spread allowed for vertically aligned icons
    pub alignment_tolerance_px: f64,
    /// Base URL; relative navigation targets are joined onto it
    pub navigation_target: String,
    /// Settle strategy
    pub settle_mode: SettleMode,
    /// Poll interval for poll-until-stable
    pub poll_interval_ms: u64,
    /// Upper bound for poll-until-stable
    pub poll_timeout_ms: u64,
    /// Two samples closer than this are considered equal
    pub stability_tolerance_px: f64,
    /// Upper bound for one navigation
    pub navigation_timeout_ms: u64,
    /// Upper bound for a whole scenario run
    pub scenario_timeout_ms: u64,
    /// Where screenshots and reports are written
    pub output_dir: PathBuf,
    /// Run the browser headless
    pub headless: bool,
    /// Chromium binary (None = auto-detect)
    pub chromium_path: Option<String>,
    /// Chromium sandbox (disable in containers)
    pub sandbox: bool,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            viewport: Viewport::default(),
            settle_delay_ms: DEFAULT_SETTLE_DELAY_MS,
            collapsed_max_px: 70.0,
            expanded_min_px: 250.0,
            alignment_tolerance_px: 30.0,
            navigation_target: "http://localhost:3002".to_string(),
            settle_mode: SettleMode::Fixed,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            poll_timeout_ms: DEFAULT_POLL_TIMEOUT_MS,
            stability_tolerance_px: 0.5,
            navigation_timeout_ms: DEFAULT_NAVIGATION_TIMEOUT_MS,
            scenario_timeout_ms: DEFAULT_SCENARIO_TIMEOUT_MS,
            output_dir: PathBuf::from("target/sidebar-probe"),
            headless: true,
            chromium_path: None,
            sandbox: true,
        }
    }
}

impl HarnessConfig {
    /// Create default configuration
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Load from a YAML or JSON file (chosen by extension, YAML otherwise)
    pub fn from_file(path: &Path) -> ProbeResult<Self> {
        let text = std::fs::read_to_string(path)?;
        let config = if path.extension().is_some_and(|ext| ext == "json") {
            serde_json::from_str(&text)?
        } else {
            serde_yaml_ng::from_str(&text)?
        };
        Ok(config)
    }

    /// Serialize as YAML
    pub fn to_yaml(&self) -> ProbeResult<String> {
        Ok(serde_yaml_ng::to_string(self)?)
    }

    /// Set viewport dimensions
    #[must_use]
    pub const fn with_viewport(mut self, width: u32, height: u32) -> Self {
        self.viewport = Viewport::new(width, height);
        self
    }

    /// Set base URL
    #[must_use]
    pub fn with_navigation_target(mut self, url: impl Into<String>) -> Self {
        self.navigation_target = url.into();
        self
    }

    /// Set fixed settle delay
    #[must_use]
    pub const fn with_settle_delay(mut self, ms: u64) -> Self {
        self.settle_delay_ms = ms;
        self
    }

    /// Set settle strategy
    #[must_use]
    pub const fn with_settle_mode(mut self, mode: SettleMode) -> Self {
        self.settle_mode = mode;
        self
    }

    /// Set width thresholds
    #[must_use]
    pub const fn with_width_thresholds(mut self, collapsed_max: f64, expanded_min: f64) -> Self {
        self.collapsed_max_px = collapsed_max;
        self.expanded_min_px = expanded_min;
        self
    }

    /// Set alignment tolerance
    #[must_use]
    pub const fn with_alignment_tolerance(mut self, px: f64) -> Self {
        self.alignment_tolerance_px = px;
        self
    }

    /// Set scenario timeout
    #[must_use]
    pub const fn with_scenario_timeout(mut self, ms: u64) -> Self {
        self.scenario_timeout_ms = ms;
        self
    }

    /// Set output directory
    #[must_use]
    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }

    /// Set chromium path
    #[must_use]
    pub fn with_chromium_path(mut self, path: impl Into<String>) -> Self {
        self.chromium_path = Some(path.into());
        self
    }

    /// Disable sandbox (for containers/CI)
    #[must_use]
    pub const fn with_no_sandbox(mut self) -> Self {
        self.sandbox = false;
        self
    }

    /// Settle delay as Duration
    #[must_use]
    pub const fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    /// Navigation timeout as Duration
    #[must_use]
    pub const fn navigation_timeout(&self) -> Duration {
        Duration::from_millis(self.navigation_timeout_ms)
    }

    /// Scenario timeout as Duration
    #[must_use]
    pub const fn scenario_timeout(&self) -> Duration {
        Duration::from_millis(self.scenario_timeout_ms)
    }

    /// Resolve a navigation target against `navigation_target`.
    ///
    /// `None` means the base URL itself; absolute URLs pass through.
    #[must_use]
    pub fn resolve_url(&self, target: Option<&str>) -> String {
        match target {
            None => self.navigation_target.clone(),
            Some(t) if t.contains("://") || t.starts_with("about:") || t.starts_with("data:") => {
                t.to_string()
            }
            Some(t) => format!(
                "{}/{}",
                self.navigation_target.trim_end_matches('/'),
                t.trim_start_matches('/')
            ),
        }
    }

    /// Reject configurations no scenario can pass
    pub fn validate(&self) -> ProbeResult<()> {
        if self.viewport.width == 0 || self.viewport.height == 0 {
            return Err(ProbeError::config("viewport must be non-empty"));
        }
        if self.collapsed_max_px >= self.expanded_min_px {
            return Err(ProbeError::config(format!(
                "collapsed_max_px ({}) must be below expanded_min_px ({})",
                self.collapsed_max_px, self.expanded_min_px
            )));
        }
        if self.alignment_tolerance_px < 0.0 || self.stability_tolerance_px < 0.0 {
            return Err(ProbeError::config("tolerances must not be negative"));
        }
        if self.poll_interval_ms == 0 || self.poll_interval_ms > self.poll_timeout_ms {
            return Err(ProbeError::config(
                "poll_interval_ms must be positive and no larger than poll_timeout_ms",
            ));
        }
        if self.navigation_target.trim().is_empty() {
            return Err(ProbeError::config("navigation_target is empty"));
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_match_observed_runs() {
        let config = HarnessConfig::default();
        assert_eq!(config.viewport, Viewport::new(1440, 900));
        assert_eq!(config.settle_delay_ms, 600);
        assert_eq!(config.collapsed_max_px, 70.0);
        assert_eq!(config.expanded_min_px, 250.0);
        assert_eq!(config.navigation_target, "http://localhost:3002");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_viewport_parse() {
        assert_eq!("1280x720".parse::<Viewport>().unwrap(), Viewport::new(1280, 720));
        assert_eq!("390X844".parse::<Viewport>().unwrap(), Viewport::new(390, 844));
        assert!("1280".parse::<Viewport>().is_err());
        assert!("wide x tall".parse::<Viewport>().is_err());
    }

    #[test]
    fn test_resolve_url() {
        let config = HarnessConfig::default().with_navigation_target("http://localhost:3002/");
        assert_eq!(config.resolve_url(None), "http://localhost:3002/");
        assert_eq!(
            config.resolve_url(Some("/agents/1")),
            "http://localhost:3002/agents/1"
        );
        assert_eq!(
            config.resolve_url(Some("https://example.com")),
            "https://example.com"
        );
        assert_eq!(config.resolve_url(Some("about:blank")), "about:blank");
    }

    #[test]
    fn test_validate_rejects_inverted_thresholds() {
        let config = HarnessConfig::default().with_width_thresholds(300.0, 250.0);
        assert!(matches!(config.validate(), Err(ProbeError::Config { .. })));
    }

    #[test]
    fn test_validate_rejects_bad_poll_interval() {
        let mut config = HarnessConfig::default();
        config.poll_interval_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_yaml_file_keeps_defaults() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        writeln!(file, "settle_delay_ms: 900\nviewport:\n  width: 1024\n  height: 768").unwrap();
        let config = HarnessConfig::from_file(file.path()).unwrap();
        assert_eq!(config.settle_delay_ms, 900);
        assert_eq!(config.viewport, Viewport::new(1024, 768));
        assert_eq!(config.expanded_min_px, 250.0);
    }

    #[test]
    fn test_json_file() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        write!(file, r#"{{"settle_mode": "poll", "collapsed_max_px": 64.0}}"#).unwrap();
        let config = HarnessConfig::from_file(file.path()).unwrap();
        assert_eq!(config.settle_mode, SettleMode::Poll);
        assert_eq!(config.collapsed_max_px, 64.0);
    }

    #[test]
    fn test_yaml_roundtrip_is_readable() {
        let yaml = HarnessConfig::default().to_yaml().unwrap();
        assert!(yaml.contains("settle_delay_ms: 600"));
        assert!(yaml.contains("navigation_target"));
    }
}
