//! CLI configuration
//!
//! Two layers: [`CliConfig`] controls how the CLI itself talks (verbosity,
//! color, report format), and [`HarnessOverrides`] carries the flags that
//! patch the probe's [`HarnessConfig`] after it is loaded from file.

use crate::error::CliResult;
use serde::{Deserialize, Serialize};
use sidebar_probe::{HarnessConfig, SettleMode, Viewport};
use std::path::PathBuf;

/// CLI verbosity level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Verbosity {
    /// Quiet - errors and the final verdict only
    Quiet,
    /// Normal - default output
    #[default]
    Normal,
    /// Verbose - per-step logging
    Verbose,
    /// Debug - candidate and poll logging
    Debug,
}

impl Verbosity {
    /// From the `-q` flag and the `-v` count
    #[must_use]
    pub const fn from_flags(quiet: bool, verbose: u8) -> Self {
        if quiet {
            return Self::Quiet;
        }
        match verbose {
            0 => Self::Normal,
            1 => Self::Verbose,
            _ => Self::Debug,
        }
    }

    /// Check if quiet mode
    #[must_use]
    pub const fn is_quiet(self) -> bool {
        matches!(self, Self::Quiet)
    }

    /// Check if verbose or higher
    #[must_use]
    pub const fn is_verbose(self) -> bool {
        matches!(self, Self::Verbose | Self::Debug)
    }

    /// Default log filter for this level
    #[must_use]
    pub const fn log_filter(self) -> &'static str {
        match self {
            Self::Quiet => "sidebar_probe=error,sidebar_probe_cli=error",
            Self::Normal => "sidebar_probe=warn,sidebar_probe_cli=warn",
            Self::Verbose => "sidebar_probe=info,sidebar_probe_cli=info",
            Self::Debug => "sidebar_probe=debug,sidebar_probe_cli=debug",
        }
    }
}

/// Color output choice
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ColorChoice {
    /// Always use colors
    Always,
    /// Use colors when output is a terminal
    #[default]
    Auto,
    /// Never use colors
    Never,
}

impl ColorChoice {
    /// Should use colors based on output detection
    #[must_use]
    pub fn should_color(self) -> bool {
        match self {
            Self::Always => true,
            Self::Never => false,
            Self::Auto => std::io::IsTerminal::is_terminal(&std::io::stdout()),
        }
    }
}

/// Report format on stdout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ReportFormat {
    /// Human-readable summary
    #[default]
    Text,
    /// Pretty JSON
    Json,
}

/// Log line format on stderr
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LogFormat {
    /// Compact human-readable lines
    #[default]
    Text,
    /// One JSON object per event
    Json,
}

/// How the CLI presents itself
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct CliConfig {
    /// Verbosity level
    pub verbosity: Verbosity,
    /// Color output choice
    pub color: ColorChoice,
    /// Report format
    pub format: ReportFormat,
    /// Log format
    pub log_format: LogFormat,
}

impl CliConfig {
    /// Create new default configuration
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set verbosity
    #[must_use]
    pub const fn with_verbosity(mut self, verbosity: Verbosity) -> Self {
        self.verbosity = verbosity;
        self
    }

    /// Set color choice
    #[must_use]
    pub const fn with_color(mut self, color: ColorChoice) -> Self {
        self.color = color;
        self
    }

    /// Set report format
    #[must_use]
    pub const fn with_format(mut self, format: ReportFormat) -> Self {
        self.format = format;
        self
    }

    /// Set log format
    #[must_use]
    pub const fn with_log_format(mut self, log_format: LogFormat) -> Self {
        self.log_format = log_format;
        self
    }
}

/// Flag overrides applied on top of the loaded [`HarnessConfig`]
#[derive(Debug, Clone, Default)]
pub struct HarnessOverrides {
    /// `--config`
    pub config_file: Option<PathBuf>,
    /// `--url`
    pub url: Option<String>,
    /// `--viewport`
    pub viewport: Option<Viewport>,
    /// `--settle-delay`
    pub settle_delay_ms: Option<u64>,
    /// `--settle-mode`
    pub settle_mode: Option<SettleMode>,
    /// `--output`
    pub output_dir: Option<PathBuf>,
    /// `--timeout`
    pub scenario_timeout_ms: Option<u64>,
    /// `--headed`
    pub headed: bool,
    /// `--no-sandbox`
    pub no_sandbox: bool,
    /// `--chromium`
    pub chromium_path: Option<String>,
}

impl HarnessOverrides {
    /// Load the config file (or defaults), apply overrides, validate
    pub fn resolve(&self) -> CliResult<HarnessConfig> {
        let base = match &self.config_file {
            Some(path) => HarnessConfig::from_file(path)?,
            None => HarnessConfig::default(),
        };
        let config = self.apply(base);
        config.validate()?;
        Ok(config)
    }

    /// Apply overrides without validating
    #[must_use]
    pub fn apply(&self, mut config: HarnessConfig) -> HarnessConfig {
        if let Some(url) = &self.url {
            config = config.with_navigation_target(url.clone());
        }
        if let Some(viewport) = self.viewport {
            config = config.with_viewport(viewport.width, viewport.height);
        }
        if let Some(ms) = self.settle_delay_ms {
            config = config.with_settle_delay(ms);
        }
        if let Some(mode) = self.settle_mode {
            config = config.with_settle_mode(mode);
        }
        if let Some(dir) = &self.output_dir {
            config = config.with_output_dir(dir.clone());
        }
        if let Some(ms) = self.scenario_timeout_ms {
            config = config.with_scenario_timeout(ms);
        }
        if self.headed {
            config.headless = false;
        }
        if self.no_sandbox {
            config = config.with_no_sandbox();
        }
        if let Some(path) = &self.chromium_path {
            config = config.with_chromium_path(path.clone());
        }
        config
    }
}
