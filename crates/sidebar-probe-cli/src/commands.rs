//! CLI command definitions using clap

use crate::config::{ColorChoice, HarnessOverrides, LogFormat, ReportFormat};
use clap::{Args, Parser, Subcommand, ValueEnum};
use sidebar_probe::{SettleMode, Viewport};
use std::path::PathBuf;

/// Sidebar-probe: verify collapsible sidebar layouts in a live browser
#[derive(Parser, Debug)]
#[command(name = "sidebar-probe")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (suppress everything but errors and the final verdict)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Color output (auto, always, never)
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorArg,

    /// Log line format on stderr
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormatArg,

    /// Report format on stdout
    #[arg(long, default_value = "text", global = true)]
    pub format: FormatArg,

    /// Harness settings
    #[command(flatten)]
    pub harness: HarnessArgs,

    /// Subcommand to run
    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run a scenario file (YAML)
    Run(RunArgs),

    /// Run a built-in scenario
    Builtin(BuiltinArgs),

    /// List built-in scenarios
    List,

    /// Check a scenario file without opening a browser
    Validate(ValidateArgs),

    /// Print the effective harness configuration
    Config(ConfigArgs),
}

/// Harness settings shared by every subcommand
#[derive(Args, Debug, Default)]
pub struct HarnessArgs {
    /// Harness config file (YAML or JSON)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Base URL of the application under test
    #[arg(long, global = true)]
    pub url: Option<String>,

    /// Viewport as WIDTHxHEIGHT
    #[arg(long, global = true)]
    pub viewport: Option<Viewport>,

    /// Fixed settle delay after each click, in milliseconds
    #[arg(long, global = true)]
    pub settle_delay: Option<u64>,

    /// How to wait after a click
    #[arg(long, global = true)]
    pub settle_mode: Option<SettleModeArg>,

    /// Directory for screenshots and reports
    #[arg(short, long, global = true)]
    pub output: Option<PathBuf>,

    /// Whole-scenario timeout in milliseconds
    #[arg(long, global = true)]
    pub timeout: Option<u64>,

    /// Show the browser window
    #[arg(long, global = true)]
    pub headed: bool,

    /// Disable the Chromium sandbox (containers)
    #[arg(long, global = true)]
    pub no_sandbox: bool,

    /// Chromium executable
    #[arg(long, global = true)]
    pub chromium: Option<String>,
}

impl From<&HarnessArgs> for HarnessOverrides {
    fn from(args: &HarnessArgs) -> Self {
        Self {
            config_file: args.config.clone(),
            url: args.url.clone(),
            viewport: args.viewport,
            settle_delay_ms: args.settle_delay,
            settle_mode: args.settle_mode.map(Into::into),
            output_dir: args.output.clone(),
            scenario_timeout_ms: args.timeout,
            headed: args.headed,
            no_sandbox: args.no_sandbox,
            chromium_path: args.chromium.clone(),
        }
    }
}

/// Arguments for the run command
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Scenario file
    pub scenario: PathBuf,
}

/// Arguments for the builtin command
#[derive(Parser, Debug)]
pub struct BuiltinArgs {
    /// Built-in scenario name (see `list`)
    pub name: String,
}

/// Arguments for the validate command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Scenario files
    #[arg(required = true)]
    pub scenarios: Vec<PathBuf>,
}

/// Arguments for the config command
#[derive(Parser, Debug)]
pub struct ConfigArgs {
    /// Print the defaults instead of the effective configuration
    #[arg(long)]
    pub defaults: bool,
}

/// Color argument
#[derive(ValueEnum, Clone, Copy, Debug, Default)]
pub enum ColorArg {
    /// Automatic color detection
    #[default]
    Auto,
    /// Always use colors
    Always,
    /// Never use colors
    Never,
}

impl From<ColorArg> for ColorChoice {
    fn from(arg: ColorArg) -> Self {
        match arg {
            ColorArg::Auto => Self::Auto,
            ColorArg::Always => Self::Always,
            ColorArg::Never => Self::Never,
        }
    }
}

/// Report format argument
#[derive(ValueEnum, Clone, Copy, Debug, Default)]
pub enum FormatArg {
    /// Human-readable summary
    #[default]
    Text,
    /// JSON report
    Json,
}

impl From<FormatArg> for ReportFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Text => Self::Text,
            FormatArg::Json => Self::Json,
        }
    }
}

/// Log format argument
#[derive(ValueEnum, Clone, Copy, Debug, Default)]
pub enum LogFormatArg {
    /// Compact text
    #[default]
    Text,
    /// JSON lines
    Json,
}

impl From<LogFormatArg> for LogFormat {
    fn from(arg: LogFormatArg) -> Self {
        match arg {
            LogFormatArg::Text => Self::Text,
            LogFormatArg::Json => Self::Json,
        }
    }
}

/// Settle mode argument
#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum SettleModeArg {
    /// Sleep for the settle delay
    Fixed,
    /// Re-measure until the layout stops moving
    Poll,
}

impl From<SettleModeArg> for SettleMode {
    fn from(arg: SettleModeArg) -> Self {
        match arg {
            SettleModeArg::Fixed => Self::Fixed,
            SettleModeArg::Poll => Self::Poll,
        }
    }
}
