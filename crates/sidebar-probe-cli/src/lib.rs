//! Sidebar-probe CLI library
//!
//! Command-line interface for running sidebar layout scenarios.

#![warn(missing_docs)]
#![allow(clippy::module_name_repetitions)]

mod commands;
mod config;
mod error;
pub mod handlers;
pub mod logger;
mod output;

pub use commands::{
    BuiltinArgs, Cli, ColorArg, Commands, ConfigArgs, FormatArg, HarnessArgs, LogFormatArg,
    RunArgs, SettleModeArg, ValidateArgs,
};
pub use config::{CliConfig, ColorChoice, HarnessOverrides, LogFormat, ReportFormat, Verbosity};
pub use error::{CliError, CliResult};
pub use output::{write_reports, Printer, JSON_REPORT, TEXT_REPORT};
