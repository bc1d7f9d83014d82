//! Sidebar-probe CLI: verify collapsible sidebars in a live browser
//!
//! ## Usage
//!
//! ```bash
//! sidebar-probe builtin sidebar-toggle --url http://localhost:3002
//! sidebar-probe run scenarios/panel.yaml --settle-mode poll
//! sidebar-probe validate scenarios/*.yaml
//! sidebar-probe config --viewport 1280x720
//! ```

use clap::Parser;
use sidebar_probe_cli::handlers::{
    builtin_scenario, execute_config, execute_list, execute_run, execute_validate, load_scenario,
};
use sidebar_probe_cli::logger::init_logger;
use sidebar_probe_cli::{Cli, CliConfig, CliResult, Commands, HarnessOverrides, Printer, Verbosity};
use std::process::ExitCode;

/// Exit code for usage, configuration and I/O errors
const ERROR_EXIT: u8 = 2;

fn main() -> ExitCode {
    match run() {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::from(ERROR_EXIT)
        }
    }
}

fn run() -> CliResult<ExitCode> {
    let cli = Cli::parse();
    let config = build_config(&cli);
    init_logger(&config);

    let overrides = HarnessOverrides::from(&cli.harness);
    let printer = Printer::new(&config);

    match cli.command {
        Commands::Run(args) => {
            let harness = overrides.resolve()?;
            let scenario = load_scenario(&args.scenario)?;
            execute_run(&scenario, &harness, &printer)
        }
        Commands::Builtin(args) => {
            let harness = overrides.resolve()?;
            let scenario = builtin_scenario(&args.name, &harness)?;
            execute_run(&scenario, &harness, &printer)
        }
        Commands::List => {
            execute_list(&printer)?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Validate(args) => {
            execute_validate(&args.scenarios, &printer)?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Config(args) => {
            execute_config(&overrides, args.defaults)?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn build_config(cli: &Cli) -> CliConfig {
    CliConfig::new()
        .with_verbosity(Verbosity::from_flags(cli.quiet, cli.verbose))
        .with_color(cli.color.into())
        .with_format(cli.format.into())
        .with_log_format(cli.log_format.into())
}
