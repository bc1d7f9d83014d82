//! Run and builtin command handlers

use crate::error::{CliError, CliResult};
use crate::output::{write_reports, Printer};
use sidebar_probe::{builtin, exit_code, run_scenario, HarnessConfig, Scenario, SessionProvider};
use std::path::Path;
use std::process::ExitCode;
use tracing::info;

/// Load a scenario file and run the static checks on it
pub fn load_scenario(path: &Path) -> CliResult<Scenario> {
    let scenario = Scenario::from_file(path)?;
    let problems = scenario.problems();
    if problems.is_empty() {
        Ok(scenario)
    } else {
        Err(CliError::InvalidScenario {
            path: path.display().to_string(),
            problems: problems.join("\n"),
        })
    }
}

/// Built-in scenario by name
pub fn builtin_scenario(name: &str, config: &HarnessConfig) -> CliResult<Scenario> {
    builtin::by_name(name, config).ok_or_else(|| {
        let known: Vec<&str> = builtin::BUILTINS.iter().map(|(n, _)| *n).collect();
        CliError::invalid_argument(format!(
            "unknown built-in '{name}' (expected one of: {})",
            known.join(", ")
        ))
    })
}

/// Run `scenario` through `provider`, print the report and write report
/// files into the output directory. Returns the process exit code.
pub async fn run_with<P>(
    provider: &P,
    scenario: &Scenario,
    config: &HarnessConfig,
    printer: &Printer,
) -> CliResult<u8>
where
    P: SessionProvider + ?Sized,
{
    let report = run_scenario(provider, scenario, config).await;
    printer.report(&report)?;
    let written = write_reports(&report, &config.output_dir)?;
    for path in &written {
        info!(path = %path.display(), "report written");
    }
    Ok(u8::try_from(exit_code(&report)).unwrap_or(1))
}

/// Execute a scenario against a real browser
#[cfg(feature = "browser")]
pub fn execute_run(
    scenario: &Scenario,
    config: &HarnessConfig,
    printer: &Printer,
) -> CliResult<ExitCode> {
    let rt = tokio::runtime::Runtime::new()?;
    let provider = sidebar_probe::CdpSessionProvider::new();
    let code = rt.block_on(run_with(&provider, scenario, config, printer))?;
    Ok(ExitCode::from(code))
}

/// Execute a scenario against a real browser
#[cfg(not(feature = "browser"))]
pub fn execute_run(
    _scenario: &Scenario,
    _config: &HarnessConfig,
    _printer: &Printer,
) -> CliResult<ExitCode> {
    Err(CliError::BrowserUnavailable)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::config::{CliConfig, ColorChoice, Verbosity};
    use sidebar_probe::{BoundingBox, FakeElement, FakePage, FakeSessionProvider};
    use std::io::Write;

    fn printer() -> Printer {
        Printer::new(
            &CliConfig::new()
                .with_color(ColorChoice::Never)
                .with_verbosity(Verbosity::Quiet),
        )
    }

    mod load_tests {
        use super::*;

        #[test]
        fn test_unknown_builtin() {
            let err = builtin_scenario("drawer", &HarnessConfig::default()).unwrap_err();
            let text = err.to_string();
            assert!(text.contains("unknown built-in 'drawer'"));
            assert!(text.contains("sidebar-toggle, secondary-panel"));
        }

        #[test]
        fn test_invalid_file_lists_problems() {
            let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
            write!(
                file,
                "name: broken\ntargets: {{}}\nsteps:\n  - action: act\n    handle: toggle\n"
            )
            .unwrap();
            let err = load_scenario(file.path()).unwrap_err();
            assert!(matches!(err, CliError::InvalidScenario { .. }));
            assert!(err.to_string().contains("'toggle' used before it is located"));
        }
    }

    mod run_tests {
        use super::*;

        #[tokio::test]
        async fn test_run_writes_reports_and_exit_code() {
            let dir = tempfile::tempdir().unwrap();
            let config = HarnessConfig::default()
                .with_settle_delay(0)
                .with_output_dir(dir.path());
            let page = FakePage::new();
            page.with_dom(|dom| {
                let aside = dom.add(FakeElement::new("aside").at(0.0, 0.0, 280.0, 900.0));
                let button = dom.add(FakeElement::new("button").at(12.0, 12.0, 32.0, 32.0));
                dom.on_click(button, move |dom| {
                    dom.set_box(aside, BoundingBox::new(0.0, 0.0, 64.0, 900.0));
                });
            });
            let scenario = Scenario::from_yaml(
                r"
name: collapse
targets:
  aside: { queries: [ { selector: aside } ] }
  toggle: { queries: [ { selector: button } ] }
steps:
  - action: locate
    query: toggle
    bind: toggle
  - action: act
    handle: toggle
  - action: assert_all
    rules:
      - name: rail
        check: width_class
        target: aside
        expect: collapsed
",
            )
            .unwrap();

            let provider = FakeSessionProvider::new(page);
            let code = run_with(&provider, &scenario, &config, &printer())
                .await
                .unwrap();
            assert_eq!(code, 0);
            assert!(dir.path().join("report.txt").exists());
            assert!(dir.path().join("report.json").exists());
        }

        #[tokio::test]
        async fn test_aborted_run_exits_non_zero() {
            let dir = tempfile::tempdir().unwrap();
            let config = HarnessConfig::default().with_output_dir(dir.path());
            let provider = FakeSessionProvider::new(FakePage::new()).failing("no chromium");
            let scenario = builtin_scenario("sidebar-toggle", &config).unwrap();
            let code = run_with(&provider, &scenario, &config, &printer())
                .await
                .unwrap();
            assert_eq!(code, 1);
            let text = std::fs::read_to_string(dir.path().join("report.txt")).unwrap();
            assert!(text.contains("ABORTED: Failed to launch browser: no chromium"));
        }
    }
}
