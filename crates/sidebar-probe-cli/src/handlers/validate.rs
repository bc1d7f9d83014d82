//! Validate command handler

use crate::error::{CliError, CliResult};
use crate::handlers::run::load_scenario;
use crate::output::Printer;
use std::path::PathBuf;

/// Check every scenario file; all are reported before failing
pub fn execute_validate(paths: &[PathBuf], printer: &Printer) -> CliResult<()> {
    let mut invalid = 0;
    for path in paths {
        match load_scenario(path) {
            Ok(scenario) => printer.success(&format!(
                "{}: '{}' ({} targets, {} steps)",
                path.display(),
                scenario.name,
                scenario.targets.len(),
                scenario.steps.len()
            ))?,
            Err(e) => {
                invalid += 1;
                printer.failure(&e.to_string())?;
            }
        }
    }
    if invalid == 0 {
        Ok(())
    } else {
        Err(CliError::invalid_argument(format!(
            "{invalid} of {} scenario file(s) invalid",
            paths.len()
        )))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::config::{CliConfig, ColorChoice};
    use sidebar_probe::{builtin, HarnessConfig};

    #[test]
    fn test_builtin_written_to_file_validates() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("toggle.yaml");
        let scenario = builtin::sidebar_toggle(&HarnessConfig::default());
        std::fs::write(&path, scenario.to_yaml().unwrap()).unwrap();

        let printer = Printer::new(&CliConfig::new().with_color(ColorChoice::Never));
        assert!(execute_validate(&[path], &printer).is_ok());
    }

    #[test]
    fn test_counts_invalid_files() {
        let dir = tempfile::tempdir().unwrap();
        let empty = dir.path().join("empty.yaml");
        std::fs::write(&empty, "name: ''\nsteps: []\n").unwrap();
        let missing = dir.path().join("missing.yaml");

        let printer = Printer::new(&CliConfig::new().with_color(ColorChoice::Never));
        let err = execute_validate(&[empty, missing], &printer).unwrap_err();
        assert!(err.to_string().contains("2 of 2 scenario file(s) invalid"));
    }
}
