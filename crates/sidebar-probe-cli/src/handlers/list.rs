//! List command handler

use crate::error::CliResult;
use crate::output::Printer;
use sidebar_probe::builtin::BUILTINS;

/// One line per built-in scenario: name, then description
#[must_use]
pub fn builtin_lines() -> Vec<String> {
    let width = BUILTINS.iter().map(|(name, _)| name.len()).max().unwrap_or(0);
    BUILTINS
        .iter()
        .map(|(name, description)| format!("{name:<width$}  {description}"))
        .collect()
}

/// Execute the list command
pub fn execute_list(printer: &Printer) -> CliResult<()> {
    for line in builtin_lines() {
        printer.line(&line)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lines_are_aligned() {
        let lines = builtin_lines();
        assert_eq!(lines.len(), BUILTINS.len());
        assert!(lines[0].starts_with("sidebar-toggle   "));
        assert!(lines[1].starts_with("secondary-panel  "));
    }
}
