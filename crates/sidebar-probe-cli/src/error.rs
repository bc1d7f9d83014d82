//! Error types for the CLI

use thiserror::Error;

/// Result type for CLI operations
pub type CliResult<T> = Result<T, CliError>;

/// Errors that can occur in the CLI
#[derive(Debug, Error)]
pub enum CliError {
    /// Configuration error
    #[error("Configuration error: {message}")]
    Config {
        /// Error message
        message: String,
    },

    /// Invalid argument
    #[error("Invalid argument: {message}")]
    InvalidArgument {
        /// Error message
        message: String,
    },

    /// Scenario file failed static checks
    #[error("Invalid scenario {path}:\n{problems}")]
    InvalidScenario {
        /// Scenario file
        path: String,
        /// One problem per line
        problems: String,
    },

    /// The binary was built without browser control
    #[error("Browser support not enabled. Rebuild with --features browser")]
    BrowserUnavailable,

    /// IO error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Library error
    #[error("{0}")]
    Probe(#[from] sidebar_probe::ProbeError),

    /// Report generation error
    #[error("Report generation failed: {message}")]
    ReportGeneration {
        /// Error message
        message: String,
    },
}

impl CliError {
    /// Create a configuration error
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create an invalid argument error
    #[must_use]
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Create a report generation error
    #[must_use]
    pub fn report_generation(message: impl Into<String>) -> Self {
        Self::ReportGeneration {
            message: message.into(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error() {
        let err = CliError::config("bad config");
        assert!(err.to_string().contains("Configuration"));
        assert!(err.to_string().contains("bad config"));
    }

    #[test]
    fn test_invalid_argument_error() {
        let err = CliError::invalid_argument("unknown built-in 'x'");
        assert!(err.to_string().contains("Invalid argument"));
    }

    #[test]
    fn test_invalid_scenario_lists_problems() {
        let err = CliError::InvalidScenario {
            path: "s.yaml".into(),
            problems: "step 2: 'toggle' acted on before it was located".into(),
        };
        let text = err.to_string();
        assert!(text.starts_with("Invalid scenario s.yaml:"));
        assert!(text.contains("step 2"));
    }

    #[test]
    fn test_probe_error_passes_through() {
        let err: CliError = sidebar_probe::ProbeError::config("viewport must be non-zero").into();
        assert_eq!(
            err.to_string(),
            "Configuration error: viewport must be non-zero"
        );
    }

    #[test]
    fn test_io_error_from() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let cli_err: CliError = io_err.into();
        assert!(cli_err.to_string().contains("I/O"));
    }
}
