//! Logging setup for the CLI.
//!
//! Log lines go to stderr so stdout carries only the report. `RUST_LOG`
//! replaces the verbosity-derived filter when set; `-v`/`-q` take precedence
//! over it.

use crate::config::{CliConfig, LogFormat, Verbosity};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Filter for the configured verbosity
#[must_use]
pub fn filter_for(verbosity: Verbosity) -> EnvFilter {
    match verbosity {
        Verbosity::Normal => EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(verbosity.log_filter())),
        _ => EnvFilter::new(verbosity.log_filter()),
    }
}

/// Install the global subscriber. Safe to call more than once; only the
/// first call takes effect.
pub fn init_logger(config: &CliConfig) {
    let filter = filter_for(config.verbosity);
    let ansi = config.color.should_color();

    let result = match config.log_format {
        LogFormat::Text => tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(false)
                    .with_level(true)
                    .with_ansi(ansi)
                    .compact(),
            )
            .try_init(),
        LogFormat::Json => tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .json()
                    .with_writer(std::io::stderr)
                    .with_current_span(false),
            )
            .try_init(),
    };
    if result.is_err() {
        tracing::debug!("logger already initialised");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_levels_ignore_environment() {
        let filter = filter_for(Verbosity::Debug).to_string();
        assert!(filter.contains("sidebar_probe=debug"));
    }

    #[test]
    fn test_init_twice_is_harmless() {
        let config = CliConfig::new().with_log_format(LogFormat::Json);
        init_logger(&config);
        init_logger(&config);
    }
}
