//! Result and error types for sidebar-probe.
//!
//! Errors here are the *fatal* or *transport* conditions of a run. A rule
//! that evaluates false is not an error: it becomes a `Fail` verdict in the
//! report and the scenario keeps going.

use thiserror::Error;

/// Result type for sidebar-probe operations
pub type ProbeResult<T> = Result<T, ProbeError>;

/// Errors that can occur while probing a page
#[derive(Debug, Error)]
pub enum ProbeError {
    /// No candidate matched any locator strategy (fatal to the step)
    #[error("Locator '{locator}' matched nothing (tried {strategies} strategies)")]
    LocatorNotFound {
        /// Locator name
        locator: String,
        /// Number of strategies attempted
        strategies: usize,
    },

    /// A single candidate could not be queried (recovered by the locator)
    #[error("Transient query error: {message}")]
    TransientQuery {
        /// Error message
        message: String,
    },

    /// Navigation, polling or the whole run exceeded its bound
    #[error("{operation} timed out after {ms}ms")]
    Timeout {
        /// What was being waited for
        operation: String,
        /// Timeout in milliseconds
        ms: u64,
    },

    /// Navigation error
    #[error("Navigation to {url} failed: {message}")]
    Navigation {
        /// URL that failed
        url: String,
        /// Error message
        message: String,
    },

    /// The element behind a handle is gone (navigation or re-render)
    #[error("Element handle {handle} is stale")]
    StaleHandle {
        /// Handle id
        handle: String,
    },

    /// An `Act` step referenced a name no `Locate` step bound
    #[error("No element bound under '{name}'")]
    UnknownBinding {
        /// Binding name
        name: String,
    },

    /// Click dispatch failed
    #[error("Click failed: {message}")]
    Input {
        /// Error message
        message: String,
    },

    /// Screenshot error
    #[error("Screenshot failed: {message}")]
    Screenshot {
        /// Error message
        message: String,
    },

    /// Browser launch error
    #[error("Failed to launch browser: {message}")]
    BrowserLaunch {
        /// Error message
        message: String,
    },

    /// Page error
    #[error("Page error: {message}")]
    Page {
        /// Error message
        message: String,
    },

    /// Invalid configuration or scenario definition
    #[error("Configuration error: {message}")]
    Config {
        /// Error message
        message: String,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),
}

impl ProbeError {
    /// Create a configuration error
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a timeout error
    #[must_use]
    pub fn timeout(operation: impl Into<String>, ms: u64) -> Self {
        Self::Timeout {
            operation: operation.into(),
            ms,
        }
    }

    /// Whether this error aborts the remaining steps of a scenario.
    ///
    /// Everything except a transient per-candidate query failure is fatal
    /// once it escapes a step.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        !matches!(self, Self::TransientQuery { .. })
    }

    /// Whether the error indicates a detached or re-rendered element
    #[must_use]
    pub const fn is_stale(&self) -> bool {
        matches!(self, Self::StaleHandle { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_locator_not_found_message() {
        let err = ProbeError::LocatorNotFound {
            locator: "toggle".to_string(),
            strategies: 2,
        };
        assert_eq!(
            err.to_string(),
            "Locator 'toggle' matched nothing (tried 2 strategies)"
        );
        assert!(err.is_fatal());
    }

    #[test]
    fn test_timeout_message() {
        let err = ProbeError::timeout("settle poll", 3000);
        assert_eq!(err.to_string(), "settle poll timed out after 3000ms");
    }

    #[test]
    fn test_transient_is_not_fatal() {
        let err = ProbeError::TransientQuery {
            message: "node detached".to_string(),
        };
        assert!(!err.is_fatal());
        assert!(!err.is_stale());
    }

    #[test]
    fn test_stale_handle() {
        let err = ProbeError::StaleHandle {
            handle: "h7".to_string(),
        };
        assert!(err.is_stale());
        assert!(err.is_fatal());
    }
}
