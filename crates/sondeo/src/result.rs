//! Result and error types for Sondeo.

use crate::api::ApiError;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for Sondeo operations
pub type SondeoResult<T> = Result<T, SondeoError>;

/// Errors that can occur in Sondeo
#[derive(Debug, Error)]
pub enum SondeoError {
    /// An interaction primitive exhausted its retry budget
    #[error("Interaction with '{selector}' failed after {attempts} attempt(s): {source}")]
    Interaction {
        /// Locator the primitive acted on
        selector: String,
        /// Number of attempts performed
        attempts: u32,
        /// Failure of the last attempt
        #[source]
        source: Box<SondeoError>,
    },

    /// Typed value did not match the intended value after fill
    #[error("Typed value mismatch on '{selector}': expected {expected:?}, got {actual:?}")]
    TypeValidation {
        /// Locator of the field
        selector: String,
        /// Text that was typed
        expected: String,
        /// Value read back from the field
        actual: String,
    },

    /// An explicit page-object assertion failed
    #[error("Assertion failed: {description} (expected {expected:?}, actual {actual:?})")]
    Assertion {
        /// Human-readable description of the check
        description: String,
        /// Expected value
        expected: String,
        /// Observed value
        actual: String,
    },

    /// Fixture file does not exist
    #[error("Fixture '{name}' not found at {}", path.display())]
    FixtureNotFound {
        /// Fixture name as requested
        name: String,
        /// Resolved path
        path: PathBuf,
    },

    /// Fixture file is not valid JSON (or does not match the requested shape)
    #[error("Fixture '{name}' is malformed: {source}")]
    FixtureParse {
        /// Fixture name as requested
        name: String,
        /// Underlying parse error
        #[source]
        source: serde_json::Error,
    },

    /// Normalized HTTP client failure
    #[error(transparent)]
    Api(#[from] ApiError),

    /// Invalid or incomplete configuration
    #[error("Configuration error: {message}")]
    Config {
        /// Error message
        message: String,
    },

    /// Operation timed out
    #[error("Operation timed out after {ms}ms: {waiting_for}")]
    Timeout {
        /// Timeout in milliseconds
        ms: u64,
        /// What was being waited for
        waiting_for: String,
    },

    /// No element matched a locator
    #[error("No element matches '{selector}'")]
    ElementNotFound {
        /// Locator that matched nothing
        selector: String,
    },

    /// Navigation error
    #[error("Navigation to {url} failed: {message}")]
    Navigation {
        /// URL that failed
        url: String,
        /// Error message
        message: String,
    },

    /// Browser driver failure
    #[error("Driver error: {message}")]
    Driver {
        /// Error message
        message: String,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl SondeoError {
    /// Create a configuration error
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a driver error
    #[must_use]
    pub fn driver(message: impl Into<String>) -> Self {
        Self::Driver {
            message: message.into(),
        }
    }

    /// Create a timeout error
    #[must_use]
    pub fn timeout(ms: u64, waiting_for: impl Into<String>) -> Self {
        Self::Timeout {
            ms,
            waiting_for: waiting_for.into(),
        }
    }

    /// Create an assertion error
    #[must_use]
    pub fn assertion(
        description: impl Into<String>,
        expected: impl Into<String>,
        actual: impl Into<String>,
    ) -> Self {
        Self::Assertion {
            description: description.into(),
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    /// Whether this error is a timeout
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_interaction_error_names_selector_and_attempts() {
        let err = SondeoError::Interaction {
            selector: "#submit".to_string(),
            attempts: 2,
            source: Box::new(SondeoError::timeout(100, "#submit visible")),
        };
        let msg = err.to_string();
        assert!(msg.contains("#submit"));
        assert!(msg.contains("2 attempt(s)"));
        assert!(err.source().unwrap().to_string().contains("100ms"));
    }

    #[test]
    fn test_assertion_error_shows_expected_and_actual() {
        let err = SondeoError::assertion("URL matches", "/dashboard/", "http://x/login");
        let msg = err.to_string();
        assert!(msg.contains("/dashboard/"));
        assert!(msg.contains("http://x/login"));
    }

    #[test]
    fn test_fixture_not_found_shows_path() {
        let err = SondeoError::FixtureNotFound {
            name: "users".to_string(),
            path: PathBuf::from("data/users.json"),
        };
        assert!(err.to_string().contains("data/users.json"));
    }

    #[test]
    fn test_is_timeout() {
        assert!(SondeoError::timeout(5, "x").is_timeout());
        assert!(!SondeoError::driver("boom").is_timeout());
    }
}
