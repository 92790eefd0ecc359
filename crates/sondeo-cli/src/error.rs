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

    /// The API did not answer its health endpoint
    #[error("API unhealthy: {message}")]
    Unhealthy {
        /// Error message
        message: String,
    },

    /// The rendered run contains failing tests
    #[error("{failed} of {total} test(s) failed")]
    TestsFailed {
        /// Failing tests
        failed: usize,
        /// All tests
        total: usize,
    },

    /// IO error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Sondeo library error
    #[error("{0}")]
    Sondeo(#[from] sondeo::SondeoError),
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

    /// Process exit code for this error
    #[must_use]
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::TestsFailed { .. } => 1,
            Self::Unhealthy { .. } => 3,
            _ => 2,
        }
    }
}

impl From<sondeo::ApiError> for CliError {
    fn from(error: sondeo::ApiError) -> Self {
        Self::Sondeo(error.into())
    }
}
