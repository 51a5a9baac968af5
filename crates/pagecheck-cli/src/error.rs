//! Error types for the CLI

use pagecheck::{PagecheckError, ScenarioError};
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

    /// IO error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Library error outside a scenario run
    #[error("pagecheck error: {0}")]
    Pagecheck(#[from] PagecheckError),

    /// Scenario could not be loaded or is invalid
    #[error("Invalid scenario: {0}")]
    Scenario(#[from] ScenarioError),

    /// JSON rendering error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The scenario ran and failed
    #[error("scenario '{scenario}' failed at step {step}")]
    ScenarioFailed {
        /// Scenario name
        scenario: String,
        /// 1-based index of the failing step
        step: usize,
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

    /// Process exit code: 1 for a failed scenario, 2 for everything that
    /// prevented a run
    #[must_use]
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::ScenarioFailed { .. } => 1,
            _ => 2,
        }
    }
}
