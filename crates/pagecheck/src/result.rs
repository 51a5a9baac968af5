//! Result and error types for pagecheck.

use crate::scenario::ScenarioError;
use thiserror::Error;

/// Result type for pagecheck operations
pub type PagecheckResult<T> = Result<T, PagecheckError>;

/// Errors that can occur while driving a page
#[derive(Debug, Error)]
pub enum PagecheckError {
    /// Browser launch error
    #[error("Failed to launch browser: {message}")]
    BrowserLaunchError {
        /// Error message
        message: String,
    },

    /// Page or CDP command error
    #[error("Page error: {message}")]
    PageError {
        /// Error message
        message: String,
    },

    /// Navigation or reload did not settle
    #[error("Navigation to {url} failed: {message}")]
    NavigationError {
        /// URL that failed
        url: String,
        /// Error message
        message: String,
    },

    /// Selector did not resolve within the timeout
    #[error("Element '{selector}' not found after {ms}ms")]
    ElementNotFound {
        /// Selector that failed to resolve
        selector: String,
        /// Timeout in milliseconds
        ms: u64,
    },

    /// Post-condition never became true
    #[error("Assertion timed out after {ms}ms: {message}")]
    AssertionTimeout {
        /// Timeout in milliseconds
        ms: u64,
        /// Last observed mismatch
        message: String,
    },

    /// Input simulation error
    #[error("Input simulation failed: {message}")]
    InputError {
        /// Error message
        message: String,
    },

    /// Screenshot error
    #[error("Screenshot failed: {message}")]
    ScreenshotError {
        /// Error message
        message: String,
    },

    /// Artifact could not be written
    #[error("Artifact '{name}' rejected: {message}")]
    ArtifactError {
        /// Artifact file name
        name: String,
        /// Error message
        message: String,
    },

    /// Scenario file is malformed or fails validation
    #[error("Invalid scenario: {0}")]
    Scenario(#[from] ScenarioError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl PagecheckError {
    /// Create a page error
    #[must_use]
    pub fn page(message: impl Into<String>) -> Self {
        Self::PageError {
            message: message.into(),
        }
    }

    /// Create an input error
    #[must_use]
    pub fn input(message: impl Into<String>) -> Self {
        Self::InputError {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_element_not_found_message() {
        let err = PagecheckError::ElementNotFound {
            selector: "#theme-toggle-btn".to_string(),
            ms: 5000,
        };
        let msg = err.to_string();
        assert!(msg.contains("#theme-toggle-btn"));
        assert!(msg.contains("5000ms"));
    }

    #[test]
    fn test_assertion_timeout_message() {
        let err = PagecheckError::AssertionTimeout {
            ms: 250,
            message: "'html' lacks class 'dark'".to_string(),
        };
        assert!(err.to_string().contains("lacks class 'dark'"));
    }

    #[test]
    fn test_io_error_from() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: PagecheckError = io_err.into();
        assert!(err.to_string().starts_with("I/O error"));
    }

    #[test]
    fn test_helper_constructors() {
        assert!(matches!(
            PagecheckError::page("x"),
            PagecheckError::PageError { .. }
        ));
        assert!(matches!(
            PagecheckError::input("x"),
            PagecheckError::InputError { .. }
        ));
    }

    #[test]
    fn test_scenario_error_from() {
        let err: PagecheckError = ScenarioError::EmptySteps.into();
        assert_eq!(err.to_string(), "Invalid scenario: Steps cannot be empty");
    }
}
