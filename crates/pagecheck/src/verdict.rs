//! Verdict of a scenario run.

use crate::result::PagecheckError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Failure taxonomy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// A locator never resolved
    ElementNotFound,
    /// A post-condition never became true
    AssertionTimeout,
    /// Navigation or reload did not settle
    NavigationFailure,
    /// Anything else, including panics inside a step
    UnexpectedException,
}

impl From<&PagecheckError> for FailureKind {
    fn from(err: &PagecheckError) -> Self {
        match err {
            PagecheckError::ElementNotFound { .. } => Self::ElementNotFound,
            PagecheckError::AssertionTimeout { .. } => Self::AssertionTimeout,
            PagecheckError::NavigationError { .. } => Self::NavigationFailure,
            _ => Self::UnexpectedException,
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::ElementNotFound => "ElementNotFound",
            Self::AssertionTimeout => "AssertionTimeout",
            Self::NavigationFailure => "NavigationFailure",
            Self::UnexpectedException => "UnexpectedException",
        };
        f.write_str(name)
    }
}

/// The first failure of a run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Failure {
    /// 1-based index of the failing step
    pub step_index: usize,
    /// Description of the failing step
    pub description: String,
    /// Failure class
    pub kind: FailureKind,
    /// Human-readable cause
    pub message: String,
    /// Diagnostic artifact (`error.png` or `error.txt`)
    pub artifact: Option<PathBuf>,
}

impl Failure {
    /// Classify an error raised by a step
    #[must_use]
    pub fn from_error(step_index: usize, description: impl Into<String>, err: &PagecheckError) -> Self {
        Self {
            step_index,
            description: description.into(),
            kind: FailureKind::from(err),
            message: err.to_string(),
            artifact: None,
        }
    }

    /// A panic caught inside a step
    #[must_use]
    pub fn panicked(step_index: usize, description: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            step_index,
            description: description.into(),
            kind: FailureKind::UnexpectedException,
            message: format!("step panicked: {}", message.into()),
            artifact: None,
        }
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "step {} ({}) failed with {}: {}",
            self.step_index, self.description, self.kind, self.message
        )
    }
}

/// Pass or fail
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Outcome {
    /// Every executed step passed
    Passed,
    /// The run stopped at a failing step
    Failed(Failure),
}

/// Result of one step
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    /// Action performed and every post-condition held
    Passed,
    /// The step failed; see the verdict's failure
    Failed,
    /// Declared but not yet verified; never executed
    Skipped {
        /// Why the step is not executed
        reason: String,
    },
}

/// Record of one step that was reached
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepRecord {
    /// 1-based step index
    pub index: usize,
    /// Step description
    pub description: String,
    /// Result
    pub status: StepStatus,
    /// Wall time spent on the step
    pub duration_ms: u64,
    /// Screenshot captured for the step
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub screenshot: Option<PathBuf>,
}

impl StepRecord {
    /// Whether the step was skipped
    #[must_use]
    pub const fn is_skipped(&self) -> bool {
        matches!(self.status, StepStatus::Skipped { .. })
    }
}

/// Final, typed result of a scenario run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verdict {
    /// Scenario name
    pub scenario: String,
    /// Pass or fail
    pub outcome: Outcome,
    /// Every step that was reached, in order
    pub steps: Vec<StepRecord>,
    /// Every artifact written
    pub artifacts: Vec<PathBuf>,
    /// Number of console messages relayed from the page
    pub console_messages: usize,
    /// Start of the run
    pub started_at: DateTime<Utc>,
    /// Total run time
    pub duration_ms: u64,
}

impl Verdict {
    /// Whether the run passed
    #[must_use]
    pub const fn passed(&self) -> bool {
        matches!(self.outcome, Outcome::Passed)
    }

    /// The failure, if any
    #[must_use]
    pub const fn failure(&self) -> Option<&Failure> {
        match &self.outcome {
            Outcome::Passed => None,
            Outcome::Failed(failure) => Some(failure),
        }
    }

    /// Process exit code: 0 on pass, 1 on failure
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        if self.passed() {
            0
        } else {
            1
        }
    }

    /// Steps that were skipped as not yet verified
    pub fn skipped(&self) -> impl Iterator<Item = &StepRecord> {
        self.steps.iter().filter(|s| s.is_skipped())
    }

    /// Number of steps that passed
    #[must_use]
    pub fn passed_steps(&self) -> usize {
        self.steps
            .iter()
            .filter(|s| s.status == StepStatus::Passed)
            .count()
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.outcome {
            Outcome::Passed => write!(
                f,
                "{}: PASSED ({} passed, {} skipped, {}ms)",
                self.scenario,
                self.passed_steps(),
                self.skipped().count(),
                self.duration_ms
            ),
            Outcome::Failed(failure) => write!(f, "{}: FAILED at {failure}", self.scenario),
        }
    }
}
