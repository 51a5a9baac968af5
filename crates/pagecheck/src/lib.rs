//! pagecheck: scenario-driven UI behaviour verification
//!
//! Drives one stateful page through an ordered scenario of steps, asserts
//! derived DOM state after each step, captures artifacts, and produces a
//! single pass/fail [`Verdict`].
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                   pagecheck Architecture                         │
//! ├─────────────────────────────────────────────────────────────────┤
//! │   ┌────────────┐    ┌────────────┐    ┌────────────┐            │
//! │   │ Scenario   │    │ Scenario   │    │ PageDriver │            │
//! │   │ (YAML or   │───►│ Runner     │───►│ Chromium / │            │
//! │   │  builtin)  │    │ + ledger   │    │ Mock page  │            │
//! │   └────────────┘    └─────┬──────┘    └────────────┘            │
//! │                           ▼                                      │
//! │                 Verdict + artifacts                              │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use pagecheck::{salary_calculator, MockDriver, RunnerOptions, ScenarioRunner};
//!
//! # async fn demo() {
//! let scenario = salary_calculator("http://127.0.0.1", 3000);
//! let runner = ScenarioRunner::new(MockDriver::salary_page(), RunnerOptions::default());
//! let verdict = runner.run(&scenario).await;
//! std::process::exit(verdict.exit_code());
//! # }
//! ```

#![warn(missing_docs)]
#![cfg_attr(test, allow(clippy::large_stack_arrays, clippy::large_stack_frames))]

mod assertion;
mod driver;
mod locator;
mod result;
mod toggle;
mod wait;

/// Write-once artifact directory
pub mod artifact;

/// Built-in salary calculator scenario and its selectors
pub mod builtin;

/// In-memory page for tests
#[allow(clippy::missing_panics_doc)]
pub mod mock;

/// Scenario execution
pub mod runner;

/// Scenario schema and YAML loading
#[allow(missing_docs)]
pub mod scenario;

/// Run verdicts and the failure taxonomy
pub mod verdict;

/// Chromium driver (requires the `browser` feature)
#[cfg(feature = "browser")]
pub mod browser;

pub use artifact::ArtifactStore;
pub use assertion::Expectation;
#[cfg(feature = "browser")]
pub use browser::ChromiumDriver;
pub use builtin::salary_calculator;
pub use driver::{ConsoleMessage, DriverConfig, ElementState, PageDriver};
pub use locator::{Locator, DEFAULT_POLL_INTERVAL_MS, DEFAULT_TIMEOUT_MS};
pub use mock::{MockDriver, MockElement, MockHistory};
pub use result::{PagecheckError, PagecheckResult};
pub use runner::{RunnerOptions, ScenarioRunner, DEFAULT_OUTPUT_DIR};
pub use scenario::{Action, Activation, Scenario, ScenarioError, Step};
pub use toggle::{ToggleKey, ToggleLedger, ToggleState};
pub use verdict::{Failure, FailureKind, Outcome, StepRecord, StepStatus, Verdict};
pub use wait::{wait_for, Check, WaitOptions, WaitOutcome};
