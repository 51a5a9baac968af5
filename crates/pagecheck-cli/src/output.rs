//! Output formatting and progress reporting

use console::{style, Term};
use indicatif::{ProgressBar, ProgressStyle};
use pagecheck::{StepRecord, StepStatus, Verdict};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Output format for the verdict
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum OutputFormat {
    /// Human-readable text
    #[default]
    Text,
    /// JSON output
    Json,
}

/// Progress reporter for a scenario run
#[derive(Debug)]
pub struct ProgressReporter {
    term: Term,
    spinner: Option<ProgressBar>,
    /// Whether to use colors
    pub use_color: bool,
    /// Quiet mode
    pub quiet: bool,
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::new(true, false)
    }
}

impl ProgressReporter {
    /// Create a new progress reporter
    #[must_use]
    pub fn new(use_color: bool, quiet: bool) -> Self {
        Self {
            term: Term::stderr(),
            spinner: None,
            use_color,
            quiet,
        }
    }

    /// Start a spinner while the scenario runs
    pub fn start_run(&mut self, scenario: &str, steps: usize) {
        if self.quiet {
            return;
        }

        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} {msg} [{elapsed}]")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        spinner.set_message(format!("running {scenario} ({steps} steps)"));
        spinner.enable_steady_tick(Duration::from_millis(100));
        self.spinner = Some(spinner);
    }

    /// Clear the spinner
    pub fn finish_run(&mut self) {
        if let Some(spinner) = self.spinner.take() {
            spinner.finish_and_clear();
        }
    }

    /// Print one line per step and the closing verdict line
    pub fn report(&self, verdict: &Verdict) {
        let total = verdict.steps.len();
        for record in &verdict.steps {
            if !self.quiet || matches!(record.status, StepStatus::Failed) {
                self.write(&step_line(record, total, self.use_color));
            }
        }

        if let Some(failure) = verdict.failure() {
            self.failure(&failure.to_string());
            if let Some(ref artifact) = failure.artifact {
                self.info(&format!("diagnostic: {}", artifact.display()));
            }
        } else {
            self.success(&verdict.to_string());
        }

        if !verdict.artifacts.is_empty() {
            self.info(&format!("{} artifact(s) written", verdict.artifacts.len()));
        }
    }

    /// Print a success message
    pub fn success(&self, message: &str) {
        if self.quiet {
            return;
        }
        let prefix = if self.use_color {
            style("✓").green().bold().to_string()
        } else {
            "PASS".to_string()
        };
        self.write(&format!("{prefix} {message}"));
    }

    /// Print a failure message
    pub fn failure(&self, message: &str) {
        // Always print failures, even in quiet mode
        let prefix = if self.use_color {
            style("✗").red().bold().to_string()
        } else {
            "FAIL".to_string()
        };
        self.write(&format!("{prefix} {message}"));
    }

    /// Print an info message
    pub fn info(&self, message: &str) {
        if self.quiet {
            return;
        }
        let prefix = if self.use_color {
            style("ℹ").blue().bold().to_string()
        } else {
            "INFO".to_string()
        };
        self.write(&format!("{prefix} {message}"));
    }

    fn write(&self, line: &str) {
        let _ = self.term.write_line(line);
    }
}

/// Render one step record as a terminal line
#[must_use]
pub fn step_line(record: &StepRecord, total: usize, use_color: bool) -> String {
    let position = format!("[{}/{total}]", record.index);
    let (mark, suffix) = match &record.status {
        StepStatus::Passed => ("ok", format!("({}ms)", record.duration_ms)),
        StepStatus::Failed => ("FAILED", format!("({}ms)", record.duration_ms)),
        StepStatus::Skipped { reason } => ("SKIPPED", format!("({reason})")),
    };
    let mark = if use_color {
        match record.status {
            StepStatus::Passed => style(mark).green().to_string(),
            StepStatus::Failed => style(mark).red().bold().to_string(),
            StepStatus::Skipped { .. } => style(mark).yellow().to_string(),
        }
    } else {
        mark.to_string()
    };
    format!("{position} {mark} {} {suffix}", record.description)
}

/// Render the verdict as pretty JSON
pub fn verdict_json(verdict: &Verdict) -> serde_json::Result<String> {
    serde_json::to_string_pretty(verdict)
}
