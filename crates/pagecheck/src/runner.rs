//! Scenario runner: executes one scenario against one page.
//!
//! Per step, in declaration order:
//!
//! 1. log `[i/n] description` (pending steps are logged as skipped and stop here)
//! 2. resolve every locator the action targets
//! 3. perform the action
//! 4. sleep the settle delay
//! 5. poll all post-conditions until they hold or the assertion timeout elapses
//! 6. capture the requested screenshot
//! 7. relay console messages
//!
//! The first failure stops the run, captures one diagnostic artifact and
//! produces a failing [`Verdict`]. The driver is closed on every exit path.

use crate::artifact::ArtifactStore;
use crate::assertion::Expectation;
use crate::driver::{ConsoleMessage, PageDriver};
use crate::locator::{Locator, DEFAULT_POLL_INTERVAL_MS, DEFAULT_TIMEOUT_MS};
use crate::result::{PagecheckError, PagecheckResult};
use crate::scenario::{Action, Activation, Scenario, Step, DEFAULT_ACTIVATION_KEY};
use crate::toggle::{ToggleKey, ToggleLedger};
use crate::verdict::{Failure, Outcome, StepRecord, StepStatus, Verdict};
use crate::wait::{wait_for, Check, WaitOptions, WaitOutcome};
use chrono::Utc;
use futures::FutureExt;
use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::path::PathBuf;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

/// Default output directory for artifacts
pub const DEFAULT_OUTPUT_DIR: &str = "target/pagecheck";

/// Runner configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunnerOptions {
    /// How long a locator may take to resolve
    pub element_timeout_ms: u64,
    /// How long post-conditions may take to hold
    pub assertion_timeout_ms: u64,
    /// Delay between polls
    pub poll_interval_ms: u64,
    /// Settle delay for steps that do not set one
    pub default_settle_ms: u64,
    /// Artifact directory
    pub output_dir: PathBuf,
}

impl Default for RunnerOptions {
    fn default() -> Self {
        Self {
            element_timeout_ms: DEFAULT_TIMEOUT_MS,
            assertion_timeout_ms: DEFAULT_TIMEOUT_MS,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            default_settle_ms: 0,
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
        }
    }
}

impl RunnerOptions {
    /// Create options with defaults
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set both the element and the assertion timeout
    #[must_use]
    pub const fn with_timeout(mut self, ms: u64) -> Self {
        self.element_timeout_ms = ms;
        self.assertion_timeout_ms = ms;
        self
    }

    /// Set the element timeout
    #[must_use]
    pub const fn with_element_timeout(mut self, ms: u64) -> Self {
        self.element_timeout_ms = ms;
        self
    }

    /// Set the assertion timeout
    #[must_use]
    pub const fn with_assertion_timeout(mut self, ms: u64) -> Self {
        self.assertion_timeout_ms = ms;
        self
    }

    /// Set the poll interval
    #[must_use]
    pub const fn with_poll_interval(mut self, ms: u64) -> Self {
        self.poll_interval_ms = ms;
        self
    }

    /// Set the default settle delay
    #[must_use]
    pub const fn with_default_settle(mut self, ms: u64) -> Self {
        self.default_settle_ms = ms;
        self
    }

    /// Set the artifact directory
    #[must_use]
    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }

    fn element_wait(&self) -> WaitOptions {
        WaitOptions::new()
            .with_timeout(self.element_timeout_ms)
            .with_poll_interval(self.poll_interval_ms)
    }

    fn assertion_wait(&self) -> WaitOptions {
        WaitOptions::new()
            .with_timeout(self.assertion_timeout_ms)
            .with_poll_interval(self.poll_interval_ms)
    }
}

/// Runs one scenario against the page behind a [`PageDriver`]
#[derive(Debug)]
pub struct ScenarioRunner<D> {
    driver: D,
    options: RunnerOptions,
    artifacts: ArtifactStore,
    ledger: ToggleLedger,
    console: Vec<ConsoleMessage>,
}

impl<D: PageDriver> ScenarioRunner<D> {
    /// Create a runner owning `driver`
    #[must_use]
    pub fn new(driver: D, options: RunnerOptions) -> Self {
        let artifacts = ArtifactStore::new(options.output_dir.clone());
        Self {
            driver,
            options,
            artifacts,
            ledger: ToggleLedger::new(),
            console: Vec::new(),
        }
    }

    /// Runner configuration
    #[must_use]
    pub const fn options(&self) -> &RunnerOptions {
        &self.options
    }

    /// Execute `scenario` and close the driver.
    ///
    /// Never fails: every error, including a panic inside a step, ends up in
    /// the returned verdict.
    pub async fn run(mut self, scenario: &Scenario) -> Verdict {
        let started_at = Utc::now();
        let clock = Instant::now();
        let total = scenario.steps.len();
        let mut records = Vec::with_capacity(total);
        let mut outcome = Outcome::Passed;

        info!(
            scenario = %scenario.name,
            target = %scenario.url("/"),
            steps = total,
            "starting scenario"
        );

        for (i, step) in scenario.steps.iter().enumerate() {
            let index = i + 1;
            info!("[{index}/{total}] {}", step.description);

            if let Some(reason) = &step.pending {
                info!("[{index}/{total}] SKIPPED ({reason})");
                records.push(StepRecord {
                    index,
                    description: step.description.clone(),
                    status: StepStatus::Skipped {
                        reason: reason.clone(),
                    },
                    duration_ms: 0,
                    screenshot: None,
                });
                continue;
            }

            let step_clock = Instant::now();
            let executed = AssertUnwindSafe(self.execute_step(scenario, step))
                .catch_unwind()
                .await;

            let (failure, screenshot) = match executed {
                Ok((Ok(()), screenshot)) => (None, screenshot),
                Ok((Err(err), screenshot)) => (
                    Some(Failure::from_error(index, &step.description, &err)),
                    screenshot,
                ),
                Err(panic) => (
                    Some(Failure::panicked(
                        index,
                        &step.description,
                        panic_message(panic.as_ref()),
                    )),
                    None,
                ),
            };

            let mut record = StepRecord {
                index,
                description: step.description.clone(),
                status: StepStatus::Passed,
                duration_ms: millis(step_clock.elapsed()),
                screenshot,
            };

            if let Some(mut failure) = failure {
                error!("[{index}/{total}] FAILED: {}: {}", failure.kind, failure.message);
                failure.artifact =
                    guarded("diagnostic capture", self.capture_diagnostic(&failure.message))
                        .await
                        .flatten();
                record.status = StepStatus::Failed;
                records.push(record);
                outcome = Outcome::Failed(failure);
                break;
            }
            debug!("[{index}/{total}] passed in {}ms", record.duration_ms);
            records.push(record);
        }

        guarded("console relay", self.relay_console()).await;
        if let Some(Err(err)) = guarded("page close", self.driver.close()).await {
            warn!(error = %err, "failed to close the page");
        }

        if !self.console.is_empty() {
            if let Some(Err(err)) =
                guarded("console log", self.artifacts.save_console(&self.console)).await
            {
                warn!(error = %err, "failed to write console log");
            }
        }

        let verdict = Verdict {
            scenario: scenario.name.clone(),
            outcome,
            steps: records,
            artifacts: self.artifacts.paths().to_vec(),
            console_messages: self.console.len(),
            started_at,
            duration_ms: millis(clock.elapsed()),
        };

        match guarded("verdict write", self.artifacts.save_verdict(&verdict)).await {
            Some(Ok(path)) => debug!(path = %path.display(), "verdict written"),
            Some(Err(err)) => warn!(error = %err, "failed to write verdict"),
            None => {}
        }
        if verdict.passed() {
            info!("{verdict}");
        } else {
            error!("{verdict}");
        }
        verdict
    }

    /// Run one step; the requested screenshot is taken even if the
    /// post-conditions failed.
    async fn execute_step(
        &mut self,
        scenario: &Scenario,
        step: &Step,
    ) -> (PagecheckResult<()>, Option<PathBuf>) {
        let mut result = self.perform(scenario, step).await;
        let mut screenshot = None;

        let capture = match &result {
            Ok(()) | Err(PagecheckError::AssertionTimeout { .. }) => step.screenshot.as_deref(),
            Err(_) => None,
        };
        if let Some(name) = capture {
            match self.capture(name).await {
                Ok(path) => screenshot = Some(path),
                Err(err) if result.is_ok() => result = Err(err),
                Err(err) => warn!(error = %err, "requested screenshot not captured"),
            }
        }

        self.relay_console().await;
        (result, screenshot)
    }

    async fn perform(&mut self, scenario: &Scenario, step: &Step) -> PagecheckResult<()> {
        for target in step.action.targets() {
            self.resolve(target).await?;
        }

        debug!(action = %step.action, "performing");
        let implicit = self.act(scenario, &step.action).await?;

        let settle = step.settle_ms.unwrap_or(self.options.default_settle_ms);
        if settle > 0 {
            tokio::time::sleep(Duration::from_millis(settle)).await;
        }

        let mut expectations = step.expect.clone();
        expectations.extend(implicit);
        self.assert_all(&expectations).await
    }

    /// Poll until the locator matches at least one element.
    async fn resolve(&self, target: &Locator) -> PagecheckResult<()> {
        let driver = &self.driver;
        let outcome = wait_for(&self.options.element_wait(), || async move {
            let state = driver.inspect(target).await?;
            Ok(if state.exists() {
                Check::Ready(())
            } else {
                Check::Pending(format!("'{target}' matches nothing"))
            })
        })
        .await?;

        match outcome {
            WaitOutcome::Satisfied { .. } => Ok(()),
            WaitOutcome::TimedOut { .. } => Err(PagecheckError::ElementNotFound {
                selector: target.selector().to_string(),
                ms: self.options.element_timeout_ms,
            }),
        }
    }

    /// Perform the action; toggles return the expectation their parity implies.
    async fn act(
        &mut self,
        scenario: &Scenario,
        action: &Action,
    ) -> PagecheckResult<Option<Expectation>> {
        match action {
            Action::Navigate { path } => self.driver.navigate(&scenario.url(path)).await?,
            Action::Reload => self.driver.reload().await?,
            Action::Click { target } => self.driver.click(target).await?,
            Action::Fill { target, value } => self.driver.fill(target, value).await?,
            Action::Focus { target } => self.driver.focus(target).await?,
            Action::Press { key, target } => self.driver.press_key(target.as_ref(), key).await?,
            Action::Wait { ms } => {
                if *ms > 0 {
                    tokio::time::sleep(Duration::from_millis(*ms)).await;
                }
            }
            Action::Toggle {
                target,
                observe,
                class,
                via,
                key,
                times,
                interval_ms,
            } => {
                let observed = observe.as_ref().unwrap_or(target);
                let ledger_key = ToggleKey::new(observed.selector(), class.as_str());
                let before = self.driver.inspect(observed).await?.has_class(class);
                debug!(control = %observed, class = %class, before, "observing toggle");
                self.ledger.observe(ledger_key.clone(), before);

                let key = key.as_deref().unwrap_or(DEFAULT_ACTIVATION_KEY);
                for n in 0..*times {
                    if n > 0 && *interval_ms > 0 {
                        tokio::time::sleep(Duration::from_millis(*interval_ms)).await;
                    }
                    match via {
                        Activation::Click => self.driver.click(target).await?,
                        Activation::Keyboard => {
                            self.driver.focus(target).await?;
                            self.driver.press_key(None, key).await?;
                        }
                    }
                }

                let expected = self.ledger.record(&ledger_key, *times).ok_or_else(|| {
                    PagecheckError::page(format!("toggle '{observed}' is not tracked"))
                })?;
                return Ok(Some(Expectation::class_state(
                    observed.clone(),
                    class.clone(),
                    expected,
                )));
            }
        }
        Ok(None)
    }

    /// Poll until every expectation holds. A timeout caused by a target that
    /// still matches nothing is reported as [`PagecheckError::ElementNotFound`].
    async fn assert_all(&self, expectations: &[Expectation]) -> PagecheckResult<()> {
        if expectations.is_empty() {
            return Ok(());
        }
        let driver = &self.driver;
        let outcome = wait_for(&self.options.assertion_wait(), || async move {
            for expectation in expectations {
                let state = driver.inspect(expectation.target()).await?;
                if let Err(mismatch) = expectation.check(&state) {
                    return Ok(Check::Pending(mismatch));
                }
            }
            Ok(Check::Ready(()))
        })
        .await?;

        match outcome {
            WaitOutcome::Satisfied { attempts, .. } => {
                debug!(attempts, "post-conditions hold");
                Ok(())
            }
            WaitOutcome::TimedOut { last, .. } => {
                for expectation in expectations.iter().filter(|e| e.requires_element()) {
                    if !self.driver.inspect(expectation.target()).await?.exists() {
                        return Err(PagecheckError::ElementNotFound {
                            selector: expectation.target().selector().to_string(),
                            ms: self.options.assertion_timeout_ms,
                        });
                    }
                }
                Err(PagecheckError::AssertionTimeout {
                    ms: self.options.assertion_timeout_ms,
                    message: last,
                })
            }
        }
    }

    async fn capture(&mut self, name: &str) -> PagecheckResult<PathBuf> {
        let png = self.driver.screenshot().await?;
        let path = self.artifacts.save_screenshot(name, &png).await?;
        info!(path = %path.display(), "screenshot saved");
        Ok(path)
    }

    /// Exactly one diagnostic artifact: `error.png`, or `error.txt` when the
    /// screenshot cannot be taken.
    async fn capture_diagnostic(&mut self, message: &str) -> Option<PathBuf> {
        let saved = match self.driver.screenshot().await {
            Ok(png) => self.artifacts.save_error_screenshot(&png).await,
            Err(err) => {
                warn!(error = %err, "diagnostic screenshot failed, writing text instead");
                self.artifacts
                    .save_error_text(&format!("{message}\nscreenshot unavailable: {err}"))
                    .await
            }
        };
        match saved {
            Ok(path) => {
                info!(path = %path.display(), "diagnostic artifact saved");
                Some(path)
            }
            Err(err) => {
                warn!(error = %err, "diagnostic artifact not written");
                None
            }
        }
    }

    async fn relay_console(&mut self) {
        for message in self.driver.drain_console().await {
            info!(target: "pagecheck::console", level = %message.level, "{}", message.text);
            self.console.push(message);
        }
    }
}

/// Await a teardown future, turning a panic into a warning
async fn guarded<T>(what: &str, work: impl Future<Output = T>) -> Option<T> {
    match AssertUnwindSafe(work).catch_unwind().await {
        Ok(value) => Some(value),
        Err(panic) => {
            warn!(panic = %panic_message(panic.as_ref()), "{what} panicked");
            None
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
