//! Bounded condition polling.
//!
//! Every asynchronous page effect the runner waits for (a selector appearing,
//! a class flipping after a transition, a debounced re-render) goes through
//! [`wait_for`]: check, and if the condition does not hold yet sleep one poll
//! interval and check again, until the timeout elapses. The check always runs
//! at least once, so a zero timeout degrades to a single check.

use crate::locator::{DEFAULT_POLL_INTERVAL_MS, DEFAULT_TIMEOUT_MS};
use crate::result::PagecheckResult;
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;

/// Options for wait operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitOptions {
    /// Timeout in milliseconds
    pub timeout_ms: u64,
    /// Polling interval in milliseconds
    pub poll_interval_ms: u64,
}

impl Default for WaitOptions {
    fn default() -> Self {
        Self {
            timeout_ms: DEFAULT_TIMEOUT_MS,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
        }
    }
}

impl WaitOptions {
    /// Create new wait options with defaults
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set timeout in milliseconds
    #[must_use]
    pub const fn with_timeout(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    /// Set polling interval in milliseconds
    #[must_use]
    pub const fn with_poll_interval(mut self, poll_interval_ms: u64) -> Self {
        self.poll_interval_ms = poll_interval_ms;
        self
    }

    /// Get timeout as Duration
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Get poll interval as Duration (never zero)
    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }
}

/// One check of a condition
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Check<T> {
    /// Condition holds
    Ready(T),
    /// Condition does not hold yet; carries what was observed instead
    Pending(String),
}

/// Outcome of a bounded wait
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WaitOutcome<T> {
    /// The condition held before the timeout
    Satisfied {
        /// Value produced by the final check
        value: T,
        /// Time spent waiting
        elapsed: Duration,
        /// Number of checks made
        attempts: u32,
    },
    /// The timeout elapsed first
    TimedOut {
        /// Observation from the last check
        last: String,
        /// Time spent waiting
        elapsed: Duration,
        /// Number of checks made
        attempts: u32,
    },
}

impl<T> WaitOutcome<T> {
    /// Whether the condition held
    #[must_use]
    pub const fn is_satisfied(&self) -> bool {
        matches!(self, Self::Satisfied { .. })
    }

    /// Number of checks made
    #[must_use]
    pub const fn attempts(&self) -> u32 {
        match self {
            Self::Satisfied { attempts, .. } | Self::TimedOut { attempts, .. } => *attempts,
        }
    }
}

/// Poll `check` until it reports [`Check::Ready`] or the timeout elapses.
///
/// # Errors
///
/// A check error aborts the wait and is returned as-is; a timeout is not an
/// error but a [`WaitOutcome::TimedOut`].
pub async fn wait_for<T, F, Fut>(
    options: &WaitOptions,
    mut check: F,
) -> PagecheckResult<WaitOutcome<T>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = PagecheckResult<Check<T>>>,
{
    let start = Instant::now();
    let timeout = options.timeout();
    let mut attempts = 0;

    loop {
        attempts += 1;
        match check().await? {
            Check::Ready(value) => {
                return Ok(WaitOutcome::Satisfied {
                    value,
                    elapsed: start.elapsed(),
                    attempts,
                });
            }
            Check::Pending(last) => {
                let elapsed = start.elapsed();
                if elapsed >= timeout {
                    return Ok(WaitOutcome::TimedOut {
                        last,
                        elapsed,
                        attempts,
                    });
                }
                let remaining = timeout - elapsed;
                tokio::time::sleep(options.poll_interval().min(remaining)).await;
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::result::PagecheckError;
    use std::sync::atomic::{AtomicU32, Ordering};

    mod options_tests {
        use super::*;

        #[test]
        fn test_defaults() {
            let opts = WaitOptions::default();
            assert_eq!(opts.timeout_ms, 5000);
            assert_eq!(opts.poll_interval_ms, 50);
        }

        #[test]
        fn test_builder() {
            let opts = WaitOptions::new().with_timeout(250).with_poll_interval(10);
            assert_eq!(opts.timeout(), Duration::from_millis(250));
            assert_eq!(opts.poll_interval(), Duration::from_millis(10));
        }

        #[test]
        fn test_zero_poll_interval_is_clamped() {
            let opts = WaitOptions::new().with_poll_interval(0);
            assert_eq!(opts.poll_interval(), Duration::from_millis(1));
        }
    }

    mod polling_tests {
        use super::*;

        #[tokio::test(start_paused = true)]
        async fn test_ready_on_first_check() {
            let outcome = wait_for(&WaitOptions::default(), || async {
                Ok(Check::Ready(7))
            })
            .await
            .unwrap();
            assert!(outcome.is_satisfied());
            assert_eq!(outcome.attempts(), 1);
        }

        #[tokio::test(start_paused = true)]
        async fn test_ready_after_several_polls() {
            let calls = AtomicU32::new(0);
            let outcome = wait_for(&WaitOptions::new().with_poll_interval(50), || {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n >= 3 {
                        Ok(Check::Ready(n))
                    } else {
                        Ok(Check::Pending(format!("attempt {n}")))
                    }
                }
            })
            .await
            .unwrap();

            match outcome {
                WaitOutcome::Satisfied {
                    value,
                    elapsed,
                    attempts,
                } => {
                    assert_eq!(value, 3);
                    assert_eq!(attempts, 4);
                    assert!(elapsed >= Duration::from_millis(150));
                }
                WaitOutcome::TimedOut { .. } => panic!("expected success"),
            }
        }

        #[tokio::test(start_paused = true)]
        async fn test_times_out_with_last_observation() {
            let outcome = wait_for(&WaitOptions::new().with_timeout(200), || async {
                Ok::<_, PagecheckError>(Check::<()>::Pending("still closed".to_string()))
            })
            .await
            .unwrap();

            match outcome {
                WaitOutcome::TimedOut { last, elapsed, .. } => {
                    assert_eq!(last, "still closed");
                    assert!(elapsed >= Duration::from_millis(200));
                    assert!(elapsed < Duration::from_millis(300));
                }
                WaitOutcome::Satisfied { .. } => panic!("expected timeout"),
            }
        }

        #[tokio::test(start_paused = true)]
        async fn test_zero_timeout_checks_once() {
            let calls = AtomicU32::new(0);
            let outcome = wait_for(&WaitOptions::new().with_timeout(0), || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Ok(Check::<()>::Pending("no".to_string())) }
            })
            .await
            .unwrap();
            assert!(!outcome.is_satisfied());
            assert_eq!(calls.load(Ordering::SeqCst), 1);
        }

        #[tokio::test(start_paused = true)]
        async fn test_check_error_aborts() {
            let result = wait_for(&WaitOptions::default(), || async {
                Err::<Check<()>, _>(PagecheckError::page("target closed"))
            })
            .await;
            assert!(matches!(result, Err(PagecheckError::PageError { .. })));
        }
    }
}
