//! Bounded retry with exponential backoff.

use log::debug;
use std::cmp::min;
use std::fmt;
use std::thread;
use std::time::Duration;

/// How often and how patiently a failed download is retried.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt; total attempts are `max_retries + 1`.
    pub max_retries: u32,
    /// Delay before the first retry.
    pub base_delay: Duration,
    /// Upper bound for any single delay.
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(10),
        }
    }
}

impl RetryPolicy {
    /// Create a policy from explicit bounds.
    #[must_use]
    pub fn new(max_retries: u32, base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_retries,
            base_delay,
            max_delay,
        }
    }

    /// Return the delay before retry number `attempt` (1-based).
    ///
    /// Attempt 0 is the initial request and never waits. Each later attempt
    /// doubles the delay, capped at `max_delay`.
    ///
    /// # Examples
    ///
    /// ```
    /// use offline_builder::fetch::RetryPolicy;
    /// use std::time::Duration;
    ///
    /// let policy = RetryPolicy::new(5, Duration::from_millis(100), Duration::from_millis(350));
    /// assert_eq!(policy.delay_for_attempt(0), Duration::ZERO);
    /// assert_eq!(policy.delay_for_attempt(1), Duration::from_millis(100));
    /// assert_eq!(policy.delay_for_attempt(2), Duration::from_millis(200));
    /// assert_eq!(policy.delay_for_attempt(3), Duration::from_millis(350));
    /// ```
    #[must_use]
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }
        let exponential = 2_u32
            .checked_pow(attempt - 1)
            .and_then(|factor| self.base_delay.checked_mul(factor))
            .unwrap_or(self.max_delay);
        min(exponential, self.max_delay)
    }

    /// Run `operation` until it succeeds, fails with a non-retryable error,
    /// or the retry budget is spent.
    ///
    /// The operation receives the zero-based attempt number.
    ///
    /// # Errors
    ///
    /// Returns the last error produced by `operation`.
    pub fn run<T, E: fmt::Display>(
        &self,
        mut operation: impl FnMut(u32) -> Result<T, E>,
        is_retryable: impl Fn(&E) -> bool,
    ) -> Result<T, E> {
        let mut attempt = 0;
        loop {
            match operation(attempt) {
                Ok(value) => return Ok(value),
                Err(err) if attempt < self.max_retries && is_retryable(&err) => {
                    attempt += 1;
                    let delay = self.delay_for_attempt(attempt);
                    debug!("attempt {attempt} failed: {err}; retrying in {delay:?}");
                    thread::sleep(delay);
                }
                Err(err) => return Err(err),
            }
        }
    }
}
