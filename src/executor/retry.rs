use log::{debug, warn};
use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

/// Outcome of a [`RetryPolicy::run`] that did not succeed.
#[derive(Debug, Clone, PartialEq)]
pub enum RetryError<E> {
    /// Every attempt failed with a retryable error.
    Exhausted { attempts: u32, last: E },
    /// An attempt failed with an error that is not worth retrying.
    Fatal(E),
}

/// Bounded retry with exponential backoff.
///
/// Attempt `n` (1-based) that fails with a retryable error is followed by a
/// delay of `base_delay * multiplier^(n - 1)` before attempt `n + 1`, up to
/// `max_attempts` attempts in total.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    max_attempts: u32,
    base_delay: Duration,
    multiplier: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_secs(1))
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
            multiplier: 2,
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Delay after the failed attempt with 0-based index `retry`.
    pub fn backoff(&self, retry: u32) -> Duration {
        self.base_delay
            .saturating_mul(self.multiplier.saturating_pow(retry))
    }

    /// Sum of all delays when every attempt fails.
    pub fn total_backoff(&self) -> Duration {
        (0..self.max_attempts - 1).map(|retry| self.backoff(retry)).sum()
    }

    /// Longest a full retry sequence can take when each attempt is cut off
    /// after `attempt_timeout`.
    pub fn worst_case(&self, attempt_timeout: Duration) -> Duration {
        attempt_timeout
            .saturating_mul(self.max_attempts)
            .saturating_add(self.total_backoff())
    }

    /// Runs `operation` until it succeeds, fails with an error for which
    /// `is_retryable` is false, or runs out of attempts. The operation is
    /// passed the 1-based attempt number.
    pub async fn run<T, E, F, Fut, P>(
        &self,
        mut operation: F,
        is_retryable: P,
    ) -> Result<T, RetryError<E>>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        P: Fn(&E) -> bool,
        E: Display,
    {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match operation(attempt).await {
                Ok(value) => {
                    if attempt > 1 {
                        debug!("Succeeded on attempt {}/{}", attempt, self.max_attempts);
                    }
                    return Ok(value);
                }
                Err(e) if !is_retryable(&e) => return Err(RetryError::Fatal(e)),
                Err(e) if attempt >= self.max_attempts => {
                    return Err(RetryError::Exhausted { attempts: attempt, last: e })
                }
                Err(e) => {
                    let delay = self.backoff(attempt - 1);
                    warn!(
                        "Attempt {}/{} failed: {}. Retrying in {:?}",
                        attempt, self.max_attempts, e, delay
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }
}
