//! Bounded retry of optimistic commits
//!
//! A `WriteConflict` means another request committed to the same user row
//! between our read and our commit. Nothing was written, so the whole
//! read-validate-commit attempt is simply run again after a short, capped
//! exponential backoff. Business-rule errors are never retried.

use crate::types::{BookstoreError, UserId};
use std::thread;
use std::time::Duration;

/// Retry configuration for engine transactions
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Retries after the first attempt (0 disables retrying)
    pub max_retries: u32,

    /// Delay before the first retry
    pub initial_backoff: Duration,

    /// Upper bound for any single delay
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 5,
            initial_backoff: Duration::from_millis(1),
            max_backoff: Duration::from_millis(50),
        }
    }
}

impl RetryPolicy {
    /// Create a policy with the default backoff curve
    pub fn with_max_retries(max_retries: u32) -> Self {
        Self {
            max_retries,
            ..Self::default()
        }
    }

    /// Delay before retry number `retry` (0-based): initial * 2^retry, capped
    pub fn backoff(&self, retry: u32) -> Duration {
        let multiplier = 2u32.saturating_pow(retry);
        self.initial_backoff
            .saturating_mul(multiplier)
            .min(self.max_backoff)
    }

    /// Run a transaction attempt until it stops conflicting
    ///
    /// # Arguments
    ///
    /// * `operation` - Name used in logs and in the transient failure
    /// * `user` - The user whose row the attempt commits to
    /// * `attempt` - One complete read-validate-commit attempt
    ///
    /// # Errors
    ///
    /// Returns `TransientFailure` once `max_retries` retries all conflicted;
    /// any other error from `attempt` is returned unchanged.
    pub fn run<T, F>(&self, operation: &str, user: UserId, mut attempt: F) -> Result<T, BookstoreError>
    where
        F: FnMut() -> Result<T, BookstoreError>,
    {
        let mut attempts = 0;
        loop {
            attempts += 1;
            match attempt() {
                Err(BookstoreError::WriteConflict { found, .. }) if attempts <= self.max_retries => {
                    let delay = self.backoff(attempts - 1);
                    tracing::debug!(
                        operation,
                        user,
                        attempt = attempts,
                        found_version = found,
                        delay_us = delay.as_micros() as u64,
                        "Write conflict, retrying"
                    );
                    thread::sleep(delay);
                }
                Err(BookstoreError::WriteConflict { .. }) => {
                    tracing::warn!(operation, user, attempts, "Retries exhausted");
                    return Err(BookstoreError::transient_failure(operation, user, attempts));
                }
                other => return other,
            }
        }
    }
}
