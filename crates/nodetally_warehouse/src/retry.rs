//! Bounded fixed-delay retry around a single table fetch.

use std::thread;
use std::time::Duration;

use crate::error::{Error, ErrorRetryStrategy, Result};

/// Attempt budget and fixed delay between attempts. No backoff, no jitter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first one; values below 1 behave as 1.
    pub attempts: u32,
    /// Sleep between consecutive attempts.
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            delay: Duration::from_secs(5),
        }
    }
}

/// Run `op` until it succeeds, fails with a non-retryable error, or the budget is spent.
///
/// `op` receives the 1-based attempt number. Non-retryable errors are returned as-is
/// after a single attempt; exhausting the budget yields [`Error::RetriesExhausted`].
pub fn run_with_retry<T, F>(policy: &RetryPolicy, table: &str, mut op: F) -> Result<T>
where
    F: FnMut(u32) -> Result<T>,
{
    let n_attempts_max = policy.attempts.max(1);
    let mut n_attempt = 0;

    loop {
        n_attempt += 1;
        match op(n_attempt) {
            Ok(value) => {
                if n_attempt > 1 {
                    tracing::info!(table, attempt = n_attempt, "fetch succeeded after retry");
                }
                return Ok(value);
            }
            Err(err) if err.to_retry_strategy() == ErrorRetryStrategy::Fail => {
                tracing::error!(table, attempt = n_attempt, error = %err, "non-retryable fetch error");
                return Err(err);
            }
            Err(err) if n_attempt >= n_attempts_max => {
                return Err(Error::RetriesExhausted {
                    table: table.to_string(),
                    attempts: n_attempt,
                    last: Box::new(err),
                });
            }
            Err(err) => {
                tracing::warn!(
                    table,
                    attempt = n_attempt,
                    delay_secs = policy.delay.as_secs_f64(),
                    error = %err,
                    "fetch attempt failed; retrying"
                );
                if !policy.delay.is_zero() {
                    thread::sleep(policy.delay);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NO_DELAY: RetryPolicy = RetryPolicy {
        attempts: 3,
        delay: Duration::ZERO,
    };

    #[test]
    fn test_zero_attempts_still_tries_once() {
        let policy = RetryPolicy {
            attempts: 0,
            delay: Duration::ZERO,
        };
        let mut n_calls = 0;
        let result: Result<()> = run_with_retry(&policy, "t", |_| {
            n_calls += 1;
            Err(Error::Connection("down".to_string()))
        });
        assert_eq!(n_calls, 1);
        assert!(matches!(result, Err(Error::RetriesExhausted { attempts: 1, .. })));
    }

    #[test]
    fn test_attempt_numbers_are_one_based() {
        let mut l_seen = Vec::new();
        let _: Result<()> = run_with_retry(&NO_DELAY, "t", |n_attempt| {
            l_seen.push(n_attempt);
            Err(Error::Connection("down".to_string()))
        });
        assert_eq!(l_seen, vec![1, 2, 3]);
    }
}
