//! Fixed-delay retry policy with an operator-visible countdown
//!
//! The policy itself is a pure transition function so the retry
//! behavior is testable without sleeping; `FixedBackoff` owns the
//! sleep side effect and the attempt counter.

use std::time::Duration;
use tokio::time::sleep;

#[derive(Debug)]
pub struct MaxRetriesExceeded;

impl std::fmt::Display for MaxRetriesExceeded {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "max retries exceeded")
    }
}

impl std::error::Error for MaxRetriesExceeded {}

/// What to do after a failed attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Wait out the delay, then attempt again (attempt is 1-based)
    Wait { attempt: u32, delay: Duration },
    /// Attempts exhausted, the caller must treat the failure as fatal
    GiveUp,
}

/// Fixed-delay retry policy: up to `max_retries` attempts, each
/// preceded by the same cool-down wait.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_retries: u32, delay_secs: u64) -> Self {
        Self {
            max_retries,
            delay: Duration::from_secs(delay_secs),
        }
    }

    /// Decide the next step given the number of consecutive failures so far
    pub fn after_failure(&self, failures: u32) -> RetryDecision {
        if failures >= self.max_retries {
            RetryDecision::GiveUp
        } else {
            RetryDecision::Wait {
                attempt: failures,
                delay: self.delay,
            }
        }
    }
}

/// Stateful retry driver: counts consecutive failures and sleeps
/// between attempts. Counters are local to one driver instance, so a
/// fresh fetch (or push) always starts from zero.
#[derive(Debug)]
pub struct FixedBackoff {
    policy: RetryPolicy,
    failures: u32,
}

impl FixedBackoff {
    pub fn new(policy: RetryPolicy) -> Self {
        Self {
            policy,
            failures: 0,
        }
    }

    /// Register a failure and wait out the retry delay.
    ///
    /// Ticks once per second so the log line doubles as a live
    /// countdown for the operator. Returns `Err(MaxRetriesExceeded)`
    /// once all attempts are used up.
    pub async fn sleep(&mut self) -> Result<(), MaxRetriesExceeded> {
        self.failures += 1;

        match self.policy.after_failure(self.failures) {
            RetryDecision::GiveUp => Err(MaxRetriesExceeded),
            RetryDecision::Wait { attempt, delay } => {
                log::warn!(
                    "⏳ {:02}/{:02}: retrying in {}s",
                    attempt,
                    self.policy.max_retries,
                    delay.as_secs()
                );

                let mut remaining = delay.as_secs();
                while remaining > 0 {
                    sleep(Duration::from_secs(1)).await;
                    remaining -= 1;
                    if remaining > 0 && remaining % 2 == 0 {
                        log::debug!("   └─ {}s", remaining);
                    }
                }

                Ok(())
            }
        }
    }

    pub fn reset(&mut self) {
        self.failures = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_policy_waits_until_exhausted() {
        // Test: 10 attempts means 9 waits, then GiveUp
        let policy = RetryPolicy::new(10, 6);

        for failures in 1..10 {
            match policy.after_failure(failures) {
                RetryDecision::Wait { attempt, delay } => {
                    assert_eq!(attempt, failures);
                    assert_eq!(delay, Duration::from_secs(6));
                }
                RetryDecision::GiveUp => panic!("gave up at {} failures", failures),
            }
        }

        assert_eq!(policy.after_failure(10), RetryDecision::GiveUp);
        assert_eq!(policy.after_failure(11), RetryDecision::GiveUp);
    }

    #[tokio::test]
    async fn test_backoff_counts_and_resets() {
        // Zero delay keeps the test instant; the counting logic is the same
        let mut backoff = FixedBackoff::new(RetryPolicy::new(3, 0));

        assert!(backoff.sleep().await.is_ok());
        assert!(backoff.sleep().await.is_ok());
        assert!(backoff.sleep().await.is_err());

        // A reset starts the counter over
        backoff.reset();
        assert!(backoff.sleep().await.is_ok());
    }
}
