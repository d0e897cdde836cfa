use std::sync::OnceLock;
use std::time::Duration;

use regex::Regex;

/// Bounded-backoff policy for the non-streaming relay fetches.
///
/// Streaming requests are never retried here; a broken stream surfaces to
/// the caller instead.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Retries allowed after the initial attempt.
    pub max_retries: u32,
    /// Delay before the first retry; doubles per attempt.
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(500),
        }
    }
}

impl RetryPolicy {
    /// Whether the attempt that just failed should be retried.
    ///
    /// A missing status means the connection itself failed, which is always
    /// worth retrying within the budget. Otherwise retry on transient
    /// statuses, or when the relay's error text says the instance is not
    /// ready to serve yet.
    pub fn should_retry(&self, attempt: u32, status: Option<u16>, message: &str) -> bool {
        if attempt >= self.max_retries {
            return false;
        }
        match status {
            None => true,
            Some(code) => {
                matches!(code, 408 | 429 | 500 | 502 | 503 | 504) || instance_not_ready(message)
            }
        }
    }

    /// Backoff delay for a retry, doubling per attempt.
    pub fn delay(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(1u32 << attempt.min(16))
    }
}

/// Relay error texts that mean "come back shortly" rather than "give up":
/// an instance mid-provision or mid-restart, or a frame the renderer has
/// not produced yet.
fn instance_not_ready(message: &str) -> bool {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN
        .get_or_init(|| {
            Regex::new(
                r"(?i)instance is (starting|provisioning|restarting)|frame not ready|temporarily unavailable",
            )
            .expect("transient error pattern compiles")
        })
        .is_match(message)
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::RetryPolicy;

    #[test]
    fn transient_statuses_are_retried_within_budget() {
        let policy = RetryPolicy::default();
        assert!(policy.should_retry(0, Some(503), ""));
        assert!(policy.should_retry(2, Some(429), ""));
        assert!(!policy.should_retry(0, Some(404), "not found"));
        assert!(!policy.should_retry(0, Some(401), "unauthorized"));
    }

    #[test]
    fn connection_failures_are_always_retried_within_budget() {
        let policy = RetryPolicy::default();
        assert!(policy.should_retry(0, None, ""));
        assert!(!policy.should_retry(3, None, ""));
    }

    #[test]
    fn not_ready_error_text_is_retried_regardless_of_status() {
        let policy = RetryPolicy::default();
        assert!(policy.should_retry(0, Some(409), "instance is starting"));
        assert!(policy.should_retry(0, Some(400), "Frame Not Ready"));
        assert!(!policy.should_retry(0, Some(409), "instance not found"));
    }

    #[test]
    fn budget_caps_every_retry_reason() {
        let policy = RetryPolicy::default();
        assert!(!policy.should_retry(3, Some(503), ""));
        assert!(!policy.should_retry(3, Some(409), "instance is starting"));
    }

    #[test]
    fn backoff_doubles_per_attempt() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay(0), Duration::from_millis(500));
        assert_eq!(policy.delay(1), Duration::from_millis(1000));
        assert_eq!(policy.delay(2), Duration::from_millis(2000));
    }
}
