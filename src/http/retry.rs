use reqwest::StatusCode;
use std::time::Duration;

pub const RETRYABLE_STATUSES: [u16; 5] = [429, 500, 502, 503, 504];

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_backoff: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_retries: u32, base_backoff: Duration) -> Self {
        Self {
            max_retries,
            base_backoff,
        }
    }

    pub fn total_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 1u32.checked_shl(attempt).unwrap_or(u32::MAX);
        self.base_backoff.saturating_mul(factor)
    }

    pub fn is_retryable_status(status: StatusCode) -> bool {
        RETRYABLE_STATUSES.contains(&status.as_u16())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_total_attempts_saturates() {
        let policy = RetryPolicy::new(u32::MAX, Duration::from_millis(1));
        assert_eq!(policy.total_attempts(), u32::MAX);
        assert_eq!(RetryPolicy::new(0, Duration::ZERO).total_attempts(), 1);
    }

    #[test]
    fn test_backoff_doubles_each_attempt() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.backoff(0), Duration::from_secs(1));
        assert_eq!(policy.backoff(1), Duration::from_secs(2));
        assert_eq!(policy.backoff(2), Duration::from_secs(4));
        assert_eq!(policy.backoff(3), Duration::from_secs(8));
    }

    #[test]
    fn test_backoff_saturates() {
        let policy = RetryPolicy::new(64, Duration::from_secs(1));
        assert!(policy.backoff(40) >= policy.backoff(31));
    }

    #[test]
    fn test_retryable_statuses() {
        for code in RETRYABLE_STATUSES {
            assert!(RetryPolicy::is_retryable_status(StatusCode::from_u16(code).unwrap()));
        }
        assert!(!RetryPolicy::is_retryable_status(StatusCode::OK));
        assert!(!RetryPolicy::is_retryable_status(StatusCode::NOT_FOUND));
        assert!(!RetryPolicy::is_retryable_status(StatusCode::FORBIDDEN));
    }

    #[test]
    fn test_total_attempts() {
        assert_eq!(RetryPolicy::new(2, Duration::ZERO).total_attempts(), 3);
    }
}
