//! Retry logic.
//!
//! # Responsibilities
//! - Decide whether a failed upstream call is worth repeating
//! - Carry the attempt and backoff settings for one upstream
//!
//! # Design Decisions
//! - Connection errors and timeouts are always retryable
//! - Only gateway-style 5xx (502, 503, 504) are retried; a 500 is the
//!   upstream's answer, not a transient fault

use std::time::Duration;

use axum::http::StatusCode;

use crate::config::RenderConfig;
use crate::resilience::backoff::calculate_backoff;

/// Whether a failure (an HTTP status, or a connection-level error) is transient.
pub fn is_retryable(status: Option<StatusCode>, connection_error: bool) -> bool {
    if connection_error {
        return true;
    }

    matches!(
        status,
        Some(StatusCode::BAD_GATEWAY | StatusCode::SERVICE_UNAVAILABLE | StatusCode::GATEWAY_TIMEOUT)
    )
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Attempts including the first; at least 1.
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl RetryPolicy {
    /// Whether another attempt follows attempt number `attempt` (1-based).
    pub fn should_retry(&self, attempt: u32) -> bool {
        attempt < self.max_attempts
    }

    pub fn delay(&self, attempt: u32) -> Duration {
        calculate_backoff(attempt, self.base_delay_ms, self.max_delay_ms)
    }
}

impl From<&RenderConfig> for RetryPolicy {
    fn from(config: &RenderConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            base_delay_ms: config.base_delay_ms,
            max_delay_ms: config.max_delay_ms,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_failures() {
        assert!(is_retryable(None, true));
        assert!(is_retryable(Some(StatusCode::SERVICE_UNAVAILABLE), false));
        assert!(is_retryable(Some(StatusCode::GATEWAY_TIMEOUT), false));

        assert!(!is_retryable(Some(StatusCode::INTERNAL_SERVER_ERROR), false));
        assert!(!is_retryable(Some(StatusCode::NOT_FOUND), false));
        assert!(!is_retryable(None, false));
    }

    #[test]
    fn test_policy_from_config() {
        let policy = RetryPolicy::from(&RenderConfig {
            max_attempts: 0,
            ..RenderConfig::default()
        });
        assert_eq!(policy.max_attempts, 1);
        assert!(!policy.should_retry(1));

        let policy = RetryPolicy::from(&RenderConfig::default());
        assert!(policy.should_retry(2));
        assert!(!policy.should_retry(3));
    }
}
