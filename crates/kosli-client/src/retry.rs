// crates/kosli-client/src/retry.rs
// ============================================================================
// Module: Kosli Retry Policy
// Description: Bounded retry with capped exponential backoff.
// Purpose: Replay idempotent requests on server-side and rate-limit failures.
// Dependencies: crate::error
// ============================================================================

//! ## Overview
//! The retry policy only replays idempotent requests, and only when the API
//! answered 5xx or 429. Client errors (4xx) and transport failures surface
//! immediately. Backoff doubles from `wait_min` per attempt and never exceeds
//! `wait_max`; a `Retry-After` hint from the server is honoured within the
//! same cap.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::time::Duration;

use crate::error::ClientError;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default number of retries after the first attempt.
pub const DEFAULT_RETRY_MAX: u32 = 3;
/// Default minimum backoff.
pub const DEFAULT_RETRY_WAIT_MIN: Duration = Duration::from_secs(1);
/// Default maximum backoff.
pub const DEFAULT_RETRY_WAIT_MAX: Duration = Duration::from_secs(30);

// ============================================================================
// SECTION: Policy
// ============================================================================

/// Retry configuration for the HTTP transport.
///
/// # Invariants
/// - `wait_min <= wait_max` and both are non-zero (enforced by [`RetryPolicy::new`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Maximum number of retries after the first attempt.
    max_retries: u32,
    /// Initial backoff.
    wait_min: Duration,
    /// Backoff cap.
    wait_max: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_RETRY_MAX,
            wait_min: DEFAULT_RETRY_WAIT_MIN,
            wait_max: DEFAULT_RETRY_WAIT_MAX,
        }
    }
}

impl RetryPolicy {
    /// Creates a validated retry policy.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Config`] when the wait window is empty or inverted.
    pub fn new(max_retries: u32, wait_min: Duration, wait_max: Duration) -> Result<Self, ClientError> {
        if wait_min.is_zero() {
            return Err(ClientError::Config("retry wait min must be > 0".to_string()));
        }
        if wait_max.is_zero() {
            return Err(ClientError::Config("retry wait max must be > 0".to_string()));
        }
        if wait_min > wait_max {
            return Err(ClientError::Config(
                "retry wait min must be <= retry wait max".to_string(),
            ));
        }
        Ok(Self {
            max_retries,
            wait_min,
            wait_max,
        })
    }

    /// Returns a policy that never retries.
    #[must_use]
    pub const fn disabled() -> Self {
        Self {
            max_retries: 0,
            wait_min: DEFAULT_RETRY_WAIT_MIN,
            wait_max: DEFAULT_RETRY_WAIT_MAX,
        }
    }

    /// Returns the maximum number of retries.
    #[must_use]
    pub const fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Decides whether a failed attempt should be replayed.
    ///
    /// `attempt` is zero-based: `0` is the first try.
    #[must_use]
    pub fn should_retry(&self, attempt: u32, idempotent: bool, error: &ClientError) -> bool {
        if !idempotent || attempt >= self.max_retries {
            return false;
        }
        error.api().is_some_and(|api| api.kind().is_retryable())
    }

    /// Computes the wait before retry number `attempt + 1`.
    #[must_use]
    pub fn backoff(&self, attempt: u32, retry_after: Option<Duration>) -> Duration {
        if let Some(hint) = retry_after {
            return hint.clamp(self.wait_min, self.wait_max);
        }
        let factor = 2_u32.saturating_pow(attempt);
        self.wait_min.saturating_mul(factor).min(self.wait_max)
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, reason = "Test-only assertions are permitted.")]

    use super::*;
    use crate::error::ApiError;

    fn api_error(status: u16) -> ClientError {
        ClientError::Api(ApiError::from_response(status, b"", None, "GET", "http://test"))
    }

    #[test]
    fn backoff_doubles_and_caps() {
        let policy =
            RetryPolicy::new(5, Duration::from_secs(1), Duration::from_secs(30)).unwrap();
        assert_eq!(policy.backoff(0, None), Duration::from_secs(1));
        assert_eq!(policy.backoff(1, None), Duration::from_secs(2));
        assert_eq!(policy.backoff(2, None), Duration::from_secs(4));
        assert_eq!(policy.backoff(10, None), Duration::from_secs(30));
        assert_eq!(policy.backoff(40, None), Duration::from_secs(30));
    }

    #[test]
    fn retry_after_hint_is_clamped() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.backoff(0, Some(Duration::from_secs(7))), Duration::from_secs(7));
        assert_eq!(policy.backoff(0, Some(Duration::from_secs(600))), Duration::from_secs(30));
        assert_eq!(policy.backoff(0, Some(Duration::ZERO)), Duration::from_secs(1));
    }

    #[test]
    fn only_server_and_rate_limit_errors_retry() {
        let policy = RetryPolicy::default();
        assert!(policy.should_retry(0, true, &api_error(503)));
        assert!(policy.should_retry(0, true, &api_error(429)));
        assert!(!policy.should_retry(0, true, &api_error(400)));
        assert!(!policy.should_retry(0, true, &api_error(404)));
        assert!(!policy.should_retry(0, true, &ClientError::Network("reset".to_string())));
    }

    #[test]
    fn non_idempotent_and_exhausted_requests_do_not_retry() {
        let policy = RetryPolicy::default();
        assert!(!policy.should_retry(0, false, &api_error(503)));
        assert!(!policy.should_retry(3, true, &api_error(503)));
        assert!(!RetryPolicy::disabled().should_retry(0, true, &api_error(503)));
    }

    #[test]
    fn inverted_window_is_rejected() {
        let result = RetryPolicy::new(1, Duration::from_secs(5), Duration::from_secs(1));
        assert!(matches!(result, Err(ClientError::Config(_))));
    }
}
