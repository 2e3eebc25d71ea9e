//! Fixed-delay retry policy for transient fetch failures.
//!
//! Failures are classified into a [`FailureType`]:
//! - [`FailureType::Transient`] - connection failures, timeouts and connections
//!   dropped mid-body; trying again may help
//! - [`FailureType::Permanent`] - everything else, including HTTP error statuses
//!   and disguised error pages: the server answered and was unhappy
//!
//! The [`RetryPolicy`] retries transient failures a bounded number of times with
//! the same delay between attempts.

use std::time::Duration;

use tracing::debug;

use super::FetchError;

/// Default maximum attempts per request (including the first).
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

/// Default delay between attempts.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(1);

/// Classification of fetch failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureType {
    /// Connection-level failure that may succeed on retry.
    Transient,

    /// Failure that retrying will not fix.
    Permanent,
}

/// Decision on whether to retry a failed request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryDecision {
    /// Retry after the specified delay.
    Retry {
        /// How long to wait before retrying.
        delay: Duration,
        /// The attempt number about to be made (1-indexed).
        attempt: u32,
    },

    /// Do not retry.
    DoNotRetry {
        /// Human-readable reason why retry is not attempted.
        reason: String,
    },
}

/// Bounded, fixed-delay retry configuration.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum number of attempts (including the initial attempt).
    max_attempts: u32,

    /// Delay between consecutive attempts.
    delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            delay: DEFAULT_RETRY_DELAY,
        }
    }
}

impl RetryPolicy {
    /// Creates a policy; `max_attempts` is clamped to at least 1.
    #[must_use]
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
        }
    }

    /// Returns the maximum number of attempts configured.
    #[must_use]
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Returns the delay between attempts.
    #[must_use]
    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Determines whether to retry after `attempt` (1-indexed) failed.
    #[must_use]
    pub fn should_retry(&self, failure_type: FailureType, attempt: u32) -> RetryDecision {
        if failure_type == FailureType::Permanent {
            return RetryDecision::DoNotRetry {
                reason: "permanent failure - retry would not help".to_string(),
            };
        }

        if attempt >= self.max_attempts {
            debug!(attempt, max = self.max_attempts, "max attempts reached");
            return RetryDecision::DoNotRetry {
                reason: format!("max attempts ({}) exhausted", self.max_attempts),
            };
        }

        RetryDecision::Retry {
            delay: self.delay,
            attempt: attempt + 1,
        }
    }
}

/// Classifies a fetch error for retry decisions.
///
/// | Error | Type |
/// |-------|------|
/// | Connect | Transient |
/// | Timeout | Transient |
/// | Body (connection lost mid-body) | Transient |
/// | Network (other transport) | Permanent |
/// | HttpStatus | Permanent |
/// | DisguisedFailure | Permanent |
/// | InvalidUrl, ClientBuild, RetriesExhausted | Permanent |
#[must_use]
pub fn classify_error(error: &FetchError) -> FailureType {
    match error {
        FetchError::Connect { .. } | FetchError::Timeout { .. } | FetchError::Body { .. } => {
            FailureType::Transient
        }
        FetchError::Network { .. }
        | FetchError::RetriesExhausted { .. }
        | FetchError::HttpStatus { .. }
        | FetchError::DisguisedFailure { .. }
        | FetchError::InvalidUrl { .. }
        | FetchError::ClientBuild { .. } => FailureType::Permanent,
    }
}
