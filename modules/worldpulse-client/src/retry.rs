//! Retry with exponential backoff around a single request.
//!
//! Attempt `i` (0-based) that fails with attempts remaining is followed by a
//! sleep of `base_backoff * 2^i`. No jitter.

use std::future::Future;
use std::time::Duration;

use tracing::warn;
use worldpulse_common::config::RetrySettings;

use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt; `max_retries + 1` attempts in total.
    pub max_retries: u32,
    pub base_backoff: Duration,
}

impl RetryPolicy {
    pub const fn new(max_retries: u32, base_backoff: Duration) -> Self {
        Self {
            max_retries,
            base_backoff,
        }
    }

    /// A single attempt, no retries.
    pub const fn none() -> Self {
        Self::new(0, Duration::ZERO)
    }

    pub fn backoff_for(&self, attempt: u32) -> Duration {
        self.base_backoff
            .saturating_mul(2u32.saturating_pow(attempt))
    }
}

impl From<RetrySettings> for RetryPolicy {
    fn from(settings: RetrySettings) -> Self {
        Self::new(settings.max_retries, settings.base_backoff())
    }
}

/// Run `attempt_fn` until it succeeds or the policy is exhausted, returning the
/// last error in the latter case.
pub async fn fetch_with_retries<T, F, Fut>(
    operation: &str,
    policy: RetryPolicy,
    mut attempt_fn: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempt = 0u32;
    loop {
        match attempt_fn().await {
            Ok(value) => return Ok(value),
            Err(e) if attempt < policy.max_retries => {
                let backoff = policy.backoff_for(attempt);
                warn!(
                    operation,
                    attempt = attempt + 1,
                    backoff_ms = backoff.as_millis() as u64,
                    error = %e,
                    "Request failed, retrying after backoff"
                );
                tokio::time::sleep(backoff).await;
                attempt += 1;
            }
            Err(e) => {
                warn!(
                    operation,
                    attempts = attempt + 1,
                    error = %e,
                    "Request failed, giving up"
                );
                return Err(e);
            }
        }
    }
}
