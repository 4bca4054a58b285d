//! Retry policy with exponential backoff
use std::future::Future;
use std::time::Duration;
use tracing::warn;

use crate::error::Result;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Attempts made after the first failure
    pub retries: u32,
    /// Delay before the first retry, doubled for each one after
    pub base_delay: Duration,
    /// Maximum delay between attempts
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            retries: 3,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    pub fn new(retries: u32) -> Self {
        Self {
            retries,
            ..Default::default()
        }
    }

    /// Single attempt, used by mutations
    pub fn none() -> Self {
        Self::new(0)
    }

    /// Delay after `failure_count` failures (zero-based): `min(base * 2^n, max)`
    pub fn delay_for(&self, failure_count: u32) -> Duration {
        let factor = 2u32.saturating_pow(failure_count);
        self.base_delay
            .checked_mul(factor)
            .map_or(self.max_delay, |d| d.min(self.max_delay))
    }
}

/// Run `f` until it succeeds or the policy's retries are used up.
///
/// The error of the final attempt is returned unchanged.
pub async fn with_retry<F, Fut, T>(policy: &RetryPolicy, label: &str, mut f: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut failures = 0;

    loop {
        match f().await {
            Ok(result) => return Ok(result),
            Err(e) => {
                if failures >= policy.retries {
                    if policy.retries > 0 {
                        warn!("{}: giving up after {} retries: {}", label, policy.retries, e);
                    }
                    return Err(e);
                }

                let delay = policy.delay_for(failures);
                failures += 1;

                warn!(
                    "{}: retry {}/{} in {:?} ({})",
                    label, failures, policy.retries, delay, e
                );

                tokio::time::sleep(delay).await;
            }
        }
    }
}
