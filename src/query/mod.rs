//! Query layer
//!
//! Cached reads keyed by [`QueryKey`], uncached writes ([`Mutation`]) and
//! paginated reads ([`InfiniteQuery`]).

pub mod client;
pub mod infinite;
pub mod key;
pub mod mutation;
pub mod retry;

use std::time::Duration;

pub use client::QueryClient;
pub use infinite::{next_page_after, InfiniteData, InfiniteQuery};
pub use key::QueryKey;
pub use mutation::{Mutation, MutationStatus};
pub use retry::{with_retry, RetryPolicy};

/// Client-wide fallbacks for options a query leaves unset
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryDefaults {
    pub stale_time: Duration,
    pub gc_time: Duration,
    pub retry: u32,
    pub max_retry_delay: Duration,
}

impl Default for QueryDefaults {
    fn default() -> Self {
        Self {
            stale_time: Duration::ZERO,
            gc_time: Duration::from_secs(5 * 60),
            retry: 3,
            max_retry_delay: Duration::from_secs(30),
        }
    }
}

/// Per-query overrides. Unset fields fall back to the hook's choice, then to
/// the client defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryOptions {
    pub stale_time: Option<Duration>,
    pub retry: Option<u32>,
    pub retry_delay: Option<Duration>,
    pub enabled: Option<bool>,
}

impl QueryOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stale_time(mut self, stale_time: Duration) -> Self {
        self.stale_time = Some(stale_time);
        self
    }

    pub fn retry(mut self, retry: u32) -> Self {
        self.retry = Some(retry);
        self
    }

    /// Delay before the first retry; later retries double it
    pub fn retry_delay(mut self, retry_delay: Duration) -> Self {
        self.retry_delay = Some(retry_delay);
        self
    }

    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = Some(enabled);
        self
    }

    /// Lay `overrides` on top of `self`; fields set in `overrides` win
    pub fn merge(self, overrides: Option<QueryOptions>) -> Self {
        let Some(o) = overrides else {
            return self;
        };
        Self {
            stale_time: o.stale_time.or(self.stale_time),
            retry: o.retry.or(self.retry),
            retry_delay: o.retry_delay.or(self.retry_delay),
            enabled: o.enabled.or(self.enabled),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_caller_options_override_hook_defaults() {
        let hook = QueryOptions::new()
            .stale_time(Duration::from_secs(5))
            .retry(2);
        let merged = hook.merge(Some(QueryOptions::new().retry(0).enabled(false)));

        assert_eq!(merged.stale_time, Some(Duration::from_secs(5)));
        assert_eq!(merged.retry, Some(0));
        assert_eq!(merged.enabled, Some(false));
    }

    #[test]
    fn test_merge_without_overrides_is_identity() {
        let hook = QueryOptions::new().retry(2);
        assert_eq!(hook.clone().merge(None), hook);
    }
}
