use moka::future::Cache;
use moka::ops::compute::{CompResult, Op};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, warn};

use super::key::QueryKey;
use super::retry::{with_retry, RetryPolicy};
use super::{QueryDefaults, QueryOptions};
use crate::error::Result;
use crate::trace_cache;

#[derive(Debug, Clone)]
struct CachedQuery {
    key: QueryKey,
    data: Value,
    /// Bumped on every write, so a waiting fetch can tell someone else
    /// already refreshed the entry
    version: u64,
    updated_at: Instant,
    invalidated: bool,
}

impl CachedQuery {
    fn is_fresh(&self, stale_time: Duration) -> bool {
        !self.invalidated && self.updated_at.elapsed() < stale_time
    }
}

/// Options after hook and client defaults have been applied
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedOptions {
    pub stale_time: Duration,
    pub retry: RetryPolicy,
    pub enabled: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheStats {
    pub total_queries: u64,
}

/// Shared response cache.
///
/// Clones share the same store. Entries nobody reads for `gc_time` are
/// dropped.
#[derive(Clone)]
pub struct QueryClient {
    cache: Cache<String, CachedQuery>,
    defaults: QueryDefaults,
    versions: Arc<AtomicU64>,
}

impl Default for QueryClient {
    fn default() -> Self {
        Self::new()
    }
}

impl QueryClient {
    pub fn new() -> Self {
        Self::with_defaults(QueryDefaults::default())
    }

    pub fn with_defaults(defaults: QueryDefaults) -> Self {
        let cache = Cache::builder().time_to_idle(defaults.gc_time).build();
        Self {
            cache,
            defaults,
            versions: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn defaults(&self) -> &QueryDefaults {
        &self.defaults
    }

    pub fn resolve(&self, options: &QueryOptions) -> ResolvedOptions {
        let mut retry = RetryPolicy::new(options.retry.unwrap_or(self.defaults.retry));
        retry.max_delay = self.defaults.max_retry_delay;
        if let Some(base) = options.retry_delay {
            retry.base_delay = base;
        }

        ResolvedOptions {
            stale_time: options.stale_time.unwrap_or(self.defaults.stale_time),
            retry,
            enabled: options.enabled.unwrap_or(true),
        }
    }

    fn stamp(&self, key: &QueryKey, data: Value) -> CachedQuery {
        CachedQuery {
            key: key.clone(),
            data,
            version: self.versions.fetch_add(1, Ordering::Relaxed) + 1,
            updated_at: Instant::now(),
            invalidated: false,
        }
    }

    /// Return fresh cached data for `key`, or fetch, store and return it.
    ///
    /// A disabled query only reads the cache and yields `None` when nothing is
    /// stored. Concurrent fetches of the same key share one request. Stale
    /// data stays readable while the refetch runs, and stays cached if the
    /// refetch fails.
    pub async fn fetch_query<T, F, Fut>(
        &self,
        key: &QueryKey,
        options: QueryOptions,
        fetcher: F,
    ) -> Result<Option<T>>
    where
        T: Serialize + DeserializeOwned,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let resolved = self.resolve(&options);
        let slot = key.hash();
        let cached = self.cache.get(&slot).await;

        if !resolved.enabled {
            trace_cache!("disabled", key);
            return cached.map(|entry| decode(&entry.data)).transpose();
        }

        match &cached {
            Some(entry) if entry.is_fresh(resolved.stale_time) => {
                trace_cache!("hit", key);
                return decode(&entry.data).map(Some);
            }
            Some(_) => {
                trace_cache!("stale", key);
            }
            None => {
                trace_cache!("miss", key);
            }
        }

        let seen = cached.map(|entry| entry.version);
        let retry = &resolved.retry;
        let outcome = self
            .cache
            .entry(slot)
            .and_try_compute_with(|current| {
                let current = current.map(|entry| entry.into_value());
                self.refresh(key, current, seen, retry, fetcher)
            })
            .await?;

        match outcome {
            CompResult::Inserted(entry)
            | CompResult::ReplacedWith(entry)
            | CompResult::Unchanged(entry) => decode(&entry.into_value().data).map(Some),
            CompResult::Removed(_) | CompResult::StillNone(_) => Ok(None),
        }
    }

    /// Runs with the entry locked. Skips the request when another caller
    /// stored new data while this one was waiting for the lock.
    async fn refresh<T, F, Fut>(
        &self,
        key: &QueryKey,
        current: Option<CachedQuery>,
        seen: Option<u64>,
        retry: &RetryPolicy,
        fetcher: F,
    ) -> Result<Op<CachedQuery>>
    where
        T: Serialize,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        if let Some(entry) = current {
            if Some(entry.version) != seen && !entry.invalidated {
                trace_cache!("shared", key);
                return Ok(Op::Nop);
            }
        }

        let data = with_retry(retry, &key.to_string(), fetcher).await?;
        debug!(target: "query", "Fetched {}", key);
        Ok(Op::Put(self.stamp(key, serde_json::to_value(&data)?)))
    }

    /// Whether `key` holds data younger than `stale_time`
    pub async fn is_fresh(&self, key: &QueryKey, stale_time: Duration) -> bool {
        self.cache
            .get(&key.hash())
            .await
            .is_some_and(|entry| entry.is_fresh(stale_time))
    }

    /// Cached data for `key`, if present and decodable as `T`
    pub async fn get_query_data<T: DeserializeOwned>(&self, key: &QueryKey) -> Option<T> {
        let entry = self.cache.get(&key.hash()).await?;
        match decode(&entry.data) {
            Ok(data) => Some(data),
            Err(e) => {
                warn!(target: "query", "Cached data for {} has a different shape: {}", key, e);
                None
            }
        }
    }

    pub async fn set_query_data<T: Serialize>(&self, key: &QueryKey, data: &T) -> Result<()> {
        let value = serde_json::to_value(data)?;
        self.cache.insert(key.hash(), self.stamp(key, value)).await;
        trace_cache!("set", key);
        Ok(())
    }

    /// Replace the data under `key` but keep its age and any pending
    /// invalidation. A key with no entry yet is stored as fresh.
    pub async fn update_query_data<T: Serialize>(&self, key: &QueryKey, data: &T) -> Result<()> {
        let value = serde_json::to_value(data)?;
        let slot = key.hash();
        let entry = match self.cache.get(&slot).await {
            Some(mut existing) => {
                existing.data = value;
                existing
            }
            None => self.stamp(key, value),
        };
        self.cache.insert(slot, entry).await;
        trace_cache!("update", key);
        Ok(())
    }

    /// Mark every entry under `prefix` stale so the next read refetches.
    /// Returns how many entries were marked.
    pub async fn invalidate_queries(&self, prefix: &QueryKey) -> usize {
        let matching: Vec<(String, CachedQuery)> = self
            .cache
            .iter()
            .filter(|(_, entry)| entry.key.starts_with(prefix))
            .map(|(slot, entry)| (slot.as_ref().clone(), entry))
            .collect();

        let count = matching.len();
        for (slot, mut entry) in matching {
            entry.invalidated = true;
            self.cache.insert(slot, entry).await;
        }
        debug!(target: "query", "Invalidated {} queries under {}", count, prefix);
        count
    }

    /// Drop every entry under `prefix`. Returns how many were removed.
    pub async fn remove_queries(&self, prefix: &QueryKey) -> usize {
        let matching: Vec<String> = self
            .cache
            .iter()
            .filter(|(_, entry)| entry.key.starts_with(prefix))
            .map(|(slot, _)| slot.as_ref().clone())
            .collect();

        let count = matching.len();
        for slot in matching {
            self.cache.invalidate(&slot).await;
        }
        debug!(target: "query", "Removed {} queries under {}", count, prefix);
        count
    }

    pub async fn clear(&self) {
        self.cache.invalidate_all();
        self.cache.run_pending_tasks().await;
    }

    pub async fn stats(&self) -> CacheStats {
        self.cache.run_pending_tasks().await;
        CacheStats {
            total_queries: self.cache.entry_count(),
        }
    }
}

fn decode<T: DeserializeOwned>(data: &Value) -> Result<T> {
    Ok(serde_json::from_value(data.clone())?)
}
