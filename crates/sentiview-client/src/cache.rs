//! Request deduplication and response caching.
//!
//! Every request a block makes goes through [`QueryCache::get_or_fetch`]:
//! a response younger than the dedupe window is served from memory, and
//! concurrent callers for the same key share one in-flight request.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use futures::future::{BoxFuture, FutureExt, Shared};
use serde_json::Value;
use sentiview_core::RequestKey;
use tokio::sync::watch;
use tokio::time::Instant;

use crate::error::Error;

/// Outcome shared between every caller of one request.
pub type SharedResult = std::result::Result<Arc<Value>, Arc<Error>>;

type InFlight = Shared<BoxFuture<'static, SharedResult>>;

// ============================================================================
// Options and state
// ============================================================================

/// Per-block request options.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryOptions {
    /// Window in which a cached response is reused without a request.
    pub dedupe_interval: Duration,
    /// Periodic revalidation.
    pub refresh_interval: Option<Duration>,
    /// Revalidate when the window regains focus. No effect outside a browser.
    pub revalidate_on_focus: bool,
    /// Retries for transient failures.
    pub retry_count: usize,
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self {
            dedupe_interval: Duration::from_secs(2),
            refresh_interval: None,
            revalidate_on_focus: false,
            retry_count: 3,
        }
    }
}

impl QueryOptions {
    /// Sets the dedupe window.
    pub fn dedupe(mut self, interval: Duration) -> Self {
        self.dedupe_interval = interval;
        self
    }

    /// Revalidates every `interval`.
    pub fn refresh(mut self, interval: Duration) -> Self {
        self.refresh_interval = Some(interval);
        self
    }

    /// Sets the retry count.
    pub fn retries(mut self, count: usize) -> Self {
        self.retry_count = count;
        self
    }
}

/// Per-block settings layered over the client's [`QueryOptions`].
///
/// Unset fields take the client default.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryOverrides {
    /// Dedupe window.
    pub dedupe_interval: Option<Duration>,
    /// Periodic revalidation.
    pub refresh_interval: Option<Duration>,
    /// Revalidate on focus.
    pub revalidate_on_focus: Option<bool>,
    /// Retries for transient failures.
    pub retry_count: Option<usize>,
}

impl QueryOverrides {
    /// The options in effect on top of `defaults`.
    pub fn resolve(&self, defaults: &QueryOptions) -> QueryOptions {
        QueryOptions {
            dedupe_interval: self.dedupe_interval.unwrap_or(defaults.dedupe_interval),
            refresh_interval: self.refresh_interval.or(defaults.refresh_interval),
            revalidate_on_focus: self.revalidate_on_focus.unwrap_or(defaults.revalidate_on_focus),
            retry_count: self.retry_count.unwrap_or(defaults.retry_count),
        }
    }
}

impl From<QueryOptions> for QueryOverrides {
    fn from(options: QueryOptions) -> Self {
        Self {
            dedupe_interval: Some(options.dedupe_interval),
            refresh_interval: options.refresh_interval,
            revalidate_on_focus: Some(options.revalidate_on_focus),
            retry_count: Some(options.retry_count),
        }
    }
}

/// What a watching consumer sees of one block.
#[derive(Debug, Clone)]
pub struct QueryState<T> {
    /// Last successful result. Kept across failed revalidations.
    pub data: Option<T>,
    /// Error from the last attempt.
    pub error: Option<Arc<Error>>,
    /// No attempt has finished yet.
    pub is_loading: bool,
    /// A request is running.
    pub is_validating: bool,
}

impl<T> QueryState<T> {
    /// State before the first request.
    pub fn loading() -> Self {
        Self {
            data: None,
            error: None,
            is_loading: true,
            is_validating: true,
        }
    }

    /// Whether the last attempt failed.
    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

impl<T> Default for QueryState<T> {
    fn default() -> Self {
        Self::loading()
    }
}

// ============================================================================
// QueryCache
// ============================================================================

struct Entry {
    key: RequestKey,
    value: Arc<Value>,
    fetched_at: Instant,
}

#[derive(Default)]
struct CacheInner {
    entries: HashMap<String, Entry>,
    in_flight: HashMap<String, InFlight>,
}

/// Shared response cache keyed by [`RequestKey::cache_key`].
///
/// Cheap to clone. Invalidation bumps a revision that watching blocks
/// subscribe to, so they refetch.
#[derive(Clone)]
pub struct QueryCache {
    inner: Arc<Mutex<CacheInner>>,
    revision: Arc<watch::Sender<u64>>,
}

impl QueryCache {
    /// Creates an empty cache.
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(0);
        Self {
            inner: Arc::new(Mutex::new(CacheInner::default())),
            revision: Arc::new(tx),
        }
    }

    fn lock(&self) -> MutexGuard<'_, CacheInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn bump(&self) {
        self.revision.send_modify(|r| *r = r.wrapping_add(1));
    }

    /// Returns the cached value for `key` or runs `fetch`.
    ///
    /// `fetch` is only called when there is neither a fresh entry nor a
    /// request already in flight for the key. Failures are not cached.
    pub async fn get_or_fetch<F, Fut>(
        &self,
        key: &RequestKey,
        options: &QueryOptions,
        fetch: F,
    ) -> SharedResult
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = crate::Result<Value>> + Send + 'static,
    {
        let id = key.cache_key();
        let pending = {
            let mut inner = self.lock();
            if let Some(entry) = inner.entries.get(&id)
                && entry.fetched_at.elapsed() < options.dedupe_interval
            {
                tracing::trace!(key = %id, "cache hit");
                return Ok(Arc::clone(&entry.value));
            }
            match inner.in_flight.get(&id) {
                Some(existing) => {
                    tracing::trace!(key = %id, "joining in-flight request");
                    existing.clone()
                }
                None => {
                    let started = fetch()
                        .map(|result| result.map(Arc::new).map_err(Arc::new))
                        .boxed()
                        .shared();
                    inner.in_flight.insert(id.clone(), started.clone());
                    started
                }
            }
        };

        let result = pending.clone().await;

        let mut inner = self.lock();
        let owns_slot = inner
            .in_flight
            .get(&id)
            .is_some_and(|current| Shared::ptr_eq(current, &pending));
        if owns_slot {
            inner.in_flight.remove(&id);
            if let Ok(value) = &result {
                inner.entries.insert(
                    id,
                    Entry {
                        key: key.clone(),
                        value: Arc::clone(value),
                        fetched_at: Instant::now(),
                    },
                );
            }
        }
        result
    }

    /// Drops `key` and fetches it again.
    pub async fn mutate<F, Fut>(&self, key: &RequestKey, options: &QueryOptions, fetch: F) -> SharedResult
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = crate::Result<Value>> + Send + 'static,
    {
        {
            let mut inner = self.lock();
            let id = key.cache_key();
            inner.entries.remove(&id);
            inner.in_flight.remove(&id);
        }
        let result = self.get_or_fetch(key, options, fetch).await;
        self.bump();
        result
    }

    /// Drops every entry whose key matches `predicate` and tells watchers.
    /// Returns how many entries were dropped.
    pub fn invalidate<P>(&self, predicate: P) -> usize
    where
        P: Fn(&RequestKey) -> bool,
    {
        let removed = {
            let mut inner = self.lock();
            let before = inner.entries.len();
            inner.entries.retain(|_, entry| !predicate(&entry.key));
            before - inner.entries.len()
        };
        tracing::debug!(removed, "cache invalidated");
        self.bump();
        removed
    }

    /// Drops everything.
    pub fn clear(&self) {
        {
            let mut inner = self.lock();
            inner.entries.clear();
            inner.in_flight.clear();
        }
        self.bump();
    }

    /// Cached value for `key`, regardless of age.
    pub fn peek(&self, key: &RequestKey) -> Option<Arc<Value>> {
        self.lock()
            .entries
            .get(&key.cache_key())
            .map(|entry| Arc::clone(&entry.value))
    }

    /// Number of cached entries.
    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    /// Whether nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Changes whenever entries are invalidated or mutated.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.revision.subscribe()
    }
}

impl Default for QueryCache {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for QueryCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.lock();
        f.debug_struct("QueryCache")
            .field("entries", &inner.entries.len())
            .field("in_flight", &inner.in_flight.len())
            .finish()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::error::HttpError;
    use serde_json::json;
    use sentiview_core::RequestConfig;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn key(url: &str) -> RequestKey {
        RequestKey::new(url, RequestConfig::get())
    }

    fn counting(
        calls: &Arc<AtomicUsize>,
        value: Value,
    ) -> impl FnOnce() -> BoxFuture<'static, crate::Result<Value>> {
        let calls = Arc::clone(calls);
        move || {
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(10)).await;
                Ok(value)
            }
            .boxed()
        }
    }

    // ------------------------------------------------------------------------
    // Dedupe window
    // ------------------------------------------------------------------------

    #[tokio::test(start_paused = true)]
    async fn test_fresh_entry_served_without_fetch() {
        let cache = QueryCache::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let opts = QueryOptions::default();

        let first = cache.get_or_fetch(&key("/a"), &opts, counting(&calls, json!(1))).await.unwrap();
        let second = cache.get_or_fetch(&key("/a"), &opts, counting(&calls, json!(2))).await.unwrap();

        assert_eq!(*first, json!(1));
        assert_eq!(*second, json!(1));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_entry_refetched() {
        let cache = QueryCache::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let opts = QueryOptions::default();

        cache.get_or_fetch(&key("/a"), &opts, counting(&calls, json!(1))).await.unwrap();
        tokio::time::advance(Duration::from_secs(3)).await;
        let value = cache.get_or_fetch(&key("/a"), &opts, counting(&calls, json!(2))).await.unwrap();

        assert_eq!(*value, json!(2));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_dedupe_always_fetches() {
        let cache = QueryCache::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let opts = QueryOptions::default().dedupe(Duration::ZERO);

        cache.get_or_fetch(&key("/a"), &opts, counting(&calls, json!(1))).await.unwrap();
        cache.get_or_fetch(&key("/a"), &opts, counting(&calls, json!(1))).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    // ------------------------------------------------------------------------
    // In-flight sharing
    // ------------------------------------------------------------------------

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_callers_share_request() {
        let cache = QueryCache::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let opts = QueryOptions::default();
        let k = key("/a");

        let (a, b, c) = tokio::join!(
            cache.get_or_fetch(&k, &opts, counting(&calls, json!("x"))),
            cache.get_or_fetch(&k, &opts, counting(&calls, json!("y"))),
            cache.get_or_fetch(&k, &opts, counting(&calls, json!("z"))),
        );

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(*a.unwrap(), json!("x"));
        assert_eq!(*b.unwrap(), json!("x"));
        assert_eq!(*c.unwrap(), json!("x"));
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_not_cached() {
        let cache = QueryCache::new();
        let opts = QueryOptions::default();
        let k = key("/a");

        let err = cache
            .get_or_fetch(&k, &opts, || async { Err(HttpError::status(500, None).into()) })
            .await
            .unwrap_err();
        assert_eq!(err.status(), Some(500));
        assert!(cache.is_empty());

        let ok = cache.get_or_fetch(&k, &opts, || async { Ok(json!(7)) }).await.unwrap();
        assert_eq!(*ok, json!(7));
    }

    #[tokio::test(start_paused = true)]
    async fn test_distinct_keys_fetch_separately() {
        let cache = QueryCache::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let opts = QueryOptions::default();

        cache.get_or_fetch(&key("/a"), &opts, counting(&calls, json!(1))).await.unwrap();
        cache
            .get_or_fetch(
                &RequestKey::new("/a", RequestConfig::get().param("tags", "x")),
                &opts,
                counting(&calls, json!(2)),
            )
            .await
            .unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    // ------------------------------------------------------------------------
    // Invalidation
    // ------------------------------------------------------------------------

    #[tokio::test(start_paused = true)]
    async fn test_mutate_refetches_and_bumps_revision() {
        let cache = QueryCache::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let opts = QueryOptions::default();
        let revision = cache.subscribe();

        cache.get_or_fetch(&key("/a"), &opts, counting(&calls, json!(1))).await.unwrap();
        let value = cache.mutate(&key("/a"), &opts, counting(&calls, json!(2))).await.unwrap();

        assert_eq!(*value, json!(2));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert!(revision.has_changed().unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalidate_by_predicate() {
        let cache = QueryCache::new();
        let opts = QueryOptions::default();
        for url in ["/metrics/a", "/metrics/b", "/pie/c"] {
            cache.get_or_fetch(&key(url), &opts, || async { Ok(json!(0)) }).await.unwrap();
        }

        let removed = cache.invalidate(|k| k.url.starts_with("/metrics"));
        assert_eq!(removed, 2);
        assert!(cache.peek(&key("/pie/c")).is_some());
        assert!(cache.peek(&key("/metrics/a")).is_none());

        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn test_query_state_defaults() {
        let state: QueryState<u32> = QueryState::default();
        assert!(state.is_loading);
        assert!(state.is_validating);
        assert!(!state.is_error());
        assert!(state.data.is_none());
    }

    #[test]
    fn test_overrides_layer_on_defaults() {
        let defaults = QueryOptions::default().dedupe(Duration::from_millis(500)).retries(0);

        let resolved = QueryOverrides::default().resolve(&defaults);
        assert_eq!(resolved, defaults);

        let overrides = QueryOverrides {
            dedupe_interval: Some(Duration::from_secs(60)),
            ..QueryOverrides::default()
        };
        let resolved = overrides.resolve(&defaults);
        assert_eq!(resolved.dedupe_interval, Duration::from_secs(60));
        assert_eq!(resolved.retry_count, 0);

        let full = QueryOverrides::from(QueryOptions::default());
        assert_eq!(full.resolve(&defaults), QueryOptions::default());
    }

    #[test]
    fn test_options_builders() {
        let opts = QueryOptions::default()
            .dedupe(Duration::ZERO)
            .refresh(Duration::from_secs(30))
            .retries(1);
        assert_eq!(opts.dedupe_interval, Duration::ZERO);
        assert_eq!(opts.refresh_interval, Some(Duration::from_secs(30)));
        assert_eq!(opts.retry_count, 1);
        assert!(!opts.revalidate_on_focus);
    }
}
