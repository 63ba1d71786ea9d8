//! The client facade shared by every block.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::Value;
use sentiview_core::{FilterStore, RawKey, RequestKey, SentiviewConfig, SourceStore, SourceValue};

use crate::cache::{QueryCache, QueryOptions, SharedResult};
use crate::config::ClientConfig;
use crate::error::Result;
use crate::fetcher::{Fetcher, RetryPolicy};
use crate::transport::{ReqwestTransport, Transport};

/// Transport, cache and global stores bundled together.
///
/// Cheap to clone; clones share state.
#[derive(Clone, Debug)]
pub struct SentiviewClient {
    fetcher: Arc<Fetcher>,
    cache: QueryCache,
    filters: FilterStore,
    sources: SourceStore,
    defaults: QueryOptions,
}

impl SentiviewClient {
    /// Creates a client talking HTTP with fresh stores.
    pub fn new(config: ClientConfig) -> Result<Self> {
        let transport = ReqwestTransport::new(&config)?;
        Ok(Self::with_transport(
            Arc::new(transport),
            FilterStore::new(),
            SourceStore::new(),
            config.defaults,
        ))
    }

    /// Creates a client from the application config and process environment.
    pub fn from_config(config: &SentiviewConfig) -> Result<Self> {
        Self::new(ClientConfig::from_config(config, |var| std::env::var(var).ok())?)
    }

    /// Creates a client over any transport.
    pub fn with_transport(
        transport: Arc<dyn Transport>,
        filters: FilterStore,
        sources: SourceStore,
        defaults: QueryOptions,
    ) -> Self {
        let retry = RetryPolicy {
            max_retries: defaults.retry_count,
            ..RetryPolicy::default()
        };
        let fetcher = Fetcher::new(transport, filters.clone(), sources.clone()).with_retry(retry);
        tracing::debug!(?fetcher, "client ready");
        Self {
            fetcher: Arc::new(fetcher),
            cache: QueryCache::new(),
            filters,
            sources,
            defaults,
        }
    }

    /// The global filter store.
    pub fn filters(&self) -> &FilterStore {
        &self.filters
    }

    /// The source selection store.
    pub fn sources(&self) -> &SourceStore {
        &self.sources
    }

    /// The response cache.
    pub fn cache(&self) -> &QueryCache {
        &self.cache
    }

    /// The fetcher.
    pub fn fetcher(&self) -> &Fetcher {
        &self.fetcher
    }

    /// Options used when a block does not override them.
    pub fn defaults(&self) -> &QueryOptions {
        &self.defaults
    }

    /// Fetches a raw key through the fetcher, bypassing the cache.
    pub async fn fetch<T: DeserializeOwned>(&self, raw: &RawKey) -> Result<T> {
        self.fetcher.fetch(raw).await
    }

    /// Fetches a normalized key through the cache.
    pub async fn query(&self, key: &RequestKey, options: &QueryOptions) -> SharedResult {
        let fetcher = Arc::clone(&self.fetcher);
        let owned = key.clone();
        let retries = options.retry_count;
        self.cache
            .get_or_fetch(key, options, move || async move {
                fetcher.fetch_normalized_value(&owned, retries).await
            })
            .await
    }

    /// Refetches `key`, replacing whatever is cached.
    pub async fn mutate(&self, key: &RequestKey, options: &QueryOptions) -> SharedResult {
        let fetcher = Arc::clone(&self.fetcher);
        let owned = key.clone();
        let retries = options.retry_count;
        self.cache
            .mutate(key, options, move || async move {
                fetcher.fetch_normalized_value(&owned, retries).await
            })
            .await
    }

    /// Drops every cached response so watching blocks refetch.
    pub fn mutate_all(&self) {
        self.cache.invalidate(|_| true);
    }

    /// Replaces the source selection and revalidates everything.
    pub fn set_sources(&self, sources: Vec<SourceValue>) {
        self.sources.set_sources(sources);
        self.mutate_all();
    }

    /// Sends a raw value request outside the cache (used by uploads).
    pub(crate) async fn send(&self, key: &RequestKey) -> Result<Value> {
        self.fetcher.fetch_normalized_value(key, 0).await
    }
}
