//! The global fetcher.
//!
//! Resolves raw keys against the global filter and sources, sends them
//! through a [`Transport`] and retries transient failures with
//! exponential backoff.

use std::sync::Arc;
use std::time::Duration;

use backon::{ExponentialBuilder, Retryable};
use serde::de::DeserializeOwned;
use serde_json::Value;
use sentiview_core::query::{Method, merge_union, select_global_query};
use sentiview_core::{FilterStore, MetricQuery, RawKey, RequestConfig, RequestKey, SourceStore};

use crate::error::{Error, HttpError, Result};
use crate::transport::{ApiRequest, Transport};

/// Backoff settings for transient failures.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Delay before the first retry.
    pub min_delay: Duration,
    /// Ceiling for a single delay.
    pub max_delay: Duration,
    /// Retries after the first attempt.
    pub max_retries: usize,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            min_delay: Duration::from_millis(250),
            max_delay: Duration::from_secs(5),
            max_retries: 3,
        }
    }
}

impl RetryPolicy {
    fn backoff(&self, max_retries: usize) -> ExponentialBuilder {
        ExponentialBuilder::default()
            .with_min_delay(self.min_delay)
            .with_max_delay(self.max_delay)
            .with_max_times(max_retries)
    }
}

/// Sends requests on behalf of every block.
pub struct Fetcher {
    transport: Arc<dyn Transport>,
    filters: FilterStore,
    sources: SourceStore,
    retry: RetryPolicy,
}

impl Fetcher {
    /// Creates a fetcher reading globals from the given stores.
    pub fn new(transport: Arc<dyn Transport>, filters: FilterStore, sources: SourceStore) -> Self {
        Self {
            transport,
            filters,
            sources,
            retry: RetryPolicy::default(),
        }
    }

    /// Replaces the retry policy.
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// The retry policy.
    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    /// Current global query: filter parameters plus selected sources.
    pub fn global_query(&self) -> MetricQuery {
        select_global_query(&self.filters.snapshot(), &self.sources.sources())
    }

    /// The request actually sent for `raw`.
    ///
    /// A bare URL is a GET carrying the globals. A tuple opting out of
    /// globals, or using any method other than GET, is sent as-is. A GET
    /// tuple has the globals unioned into its own parameters.
    pub fn resolve(&self, raw: &RawKey) -> RequestKey {
        match raw {
            RawKey::Url(url) => RequestKey::new(
                url.clone(),
                RequestConfig::get().with_params(self.global_query().to_params()),
            ),
            RawKey::Tuple(url, config) if config.no_global_params || config.method != Method::Get => {
                RequestKey::new(url.clone(), config.clone())
            }
            RawKey::Tuple(url, config) => {
                let globals = self.global_query().to_params();
                let params = merge_union(&config.params.clone().unwrap_or_default(), &globals);
                RequestKey::new(
                    url.clone(),
                    RequestConfig {
                        params: Some(params),
                        ..config.clone()
                    },
                )
            }
        }
    }

    /// Resolves `raw` against the globals, sends it and decodes the body.
    pub async fn fetch<T: DeserializeOwned>(&self, raw: &RawKey) -> Result<T> {
        let key = self.resolve(raw);
        let value = self.fetch_normalized_value(&key, self.retry.max_retries).await?;
        serde_json::from_value(value).map_err(|e| Error::decode(key.url, e))
    }

    /// Sends an already-normalized key without touching its parameters.
    pub async fn fetch_normalized<T: DeserializeOwned>(&self, key: &RequestKey) -> Result<T> {
        let value = self.fetch_normalized_value(key, self.retry.max_retries).await?;
        serde_json::from_value(value).map_err(|e| Error::decode(key.url.clone(), e))
    }

    /// Sends `key`, retrying transient failures up to `retries` times.
    pub async fn fetch_normalized_value(&self, key: &RequestKey, retries: usize) -> Result<Value> {
        let request = ApiRequest::from_key(key);
        let transport = Arc::clone(&self.transport);
        tracing::debug!(
            method = %request.method,
            url = %request.path,
            params = request.query.len(),
            transport = transport.name(),
            "fetching"
        );

        let value = (|| {
            let transport = Arc::clone(&transport);
            let request = request.clone();
            async move { transport.execute(request).await?.into_result() }
        })
        .retry(self.retry.backoff(retries))
        .when(HttpError::is_retryable)
        .notify(|err: &HttpError, delay: Duration| {
            tracing::warn!(url = %key.url, status = ?err.status, ?delay, "retrying: {err}");
        })
        .await?;
        Ok(value)
    }
}

impl std::fmt::Debug for Fetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Fetcher")
            .field("transport", &self.transport.name())
            .field("retry", &self.retry)
            .finish()
    }
}
