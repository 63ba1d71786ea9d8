//! Chart blocks.
//!
//! A [`Block`] ties a request key to a mapper: it derives its request from
//! the global filter, goes through the cache, decodes the payload and maps
//! it to a view model. [`Block::watch`] keeps that result current as the
//! filter, the sources or the cache change.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use sentiview_core::query::{QueryProps, normalize_key, normalize_key_with_props, select_global_query};
use sentiview_core::{DateRange, FilterState, RawKey, RequestKey, SourceValue, TagsStrategy};
use sentiview_views::MapContext;
use tokio::sync::watch;
use tokio::time::{Interval, MissedTickBehavior};

use crate::cache::{QueryOptions, QueryOverrides, QueryState};
use crate::client::SentiviewClient;
use crate::error::{Error, Result};

// ============================================================================
// KeySpec
// ============================================================================

/// Key builder for a period.
pub type KeyFn = Arc<dyn Fn(Option<&DateRange>) -> Option<RawKey> + Send + Sync>;

/// Where a block's raw key comes from. `None` disables the block.
#[derive(Clone)]
pub enum KeySpec {
    /// A fixed key.
    Static(Option<RawKey>),
    /// A key computed from the active period.
    Dynamic(KeyFn),
}

impl KeySpec {
    /// A key computed from the active period.
    pub fn dynamic<F>(f: F) -> Self
    where
        F: Fn(Option<&DateRange>) -> Option<RawKey> + Send + Sync + 'static,
    {
        KeySpec::Dynamic(Arc::new(f))
    }

    /// A key that never fires.
    pub fn disabled() -> Self {
        KeySpec::Static(None)
    }

    /// The raw key for `period`.
    pub fn resolve(&self, period: Option<&DateRange>) -> Option<RawKey> {
        match self {
            KeySpec::Static(key) => key.clone(),
            KeySpec::Dynamic(f) => f(period),
        }
    }
}

impl From<RawKey> for KeySpec {
    fn from(key: RawKey) -> Self {
        KeySpec::Static(Some(key))
    }
}

impl From<Option<RawKey>> for KeySpec {
    fn from(key: Option<RawKey>) -> Self {
        KeySpec::Static(key)
    }
}

impl From<&str> for KeySpec {
    fn from(url: &str) -> Self {
        KeySpec::Static(Some(RawKey::from(url)))
    }
}

impl fmt::Debug for KeySpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeySpec::Static(key) => f.debug_tuple("Static").field(key).finish(),
            KeySpec::Dynamic(_) => f.write_str("Dynamic(..)"),
        }
    }
}

// ============================================================================
// Block
// ============================================================================

/// Maps a decoded payload to a view model.
pub type MapFn<TApi, TOut> = Arc<dyn Fn(TApi, &MapContext) -> TOut + Send + Sync>;

/// A chart's request plus its mapper.
pub struct Block<TApi, TOut> {
    name: String,
    key: KeySpec,
    map: MapFn<TApi, TOut>,
    overrides: QueryOverrides,
    tags_strategy: TagsStrategy,
}

impl<TApi, TOut> Clone for Block<TApi, TOut> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            key: self.key.clone(),
            map: Arc::clone(&self.map),
            overrides: self.overrides.clone(),
            tags_strategy: self.tags_strategy,
        }
    }
}

impl<TApi, TOut> fmt::Debug for Block<TApi, TOut> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Block")
            .field("name", &self.name)
            .field("key", &self.key)
            .field("overrides", &self.overrides)
            .field("tags_strategy", &self.tags_strategy)
            .finish()
    }
}

impl<TApi, TOut> Block<TApi, TOut>
where
    TApi: DeserializeOwned + Send + 'static,
    TOut: Send + Sync + 'static,
{
    /// Creates a block using the client's default options and the `union`
    /// strategy.
    pub fn new<F>(name: impl Into<String>, key: impl Into<KeySpec>, map: F) -> Self
    where
        F: Fn(TApi, &MapContext) -> TOut + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            key: key.into(),
            map: Arc::new(map),
            overrides: QueryOverrides::default(),
            tags_strategy: TagsStrategy::default(),
        }
    }

    /// Pins every option, ignoring the client defaults.
    pub fn with_options(mut self, options: QueryOptions) -> Self {
        self.overrides = options.into();
        self
    }

    /// Sets the dedupe window.
    pub fn dedupe(mut self, interval: Duration) -> Self {
        self.overrides.dedupe_interval = Some(interval);
        self
    }

    /// Revalidates every `interval` while watched.
    pub fn refresh(mut self, interval: Duration) -> Self {
        self.overrides.refresh_interval = Some(interval);
        self
    }

    /// Sets the retry count.
    pub fn retries(mut self, count: usize) -> Self {
        self.overrides.retry_count = Some(count);
        self
    }

    /// Sets how local tags combine with global ones.
    pub fn tags_strategy(mut self, strategy: TagsStrategy) -> Self {
        self.tags_strategy = strategy;
        self
    }

    /// Block name, as used by the catalog.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Options this block sets itself.
    pub fn overrides(&self) -> &QueryOverrides {
        &self.overrides
    }

    /// Options in effect for `client`.
    pub fn options_for(&self, client: &SentiviewClient) -> QueryOptions {
        self.overrides.resolve(client.defaults())
    }

    /// The normalized request for a filter state, `None` when disabled.
    pub fn request_key(&self, state: &FilterState, sources: &[SourceValue]) -> Option<RequestKey> {
        match self.key.resolve(state.range.as_ref())? {
            RawKey::Tuple(url, config) if config.no_global_params => Some(RequestKey::new(url, config)),
            raw => normalize_key(Some(&raw), &select_global_query(state, sources), self.tags_strategy),
        }
    }

    /// Loads and maps the block once. `Ok(None)` when the key is disabled.
    pub async fn load(&self, client: &SentiviewClient) -> Result<Option<TOut>> {
        let state = client.filters().snapshot();
        let Some(key) = self.request_key(&state, &client.sources().sources()) else {
            tracing::trace!(block = %self.name, "key disabled");
            return Ok(None);
        };
        let value = client
            .query(&key, &self.options_for(client))
            .await
            .map_err(Error::from_shared)?;
        let api: TApi = serde_json::from_value((*value).clone()).map_err(|e| Error::decode(key.url.clone(), e))?;
        let context = MapContext::new(state.range);
        Ok(Some((self.map)(api, &context)))
    }

    /// Loads the block in the background and keeps it current.
    ///
    /// The task revalidates on every filter, source or cache change and on
    /// the refresh interval, and ends once every receiver is dropped.
    pub fn watch(&self, client: &SentiviewClient) -> watch::Receiver<QueryState<TOut>>
    where
        TOut: Clone,
    {
        let (tx, rx) = watch::channel(QueryState::loading());
        let block = self.clone();
        let client = client.clone();
        tokio::spawn(async move { block.run(client, tx).await });
        rx
    }

    async fn run(self, client: SentiviewClient, tx: watch::Sender<QueryState<TOut>>)
    where
        TOut: Clone,
    {
        let mut filters = client.filters().subscribe();
        let mut sources = client.sources().subscribe();
        let mut revisions = client.cache().subscribe();
        let mut ticker = self.options_for(&client).refresh_interval.filter(|d| !d.is_zero()).map(|every| {
            let mut interval = tokio::time::interval_at(tokio::time::Instant::now() + every, every);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            interval
        });

        loop {
            tx.send_modify(|state| state.is_validating = true);
            let result = self.load(&client).await;
            tx.send_modify(|state| {
                match result {
                    Ok(data) => {
                        state.data = data;
                        state.error = None;
                    }
                    Err(e) => {
                        tracing::warn!(block = %self.name, error = %e, "block load failed");
                        state.error = Some(Arc::new(e));
                    }
                }
                state.is_loading = false;
                state.is_validating = false;
            });

            tokio::select! {
                _ = tx.closed() => break,
                changed = filters.changed() => if changed.is_err() { break },
                changed = sources.changed() => if changed.is_err() { break },
                changed = revisions.changed() => if changed.is_err() { break },
                _ = next_tick(&mut ticker) => {}
            }
        }
        tracing::trace!(block = %self.name, "watch ended");
    }
}

async fn next_tick(ticker: &mut Option<Interval>) {
    match ticker {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending::<()>().await,
    }
}

// ============================================================================
// Type-erased blocks
// ============================================================================

/// A block whose view model is handed out as JSON.
///
/// Lets a catalog return blocks of different types behind one pointer.
#[async_trait]
pub trait DynBlock: Send + Sync {
    /// Block name.
    fn name(&self) -> &str;

    /// The normalized request for the current filter, `None` when disabled.
    fn current_key(&self, client: &SentiviewClient) -> Option<RequestKey>;

    /// Loads the block and serializes its view model.
    async fn load_json(&self, client: &SentiviewClient) -> Result<Option<Value>>;
}

#[async_trait]
impl<TApi, TOut> DynBlock for Block<TApi, TOut>
where
    TApi: DeserializeOwned + Send + 'static,
    TOut: Serialize + Send + Sync + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn current_key(&self, client: &SentiviewClient) -> Option<RequestKey> {
        self.request_key(&client.filters().snapshot(), &client.sources().sources())
    }

    async fn load_json(&self, client: &SentiviewClient) -> Result<Option<Value>> {
        match self.load(client).await? {
            Some(out) => serde_json::to_value(out)
                .map(Some)
                .map_err(|e| Error::decode(self.name.clone(), e)),
            None => Ok(None),
        }
    }
}

// ============================================================================
// PropsBlock
// ============================================================================

/// A block whose parameters come from its caller rather than the filter.
///
/// The key is still resolved by the fetcher, so GET requests pick up the
/// globals unless they opt out.
pub struct PropsBlock<TApi, TOut> {
    name: String,
    key: Option<RawKey>,
    map: Arc<dyn Fn(TApi) -> TOut + Send + Sync>,
    overrides: QueryOverrides,
}

impl<TApi, TOut> fmt::Debug for PropsBlock<TApi, TOut> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PropsBlock")
            .field("name", &self.name)
            .field("key", &self.key)
            .field("overrides", &self.overrides)
            .finish()
    }
}

impl<TApi, TOut> PropsBlock<TApi, TOut>
where
    TApi: DeserializeOwned,
{
    /// Creates a props-driven block.
    pub fn new<F>(name: impl Into<String>, key: Option<RawKey>, map: F) -> Self
    where
        F: Fn(TApi) -> TOut + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            key,
            map: Arc::new(map),
            overrides: QueryOverrides::default(),
        }
    }

    /// Pins every option, ignoring the client defaults.
    pub fn with_options(mut self, options: QueryOptions) -> Self {
        self.overrides = options.into();
        self
    }

    /// Block name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The request sent for `props`, `None` when disabled.
    pub fn request_key(&self, client: &SentiviewClient, props: &QueryProps) -> Option<RequestKey> {
        let local = normalize_key_with_props(props, self.key.as_ref())?;
        Some(client.fetcher().resolve(&RawKey::Tuple(local.url, local.config)))
    }

    /// Loads and maps the block once.
    pub async fn load(&self, client: &SentiviewClient, props: &QueryProps) -> Result<Option<TOut>> {
        let Some(key) = self.request_key(client, props) else {
            return Ok(None);
        };
        let options = self.overrides.resolve(client.defaults());
        let value = client.query(&key, &options).await.map_err(Error::from_shared)?;
        let api: TApi = serde_json::from_value((*value).clone()).map_err(|e| Error::decode(key.url.clone(), e))?;
        Ok(Some((self.map)(api)))
    }
}
