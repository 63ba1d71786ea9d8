//! Metric queries and request-key normalization.
//!
//! A chart's request is identified by a [`RawKey`]: either a bare URL or a
//! URL plus [`RequestConfig`]. Before hitting the cache, the key is
//! normalized against the global [`MetricQuery`] so that two charts asking
//! for the same data under the same filter share one [`RequestKey`].
//!
//! Query values serialize with repeated keys for lists
//! (`?tags=a&tags=b`), never bracket notation.

use std::collections::BTreeMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};
use crate::filter::{DateRange, ExtraFilters, FilterState};
use crate::source::SourceValue;

/// Upper bound of the rating scale.
pub const MAX_RATING: f64 = 5.0;

// ============================================================================
// ParamValue
// ============================================================================

/// A single query-string value.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    /// Boolean flag.
    Bool(bool),
    /// Number, rendered in shortest decimal form.
    Num(f64),
    /// Plain string.
    Str(String),
    /// Repeated key.
    List(Vec<String>),
}

/// Query parameters keyed by name, ordered for canonical rendering.
pub type QueryParams = BTreeMap<String, ParamValue>;

impl ParamValue {
    /// Returns `true` for [`ParamValue::List`].
    pub fn is_list(&self) -> bool {
        matches!(self, ParamValue::List(_))
    }

    /// Reads the value as a list of strings; a single string counts as a
    /// one-element list.
    pub fn as_list(&self) -> Option<Vec<String>> {
        match self {
            ParamValue::List(items) => Some(items.clone()),
            ParamValue::Str(s) => Some(vec![s.clone()]),
            _ => None,
        }
    }

    /// The value's string forms as they appear on the wire.
    pub fn wire_values(&self) -> Vec<String> {
        match self {
            ParamValue::Bool(b) => vec![b.to_string()],
            ParamValue::Num(n) => vec![n.to_string()],
            ParamValue::Str(s) => vec![s.clone()],
            ParamValue::List(items) => items.clone(),
        }
    }
}

impl PartialEq for ParamValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (ParamValue::Bool(a), ParamValue::Bool(b)) => a == b,
            (ParamValue::Num(a), ParamValue::Num(b)) => a.to_bits() == b.to_bits(),
            (ParamValue::Str(a), ParamValue::Str(b)) => a == b,
            (ParamValue::List(a), ParamValue::List(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for ParamValue {}

impl Hash for ParamValue {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            ParamValue::Bool(b) => b.hash(state),
            ParamValue::Num(n) => n.to_bits().hash(state),
            ParamValue::Str(s) => s.hash(state),
            ParamValue::List(items) => items.hash(state),
        }
    }
}

impl From<bool> for ParamValue {
    fn from(value: bool) -> Self {
        ParamValue::Bool(value)
    }
}

impl From<f64> for ParamValue {
    fn from(value: f64) -> Self {
        ParamValue::Num(value)
    }
}

impl From<i64> for ParamValue {
    fn from(value: i64) -> Self {
        ParamValue::Num(value as f64)
    }
}

impl From<u32> for ParamValue {
    fn from(value: u32) -> Self {
        ParamValue::Num(f64::from(value))
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        ParamValue::Str(value.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(value: String) -> Self {
        ParamValue::Str(value)
    }
}

impl From<Vec<String>> for ParamValue {
    fn from(value: Vec<String>) -> Self {
        ParamValue::List(value)
    }
}

impl From<&[&str]> for ParamValue {
    fn from(value: &[&str]) -> Self {
        ParamValue::List(value.iter().map(|s| (*s).to_string()).collect())
    }
}

/// Builds [`QueryParams`] from literal entries.
pub fn query_params<const N: usize>(entries: [(&str, ParamValue); N]) -> QueryParams {
    entries
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect()
}

// ============================================================================
// MetricQuery
// ============================================================================

/// Filter-derived parameters understood by every metric endpoint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricQuery {
    /// Services (repeated).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service: Option<Vec<String>>,
    /// First day, `YYYY-MM-DD`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<String>,
    /// Last day, `YYYY-MM-DD`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<String>,
    /// Lower rating bound.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_rating: Option<f64>,
    /// Upper rating bound.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_rating: Option<f64>,
    /// Free text.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Tags (repeated).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    /// Data sources (repeated).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<Vec<String>>,
    /// Explicit comment ids (repeated).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment_ids: Option<Vec<String>>,
    /// Competitor bank.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub concurrent: Option<String>,
}

impl MetricQuery {
    /// Sets `source` from a selection; empty means both sources.
    pub fn with_sources(mut self, sources: &[SourceValue]) -> Self {
        let sources = if sources.is_empty() {
            &SourceValue::ALL[..]
        } else {
            sources
        };
        self.source = Some(sources.iter().map(|s| s.as_str().to_string()).collect());
        self
    }

    /// Set fields other than `tags` and `source`.
    fn plain_entries(&self) -> Vec<(&'static str, ParamValue)> {
        let mut entries = Vec::new();
        if let Some(service) = &self.service {
            entries.push(("service", ParamValue::List(service.clone())));
        }
        if let Some(start) = &self.start_date {
            entries.push(("start_date", ParamValue::Str(start.clone())));
        }
        if let Some(end) = &self.end_date {
            entries.push(("end_date", ParamValue::Str(end.clone())));
        }
        if let Some(min) = self.min_rating {
            entries.push(("min_rating", ParamValue::Num(min)));
        }
        if let Some(max) = self.max_rating {
            entries.push(("max_rating", ParamValue::Num(max)));
        }
        if let Some(text) = &self.text {
            entries.push(("text", ParamValue::Str(text.clone())));
        }
        if let Some(ids) = &self.comment_ids {
            entries.push(("comment_ids", ParamValue::List(ids.clone())));
        }
        if let Some(concurrent) = &self.concurrent {
            entries.push(("concurrent", ParamValue::Str(concurrent.clone())));
        }
        entries
    }

    /// All set fields as query parameters.
    pub fn to_params(&self) -> QueryParams {
        let mut params: QueryParams = self
            .plain_entries()
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect();
        if let Some(tags) = &self.tags {
            params.insert("tags".into(), ParamValue::List(tags.clone()));
        }
        if let Some(source) = &self.source {
            params.insert("source".into(), ParamValue::List(source.clone()));
        }
        params
    }
}

/// Builds the metric query for a period and the extra filters.
///
/// `min_rating` falls back to 0 when unset or not finite and `max_rating`
/// is always 5. Text is included only when it is not blank, but is sent
/// untrimmed. `source` is left for the source store to fill in.
/// `comment_ids` and `concurrent` are chart-local and never come from here.
pub fn build_metric_query(period: Option<&DateRange>, extra: &ExtraFilters) -> MetricQuery {
    let non_empty = |items: &Vec<String>| (!items.is_empty()).then(|| items.clone());
    MetricQuery {
        service: non_empty(&extra.services),
        start_date: period.map(|p| p.from.format("%Y-%m-%d").to_string()),
        end_date: period.map(|p| p.to.format("%Y-%m-%d").to_string()),
        min_rating: Some(extra.rating.filter(|r| r.is_finite()).unwrap_or(0.0)),
        max_rating: Some(MAX_RATING),
        text: (!extra.text.trim().is_empty()).then(|| extra.text.clone()),
        tags: non_empty(&extra.tags),
        source: None,
        comment_ids: None,
        concurrent: None,
    }
}

/// The global query: filter-derived parameters plus the selected sources.
pub fn select_global_query(state: &FilterState, sources: &[SourceValue]) -> MetricQuery {
    build_metric_query(state.range.as_ref(), &state.extra).with_sources(sources)
}

// ============================================================================
// Merging
// ============================================================================

/// How chart-local tags combine with the global tag filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TagsStrategy {
    /// Local and global tags, de-duplicated.
    #[default]
    Union,
    /// Local tags when present, else global.
    Override,
    /// Local tags only.
    Base,
}

impl FromStr for TagsStrategy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "union" => Ok(TagsStrategy::Union),
            "override" => Ok(TagsStrategy::Override),
            "base" => Ok(TagsStrategy::Base),
            other => Err(Error::validation_field(
                "tags_strategy",
                format!("unknown strategy '{other}'"),
            )),
        }
    }
}

fn union_dedupe(first: Vec<String>, second: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(first.len() + second.len());
    for item in first.into_iter().chain(second) {
        if !out.contains(&item) {
            out.push(item);
        }
    }
    out
}

fn union_optional(base: Option<Vec<String>>, extra: Option<Vec<String>>) -> Option<Vec<String>> {
    match (base, extra) {
        (Some(base), Some(extra)) => Some(union_dedupe(base, extra)),
        (base, extra) => extra.or(base),
    }
}

/// Merges a metric query into chart-local parameters.
///
/// Set query fields override base entries, unset ones leave them alone.
/// Tags follow `strategy` and sources are always unioned.
pub fn merge_params(
    base: Option<&QueryParams>,
    extra: &MetricQuery,
    strategy: TagsStrategy,
) -> QueryParams {
    let base_tags = base.and_then(|b| b.get("tags")).and_then(ParamValue::as_list);
    let tags = match strategy {
        TagsStrategy::Override => base_tags.or_else(|| extra.tags.clone()),
        TagsStrategy::Base => base_tags,
        TagsStrategy::Union => union_optional(base_tags, extra.tags.clone()),
    };
    let base_source = base.and_then(|b| b.get("source")).and_then(ParamValue::as_list);
    let source = union_optional(base_source, extra.source.clone());

    let mut merged = base.cloned().unwrap_or_default();
    for (key, value) in extra.plain_entries() {
        merged.insert(key.to_string(), value);
    }
    merged.remove("tags");
    if let Some(tags) = tags {
        merged.insert("tags".into(), ParamValue::List(tags));
    }
    if let Some(source) = source {
        merged.insert("source".into(), ParamValue::List(source));
    }
    merged
}

/// Generic merge: where either side is a list the result is their
/// de-duplicated union, otherwise `extra` wins.
pub fn merge_union(base: &QueryParams, extra: &QueryParams) -> QueryParams {
    let mut out = base.clone();
    for (key, value) in extra {
        let merged = match out.get(key) {
            Some(current) if current.is_list() || value.is_list() => {
                ParamValue::List(union_dedupe(current.wire_values(), value.wire_values()))
            }
            None if value.is_list() => ParamValue::List(union_dedupe(Vec::new(), value.wire_values())),
            _ => value.clone(),
        };
        out.insert(key.clone(), merged);
    }
    out
}

/// Serializes parameters to `(key, value)` pairs, repeating list keys.
pub fn to_query_pairs(params: &QueryParams) -> Vec<(String, String)> {
    params
        .iter()
        .flat_map(|(key, value)| {
            value
                .wire_values()
                .into_iter()
                .map(move |v| (key.clone(), v))
        })
        .collect()
}

// ============================================================================
// Keys
// ============================================================================

/// HTTP method of a request key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    /// GET; the only method that receives global parameters.
    #[default]
    Get,
    /// POST with a JSON body.
    Post,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Method::Get => f.write_str("GET"),
            Method::Post => f.write_str("POST"),
        }
    }
}

/// Request options attached to a URL.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestConfig {
    /// HTTP method.
    pub method: Method,
    /// Query parameters.
    pub params: Option<QueryParams>,
    /// JSON body for POST.
    pub body: Option<Value>,
    /// Send as-is, without the global filter.
    pub no_global_params: bool,
}

impl RequestConfig {
    /// A GET with no parameters.
    pub fn get() -> Self {
        Self::default()
    }

    /// A POST carrying `body`.
    pub fn post(body: Value) -> Self {
        Self {
            method: Method::Post,
            body: Some(body),
            ..Self::default()
        }
    }

    /// Replaces the parameters.
    pub fn with_params(mut self, params: QueryParams) -> Self {
        self.params = Some(params);
        self
    }

    /// Adds one parameter.
    pub fn param(mut self, key: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.params
            .get_or_insert_with(QueryParams::new)
            .insert(key.into(), value.into());
        self
    }

    /// Opts out of global parameters.
    pub fn without_global_params(mut self) -> Self {
        self.no_global_params = true;
        self
    }
}

/// A chart's request before normalization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawKey {
    /// Bare URL (GET).
    Url(String),
    /// URL with options.
    Tuple(String, RequestConfig),
}

impl RawKey {
    /// Path of the request.
    pub fn url(&self) -> &str {
        match self {
            RawKey::Url(url) | RawKey::Tuple(url, _) => url,
        }
    }
}

impl From<&str> for RawKey {
    fn from(url: &str) -> Self {
        RawKey::Url(url.to_string())
    }
}

impl From<String> for RawKey {
    fn from(url: String) -> Self {
        RawKey::Url(url)
    }
}

impl From<(&str, RequestConfig)> for RawKey {
    fn from((url, config): (&str, RequestConfig)) -> Self {
        RawKey::Tuple(url.to_string(), config)
    }
}

/// A normalized request: URL plus fully merged options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestKey {
    /// Path of the request.
    pub url: String,
    /// Merged options.
    pub config: RequestConfig,
}

impl RequestKey {
    /// Creates a key.
    pub fn new(url: impl Into<String>, config: RequestConfig) -> Self {
        Self {
            url: url.into(),
            config,
        }
    }

    /// Query pairs in canonical order.
    pub fn query_pairs(&self) -> Vec<(String, String)> {
        self.config
            .params
            .as_ref()
            .map(to_query_pairs)
            .unwrap_or_default()
    }

    /// Canonical identity used by the cache: `METHOD url?pairs[#body]`,
    /// with keys and values percent-encoded.
    pub fn cache_key(&self) -> String {
        let mut key = format!("{} {}", self.config.method, self.url);
        let pairs = self.query_pairs();
        if !pairs.is_empty() {
            key.push('?');
            let rendered: Vec<String> = pairs
                .iter()
                .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
                .collect();
            key.push_str(&rendered.join("&"));
        }
        if let Some(body) = &self.config.body {
            key.push('#');
            key.push_str(&body.to_string());
        }
        key
    }
}

impl Hash for RequestKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.cache_key().hash(state);
    }
}

impl fmt::Display for RequestKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.cache_key())
    }
}

/// Normalizes a raw key against the global query.
///
/// A disabled key stays disabled. A bare URL takes the query as its
/// parameters, a tuple has the query merged into its own parameters.
pub fn normalize_key(
    raw: Option<&RawKey>,
    query: &MetricQuery,
    strategy: TagsStrategy,
) -> Option<RequestKey> {
    match raw? {
        RawKey::Url(url) => Some(RequestKey::new(
            url.clone(),
            RequestConfig::get().with_params(query.to_params()),
        )),
        RawKey::Tuple(url, config) => {
            let params = merge_params(config.params.as_ref(), query, strategy);
            Some(RequestKey::new(
                url.clone(),
                RequestConfig {
                    params: Some(params),
                    ..config.clone()
                },
            ))
        }
    }
}

/// Parameters supplied by a chart's caller instead of the global filter.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryProps {
    /// Parameters to apply.
    pub params: Option<QueryParams>,
}

/// Normalizes a raw key against caller-supplied parameters only.
///
/// Props parameters shadow the key's own entry by entry.
pub fn normalize_key_with_props(props: &QueryProps, raw: Option<&RawKey>) -> Option<RequestKey> {
    match raw? {
        RawKey::Url(url) => Some(RequestKey::new(
            url.clone(),
            RequestConfig {
                params: props.params.clone(),
                ..RequestConfig::default()
            },
        )),
        RawKey::Tuple(url, config) => {
            let params = match (&config.params, &props.params) {
                (None, None) => None,
                (own, extra) => {
                    let mut merged = own.clone().unwrap_or_default();
                    merged.extend(extra.clone().unwrap_or_default());
                    Some(merged)
                }
            };
            Some(RequestKey::new(
                url.clone(),
                RequestConfig {
                    params,
                    ..config.clone()
                },
            ))
        }
    }
}
