//! HTTP client settings derived from [`SentiviewConfig`].

use std::time::Duration;

use sentiview_core::SentiviewConfig;

use crate::cache::QueryOptions;
use crate::error::{Error, Result};

/// User agent sent with every request.
pub const USER_AGENT: &str = concat!("sentiview/", env!("CARGO_PKG_VERSION"));

/// Settings for [`ReqwestTransport`](crate::transport::ReqwestTransport)
/// and the default query options.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    /// Base URL every request path is appended to.
    pub base_url: String,
    /// Per-request timeout.
    pub timeout: Duration,
    /// Bearer token.
    pub access_token: Option<String>,
    /// User agent header.
    pub user_agent: String,
    /// Defaults for blocks that do not override them.
    pub defaults: QueryOptions,
}

impl ClientConfig {
    /// Settings pointing at `base_url` with defaults everywhere else.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            timeout: Duration::from_secs(20),
            access_token: None,
            user_agent: USER_AGENT.to_string(),
            defaults: QueryOptions::default(),
        }
    }

    /// Builds settings from the application config, resolving the base URL
    /// through `lookup`.
    pub fn from_config<F>(config: &SentiviewConfig, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let base_url = config.base_url(lookup);
        if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
            return Err(Error::config(format!(
                "base URL must be http(s), got '{base_url}'"
            )));
        }
        let defaults = QueryOptions {
            dedupe_interval: Duration::from_millis(config.cache.dedupe_ms),
            retry_count: config.cache.retry_count,
            ..QueryOptions::default()
        };
        Ok(Self {
            base_url,
            timeout: Duration::from_secs(config.api.timeout_secs),
            access_token: config.api.access_token.clone(),
            user_agent: USER_AGENT.to_string(),
            defaults,
        })
    }

    /// Sets the bearer token.
    pub fn with_access_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(token.into());
        self
    }

    /// Sets the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}
