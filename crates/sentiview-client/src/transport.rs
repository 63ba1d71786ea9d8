//! The HTTP seam.
//!
//! [`Transport`] sends one request and hands back the status and decoded
//! body. [`ReqwestTransport`] is the production implementation; tests
//! plug in their own.

use async_trait::async_trait;
use serde_json::Value;
use sentiview_core::query::Method;
use sentiview_core::RequestKey;

use crate::config::ClientConfig;
use crate::error::{Error, HttpError, Result};

// ============================================================================
// Request / response
// ============================================================================

/// One outgoing request, relative to the transport's base URL.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    /// HTTP method.
    pub method: Method,
    /// Path such as `/metrics/average_mark`.
    pub path: String,
    /// Query pairs, repeated keys allowed.
    pub query: Vec<(String, String)>,
    /// JSON body.
    pub body: Option<Value>,
}

impl ApiRequest {
    /// A GET without parameters.
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            method: Method::Get,
            path: path.into(),
            query: Vec::new(),
            body: None,
        }
    }

    /// Builds the request a normalized key describes.
    pub fn from_key(key: &RequestKey) -> Self {
        Self {
            method: key.config.method,
            path: key.url.clone(),
            query: key.query_pairs(),
            body: key.config.body.clone(),
        }
    }
}

/// A response that arrived, successful or not.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    /// Status code.
    pub status: u16,
    /// Decoded body. Empty bodies become `Null`, non-JSON bodies a string.
    pub body: Value,
}

impl ApiResponse {
    /// A 200 response.
    pub fn ok(body: Value) -> Self {
        Self { status: 200, body }
    }

    /// Whether the status is 2xx.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// The body on success, an [`HttpError`] carrying it otherwise.
    pub fn into_result(self) -> std::result::Result<Value, HttpError> {
        if self.is_success() {
            Ok(self.body)
        } else {
            let data = (!self.body.is_null()).then_some(self.body);
            Err(HttpError::status(self.status, data))
        }
    }
}

/// Decodes a raw response body.
pub fn decode_body(text: &str) -> Value {
    if text.trim().is_empty() {
        return Value::Null;
    }
    serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string()))
}

// ============================================================================
// Transport trait
// ============================================================================

/// Sends requests to the backend.
///
/// Implementations return `Ok` for every response that arrived, whatever
/// its status, and `Err` only when no response was received.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Sends one request.
    async fn execute(&self, request: ApiRequest) -> std::result::Result<ApiResponse, HttpError>;

    /// Name for logging.
    fn name(&self) -> &str;
}

// ============================================================================
// reqwest implementation
// ============================================================================

/// [`Transport`] over a shared `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
    base_url: reqwest::Url,
    access_token: Option<String>,
}

impl ReqwestTransport {
    /// Builds a transport from client settings.
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let base = config.base_url.trim_end_matches('/');
        let base_url = reqwest::Url::parse(&format!("{base}/"))
            .map_err(|e| Error::config(format!("invalid base URL '{}': {e}", config.base_url)))?;
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| Error::config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            base_url,
            access_token: config.access_token.clone(),
        })
    }

    /// Absolute URL for `request`.
    pub fn url_for(&self, request: &ApiRequest) -> std::result::Result<reqwest::Url, HttpError> {
        let mut url = self
            .base_url
            .join(request.path.trim_start_matches('/'))
            .map_err(|e| HttpError::transport(format!("invalid path '{}': {e}", request.path)))?;
        if !request.query.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (k, v) in &request.query {
                pairs.append_pair(k, v);
            }
        }
        Ok(url)
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn execute(&self, request: ApiRequest) -> std::result::Result<ApiResponse, HttpError> {
        let url = self.url_for(&request)?;
        let mut builder = match request.method {
            Method::Get => self.client.get(url),
            Method::Post => self.client.post(url),
        };
        if let Some(token) = &self.access_token {
            builder = builder.bearer_auth(token);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| HttpError::transport(format!("request to {} failed: {e}", request.path)))?;
        let status = response.status().as_u16();
        let text = response
            .text()
            .await
            .map_err(|e| HttpError::transport(format!("failed to read response body: {e}")))?;

        Ok(ApiResponse {
            status,
            body: decode_body(&text),
        })
    }

    fn name(&self) -> &str {
        "reqwest"
    }
}
