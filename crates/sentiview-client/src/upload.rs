//! JSON review upload.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sentiview_core::{RequestConfig, RequestKey, SourceValue};

use crate::client::SentiviewClient;
use crate::error::{Error, Result};

/// Upload endpoint.
pub const UPLOAD_PATH: &str = "/data_uploading/upload_json";

/// Status the upload endpoint reports on success (sic).
pub const UPLOAD_SUCCESS: &str = "successfull";

// ============================================================================
// Payload
// ============================================================================

/// One review to upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadItem {
    /// Caller-assigned id.
    pub id: i64,
    /// Review text.
    pub text: String,
}

/// Validates an upload document: either `[...]` or `{ "data": [...] }`.
pub fn normalize_payload(json: &Value) -> Result<Vec<UploadItem>> {
    let raw = match json {
        Value::Array(items) => items,
        Value::Object(map) => match map.get("data") {
            Some(Value::Array(items)) => items,
            _ => return Err(Error::validation("expected an array or {\"data\": [...]}")),
        },
        _ => return Err(Error::validation("expected an array or {\"data\": [...]}")),
    };

    raw.iter()
        .enumerate()
        .map(|(i, item)| {
            let obj = item
                .as_object()
                .ok_or_else(|| Error::validation(format!("item {i} is not an object")))?;
            let id = obj
                .get("id")
                .and_then(Value::as_i64)
                .ok_or_else(|| Error::validation(format!("item {i} needs an integer \"id\"")))?;
            let text = obj
                .get("text")
                .and_then(Value::as_str)
                .ok_or_else(|| Error::validation(format!("item {i} needs a string \"text\"")))?;
            Ok(UploadItem {
                id,
                text: text.to_string(),
            })
        })
        .collect()
}

/// Merges two lists by id. Later items replace earlier ones in place;
/// order is that of first appearance.
pub fn merge_by_id(a: Vec<UploadItem>, b: Vec<UploadItem>) -> Vec<UploadItem> {
    let mut index: HashMap<i64, usize> = HashMap::new();
    let mut out: Vec<UploadItem> = Vec::with_capacity(a.len() + b.len());
    for item in a.into_iter().chain(b) {
        match index.get(&item.id) {
            Some(&slot) => out[slot] = item,
            None => {
                index.insert(item.id, out.len());
                out.push(item);
            }
        }
    }
    out
}

/// Removes duplicate ids, keeping the last text for each.
pub fn dedupe_by_id(items: Vec<UploadItem>) -> Vec<UploadItem> {
    merge_by_id(Vec::new(), items)
}

// ============================================================================
// Responses
// ============================================================================

/// Parsed reply from the upload endpoint.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct UploadResponse {
    /// `successfull` or `error`.
    #[serde(default)]
    pub status: Option<String>,
    /// Explanation on failure.
    #[serde(default)]
    pub detail: Option<String>,
}

impl UploadResponse {
    /// Reads either the object form or a bare status string.
    pub fn from_value(value: &Value) -> Self {
        match value {
            Value::String(status) => Self {
                status: Some(status.clone()),
                detail: None,
            },
            Value::Object(map) => Self {
                status: map.get("status").and_then(Value::as_str).map(str::to_string),
                detail: map.get("detail").and_then(|d| match d {
                    Value::String(s) if s.is_empty() => None,
                    Value::String(s) => Some(s.clone()),
                    Value::Null => None,
                    other => Some(other.to_string()),
                }),
            },
            _ => Self::default(),
        }
    }

    /// Whether the backend accepted the batch.
    pub fn is_success(&self) -> bool {
        self.status.as_deref() == Some(UPLOAD_SUCCESS)
    }
}

/// How a newly read batch combines with the items already collected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UploadMode {
    /// The batch replaces what was collected.
    #[default]
    Replace,
    /// The batch is merged in by id, batch items winning.
    Append,
}

impl UploadMode {
    /// Wire name.
    pub fn as_str(self) -> &'static str {
        match self {
            UploadMode::Replace => "replace",
            UploadMode::Append => "append",
        }
    }

    /// Combines `current` with `batch`.
    pub fn combine(self, current: Vec<UploadItem>, batch: Vec<UploadItem>) -> Vec<UploadItem> {
        match self {
            UploadMode::Replace => dedupe_by_id(batch),
            UploadMode::Append => merge_by_id(current, batch),
        }
    }
}

impl fmt::Display for UploadMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UploadMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "replace" => Ok(UploadMode::Replace),
            "append" => Ok(UploadMode::Append),
            other => Err(Error::validation(format!("unknown upload mode '{other}'"))),
        }
    }
}

// ============================================================================
// Client operations
// ============================================================================

/// Wire form of the upload date.
pub fn uploading_date_param(date: NaiveDate) -> String {
    date.and_time(NaiveTime::MIN)
        .format("%Y-%m-%dT%H:%M:%S")
        .to_string()
}

impl SentiviewClient {
    /// Uploads reviews for processing.
    ///
    /// On success the `uploading` source is selected, the upload is
    /// recorded, and every cached response is dropped.
    pub async fn upload_json(&self, items: &[UploadItem], uploading_date: NaiveDate) -> Result<UploadResponse> {
        if items.is_empty() {
            return Err(Error::validation("nothing to upload"));
        }
        let body = serde_json::to_value(items).map_err(|e| Error::decode(UPLOAD_PATH, e))?;
        let key = RequestKey::new(
            UPLOAD_PATH,
            RequestConfig::post(body).param("uploading_date", uploading_date_param(uploading_date)),
        );

        let response = UploadResponse::from_value(&self.send(&key).await?);
        if !response.is_success() {
            let detail = response.detail.unwrap_or_else(|| "unknown server response".into());
            tracing::warn!(count = items.len(), %detail, "upload rejected");
            return Err(Error::UploadRejected { detail });
        }

        tracing::info!(count = items.len(), date = %uploading_date, "upload accepted");
        self.sources().add_source(SourceValue::Uploading);
        self.sources().set_last_upload_meta(items.len());
        self.mutate_all();
        Ok(response)
    }
}
