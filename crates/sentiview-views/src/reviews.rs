//! Review table rows, counts and validation errors.
//!
//! The table endpoint answers either with a paged envelope or, on older
//! backends, with a bare array of reviews. Both normalize to
//! [`CommentRow`]s via [`normalize_rows`].

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use sentiview_core::query::{ParamValue, QueryParams};

use crate::primitives::Id;

/// Default page size.
pub const DEFAULT_LIMIT: u32 = 50;

// ============================================================================
// Query
// ============================================================================

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderDir {
    /// Ascending.
    Asc,
    /// Descending.
    Desc,
}

impl OrderDir {
    /// Wire form.
    pub fn as_str(self) -> &'static str {
        match self {
            OrderDir::Asc => "ASC",
            OrderDir::Desc => "DESC",
        }
    }
}

/// Table query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommentTableQuery {
    /// Page size.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
    /// Rows to skip.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset: Option<u32>,
    /// Service.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service: Option<String>,
    /// First day, `YYYY-MM-DD`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<String>,
    /// Last day, `YYYY-MM-DD`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<String>,
    /// Lower rating bound.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_rating: Option<f64>,
    /// Upper rating bound.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_rating: Option<f64>,
    /// Free text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Date sort.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_order: Option<OrderDir>,
    /// Rating sort.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating_order: Option<OrderDir>,
}

impl Default for CommentTableQuery {
    /// First page of 50, newest and best rated first.
    fn default() -> Self {
        Self {
            limit: Some(DEFAULT_LIMIT),
            offset: Some(0),
            service: None,
            start_date: None,
            end_date: None,
            min_rating: None,
            max_rating: None,
            text: None,
            date_order: Some(OrderDir::Desc),
            rating_order: Some(OrderDir::Desc),
        }
    }
}

impl CommentTableQuery {
    /// The query as sent: text trimmed, blank text dropped.
    pub fn effective(&self) -> Self {
        let text = self
            .text
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string);
        Self {
            text,
            ..self.clone()
        }
    }

    /// The query without `limit` and `offset`, for counting.
    pub fn strip_paging(&self) -> Self {
        Self {
            limit: None,
            offset: None,
            ..self.clone()
        }
    }

    /// One-based page number.
    pub fn page(&self) -> u32 {
        let limit = self.limit.filter(|l| *l > 0).unwrap_or(DEFAULT_LIMIT);
        self.offset.unwrap_or(0) / limit + 1
    }

    /// Moves to a one-based page of `size` rows.
    pub fn with_page(mut self, page: u32, size: u32) -> Self {
        self.limit = Some(size);
        self.offset = Some(page.saturating_sub(1) * size);
        self
    }

    /// Set fields as query parameters.
    pub fn to_params(&self) -> QueryParams {
        let mut params = QueryParams::new();
        if let Some(limit) = self.limit {
            params.insert("limit".into(), limit.into());
        }
        if let Some(offset) = self.offset {
            params.insert("offset".into(), offset.into());
        }
        if let Some(service) = &self.service {
            params.insert("service".into(), service.as_str().into());
        }
        if let Some(start) = &self.start_date {
            params.insert("start_date".into(), start.as_str().into());
        }
        if let Some(end) = &self.end_date {
            params.insert("end_date".into(), end.as_str().into());
        }
        if let Some(min) = self.min_rating {
            params.insert("min_rating".into(), ParamValue::Num(min));
        }
        if let Some(max) = self.max_rating {
            params.insert("max_rating".into(), ParamValue::Num(max));
        }
        if let Some(text) = &self.text {
            params.insert("text".into(), text.as_str().into());
        }
        if let Some(order) = self.date_order {
            params.insert("date_order".into(), order.as_str().into());
        }
        if let Some(order) = self.rating_order {
            params.insert("rating_order".into(), order.as_str().into());
        }
        params
    }
}

// ============================================================================
// Rows
// ============================================================================

/// Per-tag scores of a review.
pub type TagScores = BTreeMap<String, f64>;

/// Table row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommentRow {
    /// Row id.
    pub id: Id,
    /// ISO date.
    pub date: String,
    /// Rating 0..5.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rating: Option<f64>,
    /// Service.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service: Option<String>,
    /// Author.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    /// Source.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    /// Review text.
    pub text: String,
    /// Tag scores.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<TagScores>,
}

/// Row of the paged envelope.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TableRow {
    /// Row id; generated when missing.
    #[serde(default)]
    pub id: Option<Id>,
    /// ISO date.
    pub date: String,
    /// Rating.
    #[serde(default)]
    pub rating: Option<f64>,
    /// Service.
    #[serde(default)]
    pub service: Option<String>,
    /// Author.
    #[serde(default)]
    pub author: Option<String>,
    /// Source.
    #[serde(default)]
    pub source: Option<String>,
    /// Review text.
    pub text: String,
    /// Tag scores.
    #[serde(default)]
    pub tags: Option<TagScores>,
}

/// Item of the bare-array answer.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct BackendCommentItem {
    /// Review text.
    pub text: String,
    /// Rating.
    #[serde(default)]
    pub rating: Option<f64>,
    /// Tag scores.
    #[serde(default)]
    pub tags: Option<TagScores>,
    /// Service.
    #[serde(default)]
    pub service: Option<String>,
    /// ISO date.
    pub date: String,
    /// Author name.
    #[serde(default)]
    pub name: Option<String>,
}

/// Paged envelope.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CommentTableResponse {
    /// Total rows matching the query.
    #[serde(default)]
    pub total: u64,
    /// Page size.
    #[serde(default)]
    pub limit: u32,
    /// Rows skipped.
    #[serde(default)]
    pub offset: u32,
    /// Rows.
    #[serde(default)]
    pub rows: Vec<TableRow>,
}

/// Either answer shape of the table endpoint.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum CommentTablePayload {
    /// Paged envelope.
    Table(CommentTableResponse),
    /// Bare array.
    Rows(Vec<BackendCommentItem>),
}

fn fallback_id(date: &str, service: Option<&str>, index: usize) -> Id {
    Id::Str(format!("{date}|{}|{index}", service.unwrap_or_default()))
}

/// Normalizes either answer shape to table rows.
pub fn normalize_rows(payload: CommentTablePayload) -> Vec<CommentRow> {
    match payload {
        CommentTablePayload::Rows(items) => items
            .into_iter()
            .enumerate()
            .map(|(i, r)| CommentRow {
                id: fallback_id(&r.date, r.service.as_deref(), i),
                date: r.date,
                rating: r.rating,
                author: r.name,
                source: r.service.clone(),
                service: r.service,
                text: r.text,
                tags: r.tags,
            })
            .collect(),
        CommentTablePayload::Table(table) => table
            .rows
            .into_iter()
            .enumerate()
            .map(|(i, r)| CommentRow {
                id: r
                    .id
                    .unwrap_or_else(|| fallback_id(&r.date, r.service.as_deref(), i)),
                date: r.date,
                rating: r.rating,
                service: r.service,
                author: r.author,
                source: r.source,
                text: r.text,
                tags: r.tags,
            })
            .collect(),
    }
}

// ============================================================================
// Count
// ============================================================================

/// Count payload: a number in a string.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CommentsCountResponse {
    /// Metric id.
    pub id: Id,
    /// Count.
    #[serde(default)]
    pub value: Value,
}

impl CommentsCountResponse {
    /// The parsed count, or 0 when it is not a finite number.
    pub fn total(&self) -> f64 {
        let parsed = match &self.value {
            Value::Number(n) => n.as_f64(),
            Value::String(s) if s.trim().is_empty() => Some(0.0),
            Value::String(s) => s.trim().parse::<f64>().ok(),
            Value::Null => Some(0.0),
            _ => None,
        };
        parsed.filter(|n| n.is_finite()).unwrap_or(0.0)
    }
}

// ============================================================================
// Validation errors
// ============================================================================

/// Segment of an error location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LocPart {
    /// Field name.
    Field(String),
    /// Array index.
    Index(i64),
}

/// One validation failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackendValidationIssue {
    /// Location of the bad input.
    pub loc: Vec<LocPart>,
    /// Message.
    pub msg: String,
    /// Error type.
    #[serde(rename = "type")]
    pub kind: String,
}

/// Validation error body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackendErrorResponse {
    /// Failures.
    pub detail: Vec<BackendValidationIssue>,
}

impl BackendErrorResponse {
    /// Reads an error body when it has this shape.
    pub fn detect(body: &Value) -> Option<Self> {
        let detail = body.as_object()?.get("detail")?.as_array()?;
        if !detail.iter().all(Value::is_object) {
            return None;
        }
        serde_json::from_value(body.clone()).ok()
    }
}
