//! Reviews page: the comment table and its row count.

use std::time::Duration;

use serde::Serialize;
use sentiview_core::{RawKey, RequestConfig};
use sentiview_views::MapContext;
use sentiview_views::reviews::{
    BackendErrorResponse, CommentRow, CommentTablePayload, CommentTableQuery, CommentsCountResponse,
    normalize_rows,
};

use crate::block::Block;
use crate::error::Error;

/// Dedupe window of the table and its count.
pub const TABLE_DEDUPE: Duration = Duration::from_secs(5);

/// One page of the comment table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommentTable {
    /// Total matching rows, when the backend reports it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total: Option<u64>,
    /// Rows of this page.
    pub rows: Vec<CommentRow>,
}

impl From<CommentTablePayload> for CommentTable {
    fn from(payload: CommentTablePayload) -> Self {
        let total = match &payload {
            CommentTablePayload::Table(table) => Some(table.total),
            CommentTablePayload::Rows(_) => None,
        };
        Self {
            total,
            rows: normalize_rows(payload),
        }
    }
}

fn table_key(url: &str, query: &CommentTableQuery) -> RawKey {
    RawKey::Tuple(url.to_string(), RequestConfig::get().with_params(query.to_params()))
}

/// One page of reviews for `query`, merged with the global filter.
pub fn comments_table(query: &CommentTableQuery) -> Block<CommentTablePayload, CommentTable> {
    Block::new(
        "comment_table_rows",
        table_key("/table/comment_table_rows", &query.effective()),
        |api: CommentTablePayload, _: &MapContext| CommentTable::from(api),
    )
    .dedupe(TABLE_DEDUPE)
}

/// Row count for `query` without its paging.
pub fn comments_count(query: &CommentTableQuery) -> Block<CommentsCountResponse, f64> {
    Block::new(
        "comment_count",
        table_key("/metrics/count_comments", &query.effective().strip_paging()),
        |api: CommentsCountResponse, _: &MapContext| api.total(),
    )
    .dedupe(TABLE_DEDUPE)
}

/// Field errors carried by a failed table request, if any.
pub fn validation_issues(error: &Error) -> Option<BackendErrorResponse> {
    match error {
        Error::Http(http) => http.data.as_ref().and_then(BackendErrorResponse::detect),
        Error::Shared(inner) => validation_issues(inner),
        _ => None,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::error::HttpError;
    use serde_json::json;
    use sentiview_core::query::ParamValue;
    use sentiview_core::{FilterState, SourceValue};
    use std::sync::Arc;

    #[test]
    fn test_table_key_carries_paging() {
        let query = CommentTableQuery::default().with_page(3, 20);
        let key = comments_table(&query)
            .request_key(&FilterState::initial(), &SourceValue::ALL)
            .unwrap();
        let params = key.config.params.unwrap();
        assert_eq!(params.get("limit"), Some(&ParamValue::Num(20.0)));
        assert_eq!(params.get("offset"), Some(&ParamValue::Num(40.0)));
        assert_eq!(params.get("date_order"), Some(&ParamValue::Str("DESC".into())));
    }

    #[test]
    fn test_count_key_strips_paging() {
        let query = CommentTableQuery::default().with_page(2, 50);
        let key = comments_count(&query)
            .request_key(&FilterState::initial(), &SourceValue::ALL)
            .unwrap();
        assert_eq!(key.url, "/metrics/count_comments");
        let params = key.config.params.unwrap();
        assert!(!params.contains_key("limit"));
        assert!(!params.contains_key("offset"));
    }

    #[test]
    fn test_comment_table_from_payload() {
        let payload: CommentTablePayload = serde_json::from_value(json!({
            "total": 120,
            "limit": 50,
            "offset": 0,
            "rows": [{ "id": 7, "date": "2025-01-02", "text": "ok" }]
        }))
        .unwrap();
        let table = CommentTable::from(payload);
        assert_eq!(table.total, Some(120));
        assert_eq!(table.rows.len(), 1);

        let bare: CommentTablePayload =
            serde_json::from_value(json!([{ "date": "2025-01-02", "text": "hi" }])).unwrap();
        assert_eq!(CommentTable::from(bare).total, None);
    }

    #[test]
    fn test_validation_issues_found_through_shared() {
        let body = json!({ "detail": [{ "loc": ["query", "limit"], "msg": "too big", "type": "value_error" }] });
        let err = Error::Shared(Arc::new(Error::Http(HttpError::status(422, Some(body)))));
        let issues = validation_issues(&err).unwrap();
        assert_eq!(issues.detail.len(), 1);
        assert_eq!(issues.detail[0].msg, "too big");

        assert!(validation_issues(&Error::Http(HttpError::status(500, None))).is_none());
    }
}
