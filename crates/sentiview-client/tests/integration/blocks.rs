//! Chart blocks end to end.

use std::time::Duration;

use serde_json::json;
use tokio::time::timeout;

use sentiview_client::QueryOptions;
use sentiview_client::pages::{self, ChartArgs, reviews};
use sentiview_core::ExtraFiltersPatch;
use sentiview_views::reviews::CommentTableQuery;

use crate::common::Backend;

const WAIT: Duration = Duration::from_secs(5);

#[tokio::test]
async fn test_comment_table_block() {
    let backend = Backend::start().await;
    backend.respond(
        "/table/comment_table_rows",
        200,
        json!({
            "total": 2,
            "limit": 20,
            "offset": 20,
            "rows": [
                { "id": 1, "date": "2025-03-01", "rating": 5, "text": "Отлично" },
                { "id": 2, "date": "2025-03-02", "rating": 1, "text": "Плохо" }
            ]
        }),
    );
    let client = backend.client();

    let query = CommentTableQuery::default().with_page(2, 20);
    let table = reviews::comments_table(&query).load(&client).await.unwrap().unwrap();
    assert_eq!(table.total, Some(2));
    assert_eq!(table.rows.len(), 2);
    assert_eq!(table.rows[0].text, "Отлично");

    let request = &backend.requests()[0];
    assert_eq!(request.values("limit"), vec!["20"]);
    assert_eq!(request.values("offset"), vec!["20"]);
    assert_eq!(request.values("start_date"), vec!["2024-01-01"]);
}

#[tokio::test]
async fn test_count_block_parses_string_total() {
    let backend = Backend::start().await;
    backend.respond("/metrics/count_comments", 200, json!({ "id": "count_comments", "value": "1 234" }));
    let client = backend.client();

    let total = reviews::comments_count(&CommentTableQuery::default())
        .load(&client)
        .await
        .unwrap();
    // Not a plain number, so the count falls back to zero.
    assert_eq!(total, Some(0.0));
    assert!(backend.requests()[0].values("limit").is_empty());
}

#[tokio::test]
async fn test_watch_follows_filter_changes() {
    let backend = Backend::start().await;
    backend.respond("/metrics/count_comments", 200, json!({ "id": "count_comments", "value": 7 }));
    let client = backend.client();

    let mut rx = reviews::comments_count(&CommentTableQuery::default()).watch(&client);
    let first = timeout(WAIT, rx.wait_for(|s| s.data.is_some())).await.unwrap().unwrap().clone();
    assert_eq!(first.data, Some(7.0));
    assert!(!first.is_loading);

    client.filters().set_extra(ExtraFiltersPatch::default().tags(["Ипотека"]));
    timeout(WAIT, rx.wait_for(|s| !s.is_validating && backend.hits("/metrics/count_comments") == 2))
        .await
        .unwrap()
        .unwrap();

    let last = backend.requests().pop().unwrap();
    assert_eq!(last.values("tags"), vec!["Ипотека"]);
}

#[tokio::test]
async fn test_watch_keeps_data_after_failure() {
    let backend = Backend::start().await;
    backend.respond("/metrics/count_comments", 200, json!({ "id": "count_comments", "value": 3 }));
    let client = backend.client();

    let block = reviews::comments_count(&CommentTableQuery::default())
        .with_options(QueryOptions::default().retries(0));
    let mut rx = block.watch(&client);
    timeout(WAIT, rx.wait_for(|s| s.data.is_some())).await.unwrap().unwrap();

    backend.respond("/metrics/count_comments", 503, json!({ "detail": "down" }));
    client.mutate_all();
    let state = timeout(WAIT, rx.wait_for(|s| s.is_error())).await.unwrap().unwrap().clone();
    assert_eq!(state.data, Some(3.0));
    assert_eq!(state.error.unwrap().status(), Some(503));
}

#[tokio::test]
async fn test_catalog_chart_as_json() {
    let backend = Backend::start().await;
    backend.respond("/metrics/count_comments", 200, json!({ "id": "count_comments", "value": 42 }));
    let client = backend.client();

    let chart = pages::chart("comment_count", &ChartArgs::default()).unwrap();
    assert_eq!(chart.load_json(&client).await.unwrap(), Some(json!(42.0)));
    assert!(pages::chart("no_such_chart", &ChartArgs::default()).is_none());
}
