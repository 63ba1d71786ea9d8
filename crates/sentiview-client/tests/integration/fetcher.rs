//! Fetcher over real HTTP: parameter encoding, auth, retries and errors.

use axum::http::Method;
use serde_json::{Value, json};

use sentiview_client::pages::reviews::validation_issues;
use sentiview_client::{ClientConfig, Error, SentiviewClient};
use sentiview_core::{ExtraFiltersPatch, RawKey, RequestConfig, RequestKey};

use crate::common::{Backend, TOKEN};

#[tokio::test]
async fn test_global_params_reach_backend() {
    let backend = Backend::start().await;
    backend.respond("/metrics/average_mark", 200, json!({ "id": "average_mark", "value": 4.2 }));
    let client = backend.client();

    let body: Value = client.fetch(&RawKey::from("/metrics/average_mark")).await.unwrap();
    assert_eq!(body["value"], json!(4.2));

    let requests = backend.requests();
    assert_eq!(requests.len(), 1);
    let request = &requests[0];
    assert_eq!(request.method, Method::GET);
    assert_eq!(request.bearer.as_deref(), Some(TOKEN));
    assert_eq!(request.values("start_date"), vec!["2024-01-01"]);
    assert_eq!(request.values("end_date"), vec!["2025-05-31"]);
    assert_eq!(request.values("source"), vec!["parsing", "uploading"]);
}

#[tokio::test]
async fn test_tags_repeat_as_query_pairs() {
    let backend = Backend::start().await;
    backend.respond("/pie/sentiment_distribution", 200, json!([]));
    let client = backend.client();
    client.filters().set_extra(ExtraFiltersPatch::default().tags(["Кэшбэк", "Ипотека"]));

    let _: Value = client.fetch(&RawKey::from("/pie/sentiment_distribution")).await.unwrap();

    let request = &backend.requests()[0];
    assert_eq!(request.values("tags"), vec!["Кэшбэк", "Ипотека"]);
}

#[tokio::test]
async fn test_no_global_params_sent_as_is() {
    let backend = Backend::start().await;
    backend.respond("/filter/available_filter_values", 200, json!({}));
    let client = backend.client();

    let raw = RawKey::Tuple(
        "/filter/available_filter_values".into(),
        RequestConfig::get().without_global_params(),
    );
    let _: Value = client.fetch(&raw).await.unwrap();
    assert!(backend.requests()[0].query.is_empty());
}

#[tokio::test]
async fn test_server_error_is_retried() {
    let backend = Backend::start().await;
    backend.respond_once("/metrics/count_comments", 500, json!({ "detail": "boom" }));
    backend.respond("/metrics/count_comments", 200, json!({ "id": "count_comments", "value": "12" }));
    let client = backend.client();

    let body: Value = client.fetch(&RawKey::from("/metrics/count_comments")).await.unwrap();
    assert_eq!(body["value"], json!("12"));
    assert_eq!(backend.hits("/metrics/count_comments"), 2);
}

#[tokio::test]
async fn test_validation_error_keeps_body() {
    let backend = Backend::start().await;
    backend.respond(
        "/table/comment_table_rows",
        422,
        json!({ "detail": [{ "loc": ["query", "limit"], "msg": "too large", "type": "value_error" }] }),
    );
    let client = backend.client();

    let err = client
        .fetch::<Value>(&RawKey::from("/table/comment_table_rows"))
        .await
        .unwrap_err();
    assert_eq!(err.status(), Some(422));
    assert!(!err.is_retryable());
    assert_eq!(validation_issues(&err).unwrap().detail[0].msg, "too large");
    assert_eq!(backend.hits("/table/comment_table_rows"), 1);
}

#[tokio::test]
async fn test_decode_failure_names_url() {
    let backend = Backend::start().await;
    backend.respond("/metrics/average_mark", 200, json!({ "unexpected": true }));
    let client = backend.client();

    let err = client
        .fetch::<Vec<u32>>(&RawKey::from("/metrics/average_mark"))
        .await
        .unwrap_err();
    match err {
        Error::Decode { url, .. } => assert_eq!(url, "/metrics/average_mark"),
        other => panic!("expected decode error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_unreachable_backend_is_transport_error() {
    let addr = std::net::TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap();
    let client = SentiviewClient::new(ClientConfig::new(format!("http://{addr}"))).unwrap();

    let key = RequestKey::new("/metrics/average_mark", RequestConfig::get());
    let err = client.fetcher().fetch_normalized_value(&key, 0).await.unwrap_err();
    assert!(err.is_retryable());
    assert_eq!(err.status(), None);
}
