//! Upload endpoint.

use axum::http::Method;
use chrono::NaiveDate;
use serde_json::json;

use sentiview_client::pages::dashboard;
use sentiview_client::upload::UPLOAD_PATH;
use sentiview_client::{Error, UploadItem, UploadMode};
use sentiview_core::SourceValue;
use sentiview_views::kpi::KpiMetric;

use crate::common::Backend;

fn items() -> Vec<UploadItem> {
    vec![
        UploadItem {
            id: 1,
            text: "Быстро одобрили кредит".into(),
        },
        UploadItem {
            id: 2,
            text: "Долго ждал в отделении".into(),
        },
    ]
}

fn day() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 6, 1).unwrap()
}

#[tokio::test]
async fn test_upload_selects_source_and_drops_cache() {
    let backend = Backend::start().await;
    backend.respond(UPLOAD_PATH, 200, json!({ "status": "successfull", "detail": null }));
    backend.respond("/metrics/average_mark", 200, json!({ "id": "average_mark", "value": 4.0 }));
    let client = backend.client();
    client.set_sources(vec![SourceValue::Parsing]);

    dashboard::kpi(KpiMetric::AverageMark, None).load(&client).await.unwrap();
    assert_eq!(client.cache().len(), 1);

    let response = client.upload_json(&items(), day()).await.unwrap();
    assert!(response.is_success());

    let request = backend
        .requests()
        .into_iter()
        .find(|r| r.path == UPLOAD_PATH)
        .unwrap();
    assert_eq!(request.method, Method::POST);
    assert_eq!(request.values("uploading_date"), vec!["2025-06-01T00:00:00"]);
    assert!(request.values("start_date").is_empty());
    assert_eq!(request.body.unwrap()[1]["id"], json!(2));

    let sources = client.sources().snapshot();
    assert_eq!(sources.sources, vec![SourceValue::Parsing, SourceValue::Uploading]);
    assert_eq!(sources.last_upload_count, Some(2));
    assert!(client.cache().is_empty());
}

#[tokio::test]
async fn test_upload_rejection_keeps_state() {
    let backend = Backend::start().await;
    backend.respond(UPLOAD_PATH, 200, json!({ "status": "error", "detail": "bad payload" }));
    let client = backend.client();
    client.set_sources(vec![SourceValue::Parsing]);

    let err = client.upload_json(&items(), day()).await.unwrap_err();
    match err {
        Error::UploadRejected { detail } => assert_eq!(detail, "bad payload"),
        other => panic!("expected rejection, got {other:?}"),
    }
    assert_eq!(client.sources().sources(), vec![SourceValue::Parsing]);
    assert_eq!(client.sources().snapshot().last_upload_count, None);
}

#[tokio::test]
async fn test_upload_server_error_is_not_retried() {
    let backend = Backend::start().await;
    backend.respond(UPLOAD_PATH, 500, json!({ "detail": "boom" }));
    let client = backend.client();

    let err = client.upload_json(&items(), day()).await.unwrap_err();
    assert_eq!(err.status(), Some(500));
    assert_eq!(backend.hits(UPLOAD_PATH), 1);
}

#[tokio::test]
async fn test_appended_batches_upload_once() {
    let backend = Backend::start().await;
    backend.respond(UPLOAD_PATH, 200, json!({ "status": "successfull", "detail": "" }));
    let client = backend.client();

    let second = vec![
        UploadItem {
            id: 1,
            text: "Поправили ошибку".into(),
        },
        UploadItem {
            id: 7,
            text: "Долго ждал ответа".into(),
        },
    ];
    let batch = UploadMode::Append.combine(items(), second);
    client.upload_json(&batch, day()).await.unwrap();

    assert_eq!(backend.hits(UPLOAD_PATH), 1);
    let request = &backend.requests()[0];
    assert_eq!(request.method, Method::POST);
    let body = request.body.clone().unwrap();
    let ids: Vec<i64> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|item| item["id"].as_i64().unwrap())
        .collect();
    assert_eq!(ids, vec![1, 2, 7]);
    assert_eq!(body[0]["text"], "Поправили ошибку");
}
