//! Response cache over real HTTP.

use serde_json::json;

use sentiview_client::pages::dashboard;
use sentiview_core::{FilterState, SourceValue};
use sentiview_views::kpi::KpiMetric;

use crate::common::Backend;

fn metric_body() -> serde_json::Value {
    json!({ "id": "average_mark", "value": 4.5 })
}

#[tokio::test]
async fn test_concurrent_loads_share_one_request() {
    let backend = Backend::start().await;
    backend.respond("/metrics/average_mark", 200, metric_body());
    let client = backend.client();
    let block = dashboard::kpi(KpiMetric::AverageMark, None);

    let (a, b) = tokio::join!(block.load(&client), block.load(&client));
    assert_eq!(a.unwrap(), b.unwrap());
    assert_eq!(backend.hits("/metrics/average_mark"), 1);
}

#[tokio::test]
async fn test_mutate_all_forces_refetch() {
    let backend = Backend::start().await;
    backend.respond("/metrics/average_mark", 200, metric_body());
    let client = backend.client();
    let block = dashboard::kpi(KpiMetric::AverageMark, None);

    block.load(&client).await.unwrap();
    block.load(&client).await.unwrap();
    assert_eq!(backend.hits("/metrics/average_mark"), 1);

    client.mutate_all();
    assert!(client.cache().is_empty());
    block.load(&client).await.unwrap();
    assert_eq!(backend.hits("/metrics/average_mark"), 2);
}

#[tokio::test]
async fn test_source_change_changes_key() {
    let backend = Backend::start().await;
    backend.respond("/metrics/average_mark", 200, metric_body());
    let client = backend.client();
    let block = dashboard::kpi(KpiMetric::AverageMark, None);

    block.load(&client).await.unwrap();
    client.set_sources(vec![SourceValue::Parsing]);
    block.load(&client).await.unwrap();

    let requests = backend.requests();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[1].values("source"), vec!["parsing"]);
}

#[tokio::test]
async fn test_explicit_mutate_replaces_entry() {
    let backend = Backend::start().await;
    backend.respond("/metrics/average_mark", 200, metric_body());
    let client = backend.client();
    let block = dashboard::kpi(KpiMetric::AverageMark, None);
    let key = block.request_key(&FilterState::initial(), &SourceValue::ALL).unwrap();

    block.load(&client).await.unwrap();
    backend.respond("/metrics/average_mark", 200, json!({ "id": "average_mark", "value": 3.9 }));
    let fresh = client.mutate(&key, &block.options_for(&client)).await.unwrap();
    assert_eq!(fresh["value"], json!(3.9));
    assert_eq!(client.cache().peek(&key).unwrap()["value"], json!(3.9));
}
