//! Filter options: competitor banks, services and the data date bounds.

use std::time::Duration;

use sentiview_core::{RawKey, RequestConfig};
use sentiview_views::MapContext;
use sentiview_views::filters::{ApiEnvelope, AvailableFilterValues};

use crate::block::Block;
use crate::client::SentiviewClient;
use crate::error::Result;

/// Filter option payload as served.
pub type FilterValues = ApiEnvelope<AvailableFilterValues>;

fn filter_values_key() -> RawKey {
    RawKey::Tuple(
        "/filter/available_filter_values".into(),
        RequestConfig::get().without_global_params(),
    )
}

/// Available filter values. Sent without global parameters.
pub fn available_filter_values() -> Block<FilterValues, FilterValues> {
    Block::new(
        "available_filter_values",
        filter_values_key(),
        |api: FilterValues, _: &MapContext| api,
    )
    .dedupe(Duration::from_secs(300))
}

impl SentiviewClient {
    /// Loads the filter options and acknowledges their default date range.
    ///
    /// Returns the options and whether the filter store took the defaults.
    pub async fn load_filter_defaults(&self) -> Result<(FilterValues, bool)> {
        let values: FilterValues = self.fetch(&filter_values_key()).await?;
        let applied = self.filters().apply_default_dates(values.value.default_range());
        tracing::debug!(applied, "filter defaults loaded");
        Ok((values, applied))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::cache::QueryOptions;
    use crate::error::HttpError;
    use crate::transport::{ApiRequest, ApiResponse, Transport};
    use async_trait::async_trait;
    use sentiview_core::{FilterState, FilterStore, SourceStore, SourceValue};
    use serde_json::json;
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    struct Canned {
        seen: Mutex<Vec<ApiRequest>>,
    }

    #[async_trait]
    impl Transport for Canned {
        async fn execute(&self, request: ApiRequest) -> std::result::Result<ApiResponse, HttpError> {
            self.seen.lock().unwrap().push(request);
            Ok(ApiResponse::ok(json!({
                "id": "available_filter_values",
                "value": {
                    "banks": [{ "label": "Банки", "options": [{ "label": "ВТБ", "value": "vtb" }] }],
                    "services": [],
                    "ratings": { "min": 1, "max": 5 },
                    "dates": {
                        "min": "2024-01-01",
                        "max": "2025-05-31",
                        "default_min": "01-03-2025",
                        "default_max": "31-05-2025"
                    }
                }
            })))
        }

        fn name(&self) -> &str {
            "canned"
        }
    }

    fn client(filters: FilterStore) -> (SentiviewClient, Arc<Canned>) {
        let canned = Arc::new(Canned::default());
        let client =
            SentiviewClient::with_transport(canned.clone(), filters, SourceStore::new(), QueryOptions::default());
        (client, canned)
    }

    #[test]
    fn test_key_skips_global_params() {
        let key = available_filter_values()
            .request_key(&FilterState::initial(), &SourceValue::ALL)
            .unwrap();
        assert_eq!(key.url, "/filter/available_filter_values");
        assert!(key.config.params.unwrap_or_default().is_empty());
    }

    #[tokio::test]
    async fn test_load_filter_defaults_marks_hydrated_store() {
        let dir = tempfile::tempdir().unwrap();
        let filters = FilterStore::new();
        filters.hydrate(dir.path()).unwrap();
        let (client, canned) = client(filters);

        let (values, applied) = client.load_filter_defaults().await.unwrap();
        assert!(applied);
        assert_eq!(values.value.bank_values(), vec!["vtb"]);
        assert!(client.filters().initialized_with_defaults());

        let seen = canned.seen.lock().unwrap();
        assert!(seen[0].query.is_empty());
    }

    #[tokio::test]
    async fn test_load_filter_defaults_waits_for_hydration() {
        let (client, _) = client(FilterStore::new());
        let (_, applied) = client.load_filter_defaults().await.unwrap();
        assert!(!applied);
    }

    #[tokio::test]
    async fn test_block_load_is_cached() {
        let (client, canned) = client(FilterStore::new());
        let block = available_filter_values();
        block.load(&client).await.unwrap();
        block.load(&client).await.unwrap();
        assert_eq!(canned.seen.lock().unwrap().len(), 1);
    }
}
