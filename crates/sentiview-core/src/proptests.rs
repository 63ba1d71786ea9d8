//! Property-based tests for query composition.

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use crate::filter::{ExtraFilters, PeriodKey};
    use crate::query::{
        MetricQuery, ParamValue, QueryParams, RequestConfig, RequestKey, TagsStrategy,
        build_metric_query, merge_params, merge_union, to_query_pairs,
    };
    use chrono::NaiveDate;
    use proptest::prelude::*;

    fn tag() -> impl Strategy<Value = String> {
        "[a-z]{1,4}"
    }

    fn plain_params() -> impl Strategy<Value = QueryParams> {
        prop::collection::btree_map("[a-m]{1,6}", "[a-z0-9]{0,6}", 0..6).prop_map(|m| {
            m.into_iter()
                .map(|(k, v)| (k, ParamValue::Str(v)))
                .collect()
        })
    }

    proptest! {
        #[test]
        fn test_union_tags_are_unique_superset(
            base in prop::collection::vec(tag(), 0..6),
            global in prop::collection::vec(tag(), 1..6),
        ) {
            let mut params = QueryParams::new();
            params.insert("tags".into(), ParamValue::List(base.clone()));
            let query = MetricQuery { tags: Some(global.clone()), ..MetricQuery::default() };
            let merged = merge_params(Some(&params), &query, TagsStrategy::Union);
            let tags = merged["tags"].as_list().unwrap();

            let mut seen = std::collections::HashSet::new();
            prop_assert!(tags.iter().all(|t| seen.insert(t.clone())));
            prop_assert!(base.iter().chain(global.iter()).all(|t| tags.contains(t)));
        }

        #[test]
        fn test_empty_query_leaves_base_untouched(base in plain_params()) {
            let merged = merge_params(Some(&base), &MetricQuery::default(), TagsStrategy::Union);
            prop_assert_eq!(merged, base);
        }

        #[test]
        fn test_merge_union_idempotent(base in plain_params(), tags in prop::collection::vec(tag(), 0..5)) {
            let mut extra = QueryParams::new();
            extra.insert("tags".into(), ParamValue::List(tags));
            let once = merge_union(&base, &extra);
            let twice = merge_union(&once, &extra);
            prop_assert_eq!(once, twice);
        }

        #[test]
        fn test_query_pairs_count_list_items(items in prop::collection::vec(tag(), 0..8)) {
            let mut params = QueryParams::new();
            params.insert("tags".into(), ParamValue::List(items.clone()));
            params.insert("min_rating".into(), ParamValue::Num(0.0));
            let pairs = to_query_pairs(&params);
            prop_assert_eq!(pairs.len(), items.len() + 1);
            prop_assert!(pairs.iter().all(|(k, _)| k == "tags" || k == "min_rating"));
        }

        #[test]
        fn test_cache_key_independent_of_insertion_order(params in plain_params()) {
            let forward: QueryParams = params.clone().into_iter().collect();
            let reversed: QueryParams = params.into_iter().rev().collect();
            let a = RequestKey::new("/x", RequestConfig::get().with_params(forward));
            let b = RequestKey::new("/x", RequestConfig::get().with_params(reversed));
            prop_assert_eq!(a.cache_key(), b.cache_key());
        }

        #[test]
        fn test_metric_query_rating_bounds(rating in prop::option::of(-10.0f64..10.0)) {
            let extra = ExtraFilters { rating, ..ExtraFilters::default() };
            let query = build_metric_query(None, &extra);
            prop_assert_eq!(query.min_rating, Some(rating.unwrap_or(0.0)));
            prop_assert_eq!(query.max_rating, Some(5.0));
        }

        #[test]
        fn test_presets_are_ordered_ranges(offset in 0i64..3650) {
            let today = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap() + chrono::Duration::days(offset);
            for period in [PeriodKey::Today, PeriodKey::Yesterday, PeriodKey::Week, PeriodKey::Month, PeriodKey::Quarter] {
                let range = period.range_for(today).unwrap();
                prop_assert!(range.from <= range.to);
                if period != PeriodKey::Yesterday {
                    prop_assert!(range.from <= today && today <= range.to);
                }
            }
        }
    }
}
