//! The chart catalog.
//!
//! One module per dashboard page, each exposing block constructors with
//! the endpoints, mappers and cache options that page uses. [`chart`]
//! looks a block up by name for callers that only deal in JSON.

pub mod characteristics;
pub mod dashboard;
pub mod filters;
pub mod finance;
pub mod persona;
pub mod reviews;

use std::time::Duration;

use sentiview_core::query::ParamValue;
use sentiview_core::{RawKey, RequestConfig};
use sentiview_views::kpi::KpiMetric;
use sentiview_views::reviews::CommentTableQuery;

use crate::block::DynBlock;

/// Dedupe window of slow-changing reference data.
pub const FIVE_MINUTES: Duration = Duration::from_secs(5 * 60);

/// A `GET url` carrying `concurrent` when one is given.
pub(crate) fn with_concurrent(url: &str, concurrent: Option<&str>) -> RawKey {
    let config = match concurrent {
        Some(bank) => RequestConfig::get().param("concurrent", bank),
        None => RequestConfig::get(),
    };
    RawKey::Tuple(url.to_string(), config)
}

/// A `GET url` carrying `tags` only when the list is non-empty.
pub(crate) fn with_tags(url: &str, tags: &[String]) -> RawKey {
    let config = if tags.is_empty() {
        RequestConfig::get().with_params(Default::default())
    } else {
        RequestConfig::get().param("tags", ParamValue::List(tags.to_vec()))
    };
    RawKey::Tuple(url.to_string(), config)
}

/// `url` narrowed to one tag, or the bare URL.
pub(crate) fn with_optional_tag(url: &str, tag: Option<&str>) -> RawKey {
    match tag.map(str::trim).filter(|t| !t.is_empty()) {
        Some(tag) => with_tags(url, &[tag.to_string()]),
        None => RawKey::from(url),
    }
}

// ============================================================================
// Catalog
// ============================================================================

/// Inputs some charts need beyond the global filter.
#[derive(Debug, Clone, Default)]
pub struct ChartArgs {
    /// Competitor bank for dashboard charts.
    pub concurrent: Option<String>,
    /// Local tags for tag timelines.
    pub tags: Vec<String>,
    /// Single tag for finance and persona charts.
    pub tag: Option<String>,
    /// Theme for the nearest-comments search.
    pub theme: Option<String>,
    /// Review table query.
    pub table: CommentTableQuery,
}

/// Every chart name [`chart`] accepts.
pub const CHART_NAMES: &[&str] = &[
    "count_comments",
    "average_sentiment",
    "average_mark",
    "most_liked_cluster",
    "most_disliked_cluster",
    "count_timeline",
    "rating_timeline",
    "tags_sentiment_histogram",
    "tags_treemap",
    "tags_correlation",
    "tags_scatter",
    "sentiment_distribution",
    "service_distribution",
    "distinct_tags",
    "tags_count_timeline",
    "avg_tags_mark",
    "find_nearest_comments",
    "fin_tags_sentiment_histogram",
    "key_rate_tags_mark_correlation",
    "wordcloud",
    "pareto",
    "comment_table_rows",
    "comment_count",
    "available_filter_values",
];

/// Looks a chart up by name.
pub fn chart(name: &str, args: &ChartArgs) -> Option<Box<dyn DynBlock>> {
    let concurrent = args.concurrent.as_deref();
    let tag = args.tag.as_deref();

    if let Some(metric) = KpiMetric::ALL.into_iter().find(|m| m.name() == name) {
        return Some(Box::new(dashboard::kpi(metric, concurrent)));
    }

    let block: Box<dyn DynBlock> = match name {
        "count_timeline" => Box::new(dashboard::count_timeline(concurrent)),
        "rating_timeline" => Box::new(dashboard::rating_timeline(concurrent)),
        "tags_sentiment_histogram" => Box::new(dashboard::tags_sentiment_histogram(concurrent)),
        "tags_treemap" => Box::new(dashboard::tags_treemap(concurrent)),
        "tags_correlation" => Box::new(characteristics::tags_correlation()),
        "tags_scatter" => Box::new(characteristics::tags_scatter()),
        "sentiment_distribution" => Box::new(characteristics::sentiment_distribution()),
        "service_distribution" => Box::new(characteristics::service_distribution()),
        "distinct_tags" => Box::new(characteristics::distinct_tags()),
        "tags_count_timeline" => Box::new(characteristics::tags_count_timeline(&args.tags)),
        "avg_tags_mark" => Box::new(characteristics::avg_tags_mark(&args.tags)),
        "find_nearest_comments" => Box::new(characteristics::theme_search(
            args.theme.as_deref().unwrap_or_default(),
        )),
        "fin_tags_sentiment_histogram" => Box::new(finance::fin_tags_sentiment_histogram()),
        "key_rate_tags_mark_correlation" => Box::new(finance::fin_tags_mark(tag)),
        "wordcloud" => Box::new(persona::wordcloud(tag)),
        "pareto" => Box::new(persona::negative_pareto(tag)),
        "comment_table_rows" => Box::new(reviews::comments_table(&args.table)),
        "comment_count" => Box::new(reviews::comments_count(&args.table)),
        "available_filter_values" => Box::new(filters::available_filter_values()),
        _ => return None,
    };
    Some(block)
}
