//! Finance page.

use sentiview_core::TagsStrategy;
use sentiview_views::MapContext;
use sentiview_views::bars::{BackendHistogram, ClusterBars, map_histogram};
use sentiview_views::filters::DistinctTags;
use sentiview_views::line::{BackendTimeseries, FillMissing, KvTimeseriesMapper, LineTimeseries};

use super::characteristics;
use super::dashboard::timeline;
use super::{FIVE_MINUTES, with_tags};
use crate::block::Block;

/// Financial tags split by sentiment.
pub fn fin_tags_sentiment_histogram() -> Block<BackendHistogram, ClusterBars> {
    Block::new(
        "fin_tags_sentiment_histogram",
        "/histograms/fin_tags_sentiment_histogram",
        |api: BackendHistogram, ctx: &MapContext| map_histogram(api, ctx),
    )
}

/// Sentiment of financial tags against the key rate. Only the selected
/// tag is sent; global tags are ignored.
pub fn fin_tags_mark(tag: Option<&str>) -> Block<BackendTimeseries, LineTimeseries> {
    let tags: Vec<String> = tag
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .into_iter()
        .collect();
    timeline(
        "key_rate_tags_mark_correlation",
        with_tags("/timeline/key_rate_tags_mark_correlation", &tags),
        KvTimeseriesMapper::new(FillMissing::Null).with_y_left_domain(Some(0.0), Some(5.0)),
        "Динамика сентимента финансовых тегов",
    )
    .tags_strategy(TagsStrategy::Base)
    .dedupe(FIVE_MINUTES)
}

/// Tag list for the tag picker.
pub fn distinct_tags() -> Block<DistinctTags, DistinctTags> {
    characteristics::distinct_tags().dedupe(FIVE_MINUTES)
}
