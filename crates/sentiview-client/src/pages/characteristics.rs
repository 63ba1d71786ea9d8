//! Characteristics (tags) page.

use std::time::Duration;

use sentiview_core::{RawKey, RequestConfig, TagsStrategy};
use sentiview_views::MapContext;
use sentiview_views::bars::{BackendHistogram, ClusterBars};
use sentiview_views::filters::DistinctTags;
use sentiview_views::heatmap::{BackendHeatmap, HeatmapData, map_heatmap};
use sentiview_views::line::{BackendTimeseries, FillMissing, KvTimeseriesMapper, LineTimeseries};
use sentiview_views::pie::{BackendPie, PieResponse, map_pie};
use sentiview_views::scatter::{BackendScatter, ScatterBlock, map_scatter};
use sentiview_views::search::{ThemeSearchResponse, search_theme};

use super::dashboard::{tags_sentiment_histogram, timeline};
use super::with_tags;
use crate::block::{Block, KeySpec};

/// Refresh period of the tag timelines.
pub const TAG_TIMELINE_REFRESH: Duration = Duration::from_secs(30);

/// Tag co-occurrence heatmap.
pub fn tags_correlation() -> Block<BackendHeatmap, HeatmapData> {
    Block::new(
        "tags_correlation",
        "/unusual_graphics/tags_correlation",
        |api: BackendHeatmap, _: &MapContext| map_heatmap(api),
    )
    .dedupe(Duration::from_secs(60))
}

/// Tag mentions against sentiment.
pub fn tags_scatter() -> Block<BackendScatter, ScatterBlock> {
    Block::new(
        "tags_scatter",
        "/unusual_graphics/tags_scatter",
        |api: BackendScatter, _: &MapContext| map_scatter(api),
    )
}

fn pie(name: &str, url: &str) -> Block<BackendPie, PieResponse> {
    Block::new(name, url, |api: BackendPie, _: &MapContext| map_pie(api))
}

/// Share of positive, neutral and negative reviews.
pub fn sentiment_distribution() -> Block<BackendPie, PieResponse> {
    pie("sentiment_distribution", "/pie/sentiment_distribution")
}

/// Share of reviews per service.
pub fn service_distribution() -> Block<BackendPie, PieResponse> {
    pie("service_distribution", "/pie/service_distribution")
}

/// Tag histogram, same as on the dashboard.
pub fn histogram() -> Block<BackendHistogram, ClusterBars> {
    tags_sentiment_histogram(None)
}

/// Every known tag.
pub fn distinct_tags() -> Block<DistinctTags, DistinctTags> {
    Block::new(
        "distinct_tags",
        RawKey::Tuple("/filter/distinct_tags".into(), RequestConfig::get().with_params(Default::default())),
        |api: DistinctTags, _: &MapContext| api,
    )
}

fn tag_timeline(
    name: &str,
    url: &str,
    tags: &[String],
    mapper: KvTimeseriesMapper,
    title: &'static str,
) -> Block<BackendTimeseries, LineTimeseries> {
    timeline(name, with_tags(url, tags), mapper, title)
        .tags_strategy(TagsStrategy::Base)
        .refresh(TAG_TIMELINE_REFRESH)
        .dedupe(Duration::ZERO)
}

/// Mentions of the selected tags over time. Global tags are ignored.
pub fn tags_count_timeline(tags: &[String]) -> Block<BackendTimeseries, LineTimeseries> {
    tag_timeline(
        "tags_count_timeline",
        "/timeline/tags_count_timeline",
        tags,
        KvTimeseriesMapper::new(FillMissing::Zero),
        "Динамика количества характеристик",
    )
}

/// Average rating of the selected tags over time. Global tags are ignored.
pub fn avg_tags_mark(tags: &[String]) -> Block<BackendTimeseries, LineTimeseries> {
    tag_timeline(
        "avg_tags_mark",
        "/timeline/avg_tags_mark",
        tags,
        KvTimeseriesMapper::new(FillMissing::Null).with_y_left_domain(Some(0.0), Some(5.0)),
        "Динамика сентимента характеристик",
    )
}

/// Nearest comments for a free-text theme; disabled while the theme is blank.
pub fn theme_search(theme: &str) -> Block<ThemeSearchResponse, ThemeSearchResponse> {
    let key: KeySpec = search_theme(theme)
        .map(|theme| {
            RawKey::Tuple(
                "/searching/find_nearest_comments".into(),
                RequestConfig::get().param("theme", theme),
            )
        })
        .into();
    Block::new("find_nearest_comments", key, |api: ThemeSearchResponse, _: &MapContext| api)
        .dedupe(Duration::from_secs(30))
}
