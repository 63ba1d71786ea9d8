//! Dashboard page; the competitors page reuses it with a bank name.

use sentiview_core::RawKey;
use sentiview_views::MapContext;
use sentiview_views::bars::{BackendHistogram, ClusterBars, map_histogram};
use sentiview_views::kpi::{BackendMetric, KpiCard, KpiMetric};
use sentiview_views::line::{BackendTimeseries, FillMissing, KvTimeseriesMapper, LineTimeseries, with_title};
use sentiview_views::treemap::{BackendTreemap, TreemapResponse, map_treemap};

use super::with_concurrent;
use crate::block::{Block, KeySpec};

/// Top tags in the sentiment histogram.
pub const HISTOGRAM_TOP_N: u32 = 5;

/// A line chart block mapping through `mapper` and titled `title`.
pub(crate) fn timeline(
    name: &str,
    key: impl Into<KeySpec>,
    mapper: KvTimeseriesMapper,
    title: &'static str,
) -> Block<BackendTimeseries, LineTimeseries> {
    Block::new(name, key, move |api: BackendTimeseries, _: &MapContext| {
        with_title(mapper.map(api), Some(title))
    })
}

/// KPI card for `metric`.
pub fn kpi(metric: KpiMetric, concurrent: Option<&str>) -> Block<BackendMetric, KpiCard> {
    Block::new(
        metric.name(),
        with_concurrent(metric.path(), concurrent),
        move |api: BackendMetric, ctx: &MapContext| metric.map(api, ctx),
    )
}

/// Every KPI card, in dashboard order.
pub fn kpis(concurrent: Option<&str>) -> Vec<Block<BackendMetric, KpiCard>> {
    KpiMetric::ALL.into_iter().map(|m| kpi(m, concurrent)).collect()
}

/// Review count over time.
pub fn count_timeline(concurrent: Option<&str>) -> Block<BackendTimeseries, LineTimeseries> {
    timeline(
        "count_timeline",
        with_concurrent("/timeline/count_timeline", concurrent),
        KvTimeseriesMapper::new(FillMissing::Zero),
        "Количество отзывов",
    )
}

/// Average rating over time.
pub fn rating_timeline(concurrent: Option<&str>) -> Block<BackendTimeseries, LineTimeseries> {
    timeline(
        "rating_timeline",
        with_concurrent("/timeline/rating_timeline", concurrent),
        KvTimeseriesMapper::new(FillMissing::Null).with_y_left_domain(Some(0.0), Some(5.0)),
        "Рейтинг",
    )
}

/// Top tags split by sentiment.
pub fn tags_sentiment_histogram(concurrent: Option<&str>) -> Block<BackendHistogram, ClusterBars> {
    let key = match with_concurrent("/histograms/tags_sentiment_histogram", concurrent) {
        RawKey::Tuple(url, config) => RawKey::Tuple(url, config.param("top_n", HISTOGRAM_TOP_N)),
        other => other,
    };
    Block::new("tags_sentiment_histogram", key, map_histogram)
}

/// Tag volume and sentiment treemap.
pub fn tags_treemap(concurrent: Option<&str>) -> Block<BackendTreemap, TreemapResponse> {
    Block::new(
        "tags_treemap",
        with_concurrent("/unusual_graphics/tags_treemap", concurrent),
        |api: BackendTreemap, _: &MapContext| map_treemap(api),
    )
}
