//! Cluster bars: per-tag sentiment histograms.

use serde::{Deserialize, Serialize};

use crate::primitives::{Id, MapContext, TimeRange};

/// Title used when the backend sends none.
pub const DEFAULT_TITLE: &str = "Теги по тональностям";

/// Bar keys used when the backend sends none.
pub const DEFAULT_BAR_KEYS: [&str; 3] = ["positive", "neutral", "negative"];

/// Maps a display bar key to its data field; unknown keys pass through.
pub fn canonical_bar_key(key: &str) -> &str {
    match key {
        "Позитивные" => "positive",
        "Нейтральные" => "neutral",
        "Негативные" => "negative",
        "Упоминания" => "mentions",
        other => other,
    }
}

/// Raw histogram payload.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackendHistogram {
    /// Chart id.
    pub id: Id,
    /// Title.
    #[serde(default)]
    pub title: Option<String>,
    /// Rows.
    #[serde(default)]
    pub data: Vec<ClusterBarRow>,
    /// Series to draw, possibly with display names.
    #[serde(default)]
    pub bar_keys: Option<Vec<String>>,
    /// Stack the bars.
    #[serde(default)]
    pub stacked: Option<bool>,
    /// Normalize each bar to 100 %.
    #[serde(default, rename = "normalize100")]
    pub normalize_100: Option<bool>,
}

/// One category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterBarRow {
    /// Category.
    pub name: String,
    /// Volume.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mentions: Option<f64>,
    /// Positive reviews.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub positive: Option<f64>,
    /// Neutral reviews.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub neutral: Option<f64>,
    /// Negative reviews.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub negative: Option<f64>,
}

/// Chart-ready cluster bars.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterBars {
    /// Chart id.
    pub id: Id,
    /// Title.
    pub title: String,
    /// Covered period.
    pub period: TimeRange,
    /// Rows.
    pub data: Vec<ClusterBarRow>,
    /// Series in stack order.
    pub bar_keys: Vec<String>,
    /// Stacked.
    pub stacked: bool,
    /// Normalized to 100 %.
    #[serde(rename = "normalize100")]
    pub normalize_100: bool,
}

/// Maps a histogram payload.
pub fn map_histogram(api: BackendHistogram, ctx: &MapContext) -> ClusterBars {
    let mut bar_keys: Vec<String> = api
        .bar_keys
        .unwrap_or_default()
        .iter()
        .map(|k| canonical_bar_key(k).to_string())
        .filter(|k| !k.is_empty())
        .collect();
    if bar_keys.is_empty() {
        bar_keys = DEFAULT_BAR_KEYS.iter().map(|k| (*k).to_string()).collect();
    }

    ClusterBars {
        id: api.id,
        title: api.title.unwrap_or_else(|| DEFAULT_TITLE.to_string()),
        period: ctx.period_or_recent(),
        data: api.data,
        bar_keys,
        stacked: api.stacked.unwrap_or(true),
        normalize_100: api.normalize_100.unwrap_or(false),
    }
}
