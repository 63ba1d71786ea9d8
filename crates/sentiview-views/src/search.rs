//! Theme search: reviews nearest to a free-text theme.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use sentiview_core::format::NumberOrText;

use crate::bars::ClusterBarRow;
use crate::pie::CenterValue;
use crate::primitives::TimeRange;
use crate::wordcloud::WordCloudResponse;

/// A single metric of the search result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThemeSearchMetric {
    /// Metric id.
    pub id: String,
    /// Value, when computed.
    #[serde(default)]
    pub value: Option<NumberOrText>,
    /// Unit.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
}

/// Pie slice of the search result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThemeSearchPieDatum {
    /// Category.
    pub name: String,
    /// Value.
    pub value: NumberOrText,
    /// Colour.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

/// Pie chart of the search result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThemeSearchPieChart {
    /// Chart id.
    pub id: String,
    /// Title.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Slices.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Vec<ThemeSearchPieDatum>>,
    /// Donut caption.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub central_value: Option<CenterValue>,
}

/// Tags closest to the theme, as cluster bars.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThemeSearchNearestTags {
    /// Chart id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Title.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Subtitle.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtitle: Option<String>,
    /// Rows.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Vec<ClusterBarRow>>,
    /// Covered period.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub period: Option<TimeRange>,
    /// Series.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bar_keys: Option<Vec<String>>,
    /// Stacked.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stacked: Option<bool>,
    /// Normalized to 100 %.
    #[serde(default, rename = "normalize100", skip_serializing_if = "Option::is_none")]
    pub normalize_100: Option<bool>,
}

/// Full search result; every section is optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ThemeSearchResponse {
    /// Metrics by name (`total_count`, `avg_sentiment`, `avg_rating`, ...).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metrics: Option<BTreeMap<String, ThemeSearchMetric>>,
    /// Word cloud of the matching reviews.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wordcloud: Option<WordCloudResponse>,
    /// Pies by name (`sentiment`, `services`, ...).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub piecharts: Option<BTreeMap<String, ThemeSearchPieChart>>,
    /// Nearest tags.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nearest_tags: Option<ThemeSearchNearestTags>,
}

impl ThemeSearchResponse {
    /// A metric by name.
    pub fn metric(&self, name: &str) -> Option<&ThemeSearchMetric> {
        self.metrics.as_ref()?.get(name)
    }

    /// A pie by name.
    pub fn pie(&self, name: &str) -> Option<&ThemeSearchPieChart> {
        self.piecharts.as_ref()?.get(name)
    }
}

/// The theme to search for, or `None` when it is blank.
pub fn search_theme(input: &str) -> Option<String> {
    let trimmed = input.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}
