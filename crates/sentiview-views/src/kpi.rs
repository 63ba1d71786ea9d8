//! KPI cards.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use sentiview_core::format::{Delta, NumberOrText, format_fixed, format_int, to_number_safe};

use crate::primitives::{Id, MapContext, TimeRange};

/// Raw metric payload: `{ id, value }` with the value usually a string.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct BackendMetric {
    /// Metric id.
    pub id: Id,
    /// Value as sent.
    #[serde(default)]
    pub value: Value,
}

impl BackendMetric {
    /// The value as text, ready for [`to_number_safe`].
    pub fn value_text(&self) -> String {
        match &self.value {
            Value::String(s) => s.clone(),
            Value::Null => String::new(),
            other => other.to_string(),
        }
    }
}

/// Sparkline point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SparkPoint {
    /// Timestamp.
    pub t: String,
    /// Value.
    pub v: f64,
}

/// Sparkline under the value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sparkline {
    /// Points.
    pub data: Vec<SparkPoint>,
}

/// Chart-ready KPI card.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KpiCard {
    /// Metric id.
    pub id: Id,
    /// Card title.
    pub title: String,
    /// Formatted value.
    pub value: String,
    /// Unit suffix.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    /// Comparison with the previous period.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compare: Option<Delta>,
    /// Covered period.
    pub period: TimeRange,
    /// Trend.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sparkline: Option<Sparkline>,
}

/// Dashboard metrics shown as KPI cards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KpiMetric {
    /// Number of reviews.
    CountComments,
    /// Average sentiment, percent.
    AverageSentiment,
    /// Average star rating.
    AverageMark,
    /// Tag with the most positive reviews.
    MostLikedCluster,
    /// Tag with the most negative reviews.
    MostDislikedCluster,
}

impl KpiMetric {
    /// Every card, in dashboard order.
    pub const ALL: [KpiMetric; 5] = [
        KpiMetric::CountComments,
        KpiMetric::AverageSentiment,
        KpiMetric::AverageMark,
        KpiMetric::MostLikedCluster,
        KpiMetric::MostDislikedCluster,
    ];

    /// Endpoint path.
    pub fn path(self) -> &'static str {
        match self {
            KpiMetric::CountComments => "/metrics/count_comments",
            KpiMetric::AverageSentiment => "/metrics/average_sentiment",
            KpiMetric::AverageMark => "/metrics/average_mark",
            KpiMetric::MostLikedCluster => "/metrics/most_liked_cluster",
            KpiMetric::MostDislikedCluster => "/metrics/most_disliked_cluster",
        }
    }

    /// Short name used by the CLI.
    pub fn name(self) -> &'static str {
        match self {
            KpiMetric::CountComments => "count_comments",
            KpiMetric::AverageSentiment => "average_sentiment",
            KpiMetric::AverageMark => "average_mark",
            KpiMetric::MostLikedCluster => "most_liked_cluster",
            KpiMetric::MostDislikedCluster => "most_disliked_cluster",
        }
    }

    /// Card title.
    pub fn title(self) -> &'static str {
        match self {
            KpiMetric::CountComments => "Количество отзывов",
            KpiMetric::AverageSentiment => "Средний уровень удовлетворённости клиентов",
            KpiMetric::AverageMark => "Средний рейтинг",
            KpiMetric::MostLikedCluster => "Лидер по положительным отзывам",
            KpiMetric::MostDislikedCluster => "Лидер по отрицательным отзывам",
        }
    }

    /// Unit suffix.
    pub fn unit(self) -> &'static str {
        match self {
            KpiMetric::AverageSentiment => "%",
            KpiMetric::AverageMark => "★",
            _ => "",
        }
    }

    fn format(self, raw: &str) -> String {
        let value = to_number_safe(raw);
        match (self, &value) {
            (KpiMetric::CountComments, NumberOrText::Number(n)) => format_int(*n),
            _ => format_fixed(&value, 2),
        }
    }

    /// Builds the card for a metric payload.
    pub fn map(self, api: BackendMetric, ctx: &MapContext) -> KpiCard {
        KpiCard {
            value: self.format(&api.value_text()),
            id: api.id,
            title: self.title().to_string(),
            unit: Some(self.unit().to_string()),
            compare: None,
            period: ctx.period_or_recent(),
            sparkline: None,
        }
    }
}

impl fmt::Display for KpiMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
