//! Tag scatter plots: one series per characteristic.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::primitives::Id;

/// Label used for points without a characteristic.
pub const UNLABELED: &str = "—";

/// Raw scatter payload.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackendScatter {
    /// Chart id.
    pub id: Id,
    /// Title.
    #[serde(default)]
    pub title: Option<String>,
    /// X axis label.
    #[serde(default)]
    pub x_label: Option<String>,
    /// Y axis label.
    #[serde(default)]
    pub y_label: Option<String>,
    /// Average sentiment reference line.
    #[serde(default)]
    pub avg_sentiment: Option<f64>,
    /// Points.
    #[serde(default)]
    pub points: Vec<BackendPoint>,
    /// Colour legend.
    #[serde(default)]
    pub legend: Vec<LegendEntry>,
}

/// Raw point.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct BackendPoint {
    /// X.
    pub x: f64,
    /// Y.
    pub y: f64,
    /// Colour, kept only when it is a hex code.
    #[serde(default)]
    pub color: Option<String>,
    /// Characteristic.
    #[serde(default)]
    pub label: Option<String>,
    /// Point size.
    #[serde(default)]
    pub mentions: Option<f64>,
    /// Sentiment for the tooltip.
    #[serde(default)]
    pub sentiment: Option<f64>,
}

/// Legend entry.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LegendEntry {
    /// Colour.
    pub color: String,
    /// Characteristic.
    pub label: String,
}

/// Plotted point.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScatterDatum {
    /// X.
    pub x: f64,
    /// Y.
    pub y: f64,
    /// Point size.
    pub mentions: f64,
    /// Sentiment.
    pub sentiment: f64,
    /// Characteristic.
    pub characteristic: String,
}

/// One series.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScatterSeries {
    /// Series id.
    pub id: Id,
    /// Legend name.
    pub name: String,
    /// Points.
    pub data: Vec<ScatterDatum>,
    /// Field holding x.
    pub x_key: &'static str,
    /// Field holding y.
    pub y_key: &'static str,
    /// Field holding the size.
    pub size_key: &'static str,
    /// Colour of the first point.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color_hex: Option<String>,
}

/// Chart-ready scatter.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScatterBlock {
    /// Series in first-seen order.
    pub series: Vec<ScatterSeries>,
    /// Average sentiment.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avg_sentiment: Option<f64>,
    /// X axis label.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub x_label: Option<String>,
    /// Y axis label.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub y_label: Option<String>,
    /// Title.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

/// Returns the trimmed colour when it is `#RGB` or `#RRGGBB`.
pub fn as_hex(color: Option<&str>) -> Option<String> {
    let s = color?.trim();
    let digits = s.strip_prefix('#')?;
    let valid = matches!(digits.len(), 3 | 6) && digits.chars().all(|c| c.is_ascii_hexdigit());
    valid.then(|| s.to_string())
}

/// Groups points into series by characteristic.
pub fn map_scatter(payload: BackendScatter) -> ScatterBlock {
    let legend: HashMap<&str, &str> = payload
        .legend
        .iter()
        .map(|l| (l.label.as_str(), l.color.as_str()))
        .collect();

    let mut series: Vec<ScatterSeries> = Vec::new();
    for p in &payload.points {
        let characteristic = p.label.clone().unwrap_or_else(|| UNLABELED.to_string());
        let color = as_hex(
            p.color
                .as_deref()
                .or_else(|| legend.get(characteristic.as_str()).copied()),
        );
        let datum = ScatterDatum {
            x: p.x,
            y: p.y,
            mentions: p.mentions.unwrap_or(0.0),
            sentiment: p.sentiment.unwrap_or(p.y),
            characteristic: characteristic.clone(),
        };

        let name = if characteristic.is_empty() {
            "All".to_string()
        } else {
            characteristic
        };
        match series.iter_mut().find(|s| s.name == name) {
            Some(existing) => existing.data.push(datum),
            None => series.push(ScatterSeries {
                id: Id::Str(name.clone()),
                name,
                data: vec![datum],
                x_key: "x",
                y_key: "y",
                size_key: "mentions",
                color_hex: color,
            }),
        }
    }

    ScatterBlock {
        series,
        avg_sentiment: payload.avg_sentiment,
        x_label: payload.x_label,
        y_label: payload.y_label,
        title: payload.title,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_as_hex() {
        assert_eq!(as_hex(Some(" #aBc ")).as_deref(), Some("#aBc"));
        assert_eq!(as_hex(Some("#112233")).as_deref(), Some("#112233"));
        assert!(as_hex(Some("#1122")).is_none());
        assert!(as_hex(Some("red")).is_none());
        assert!(as_hex(None).is_none());
    }

    #[test]
    fn test_points_grouped_by_label() {
        let payload: BackendScatter = serde_json::from_value(json!({
            "id": "scatter",
            "title": "Теги",
            "xLabel": "Упоминания",
            "yLabel": "Рейтинг",
            "avgSentiment": 3.4,
            "points": [
                { "x": 1, "y": 4, "label": "app", "mentions": 10 },
                { "x": 2, "y": 2, "color": "#f00" },
                { "x": 3, "y": 5, "label": "app", "sentiment": 80 },
                { "x": 4, "y": 1, "label": "" }
            ],
            "legend": [{ "label": "app", "color": "#00ff00" }]
        }))
        .unwrap();

        let block = map_scatter(payload);
        let names: Vec<&str> = block.series.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["app", "—", "All"]);

        let app = &block.series[0];
        assert_eq!(app.color_hex.as_deref(), Some("#00ff00"));
        assert_eq!(app.data.len(), 2);
        assert_eq!(app.data[0].sentiment, 4.0);
        assert_eq!(app.data[1].sentiment, 80.0);
        assert_eq!(app.data[1].mentions, 0.0);

        assert_eq!(block.series[1].color_hex.as_deref(), Some("#f00"));
        assert_eq!(block.series[2].data[0].characteristic, "");
        assert_eq!(block.avg_sentiment, Some(3.4));
    }
}
