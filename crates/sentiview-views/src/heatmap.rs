//! Tag correlation heatmaps.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::primitives::Id;

/// Raw correlation payload.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackendHeatmap {
    /// Chart id.
    pub id: Id,
    /// Title.
    #[serde(default)]
    pub title: Option<String>,
    /// Tags covered by the matrix.
    #[serde(default)]
    pub tags: Vec<String>,
    /// Matrix cells.
    #[serde(default)]
    pub data: Vec<BackendCell>,
    /// Value bounds, e.g. `[0, 100]`.
    #[serde(default)]
    pub value_range: Option<Vec<f64>>,
}

/// Raw matrix cell.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackendCell {
    /// Column tag.
    pub x_tag: String,
    /// Row tag.
    pub y_tag: String,
    /// Cell value.
    pub value: f64,
}

/// Chart cell.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HeatmapCell {
    /// Column.
    pub x: String,
    /// Row.
    pub y: String,
    /// Value.
    pub v: f64,
}

/// Axis labels and value bounds.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HeatmapMeta {
    /// Column axis label.
    pub x_label: String,
    /// Row axis label.
    pub y_label: String,
    /// Value label.
    pub v_label: String,
    /// Lowest value.
    pub v_min: Option<f64>,
    /// Highest value.
    pub v_max: Option<f64>,
    /// Decimals shown in tooltips.
    pub decimals: u8,
}

/// Chart-ready heatmap.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HeatmapData {
    /// Column order.
    pub x_order: Vec<String>,
    /// Row order.
    pub y_order: Vec<String>,
    /// Cells.
    pub cells: Vec<HeatmapCell>,
    /// Labels and bounds.
    pub meta: HeatmapMeta,
}

fn first_seen<'a>(items: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for item in items {
        if !out.iter().any(|seen| seen == item) {
            out.push(item.to_string());
        }
    }
    out
}

fn bounds(values: &[f64]) -> Option<(f64, f64)> {
    if values.is_empty() {
        return None;
    }
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    Some((min, max))
}

/// Maps a correlation payload.
pub fn map_heatmap(payload: BackendHeatmap) -> HeatmapData {
    let cells: Vec<HeatmapCell> = payload
        .data
        .into_iter()
        .map(|c| HeatmapCell {
            x: c.x_tag,
            y: c.y_tag,
            v: c.value,
        })
        .collect();

    let x_order = first_seen(cells.iter().map(|c| c.x.as_str()));
    let y_order = first_seen(cells.iter().map(|c| c.y.as_str()));

    let range = payload
        .value_range
        .as_deref()
        .filter(|r| !r.is_empty())
        .and_then(bounds)
        .or_else(|| bounds(&cells.iter().map(|c| c.v).collect::<Vec<_>>()));

    HeatmapData {
        x_order,
        y_order,
        cells,
        meta: HeatmapMeta {
            x_label: "X tag".into(),
            y_label: "Y tag".into(),
            v_label: "value".into(),
            v_min: range.map(|(min, _)| min),
            v_max: range.map(|(_, max)| max),
            decimals: 2,
        },
    }
}

// ============================================================================
// Palettes
// ============================================================================

/// Cell colour scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Palette {
    /// Yellow to green.
    #[default]
    Green,
    /// Orange to red.
    Red,
    /// Cyan to blue.
    Blue,
    /// Light to dark gray.
    Gray,
}

impl FromStr for Palette {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "green" => Ok(Palette::Green),
            "red" => Ok(Palette::Red),
            "blue" => Ok(Palette::Blue),
            "gray" => Ok(Palette::Gray),
            other => Err(format!("unknown palette '{other}'")),
        }
    }
}

fn lerp(a: f64, b: f64, t: f64) -> f64 {
    a + (b - a) * t
}

impl Palette {
    /// Colour of `v` within `[min, max]`.
    pub fn color(self, v: f64, min: f64, max: f64) -> String {
        let t = ((v - min) / (max - min).max(1e-9)).clamp(0.0, 1.0);
        match self {
            Palette::Green => format!("hsl({} 70% 45%)", lerp(60.0, 140.0, t).round()),
            Palette::Red => format!("hsl({} 70% 50%)", lerp(10.0, 0.0, t).round()),
            Palette::Blue => format!("hsl({} 70% 50%)", lerp(190.0, 230.0, t).round()),
            Palette::Gray => format!("hsl(0 0% {}%)", lerp(90.0, 25.0, t).round()),
        }
    }
}

impl HeatmapData {
    /// Colour of every cell, in cell order; `None` when there are no bounds.
    pub fn colors(&self, palette: Palette) -> Option<Vec<String>> {
        let (min, max) = (self.meta.v_min?, self.meta.v_max?);
        Some(self.cells.iter().map(|c| palette.color(c.v, min, max)).collect())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    fn payload(value: serde_json::Value) -> BackendHeatmap {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_axes_in_first_seen_order() {
        let heatmap = map_heatmap(payload(json!({
            "id": "corr",
            "title": "t",
            "tags": [],
            "data": [
                { "xTag": "b", "yTag": "y1", "value": 3 },
                { "xTag": "a", "yTag": "y2", "value": -1 },
                { "xTag": "b", "yTag": "y1", "value": 7 }
            ]
        })));
        assert_eq!(heatmap.x_order, vec!["b", "a"]);
        assert_eq!(heatmap.y_order, vec!["y1", "y2"]);
        assert_eq!(heatmap.meta.v_min, Some(-1.0));
        assert_eq!(heatmap.meta.v_max, Some(7.0));
        assert_eq!(heatmap.meta.decimals, 2);
    }

    #[test]
    fn test_value_range_wins() {
        let heatmap = map_heatmap(payload(json!({
            "id": 1,
            "data": [{ "xTag": "a", "yTag": "b", "value": 40 }],
            "valueRange": [100, 0]
        })));
        assert_eq!(heatmap.meta.v_min, Some(0.0));
        assert_eq!(heatmap.meta.v_max, Some(100.0));
    }

    #[test]
    fn test_empty_heatmap_has_no_bounds() {
        let heatmap = map_heatmap(payload(json!({ "id": 1, "data": [], "valueRange": [] })));
        assert!(heatmap.meta.v_min.is_none());
        assert!(heatmap.colors(Palette::Green).is_none());
    }

    #[test]
    fn test_palette_endpoints() {
        assert_eq!(Palette::Green.color(0.0, 0.0, 10.0), "hsl(60 70% 45%)");
        assert_eq!(Palette::Green.color(10.0, 0.0, 10.0), "hsl(140 70% 45%)");
        assert_eq!(Palette::Red.color(5.0, 0.0, 10.0), "hsl(5 70% 50%)");
        assert_eq!(Palette::Blue.color(99.0, 0.0, 10.0), "hsl(230 70% 50%)");
        assert_eq!(Palette::Gray.color(-5.0, 0.0, 10.0), "hsl(0 0% 90%)");
    }

    #[test]
    fn test_flat_range_does_not_divide_by_zero() {
        assert_eq!(Palette::Green.color(3.0, 3.0, 3.0), "hsl(60 70% 45%)");
    }

    #[test]
    fn test_palette_from_str() {
        assert_eq!("gray".parse::<Palette>().unwrap(), Palette::Gray);
        assert!("pink".parse::<Palette>().is_err());
    }
}
