//! Pie charts (sentiment and service distributions).

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::primitives::Id;

/// Raw distribution payload.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackendPie {
    /// Chart id.
    pub id: Id,
    /// Title.
    #[serde(default)]
    pub title: Option<String>,
    /// Slices.
    #[serde(default)]
    pub data: Vec<BackendSlice>,
    /// Caption in the middle of the donut.
    #[serde(default)]
    pub central_value: Option<CenterValue>,
}

/// Raw slice. The value is kept loose because the backend sometimes sends
/// strings.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct BackendSlice {
    /// Category name.
    #[serde(default)]
    pub name: Option<String>,
    /// Slice value.
    #[serde(default)]
    pub value: Value,
}

/// Label and value shown in the middle of the donut.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CenterValue {
    /// Caption.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// Value text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

/// Chart slice.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PieSlice {
    /// Stable key.
    pub key: String,
    /// Legend label.
    pub label: String,
    /// Value.
    pub value: f64,
    /// Fill colour.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color_hex: Option<String>,
}

/// Chart-ready pie.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PieResponse {
    /// Chart id.
    pub id: Id,
    /// Title.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Slices in payload order.
    pub slices: Vec<PieSlice>,
    /// Donut caption.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub center: Option<CenterValue>,
}

/// Maps a distribution payload.
pub fn map_pie(payload: BackendPie) -> PieResponse {
    let slices = payload
        .data
        .into_iter()
        .enumerate()
        .map(|(i, d)| PieSlice {
            key: d.name.clone().unwrap_or_else(|| format!("slice_{i}")),
            label: d.name.unwrap_or_else(|| format!("Категория {}", i + 1)),
            value: d.value.as_f64().unwrap_or(0.0),
            color_hex: None,
        })
        .collect();

    let non_empty = |s: &Option<String>| s.as_deref().is_some_and(|s| !s.is_empty());
    let center = payload
        .central_value
        .filter(|c| non_empty(&c.label) || non_empty(&c.value));

    PieResponse {
        id: payload.id,
        title: payload.title,
        slices,
        center,
    }
}
