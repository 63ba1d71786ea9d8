//! Tag volume/sentiment treemaps.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::primitives::Id;

/// Title used when the backend sends none.
pub const DEFAULT_TITLE: &str = "Объём и сентимент";

/// Raw treemap payload.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct BackendTreemap {
    /// Chart id.
    pub id: Id,
    /// Title.
    #[serde(default)]
    pub title: Option<String>,
    /// Leaves.
    #[serde(default)]
    pub data: Vec<BackendLeaf>,
}

/// Raw leaf; numbers may arrive as strings.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackendLeaf {
    /// Tag.
    #[serde(default)]
    pub name: Value,
    /// Volume.
    #[serde(default)]
    pub size: Value,
    /// Sentiment, 0..100.
    #[serde(default)]
    pub sentiment_score: Value,
    /// Fill colour.
    #[serde(default)]
    pub color: Option<String>,
}

/// Treemap node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TreemapNode {
    /// Rectangle label.
    pub name: String,
    /// Volume, for leaves.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<f64>,
    /// Sentiment, 0..100.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sentiment_score: Option<f64>,
    /// Fill colour; may be empty.
    #[serde(default)]
    pub color: String,
    /// Nested nodes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<TreemapNode>>,
}

/// Chart-ready treemap.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TreemapResponse {
    /// Chart id.
    pub id: Id,
    /// Title.
    pub title: String,
    /// Root volume.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<f64>,
    /// Root sentiment.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sentiment_score: Option<f64>,
    /// Nodes.
    #[serde(default)]
    pub data: Vec<TreemapNode>,
}

/// Either a full response or a bare leaf list.
#[derive(Debug, Clone, PartialEq)]
pub enum TreemapInput {
    /// Response with a title.
    Response(TreemapResponse),
    /// Leaves only.
    Leaves(Vec<TreemapNode>),
}

impl TreemapInput {
    fn nodes(&self) -> &[TreemapNode] {
        match self {
            TreemapInput::Response(r) => &r.data,
            TreemapInput::Leaves(nodes) => nodes,
        }
    }
}

/// Hierarchical root handed to the renderer.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TreemapRoot {
    /// Label.
    pub name: String,
    /// Volume.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<f64>,
    /// Sentiment.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sentiment_score: Option<f64>,
    /// Children.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<TreemapRoot>>,
}

fn loose_number(value: &Value) -> f64 {
    match value {
        Value::Number(n) => n.as_f64().unwrap_or(0.0),
        Value::String(s) if s.trim().is_empty() => 0.0,
        Value::String(s) => s.trim().parse().unwrap_or(f64::NAN),
        Value::Bool(b) => f64::from(u8::from(*b)),
        Value::Null => 0.0,
        _ => f64::NAN,
    }
}

fn loose_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => "null".to_string(),
        other => other.to_string(),
    }
}

/// Maps the tag treemap payload.
pub fn map_treemap(payload: BackendTreemap) -> TreemapResponse {
    let data = payload
        .data
        .into_iter()
        .map(|leaf| TreemapNode {
            name: loose_string(&leaf.name),
            size: Some(loose_number(&leaf.size)),
            sentiment_score: Some(loose_number(&leaf.sentiment_score)),
            color: leaf.color.unwrap_or_default(),
            children: None,
        })
        .collect();

    TreemapResponse {
        id: payload.id,
        title: payload.title.unwrap_or_else(|| DEFAULT_TITLE.to_string()),
        size: None,
        sentiment_score: None,
        data,
    }
}

/// Red-to-green hue for a 0..100 sentiment score; 50 when not finite.
pub fn fallback_color(sentiment_score: f64) -> String {
    let clamped = if sentiment_score.is_finite() {
        sentiment_score.clamp(0.0, 100.0)
    } else {
        50.0
    };
    format!("hsl({} 80% 50%)", (120.0 * clamped / 100.0).round())
}

/// Leaves with a guaranteed colour.
pub fn collect_leaves(input: &TreemapInput) -> Vec<TreemapNode> {
    input
        .nodes()
        .iter()
        .map(|n| {
            let size = n.size.unwrap_or(0.0);
            let sentiment_score = n.sentiment_score.unwrap_or(0.0);
            let color = if n.color.trim().is_empty() {
                fallback_color(sentiment_score)
            } else {
                n.color.clone()
            };
            TreemapNode {
                name: n.name.clone(),
                size: Some(size),
                sentiment_score: Some(sentiment_score),
                color,
                children: None,
            }
        })
        .collect()
}

/// Sum of leaf sizes.
pub fn total_size(input: &TreemapInput) -> f64 {
    input.nodes().iter().map(|n| n.size.unwrap_or(0.0)).sum()
}

fn to_root(node: &TreemapNode) -> TreemapRoot {
    TreemapRoot {
        name: node.name.clone(),
        size: node.size,
        sentiment_score: node.sentiment_score,
        children: node
            .children
            .as_ref()
            .map(|children| children.iter().map(to_root).collect()),
    }
}

/// Builds the renderer root; a leaf list is wrapped under `root`.
pub fn wrap_root(input: &TreemapInput) -> TreemapRoot {
    match input {
        TreemapInput::Leaves(nodes) => TreemapRoot {
            name: "root".to_string(),
            size: None,
            sentiment_score: None,
            children: Some(nodes.iter().map(to_root).collect()),
        },
        TreemapInput::Response(response) => TreemapRoot {
            name: response.title.clone(),
            size: response.size,
            sentiment_score: response.sentiment_score,
            children: Some(response.data.iter().map(to_root).collect()),
        },
    }
}
