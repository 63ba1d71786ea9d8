//! Critical issue lists.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use sentiview_core::format::{format_int, format_percent};

use crate::primitives::Id;

/// Banner text when there are no rows.
pub const NO_DATA: &str = "Нет данных";

/// One problem area.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CriticalIssueRow {
    /// Row id.
    pub id: Id,
    /// Aspect name.
    pub aspect: String,
    /// Share of negative reviews, 0..1.
    pub negative_share: f64,
    /// Mentions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volume: Option<f64>,
    /// Explanation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Critical issues payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CriticalIssuesResponse {
    /// Last update, ISO.
    pub updated_at: String,
    /// Rows.
    #[serde(default)]
    pub rows: Vec<CriticalIssueRow>,
}

/// Sort column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SortKey {
    /// By negative share.
    #[default]
    NegativeShare,
    /// By volume; missing volume counts as 0.
    Volume,
    /// By aspect name.
    Aspect,
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDir {
    /// Ascending.
    Asc,
    /// Descending.
    #[default]
    Desc,
}

/// Presentation variant of an issue list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Variant {
    /// Problems, tagged with their negative share.
    #[default]
    Issue,
    /// Insights, tagged with their volume.
    Insight,
    /// Recommendations.
    Recommendation,
}

impl Variant {
    /// Badge text for a row, if the variant shows one.
    pub fn tag_label(self, row: &CriticalIssueRow) -> Option<String> {
        match self {
            Variant::Issue => Some(format!("{} негатива", format_percent(Some(row.negative_share)))),
            Variant::Insight => row.volume.map(|v| format!("{} упоминаний", format_int(v))),
            Variant::Recommendation => Some("Приоритет: высокий".to_string()),
        }
    }
}

fn compare(a: &CriticalIssueRow, b: &CriticalIssueRow, key: SortKey) -> Ordering {
    match key {
        SortKey::NegativeShare => a.negative_share.total_cmp(&b.negative_share),
        SortKey::Volume => a.volume.unwrap_or(0.0).total_cmp(&b.volume.unwrap_or(0.0)),
        SortKey::Aspect => a.aspect.cmp(&b.aspect),
    }
}

impl CriticalIssuesResponse {
    /// Rows sorted by `key`; ties keep their order.
    pub fn sort_rows(&self, key: SortKey, dir: SortDir) -> Vec<CriticalIssueRow> {
        let mut rows = self.rows.clone();
        rows.sort_by(|a, b| match dir {
            SortDir::Asc => compare(a, b, key),
            SortDir::Desc => compare(b, a, key),
        });
        rows
    }

    /// The first `limit` rows, or all of them.
    pub fn truncate(&self, limit: Option<usize>) -> &[CriticalIssueRow] {
        match limit {
            Some(limit) => &self.rows[..limit.min(self.rows.len())],
            None => &self.rows,
        }
    }
}

/// Preview line: the first non-blank description, else up to three aspects.
pub fn banner_text(rows: &[CriticalIssueRow]) -> String {
    if let Some(description) = rows
        .iter()
        .filter_map(|r| r.description.as_deref())
        .find(|d| !d.trim().is_empty())
    {
        return description.to_string();
    }
    let titles: Vec<&str> = rows.iter().take(3).map(|r| r.aspect.as_str()).collect();
    if titles.is_empty() {
        NO_DATA.to_string()
    } else {
        titles.join(" · ")
    }
}
