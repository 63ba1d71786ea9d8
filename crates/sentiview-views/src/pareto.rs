//! Negative-review Pareto (80/20) charts.

use serde::{Deserialize, Serialize};

use crate::primitives::{Id, MapContext, TimeRange};

/// Title used when the backend sends none.
pub const DEFAULT_TITLE: &str = "Pareto-анализ негатива (80/20)";

/// Cut-off used when the backend sends none.
pub const DEFAULT_THRESHOLD: f64 = 0.8;

/// Raw Pareto payload.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackendPareto {
    /// Chart id.
    pub id: Id,
    /// Title.
    #[serde(default)]
    pub title: Option<String>,
    /// Rows sorted by `negative` descending.
    #[serde(default)]
    pub data: Vec<BackendParetoRow>,
    /// Whether `cumulative` is meant as 0..100.
    #[serde(default)]
    pub cumulative_as_percent: Option<bool>,
    /// Cut-off, either 0..1 or 0..100.
    #[serde(default)]
    pub threshold: Option<f64>,
}

/// Raw row; `cumulative` may be absolute or a percent.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct BackendParetoRow {
    /// Aspect.
    pub name: String,
    /// Negative volume.
    #[serde(default)]
    pub negative: Option<f64>,
    /// Running total.
    #[serde(default)]
    pub cumulative: Option<f64>,
}

/// Chart row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParetoRow {
    /// Aspect.
    pub name: String,
    /// Bar height.
    pub negative: f64,
    /// Line value.
    pub cumulative: f64,
}

/// Chart-ready Pareto.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParetoResponse {
    /// Chart id.
    pub id: Id,
    /// Title.
    pub title: String,
    /// Covered period.
    pub period: TimeRange,
    /// Rows.
    pub data: Vec<ParetoRow>,
    /// Whether `cumulative` is 0..100.
    pub cumulative_as_percent: bool,
    /// Cut-off as a fraction.
    pub threshold: f64,
}

/// Scales a threshold given as 0..100 down to a fraction.
pub fn normalize_threshold(threshold: Option<f64>) -> f64 {
    match threshold {
        Some(t) if t > 1.0 => t / 100.0,
        Some(t) => t,
        None => DEFAULT_THRESHOLD,
    }
}

/// Maps a Pareto payload.
///
/// With the percent flag set, cumulative values that do not already look
/// like percentages are rescaled against the last cumulative value, or the
/// sum of negatives when that is zero.
pub fn map_pareto(payload: BackendPareto, ctx: &MapContext) -> ParetoResponse {
    let rows = payload.data;
    let as_percent = payload.cumulative_as_percent.unwrap_or(false);
    let last = rows.last().and_then(|r| r.cumulative).unwrap_or(0.0);

    // A null cumulative counts as zero here, as it does in the dashboard.
    let looks_like_percent = last <= 100.0 && rows.iter().any(|r| r.cumulative.unwrap_or(0.0) <= 100.0);

    let scale = if as_percent && !looks_like_percent {
        let total = if last != 0.0 {
            last
        } else {
            rows.iter()
                .filter_map(|r| r.negative.filter(|n| n.is_finite()))
                .sum()
        };
        Some(total)
    } else {
        None
    };

    let data = rows
        .into_iter()
        .map(|r| {
            let cumulative = r.cumulative.unwrap_or(0.0);
            ParetoRow {
                name: r.name,
                negative: r.negative.unwrap_or(0.0),
                cumulative: match scale {
                    Some(total) if total != 0.0 => cumulative / total * 100.0,
                    Some(_) => 0.0,
                    None => cumulative,
                },
            }
        })
        .collect();

    ParetoResponse {
        id: payload.id,
        title: payload.title.unwrap_or_else(|| DEFAULT_TITLE.to_string()),
        period: ctx.period_or_recent(),
        data,
        cumulative_as_percent: as_percent,
        threshold: normalize_threshold(payload.threshold),
    }
}
