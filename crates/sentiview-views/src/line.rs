//! Line timeseries.
//!
//! The backend sends each point as `{ t, value: { seriesKey: number|null } }`.
//! [`KvTimeseriesMapper`] flattens that into [`TsPoint`]s with one entry per
//! series, filling gaps according to [`FillMissing`].

use std::collections::HashMap;

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};

use crate::primitives::{Id, finite};

/// Axis bounds; `None` lets the chart pick.
pub type Domain = (Option<f64>, Option<f64>);

/// Raw timeseries payload.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackendTimeseries {
    /// Chart id.
    pub id: Id,
    /// Title.
    #[serde(default)]
    pub title: Option<String>,
    /// Points in arbitrary order.
    #[serde(default)]
    pub data: Vec<BackendTsRow>,
    /// Series definitions, when the backend provides them.
    #[serde(default)]
    pub series: Option<Vec<BackendSeriesDef>>,
    /// Left axis bounds.
    #[serde(default)]
    pub y_left_domain: Option<Domain>,
    /// Right axis bounds.
    #[serde(default)]
    pub y_right_domain: Option<Domain>,
}

/// One raw point.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct BackendTsRow {
    /// Timestamp or date.
    pub t: String,
    /// Values by series key.
    #[serde(default)]
    pub value: Option<Map<String, Value>>,
}

/// Raw series definition.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackendSeriesDef {
    /// Series key.
    pub key: String,
    /// Display label.
    #[serde(default)]
    pub label: Option<String>,
    /// Axis the series is plotted on.
    #[serde(default)]
    pub y_axis: Option<YAxis>,
}

/// Vertical axis side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum YAxis {
    /// Left axis.
    #[default]
    Left,
    /// Right axis.
    Right,
}

/// Series shown on the chart.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SeriesDef {
    /// Key into [`TsPoint`] values.
    pub key: String,
    /// Display label.
    pub label: String,
    /// Axis side.
    pub y_axis: YAxis,
}

/// One chart point: `t` plus a value per series, in series order.
#[derive(Debug, Clone, PartialEq)]
pub struct TsPoint {
    /// Timestamp or date.
    pub t: String,
    /// `(series key, value)` pairs.
    pub values: Vec<(String, Option<f64>)>,
}

impl TsPoint {
    /// Value of a series at this point (`Some(None)` is an explicit gap).
    pub fn get(&self, key: &str) -> Option<Option<f64>> {
        self.values.iter().find(|(k, _)| k == key).map(|(_, v)| *v)
    }
}

impl Serialize for TsPoint {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.values.len() + 1))?;
        map.serialize_entry("t", &self.t)?;
        for (key, value) in &self.values {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

/// Chart-ready line timeseries.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LineTimeseries {
    /// Chart id.
    pub id: Id,
    /// Title.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Points.
    pub data: Vec<TsPoint>,
    /// Series.
    pub series: Vec<SeriesDef>,
    /// Left axis bounds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub y_left_domain: Option<Domain>,
    /// Right axis bounds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub y_right_domain: Option<Domain>,
}

/// What a missing, null or NaN value becomes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FillMissing {
    /// `0`; counts.
    #[default]
    Zero,
    /// A gap; averages.
    Null,
}

/// Maps key/value timeseries payloads.
#[derive(Debug, Clone, PartialEq)]
pub struct KvTimeseriesMapper {
    /// Gap filling.
    pub fill_missing: FillMissing,
    /// Label overrides by series key.
    pub label_by_key: HashMap<String, String>,
    /// Forced left axis bounds.
    pub y_left_domain: Option<Domain>,
    /// Forced right axis bounds.
    pub y_right_domain: Option<Domain>,
    /// Sort points by `t`.
    pub sort_asc: bool,
}

impl Default for KvTimeseriesMapper {
    fn default() -> Self {
        Self {
            fill_missing: FillMissing::Zero,
            label_by_key: HashMap::new(),
            y_left_domain: None,
            y_right_domain: None,
            sort_asc: true,
        }
    }
}

impl KvTimeseriesMapper {
    /// Mapper with the given gap filling.
    pub fn new(fill_missing: FillMissing) -> Self {
        Self {
            fill_missing,
            ..Self::default()
        }
    }

    /// Forces the left axis bounds.
    pub fn with_y_left_domain(mut self, min: Option<f64>, max: Option<f64>) -> Self {
        self.y_left_domain = Some((min, max));
        self
    }

    /// Overrides a series label.
    pub fn with_label(mut self, key: impl Into<String>, label: impl Into<String>) -> Self {
        self.label_by_key.insert(key.into(), label.into());
        self
    }

    /// Maps a payload.
    pub fn map(&self, api: BackendTimeseries) -> LineTimeseries {
        let mut rows = api.data;
        let series = self.series_for(api.series.as_deref(), &rows);

        if self.sort_asc {
            rows.sort_by(|a, b| a.t.cmp(&b.t));
        }

        let data = rows
            .into_iter()
            .map(|row| {
                let value = row.value.unwrap_or_default();
                let values = series
                    .iter()
                    .map(|s| {
                        let v = finite(value.get(&s.key)).or(match self.fill_missing {
                            FillMissing::Zero => Some(0.0),
                            FillMissing::Null => None,
                        });
                        (s.key.clone(), v)
                    })
                    .collect();
                TsPoint { t: row.t, values }
            })
            .collect();

        LineTimeseries {
            id: api.id,
            title: api.title,
            data,
            series,
            y_left_domain: self.y_left_domain.or(api.y_left_domain),
            y_right_domain: self.y_right_domain.or(api.y_right_domain),
        }
    }

    fn series_for(&self, declared: Option<&[BackendSeriesDef]>, rows: &[BackendTsRow]) -> Vec<SeriesDef> {
        if let Some(declared) = declared.filter(|d| !d.is_empty()) {
            return declared
                .iter()
                .map(|s| SeriesDef {
                    key: s.key.clone(),
                    label: self
                        .label_by_key
                        .get(&s.key)
                        .or(s.label.as_ref())
                        .unwrap_or(&s.key)
                        .clone(),
                    y_axis: s.y_axis.unwrap_or_default(),
                })
                .collect();
        }

        let mut keys: Vec<&String> = Vec::new();
        for value in rows.iter().filter_map(|r| r.value.as_ref()) {
            for key in value.keys() {
                if !keys.contains(&key) {
                    keys.push(key);
                }
            }
        }
        keys.into_iter()
            .map(|key| SeriesDef {
                key: key.clone(),
                label: self.label_by_key.get(key).unwrap_or(key).clone(),
                y_axis: YAxis::Left,
            })
            .collect()
    }
}

/// Replaces the title when one is given.
pub fn with_title(mut line: LineTimeseries, title: Option<&str>) -> LineTimeseries {
    if let Some(title) = title.filter(|t| !t.is_empty()) {
        line.title = Some(title.to_string());
    }
    line
}
