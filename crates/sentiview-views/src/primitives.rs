//! Primitives shared by every view model.

use std::fmt;

use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};

use sentiview_core::filter::DateRange;

/// Days covered by the fallback period when no range is selected.
pub const FALLBACK_PERIOD_DAYS: u64 = 30;

/// Backend identifier: string or number.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Id {
    /// Numeric id.
    Num(i64),
    /// String id.
    Str(String),
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Id::Num(n) => write!(f, "{n}"),
            Id::Str(s) => f.write_str(s),
        }
    }
}

impl From<&str> for Id {
    fn from(value: &str) -> Self {
        Id::Str(value.to_string())
    }
}

impl From<String> for Id {
    fn from(value: String) -> Self {
        Id::Str(value)
    }
}

impl From<i64> for Id {
    fn from(value: i64) -> Self {
        Id::Num(value)
    }
}

impl Default for Id {
    fn default() -> Self {
        Id::Str(String::new())
    }
}

/// Time bucket size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    /// Hourly.
    Hour,
    /// Daily.
    Day,
    /// Weekly.
    Week,
    /// Monthly.
    Month,
    /// Quarterly.
    Quarter,
}

/// Sentiment bucket of a review.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SentimentClass {
    /// Positive.
    Positive,
    /// Neutral.
    Neutral,
    /// Negative.
    Negative,
}

/// Period a view model covers, as ISO timestamps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    /// Start timestamp.
    pub from: String,
    /// End timestamp.
    pub to: String,
    /// Bucket size, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub granularity: Option<Granularity>,
}

impl From<DateRange> for TimeRange {
    fn from(range: DateRange) -> Self {
        let (from, to) = range.to_iso_pair();
        Self {
            from,
            to,
            granularity: None,
        }
    }
}

/// Filter context handed to mappers alongside the payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MapContext {
    /// Active filter range.
    pub period: Option<DateRange>,
    /// Day used for fallback periods.
    pub today: NaiveDate,
}

impl MapContext {
    /// Context for `period` relative to the local current date.
    pub fn new(period: Option<DateRange>) -> Self {
        Self {
            period,
            today: Local::now().date_naive(),
        }
    }

    /// Context with an explicit current date.
    pub fn at(period: Option<DateRange>, today: NaiveDate) -> Self {
        Self { period, today }
    }

    /// The active range, or the last 30 days.
    pub fn period_or_recent(&self) -> TimeRange {
        self.period
            .unwrap_or_else(|| DateRange::last_days(self.today, FALLBACK_PERIOD_DAYS))
            .into()
    }
}

impl Default for MapContext {
    fn default() -> Self {
        Self::new(None)
    }
}

/// Reads a JSON value as a finite number.
pub(crate) fn finite(value: Option<&serde_json::Value>) -> Option<f64> {
    value.and_then(serde_json::Value::as_f64).filter(|v| v.is_finite())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_id_untagged() {
        let ids: Vec<Id> = serde_json::from_str(r#"[1, "a"]"#).unwrap();
        assert_eq!(ids, vec![Id::Num(1), Id::Str("a".into())]);
        assert_eq!(ids[0].to_string(), "1");
    }

    #[test]
    fn test_period_fallback_is_thirty_days() {
        let today = NaiveDate::from_ymd_opt(2024, 3, 31).unwrap();
        let period = MapContext::at(None, today).period_or_recent();
        assert_eq!(period.from, "2024-03-01T00:00:00.000Z");
        assert_eq!(period.to, "2024-03-31T23:59:59.999Z");
    }

    #[test]
    fn test_period_uses_filter_range() {
        let range = DateRange::default_custom().unwrap();
        let ctx = MapContext::at(Some(range), NaiveDate::from_ymd_opt(2030, 1, 1).unwrap());
        assert_eq!(ctx.period_or_recent().from, "2024-01-01T00:00:00.000Z");
    }
}
