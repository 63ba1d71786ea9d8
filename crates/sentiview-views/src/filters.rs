//! Filter option payloads: distinct tags and available filter values.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use sentiview_core::filter::DateRange;

/// Date format of the default range bounds.
pub const DEFAULT_DATE_FORMAT: &str = "%d-%m-%Y";

/// `/filter/distinct_tags` payload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DistinctTags {
    /// Every known tag.
    #[serde(default)]
    pub tags: Vec<String>,
}

/// `{ id, value }` wrapper used by some endpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiEnvelope<T> {
    /// Payload id.
    pub id: String,
    /// Payload.
    pub value: T,
}

/// Selectable option.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabeledValue {
    /// Display label.
    pub label: String,
    /// Wire value.
    pub value: String,
}

/// Option group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptionGroup {
    /// Group label.
    pub label: String,
    /// Options.
    #[serde(default)]
    pub options: Vec<LabeledValue>,
}

/// Rating bounds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RatingBounds {
    /// Lowest rating.
    pub min: f64,
    /// Highest rating.
    pub max: f64,
}

/// Date bounds of the data set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateBounds {
    /// Earliest review.
    pub min: String,
    /// Latest review.
    pub max: String,
    /// Suggested range start, `DD-MM-YYYY`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_min: Option<String>,
    /// Suggested range end, `DD-MM-YYYY`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_max: Option<String>,
}

/// `/filter/available_filter_values` payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AvailableFilterValues {
    /// Competitor banks.
    #[serde(default)]
    pub banks: Vec<OptionGroup>,
    /// Services.
    #[serde(default)]
    pub services: Vec<OptionGroup>,
    /// Rating bounds.
    pub ratings: RatingBounds,
    /// Date bounds.
    pub dates: DateBounds,
}

fn parse_default_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    NaiveDate::parse_from_str(s, DEFAULT_DATE_FORMAT)
        .or_else(|_| NaiveDate::parse_from_str(s, "%Y-%m-%d"))
        .ok()
}

impl AvailableFilterValues {
    /// The suggested default range, when both bounds parse and are ordered.
    pub fn default_range(&self) -> Option<DateRange> {
        let from = parse_default_date(self.dates.default_min.as_deref()?)?;
        let to = parse_default_date(self.dates.default_max.as_deref()?)?;
        match DateRange::new(from, to) {
            Ok(range) => Some(range),
            Err(e) => {
                log::warn!("Ignoring default date range: {e}");
                None
            }
        }
    }

    /// Every service value, flattened across groups.
    pub fn service_values(&self) -> Vec<&str> {
        flatten(&self.services)
    }

    /// Every bank value, flattened across groups.
    pub fn bank_values(&self) -> Vec<&str> {
        flatten(&self.banks)
    }
}

fn flatten(groups: &[OptionGroup]) -> Vec<&str> {
    groups
        .iter()
        .flat_map(|g| g.options.iter().map(|o| o.value.as_str()))
        .collect()
}
