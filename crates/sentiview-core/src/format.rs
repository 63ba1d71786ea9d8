//! Display helpers for KPI cards and tables.
//!
//! Numbers are rendered the ru-RU way: a no-break space groups thousands
//! and a comma separates decimals (`1 234,50`).

use std::fmt;

use serde::{Deserialize, Serialize};

/// Thousands separator used by ru-RU number formatting.
pub const GROUP_SEPARATOR: char = '\u{a0}';

/// Placeholder for a missing value.
pub const DASH: &str = "—";

/// A backend value that may or may not be numeric.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NumberOrText {
    /// A finite number.
    Number(f64),
    /// Anything else, verbatim.
    Text(String),
}

impl fmt::Display for NumberOrText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NumberOrText::Number(n) => write!(f, "{n}"),
            NumberOrText::Text(s) => f.write_str(s),
        }
    }
}

/// Parses `s` as a number after removing whitespace and turning the first
/// comma into a dot; returns the original text when that fails.
///
/// An empty or all-whitespace string reads as zero.
pub fn to_number_safe(s: &str) -> NumberOrText {
    let compact: String = s.chars().filter(|c| !c.is_whitespace()).collect();
    let normalized = compact.replacen(',', ".", 1);
    if normalized.is_empty() {
        return NumberOrText::Number(0.0);
    }
    match normalized.parse::<f64>() {
        Ok(n) if n.is_finite() => NumberOrText::Number(n),
        _ => NumberOrText::Text(s.to_string()),
    }
}

fn group_thousands(digits: &str) -> String {
    let len = digits.chars().count();
    let mut out = String::with_capacity(len + len / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (len - i) % 3 == 0 {
            out.push(GROUP_SEPARATOR);
        }
        out.push(c);
    }
    out
}

fn format_number(value: f64, digits: usize) -> String {
    let rendered = format!("{:.*}", digits, value.abs());
    let (int_part, frac_part) = match rendered.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (rendered.as_str(), None),
    };
    let negative = value < 0.0 && rendered.chars().any(|c| c.is_ascii_digit() && c != '0');
    let mut out = String::new();
    if negative {
        out.push('-');
    }
    out.push_str(&group_thousands(int_part));
    if let Some(frac) = frac_part {
        out.push(',');
        out.push_str(frac);
    }
    out
}

/// Formats with exactly `digits` fractional digits; text passes through.
pub fn format_fixed(value: &NumberOrText, digits: usize) -> String {
    match value {
        NumberOrText::Number(n) => format_number(*n, digits),
        NumberOrText::Text(s) => s.clone(),
    }
}

/// Formats a rounded integer with ru-RU grouping.
pub fn format_int(n: f64) -> String {
    format_number(n.round(), 0)
}

/// `round(p * 100)%`, or a dash when missing or NaN.
pub fn format_percent(p: Option<f64>) -> String {
    match p {
        // `+ 0.0` folds a rounded -0 into 0.
        Some(p) if !p.is_nan() => format!("{}%", (p * 100.0).round() + 0.0),
        _ => DASH.to_string(),
    }
}

/// Trend direction of a comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Increase.
    Up,
    /// Decrease.
    Down,
    /// No change.
    Flat,
}

/// Change of a metric against the previous period.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Delta {
    /// Absolute change.
    pub abs: f64,
    /// Relative change (0.1 = 10 %).
    pub rel: f64,
    /// Explicit direction; derived from `rel` when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub direction: Option<Direction>,
}

/// Renders a delta as `+12.34%` with its direction.
pub fn format_delta(delta: Option<&Delta>) -> (String, Direction) {
    let Some(delta) = delta else {
        return (DASH.to_string(), Direction::Flat);
    };
    let direction = delta.direction.unwrap_or(if delta.rel > 0.0 {
        Direction::Up
    } else if delta.rel < 0.0 {
        Direction::Down
    } else {
        Direction::Flat
    });
    let sign = if delta.rel > 0.0 { "+" } else { "" };
    (format!("{sign}{:.2}%", delta.rel * 100.0), direction)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_number_safe() {
        assert_eq!(to_number_safe("4,25"), NumberOrText::Number(4.25));
        assert_eq!(to_number_safe(" 1 234,5 "), NumberOrText::Number(1234.5));
        assert_eq!(to_number_safe("Карты"), NumberOrText::Text("Карты".into()));
        assert_eq!(to_number_safe(""), NumberOrText::Number(0.0));
    }

    #[test]
    fn test_only_first_comma_converted() {
        assert_eq!(to_number_safe("1,2,3"), NumberOrText::Text("1,2,3".into()));
    }

    #[test]
    fn test_format_fixed() {
        assert_eq!(format_fixed(&NumberOrText::Number(4.256), 2), "4,26");
        assert_eq!(format_fixed(&NumberOrText::Number(1234567.0), 2), "1\u{a0}234\u{a0}567,00");
        assert_eq!(format_fixed(&NumberOrText::Number(-0.001), 2), "0,00");
        assert_eq!(format_fixed(&NumberOrText::Number(-12.5), 1), "-12,5");
        assert_eq!(format_fixed(&NumberOrText::Text("n/a".into()), 2), "n/a");
    }

    #[test]
    fn test_format_int() {
        assert_eq!(format_int(999.0), "999");
        assert_eq!(format_int(12345.6), "12\u{a0}346");
    }

    #[test]
    fn test_format_percent() {
        assert_eq!(format_percent(Some(0.456)), "46%");
        assert_eq!(format_percent(None), "—");
        assert_eq!(format_percent(Some(f64::NAN)), "—");
        assert_eq!(format_percent(Some(-0.001)), "0%");
        assert_eq!(format_percent(Some(-0.0)), "0%");
        assert_eq!(format_percent(Some(-0.126)), "-13%");
    }

    #[test]
    fn test_format_delta() {
        let up = Delta { abs: 3.0, rel: 0.1234, direction: None };
        assert_eq!(format_delta(Some(&up)), ("+12.34%".to_string(), Direction::Up));

        let down = Delta { abs: -1.0, rel: -0.05, direction: None };
        assert_eq!(format_delta(Some(&down)), ("-5.00%".to_string(), Direction::Down));

        let forced = Delta { abs: 0.0, rel: 0.0, direction: Some(Direction::Up) };
        assert_eq!(format_delta(Some(&forced)).1, Direction::Up);

        assert_eq!(format_delta(None), ("—".to_string(), Direction::Flat));
    }
}
