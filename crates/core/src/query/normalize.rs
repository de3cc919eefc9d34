//! Lenient value normalization.
//!
//! Nothing here fails: unparseable numbers become `0`, unparseable dates
//! become the epoch, and truthiness follows a fixed word list.

use super::params::DataType;
use crate::record::Value;
use chrono::{DateTime, NaiveDate, Utc};
use regex::Regex;
use std::sync::LazyLock;

static NUMBER_LIKE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*[-+]?\s*[$€£¥]?\s*(\d{1,3}(,\d{3})+|\d+)?(\.\d+)?\s*%?\s*$").expect("valid regex")
});

static ISO_DATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}([T ]\d{2}:\d{2}(:\d{2}(\.\d+)?)?(Z|[+-]\d{2}:?\d{2})?)?$").expect("valid regex"));

/// Whether a string looks like a number, allowing currency, separators and `%`.
pub fn is_number_like(s: &str) -> bool {
    s.chars().any(|c| c.is_ascii_digit()) && NUMBER_LIKE.is_match(s)
}

/// Parse a string as a date. Accepts RFC 3339 and ISO `YYYY-MM-DD` prefixes.
pub fn parse_date_str(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if !ISO_DATE.is_match(s) {
        return None;
    }
    if let Ok(d) = DateTime::parse_from_rfc3339(s) {
        return Some(d.with_timezone(&Utc));
    }
    if let Ok(d) = chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S") {
        return Some(d.and_utc());
    }
    if let Ok(d) = chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return Some(d.and_utc());
    }
    NaiveDate::parse_from_str(s.get(..10)?, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|d| d.and_utc())
}

/// Strip everything but digits, `.` and a leading `-`, then parse. Invalid input yields `0`.
pub fn parse_number_str(s: &str) -> f64 {
    let negative = s.trim_start().starts_with('-');
    let digits: String = s.chars().filter(|c| c.is_ascii_digit() || *c == '.').collect();
    let n = digits.parse::<f64>().unwrap_or(0.0);
    if negative { -n } else { n }
}

pub fn to_number(value: &Value) -> f64 {
    match value {
        Value::Number(n) if n.is_finite() => *n,
        Value::Number(_) => 0.0,
        Value::Bool(b) => f64::from(u8::from(*b)),
        Value::Text(s) => parse_number_str(s),
        Value::Date(d) => d.timestamp_millis() as f64,
        Value::List(items) => items.first().map(to_number).unwrap_or(0.0),
        Value::Null | Value::Map(_) => 0.0,
    }
}

/// Epoch milliseconds; anything unparseable maps to `0`.
pub fn to_epoch_millis(value: &Value) -> i64 {
    match value {
        Value::Date(d) => d.timestamp_millis(),
        Value::Text(s) => parse_date_str(s).map(|d| d.timestamp_millis()).unwrap_or(0),
        Value::Number(n) if n.is_finite() => *n as i64,
        _ => 0,
    }
}

pub fn to_bool(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Number(n) => *n != 0.0 && !n.is_nan(),
        Value::Text(s) => match s.trim().to_lowercase().as_str() {
            "" | "false" | "0" | "no" | "off" | "n" => false,
            _ => true,
        },
        Value::Null => false,
        Value::Date(_) => true,
        Value::List(items) => !items.is_empty(),
        Value::Map(map) => !map.is_empty(),
    }
}

pub fn to_text(value: &Value) -> String {
    value.as_text().trim().to_lowercase()
}

/// Infer a comparison type from the shape of a value.
pub fn infer_data_type(value: &Value) -> DataType {
    match value {
        Value::Number(_) => DataType::Number,
        Value::Bool(_) => DataType::Boolean,
        Value::Date(_) => DataType::Date,
        Value::Text(s) => {
            let t = s.trim().to_lowercase();
            if t == "true" || t == "false" {
                DataType::Boolean
            } else if is_number_like(s) {
                DataType::Number
            } else if parse_date_str(s).is_some() {
                DataType::Date
            } else {
                DataType::String
            }
        }
        Value::List(items) => items.first().map(infer_data_type).unwrap_or(DataType::String),
        Value::Null | Value::Map(_) => DataType::String,
    }
}

/// A value normalized to one comparable representation.
#[derive(Debug, Clone, PartialEq)]
pub enum Normalized {
    Number(f64),
    Date(i64),
    Bool(bool),
    Text(String),
}

impl Normalized {
    pub fn new(value: &Value, data_type: DataType) -> Self {
        match data_type {
            DataType::Number => Normalized::Number(to_number(value)),
            DataType::Date => Normalized::Date(to_epoch_millis(value)),
            DataType::Boolean => Normalized::Bool(to_bool(value)),
            DataType::String => Normalized::Text(to_text(value)),
        }
    }

    pub fn compare(&self, other: &Normalized) -> std::cmp::Ordering {
        use std::cmp::Ordering;
        match (self, other) {
            (Normalized::Number(a), Normalized::Number(b)) => a.partial_cmp(b).unwrap_or(Ordering::Equal),
            (Normalized::Date(a), Normalized::Date(b)) => a.cmp(b),
            (Normalized::Bool(a), Normalized::Bool(b)) => a.cmp(b),
            (Normalized::Text(a), Normalized::Text(b)) => a.cmp(b),
            _ => Ordering::Equal,
        }
    }
}
