//! Schema-less record model.
//!
//! Scraped data arrives as arbitrary key/value shapes. Records are kept as
//! ordered maps of field name to a tagged [`Value`], so search, filtering and
//! sorting can dispatch on the variant instead of guessing at runtime.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A single scraped record.
///
/// Ordered so that hashing and cache-key canonicalization are deterministic.
pub type Record = BTreeMap<String, Value>;

/// A field value inside a [`Record`].
///
/// Deserialization is untagged: RFC 3339 strings become [`Value::Date`],
/// every other string stays [`Value::Text`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Bool(bool),
    Number(f64),
    Date(DateTime<Utc>),
    Text(String),
    List(Vec<Value>),
    Map(Record),
}

impl Value {
    /// True for `Null`, empty strings, empty lists and empty maps.
    pub fn is_empty(&self) -> bool {
        match self {
            Value::Null => true,
            Value::Text(s) => s.trim().is_empty(),
            Value::List(items) => items.is_empty(),
            Value::Map(map) => map.is_empty(),
            Value::Bool(_) | Value::Number(_) | Value::Date(_) => false,
        }
    }

    /// Render the value as plain text for string comparisons and search.
    ///
    /// Lists are joined with spaces; maps render their values in key order.
    pub fn as_text(&self) -> String {
        match self {
            Value::Null => String::new(),
            Value::Bool(b) => b.to_string(),
            Value::Number(n) => format_number(*n),
            Value::Date(d) => d.to_rfc3339(),
            Value::Text(s) => s.clone(),
            Value::List(items) => items.iter().map(Value::as_text).collect::<Vec<_>>().join(" "),
            Value::Map(map) => map.values().map(Value::as_text).collect::<Vec<_>>().join(" "),
        }
    }
}

fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 { format!("{}", n as i64) } else { n.to_string() }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(n as f64)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<serde_json::Value> for Value {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => Value::Number(n.as_f64().unwrap_or(0.0)),
            serde_json::Value::String(s) => match DateTime::parse_from_rfc3339(&s) {
                Ok(d) => Value::Date(d.with_timezone(&Utc)),
                Err(_) => Value::Text(s),
            },
            serde_json::Value::Array(items) => Value::List(items.into_iter().map(Value::from).collect()),
            serde_json::Value::Object(map) => Value::Map(map.into_iter().map(|(k, v)| (k, Value::from(v))).collect()),
        }
    }
}

/// Look up a dotted path (`specs.color`) inside a record.
///
/// Returns `None` when any step is missing or is not a nested map.
pub fn get_path<'a>(record: &'a Record, path: &str) -> Option<&'a Value> {
    let mut segments = path.split('.');
    let mut current = record.get(segments.next()?)?;
    for segment in segments {
        match current {
            Value::Map(map) => current = map.get(segment)?,
            _ => return None,
        }
    }
    Some(current)
}

/// Insert `value` at a dotted path, creating intermediate maps as needed.
///
/// An existing non-map value on the way is replaced by a map.
pub fn set_path(record: &mut Record, path: &str, value: Value) {
    match path.split_once('.') {
        None => {
            record.insert(path.to_string(), value);
        }
        Some((head, rest)) => {
            let slot = record.entry(head.to_string()).or_insert_with(|| Value::Map(Record::new()));
            if !matches!(slot, Value::Map(_)) {
                *slot = Value::Map(Record::new());
            }
            if let Value::Map(inner) = slot {
                set_path(inner, rest, value);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nested() -> Record {
        let mut specs = Record::new();
        specs.insert("color".into(), "red".into());
        let mut record = Record::new();
        record.insert("title".into(), "Red Shoes".into());
        record.insert("specs".into(), Value::Map(specs));
        record
    }

    #[test]
    fn test_get_path_nested() {
        let record = nested();
        assert_eq!(get_path(&record, "specs.color"), Some(&Value::Text("red".into())));
        assert_eq!(get_path(&record, "title"), Some(&Value::Text("Red Shoes".into())));
    }

    #[test]
    fn test_get_path_through_scalar_is_absent() {
        let record = nested();
        assert!(get_path(&record, "title.length").is_none());
        assert!(get_path(&record, "specs.size").is_none());
    }

    #[test]
    fn test_set_path_creates_maps() {
        let mut record = Record::new();
        set_path(&mut record, "a.b.c", Value::Number(1.0));
        assert_eq!(get_path(&record, "a.b.c"), Some(&Value::Number(1.0)));
    }

    #[test]
    fn test_deserialize_untagged() {
        let record: Record = serde_json::from_str(
            r#"{"title":"Shoes","price":40,"stock":true,"seen":"2024-01-02T03:04:05Z","tags":["a"],"x":null}"#,
        )
        .unwrap();
        assert!(matches!(record["title"], Value::Text(_)));
        assert_eq!(record["price"], Value::Number(40.0));
        assert_eq!(record["stock"], Value::Bool(true));
        assert!(matches!(record["seen"], Value::Date(_)));
        assert!(matches!(record["tags"], Value::List(_)));
        assert_eq!(record["x"], Value::Null);
    }

    #[test]
    fn test_from_json_value() {
        let value = Value::from(serde_json::json!({"a": [1, "two"], "b": "2024-01-02T00:00:00Z"}));
        let Value::Map(map) = value else { panic!("expected map") };
        assert_eq!(map["a"], Value::List(vec![Value::Number(1.0), Value::Text("two".into())]));
        assert!(matches!(map["b"], Value::Date(_)));
    }

    #[test]
    fn test_as_text_and_is_empty() {
        assert_eq!(Value::Number(40.0).as_text(), "40");
        assert_eq!(Value::Number(2.5).as_text(), "2.5");
        assert!(Value::Text("  ".into()).is_empty());
        assert!(!Value::Bool(false).is_empty());
    }
}
