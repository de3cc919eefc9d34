//! Filter parsing and evaluation.
//!
//! Operators are inferred from the shape of each filter entry:
//!
//! - `<field>_min` / `<field>_max`: numeric `gte` / `lte`
//! - `<field>_gt` / `<field>_lt`: strict bounds (numeric, or dates when the value is a date)
//! - `<field>_ne`: not equal; `<field>_nin`: not in the given list
//! - `<field>_prefix` / `<field>_suffix`: string prefix / suffix
//! - a list value: `in`
//! - a string containing `*`: `contains`, with the wildcards stripped
//! - anything else: `eq`, typed by the value's shape
//!
//! All conditions combine with AND. A record missing the field never matches.

use super::normalize::{Normalized, infer_data_type, to_number, to_text};
use super::params::DataType;
use crate::record::{Record, Value, get_path};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum FilterOperator {
    Eq,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
    In,
    NotIn,
    Contains,
    StartsWith,
    EndsWith,
}

/// A single parsed filter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterCondition {
    pub field: String,
    pub operator: FilterOperator,
    pub value: Value,
    pub data_type: DataType,
}

const SUFFIXES: &[(&str, FilterOperator)] = &[
    ("_min", FilterOperator::Gte),
    ("_max", FilterOperator::Lte),
    ("_gt", FilterOperator::Gt),
    ("_lt", FilterOperator::Lt),
    ("_ne", FilterOperator::Ne),
    ("_nin", FilterOperator::NotIn),
    ("_prefix", FilterOperator::StartsWith),
    ("_suffix", FilterOperator::EndsWith),
];

fn split_suffix(key: &str) -> Option<(&str, FilterOperator)> {
    SUFFIXES.iter().find_map(|(suffix, op)| {
        key.strip_suffix(suffix)
            .filter(|base| !base.is_empty())
            .map(|base| (base, *op))
    })
}

impl FilterCondition {
    /// Infer a condition from a raw filter key and value.
    pub fn parse(key: &str, value: &Value) -> FilterCondition {
        if let Some((field, operator)) = split_suffix(key) {
            return Self::with_operator(field, operator, value);
        }

        match value {
            Value::List(items) => FilterCondition {
                field: key.to_string(),
                operator: FilterOperator::In,
                value: value.clone(),
                data_type: items.first().map(infer_data_type).unwrap_or(DataType::String),
            },
            Value::Text(s) if s.contains('*') => FilterCondition {
                field: key.to_string(),
                operator: FilterOperator::Contains,
                value: Value::Text(s.replace('*', "")),
                data_type: DataType::String,
            },
            _ => FilterCondition {
                field: key.to_string(),
                operator: FilterOperator::Eq,
                value: value.clone(),
                data_type: infer_data_type(value),
            },
        }
    }

    fn with_operator(field: &str, operator: FilterOperator, value: &Value) -> FilterCondition {
        let (value, data_type) = match operator {
            FilterOperator::Gte | FilterOperator::Lte => (Value::Number(to_number(value)), DataType::Number),
            FilterOperator::Gt | FilterOperator::Lt => match infer_data_type(value) {
                DataType::Date => (value.clone(), DataType::Date),
                _ => (Value::Number(to_number(value)), DataType::Number),
            },
            FilterOperator::NotIn => match value {
                Value::List(items) => {
                    (value.clone(), items.first().map(infer_data_type).unwrap_or(DataType::String))
                }
                other => (Value::List(vec![other.clone()]), infer_data_type(other)),
            },
            FilterOperator::StartsWith | FilterOperator::EndsWith => (value.clone(), DataType::String),
            _ => (value.clone(), infer_data_type(value)),
        };

        FilterCondition { field: field.to_string(), operator, value, data_type }
    }

    /// Whether `record` satisfies this condition.
    pub fn matches(&self, record: &Record) -> bool {
        match get_path(record, &self.field) {
            None | Some(Value::Null) => false,
            Some(Value::List(items)) if !matches!(self.operator, FilterOperator::Ne | FilterOperator::NotIn) => {
                items.iter().any(|item| self.matches_value(item))
            }
            Some(Value::List(items)) => items.iter().all(|item| self.matches_value(item)),
            Some(value) => self.matches_value(value),
        }
    }

    fn matches_value(&self, actual: &Value) -> bool {
        let ordering = || Normalized::new(actual, self.data_type).compare(&Normalized::new(&self.value, self.data_type));

        match self.operator {
            FilterOperator::Eq => ordering() == Ordering::Equal,
            FilterOperator::Ne => ordering() != Ordering::Equal,
            FilterOperator::Gt => ordering() == Ordering::Greater,
            FilterOperator::Gte => ordering() != Ordering::Less,
            FilterOperator::Lt => ordering() == Ordering::Less,
            FilterOperator::Lte => ordering() != Ordering::Greater,
            FilterOperator::In => self.member_of_list(actual),
            FilterOperator::NotIn => !self.member_of_list(actual),
            FilterOperator::Contains => to_text(actual).contains(&to_text(&self.value)),
            FilterOperator::StartsWith => to_text(actual).starts_with(&to_text(&self.value)),
            FilterOperator::EndsWith => to_text(actual).ends_with(&to_text(&self.value)),
        }
    }

    fn member_of_list(&self, actual: &Value) -> bool {
        let actual = Normalized::new(actual, self.data_type);
        match &self.value {
            Value::List(options) => options
                .iter()
                .any(|option| actual.compare(&Normalized::new(option, self.data_type)) == Ordering::Equal),
            single => actual.compare(&Normalized::new(single, self.data_type)) == Ordering::Equal,
        }
    }
}

/// Parse every filter entry into a condition, in key order.
pub fn parse_filters(filters: &BTreeMap<String, Value>) -> Vec<FilterCondition> {
    filters
        .iter()
        .map(|(key, value)| FilterCondition::parse(key, value))
        .collect()
}

/// Keep only records that satisfy every condition.
pub fn apply_filters(records: Vec<Record>, conditions: &[FilterCondition]) -> Vec<Record> {
    if conditions.is_empty() {
        return records;
    }
    records
        .into_iter()
        .filter(|record| conditions.iter().all(|c| c.matches(record)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(pairs: &[(&str, Value)]) -> Record {
        pairs.iter().map(|(k, v)| ((*k).to_string(), v.clone())).collect()
    }

    fn shoes() -> Vec<Record> {
        vec![
            record(&[("title", "Red Shoes".into()), ("price", "$40".into())]),
            record(&[("title", "Blue Shoes".into()), ("price", "$85".into())]),
        ]
    }

    #[test]
    fn test_parse_min_max() {
        let c = FilterCondition::parse("price_min", &Value::from("50"));
        assert_eq!(c.field, "price");
        assert_eq!(c.operator, FilterOperator::Gte);
        assert_eq!(c.value, Value::Number(50.0));
        assert_eq!(c.data_type, DataType::Number);

        let c = FilterCondition::parse("price_max", &Value::from("not a number"));
        assert_eq!(c.operator, FilterOperator::Lte);
        assert_eq!(c.value, Value::Number(0.0));
    }

    #[test]
    fn test_parse_shapes() {
        let c = FilterCondition::parse("brand", &Value::List(vec!["acme".into(), "zeta".into()]));
        assert_eq!(c.operator, FilterOperator::In);

        let c = FilterCondition::parse("title", &Value::from("*shoe*"));
        assert_eq!(c.operator, FilterOperator::Contains);
        assert_eq!(c.value, Value::from("shoe"));

        let c = FilterCondition::parse("in_stock", &Value::Bool(true));
        assert_eq!(c.operator, FilterOperator::Eq);
        assert_eq!(c.data_type, DataType::Boolean);

        let c = FilterCondition::parse("listed", &Value::from("2024-01-01"));
        assert_eq!(c.data_type, DataType::Date);
    }

    #[test]
    fn test_bare_suffix_is_a_field_name() {
        let c = FilterCondition::parse("_min", &Value::from("5"));
        assert_eq!(c.field, "_min");
        assert_eq!(c.operator, FilterOperator::Eq);
    }

    #[test]
    fn test_price_min_scenario() {
        let mut filters = BTreeMap::new();
        filters.insert("price_min".to_string(), Value::from("50"));
        let result = apply_filters(shoes(), &parse_filters(&filters));
        assert_eq!(result.len(), 1);
        assert_eq!(result[0]["title"], Value::from("Blue Shoes"));
    }

    #[test]
    fn test_conditions_combine_with_and() {
        let mut filters = BTreeMap::new();
        filters.insert("price_max".to_string(), Value::from("100"));
        filters.insert("title".to_string(), Value::from("*red*"));
        let result = apply_filters(shoes(), &parse_filters(&filters));
        assert_eq!(result.len(), 1);
        assert_eq!(result[0]["title"], Value::from("Red Shoes"));
    }

    #[test]
    fn test_missing_field_never_matches() {
        let c = FilterCondition::parse("color_ne", &Value::from("green"));
        assert!(!c.matches(&shoes()[0]));
    }

    #[test]
    fn test_eq_is_case_insensitive() {
        let c = FilterCondition::parse("title", &Value::from("red shoes"));
        assert!(c.matches(&shoes()[0]));
        assert!(!c.matches(&shoes()[1]));
    }

    #[test]
    fn test_in_and_not_in() {
        let c = FilterCondition::parse("title", &Value::List(vec!["Blue Shoes".into(), "Green Hat".into()]));
        assert!(c.matches(&shoes()[1]));
        assert!(!c.matches(&shoes()[0]));

        let c = FilterCondition::parse("title_nin", &Value::from("Blue Shoes"));
        assert!(c.matches(&shoes()[0]));
        assert!(!c.matches(&shoes()[1]));
    }

    #[test]
    fn test_prefix_suffix() {
        let c = FilterCondition::parse("title_prefix", &Value::from("blue"));
        assert!(c.matches(&shoes()[1]));
        let c = FilterCondition::parse("title_suffix", &Value::from("SHOES"));
        assert!(c.matches(&shoes()[0]));
    }

    #[test]
    fn test_date_bounds() {
        let rec = record(&[("listed", Value::from("2024-03-10"))]);
        assert!(FilterCondition::parse("listed_gt", &Value::from("2024-03-01")).matches(&rec));
        assert!(!FilterCondition::parse("listed_lt", &Value::from("2024-03-01")).matches(&rec));
    }

    #[test]
    fn test_list_field_matches_any_element() {
        let rec = record(&[("tags", Value::List(vec!["sale".into(), "new".into()]))]);
        assert!(FilterCondition::parse("tags", &Value::from("sale")).matches(&rec));
        assert!(!FilterCondition::parse("tags_ne", &Value::from("sale")).matches(&rec));
        assert!(FilterCondition::parse("tags_ne", &Value::from("old")).matches(&rec));
    }

    #[test]
    fn test_nested_field() {
        let mut specs = Record::new();
        specs.insert("size".into(), Value::Number(42.0));
        let rec = record(&[("specs", Value::Map(specs))]);
        assert!(FilterCondition::parse("specs.size_min", &Value::from("40")).matches(&rec));
    }
}
