//! Stable sorting on a normalized field value.

use super::normalize::{Normalized, infer_data_type};
use super::params::{SortOrder, SortSpec};
use crate::record::{Record, Value, get_path};
use std::cmp::Ordering;

/// Sort `records` by `spec`, keeping the relative order of ties.
///
/// Without a type hint, the type is inferred from the first record that has
/// the field. Records missing the field go last in either direction.
pub fn sort_records(records: Vec<Record>, spec: &SortSpec) -> Vec<Record> {
    let data_type = spec.data_type.unwrap_or_else(|| {
        records
            .iter()
            .filter_map(|r| get_path(r, &spec.field))
            .find(|v| !matches!(v, Value::Null))
            .map(infer_data_type)
            .unwrap_or(super::params::DataType::String)
    });

    let mut keyed: Vec<(Option<Normalized>, Record)> = records
        .into_iter()
        .map(|record| {
            let key = get_path(&record, &spec.field)
                .filter(|v| !matches!(v, Value::Null))
                .map(|v| Normalized::new(v, data_type));
            (key, record)
        })
        .collect();

    keyed.sort_by(|(a, _), (b, _)| match (a, b) {
        (Some(a), Some(b)) => match spec.order {
            SortOrder::Asc => a.compare(b),
            SortOrder::Desc => b.compare(a),
        },
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });

    keyed.into_iter().map(|(_, record)| record).collect()
}
