//! Query request types.

use crate::record::Value;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Value type used to normalize a field before comparing it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    String,
    Number,
    Date,
    Boolean,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

/// Sort request: field (dotted paths allowed), order and an optional type hint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct SortSpec {
    pub field: String,
    #[serde(default)]
    pub order: SortOrder,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub data_type: Option<DataType>,
}

/// Page-based pagination with an optional explicit offset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct Pagination {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,
    /// Overrides `page` when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset: Option<usize>,
}

/// Everything a caller may ask of the query pipeline. Every part is optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryParams {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
    /// Field name (with optional operator suffix) to filter value.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub filters: BTreeMap<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort: Option<SortSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pagination: Option<Pagination>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fields: Option<Vec<String>>,
}

impl QueryParams {
    /// The trimmed search string, if it has any content.
    pub fn search_term(&self) -> Option<&str> {
        self.search.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }

    /// True when no pipeline stage would run.
    pub fn is_empty(&self) -> bool {
        self.search_term().is_none()
            && self.filters.is_empty()
            && self.sort.is_none()
            && self.pagination.is_none()
            && self.fields.is_none()
    }

    /// Normalized copy used for cache keys: trimmed search, and a trimmed,
    /// sorted, deduplicated field list. Projection output does not depend on
    /// field order.
    pub fn canonical(&self) -> QueryParams {
        QueryParams {
            search: self.search_term().map(str::to_string),
            filters: self.filters.clone(),
            sort: self.sort.clone(),
            pagination: self.pagination,
            fields: self.fields.as_ref().map(|fields| {
                let mut fields: Vec<String> = fields
                    .iter()
                    .map(|f| f.trim().to_string())
                    .filter(|f| !f.is_empty())
                    .collect();
                fields.sort();
                fields.dedup();
                fields
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_params() {
        assert!(QueryParams::default().is_empty());
        let blank_search = QueryParams { search: Some("  ".into()), ..Default::default() };
        assert!(blank_search.is_empty());
    }

    #[test]
    fn test_non_empty_params() {
        let params = QueryParams { pagination: Some(Pagination::default()), ..Default::default() };
        assert!(!params.is_empty());
    }

    #[test]
    fn test_deserialize_request_shape() {
        let params: QueryParams = serde_json::from_str(
            r#"{"search":"shoe","filters":{"price_min":"50"},"sort":{"field":"price","order":"desc","type":"number"},
                "pagination":{"page":2,"limit":1},"fields":["title"]}"#,
        )
        .unwrap();
        assert_eq!(params.search_term(), Some("shoe"));
        assert_eq!(params.filters["price_min"], Value::Text("50".into()));
        let sort = params.sort.unwrap();
        assert_eq!(sort.order, SortOrder::Desc);
        assert_eq!(sort.data_type, Some(DataType::Number));
        assert_eq!(params.pagination.unwrap().page, Some(2));
    }

    #[test]
    fn test_sort_order_defaults_to_asc() {
        let sort: SortSpec = serde_json::from_str(r#"{"field":"title"}"#).unwrap();
        assert_eq!(sort.order, SortOrder::Asc);
        assert!(sort.data_type.is_none());
    }
}
