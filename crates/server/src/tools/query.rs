//! data_query tool implementation.
//!
//! Serves a resource's records through the cache and runs the query pipeline
//! over them.

use super::json_result;
use harvest_core::query::{Pagination, QueryParams, SortSpec};
use harvest_core::{Error, ServingFacade, Value};
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Input parameters for the data_query tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct DataQueryParams {
    /// Resource to serve; also the URL handed to the extraction service.
    pub resource_id: String,

    /// Website classification label (ecommerce, news, social, jobs, real_estate, blog).
    /// Unknown or missing labels use the default strategy.
    #[serde(default)]
    pub website_type: Option<String>,

    /// Free-text search across the type's weighted fields.
    #[serde(default)]
    pub search: Option<String>,

    /// Field filters. Suffixes pick the operator: `_min`, `_max`, `_gt`, `_lt`,
    /// `_ne`, `_nin`, `_prefix`, `_suffix`. Arrays mean "in", `*` means contains.
    #[serde(default)]
    pub filters: Option<BTreeMap<String, serde_json::Value>>,

    #[serde(default)]
    pub sort: Option<SortSpec>,

    #[serde(default)]
    pub pagination: Option<Pagination>,

    /// Fields to keep in each record (dotted paths allowed).
    #[serde(default)]
    pub fields: Option<Vec<String>>,
}

impl DataQueryParams {
    fn query(&self) -> QueryParams {
        QueryParams {
            search: self.search.clone(),
            filters: self
                .filters
                .iter()
                .flatten()
                .map(|(key, value)| (key.clone(), Value::from(value.clone())))
                .collect(),
            sort: self.sort.clone(),
            pagination: self.pagination,
            fields: self.fields.clone(),
        }
    }
}

/// Implementation of the data_query tool.
pub async fn query_impl(facade: &ServingFacade, params: DataQueryParams) -> Result<CallToolResult, McpError> {
    if params.resource_id.trim().is_empty() {
        return Err(Error::InvalidInput("resource_id cannot be empty".into()).into());
    }

    let website_type = params.website_type.as_deref().unwrap_or_default();
    let response = facade.serve(&params.resource_id, &params.query(), website_type).await?;

    tracing::debug!(
        resource = %params.resource_id,
        total = response.result.metadata.total,
        cache_hit = response.result.metadata.cache_hit,
        stale = response.stale,
        "data_query served"
    );

    json_result(&response)
}
