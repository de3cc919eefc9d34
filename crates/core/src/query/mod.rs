//! Schema-less query pipeline over in-memory record sets.
//!
//! Stages run in a fixed order, each consuming the previous stage's output:
//!
//! 1. Search: weighted exact, fuzzy and word-overlap scoring
//! 2. Filter: operators inferred from key suffixes and value shapes
//! 3. Sort: stable, on normalized values
//! 4. Project: keep only requested (possibly dotted) fields
//! 5. Paginate: clamped limit, `total` counted before slicing
//!
//! The pipeline never fails. Malformed input degrades to defaults.

pub mod filter;
pub mod normalize;
pub mod paginate;
pub mod params;
pub mod project;
pub mod search;
pub mod sort;

pub use filter::{FilterCondition, FilterOperator};
pub use params::{DataType, Pagination, QueryParams, SortOrder, SortSpec};
pub use search::SearchConfig;

use crate::config::AppConfig;
use crate::record::Record;
use serde::{Deserialize, Serialize};
use std::time::Instant;

/// Result metadata returned with every query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryMetadata {
    /// Matches after search and filter, before pagination.
    pub total: usize,
    pub page: usize,
    pub limit: usize,
    pub has_more: bool,
    pub execution_time_ms: u64,
    pub cache_hit: bool,
}

/// One query's output. Built fresh per call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
    pub data: Vec<Record>,
    pub metadata: QueryMetadata,
    pub applied_filters: Vec<FilterCondition>,
    pub applied_sort: Option<SortSpec>,
}

impl QueryResult {
    /// Wrap records in stored order as a single first page of at most `max_limit`.
    pub fn passthrough(mut data: Vec<Record>, max_limit: usize) -> Self {
        let total = data.len();
        let limit = total.min(max_limit.max(1));
        data.truncate(limit);
        Self {
            data,
            metadata: QueryMetadata {
                total,
                page: 1,
                limit,
                has_more: total > limit,
                execution_time_ms: 0,
                cache_hit: false,
            },
            applied_filters: Vec::new(),
            applied_sort: None,
        }
    }
}

/// Runs the search, filter, sort, project and paginate stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryEngine {
    default_limit: usize,
    max_limit: usize,
}

impl Default for QueryEngine {
    fn default() -> Self {
        Self::from_config(&AppConfig::default())
    }
}

impl QueryEngine {
    pub fn new(default_limit: usize, max_limit: usize) -> Self {
        let max_limit = max_limit.max(1);
        Self { default_limit: default_limit.clamp(1, max_limit), max_limit }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(config.default_limit, config.max_limit)
    }

    pub fn max_limit(&self) -> usize {
        self.max_limit
    }

    /// Execute the full pipeline over `records`.
    ///
    /// `website_type` selects the search configuration; unknown labels use the default.
    pub fn execute(&self, records: Vec<Record>, params: &QueryParams, website_type: &str) -> QueryResult {
        let start = Instant::now();

        let records = match params.search_term() {
            Some(term) => search::search(records, term, &SearchConfig::for_website_type(website_type)),
            None => records,
        };

        let conditions = filter::parse_filters(&params.filters);
        let records = filter::apply_filters(records, &conditions);

        let records = match &params.sort {
            Some(spec) => sort::sort_records(records, spec),
            None => records,
        };

        let records = match &params.fields {
            Some(fields) => project::project(records, fields),
            None => records,
        };

        let page = paginate::paginate(records, params.pagination.as_ref(), self.default_limit, self.max_limit);

        let execution_time_ms = start.elapsed().as_millis() as u64;
        tracing::debug!(
            total = page.total,
            returned = page.records.len(),
            filters = conditions.len(),
            execution_time_ms,
            "query executed"
        );

        QueryResult {
            data: page.records,
            metadata: QueryMetadata {
                total: page.total,
                page: page.page,
                limit: page.limit,
                has_more: page.has_more,
                execution_time_ms,
                cache_hit: false,
            },
            applied_filters: conditions,
            applied_sort: params.sort.clone(),
        }
    }
}
