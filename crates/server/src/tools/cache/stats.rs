//! cache_stats tool implementation.

use crate::tools::json_result;
use harvest_core::{CacheStats, ServingFacade};
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Output from the cache_stats tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheStatsOutput {
    pub cache: CacheStats,
    /// Refresh jobs waiting for their scheduled time.
    pub pending_jobs: usize,
    /// Pending plus in-flight refresh jobs.
    pub total_jobs: usize,
    pub background_refresh: bool,
}

pub fn collect(facade: &ServingFacade) -> CacheStatsOutput {
    let scheduler = facade.scheduler();
    CacheStatsOutput {
        cache: facade.cache().stats(),
        pending_jobs: scheduler.pending_count(),
        total_jobs: scheduler.len(),
        background_refresh: scheduler.is_enabled(),
    }
}

/// Implementation of the cache_stats tool.
pub async fn stats_impl(facade: &ServingFacade) -> Result<CallToolResult, McpError> {
    json_result(&collect(facade))
}

#[cfg(test)]
mod tests {
    use super::*;
    use harvest_core::{AppConfig, Error, Fetcher, QueryParams, Record, ResourceInfo};
    use std::sync::Arc;

    struct EmptyFetcher;

    #[async_trait::async_trait]
    impl Fetcher for EmptyFetcher {
        async fn fetch(&self, _resource: &ResourceInfo) -> Result<Vec<Record>, Error> {
            Ok(vec![Record::new()])
        }
    }

    #[tokio::test]
    async fn test_stats_track_serving() {
        let facade = ServingFacade::new(AppConfig::default(), Arc::new(EmptyFetcher));
        let empty = collect(&facade);
        assert_eq!(empty.cache.entries, 0);
        assert_eq!(empty.cache.max_size, 1000);
        assert_eq!(empty.total_jobs, 0);

        facade.serve("a", &QueryParams::default(), "news").await.unwrap();
        facade.serve("a", &QueryParams::default(), "news").await.unwrap();

        let stats = collect(&facade);
        assert_eq!(stats.cache.entries, 1);
        assert_eq!(stats.cache.misses, 1);
        assert!(stats.cache.hits >= 1);
        assert_eq!(stats.pending_jobs, 1);
        assert!(stats.background_refresh);
    }

    #[tokio::test]
    async fn test_stats_impl_renders_json() {
        let facade = ServingFacade::new(AppConfig::default(), Arc::new(EmptyFetcher));
        let result = stats_impl(&facade).await.unwrap();
        let content_val = serde_json::to_value(&result.content[0]).unwrap();
        let text = content_val.get("text").and_then(|v| v.as_str()).unwrap();
        let output: CacheStatsOutput = serde_json::from_str(text).unwrap();
        assert_eq!(output.cache.entries, 0);
    }
}
