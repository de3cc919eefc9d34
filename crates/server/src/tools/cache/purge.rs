//! cache_purge tool implementation.
//!
//! Purges expired entries, or the whole cache.

use crate::tools::json_result;
use harvest_core::ServingFacade;
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Parameters for the cache_purge tool.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct CachePurgeParams {
    /// Only delete expired entries (default: true). `false` clears everything.
    #[serde(default)]
    pub expired_only: Option<bool>,
}

/// Output from the cache_purge tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CachePurgeOutput {
    /// Number of entries deleted.
    pub deleted: u64,
}

/// Implementation of the cache_purge tool.
pub async fn purge_impl(facade: &ServingFacade, params: CachePurgeParams) -> Result<CallToolResult, McpError> {
    let deleted = if params.expired_only.unwrap_or(true) {
        facade.cache().purge_expired()
    } else {
        facade.cache().clear()
    };

    tracing::info!(deleted, expired_only = params.expired_only.unwrap_or(true), "cache purged");
    json_result(&CachePurgeOutput { deleted })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeDelta, Utc};
    use harvest_core::{AppConfig, CacheStrategy, Error, Fetcher, Record, ResourceInfo};
    use std::sync::Arc;

    struct NoFetch;

    #[async_trait::async_trait]
    impl Fetcher for NoFetch {
        async fn fetch(&self, _resource: &ResourceInfo) -> Result<Vec<Record>, Error> {
            Err(Error::FetchFailed("not used".into()))
        }
    }

    fn seeded() -> ServingFacade {
        let facade = ServingFacade::new(AppConfig::default(), Arc::new(NoFetch));
        let strategy = CacheStrategy::for_website_type("social");
        facade.cache().put("fresh", vec![Record::new()], &strategy);
        facade
            .cache()
            .put_at("old", vec![Record::new()], &strategy, Utc::now() - TimeDelta::hours(2));
        facade
    }

    fn deleted(result: &CallToolResult) -> u64 {
        let content_val = serde_json::to_value(&result.content[0]).unwrap();
        let text = content_val
            .get("text")
            .and_then(|v| v.as_str())
            .expect("Expected text field in content");
        let output: CachePurgeOutput = serde_json::from_str(text).unwrap();
        output.deleted
    }

    #[tokio::test]
    async fn test_purge_expired_by_default() {
        let facade = seeded();
        let result = purge_impl(&facade, CachePurgeParams::default()).await.unwrap();
        assert_eq!(deleted(&result), 1);
        assert_eq!(facade.cache().len(), 1);
    }

    #[tokio::test]
    async fn test_purge_everything() {
        let facade = seeded();
        let result = purge_impl(&facade, CachePurgeParams { expired_only: Some(false) }).await.unwrap();
        assert_eq!(deleted(&result), 2);
        assert!(facade.cache().is_empty());
    }
}
