//! MCP server handler implementation.
//!
//! This module defines the main server handler that
//! routes tool calls to the appropriate implementations.
use crate::tools::{
    DataQueryParams,
    cache::{CachePurgeParams, purge_impl, stats_impl},
    query::query_impl,
};
use harvest_core::ServingFacade;
use std::sync::Arc;

use rmcp::{
    ErrorData as McpError, ServerHandler,
    handler::server::{
        tool::{ToolCallContext, ToolRouter},
        wrapper::Parameters,
    },
    model::{
        CallToolRequestParam, CallToolResult, Implementation, ListToolsResult, PaginatedRequestParam, ProtocolVersion,
        ServerCapabilities, ServerInfo,
    },
    service::{RequestContext, RoleServer},
    tool, tool_router,
};

/// The main MCP server handler for harvest.
#[derive(Clone)]
pub struct HarvestServer {
    facade: Arc<ServingFacade>,
    tool_router: ToolRouter<Self>,
}

/// Tool router implementation using the #[tool_router] macro.
///
/// This macro generates the routing logic that maps tool names to handler methods.
#[tool_router]
impl HarvestServer {
    /// Create a new server handler around a shared facade.
    pub fn new(facade: Arc<ServingFacade>) -> Self {
        Self { facade, tool_router: Self::tool_router() }
    }

    /// Serve a resource's records through the cache and query them.
    #[tool(
        description = "Query a website's extracted records. Serves from cache when fresh, fetches otherwise. Supports search, suffix-based filters (_min, _max, _gt, _lt, _ne, _nin, _prefix, _suffix), sort, pagination and field projection."
    )]
    async fn data_query(&self, params: Parameters<DataQueryParams>) -> Result<CallToolResult, McpError> {
        query_impl(&self.facade, params.0).await
    }

    /// Report cache and refresh-queue counters.
    #[tool(description = "Show cache counters (entries, hits, misses, evictions, expirations) and refresh queue size.")]
    async fn cache_stats(&self) -> Result<CallToolResult, McpError> {
        stats_impl(&self.facade).await
    }

    /// Purge expired entries, or clear the cache.
    #[tool(description = "Purge expired cache entries. Set expired_only=false to clear the whole cache.")]
    async fn cache_purge(&self, params: Parameters<CachePurgeParams>) -> Result<CallToolResult, McpError> {
        purge_impl(&self.facade, params.0).await
    }
}

impl ServerHandler for HarvestServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            server_info: Implementation {
                name: "harvest-mcp".into(),
                version: env!("CARGO_PKG_VERSION").into(),
                ..Default::default()
            },
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }

    async fn list_tools(
        &self, _request: Option<PaginatedRequestParam>, _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, rmcp::model::ErrorData> {
        Ok(ListToolsResult { meta: None, tools: self.tool_router.list_all(), next_cursor: None })
    }

    async fn call_tool(
        &self, request: CallToolRequestParam, context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, rmcp::model::ErrorData> {
        self.tool_router
            .call(ToolCallContext::new(self, request, context))
            .await
    }
}
