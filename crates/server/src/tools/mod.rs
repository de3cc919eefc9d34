//! MCP tool implementations.
//!
//! This module contains all tools exposed by the harvest server.

pub mod cache;
pub mod query;

pub use query::DataQueryParams;

/// Render a tool output as pretty JSON text content.
pub(crate) fn json_result<T: serde::Serialize>(
    output: &T,
) -> Result<rmcp::model::CallToolResult, rmcp::ErrorData> {
    let json = serde_json::to_string_pretty(output).map_err(harvest_core::Error::from)?;
    Ok(rmcp::model::CallToolResult::success(vec![rmcp::model::Content::text(json)]))
}
