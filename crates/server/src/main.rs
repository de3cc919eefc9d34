//! harvest-mcp server entry point.
//!
//! Boots the MCP server on stdio transport and the background refresh worker.
//! Logging goes to stderr to avoid interfering with the JSON-RPC protocol on stdout.

use anyhow::Result;
use harvest_client::HttpFetcher;
use harvest_core::{AppConfig, ServingFacade};
use rmcp::service::serve_server;
use rmcp::transport::io::stdio;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

mod handler;
mod tools;
mod worker;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = AppConfig::load()?;
    let fetcher = HttpFetcher::from_app_config(&config)?;
    let facade = Arc::new(ServingFacade::new(config, Arc::new(fetcher)));

    tracing::info!(
        max_entries = facade.config().max_entries,
        background_refresh = facade.config().background_refresh,
        "Starting harvest-mcp server on stdio transport"
    );

    let refresher = worker::spawn(Arc::clone(&facade));

    let handler = handler::HarvestServer::new(facade);
    let transport = stdio();
    let server = serve_server(handler, transport).await?;

    server.waiting().await?;
    refresher.abort();

    Ok(())
}
