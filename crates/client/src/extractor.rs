//! Extraction service client.
//!
//! ### Protocol
//!
//! - **Endpoint**: `POST {extractor_url}/extract`
//! - **Request**: JSON `{ "url", "website_type", "query" }`, where `query` is
//!   the canonical query the records will be served for.
//! - **Response**: either a bare JSON array of records, or an object carrying
//!   the array under `records` or `data`. Items that are not objects are
//!   wrapped as `{ "value": item }`.
//! - **Errors**: 429 maps to rate limiting, any other non-2xx status to an
//!   HTTP error. Bodies above `max_bytes` are rejected.

use crate::error::FetchError;
use crate::target::canonicalize_target;
use harvest_core::query::QueryParams;
use harvest_core::{AppConfig, Error, Fetcher, Record, ResourceInfo, Value};
use reqwest::{Client, header};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use url::Url;

/// Default maximum response body size (10MB).
const DEFAULT_MAX_BYTES: usize = 10 * 1024 * 1024;

/// Extraction client configuration.
#[derive(Debug, Clone)]
pub struct ExtractorConfig {
    /// Base URL of the extraction service.
    pub endpoint: Url,
    pub timeout: Duration,
    pub user_agent: String,
    pub max_bytes: usize,
}

impl ExtractorConfig {
    /// Build from the application config.
    ///
    /// Fails with `MissingEndpoint` when `extractor_url` is unset.
    pub fn from_app_config(config: &AppConfig) -> Result<Self, FetchError> {
        let raw = config.require_extractor_url().map_err(|_| FetchError::MissingEndpoint)?;
        let endpoint = Url::parse(raw.trim()).map_err(|e| FetchError::InvalidEndpoint(e.to_string()))?;

        Ok(Self {
            endpoint,
            timeout: config.fetch_timeout(),
            user_agent: config.user_agent.clone(),
            max_bytes: DEFAULT_MAX_BYTES,
        })
    }

    /// The full URL of the extract call.
    pub fn extract_url(&self) -> Result<Url, FetchError> {
        let mut base = self.endpoint.clone();
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        base.join("extract").map_err(|e| FetchError::InvalidEndpoint(e.to_string()))
    }
}

#[derive(Debug, Serialize)]
struct ExtractRequest<'a> {
    url: &'a str,
    website_type: &'a str,
    query: &'a QueryParams,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ExtractResponse {
    Bare(Vec<serde_json::Value>),
    Records { records: Vec<serde_json::Value> },
    Data { data: Vec<serde_json::Value> },
}

impl ExtractResponse {
    fn into_items(self) -> Vec<serde_json::Value> {
        match self {
            ExtractResponse::Bare(items) => items,
            ExtractResponse::Records { records } => records,
            ExtractResponse::Data { data } => data,
        }
    }
}

/// Decode an extraction response body into records.
pub fn parse_records(body: &[u8]) -> Result<Vec<Record>, FetchError> {
    let response: ExtractResponse = serde_json::from_slice(body).map_err(|e| FetchError::Parse(e.to_string()))?;

    Ok(response
        .into_items()
        .into_iter()
        .map(|item| match Value::from(item) {
            Value::Map(record) => record,
            other => Record::from([("value".to_string(), other)]),
        })
        .collect())
}

/// [`Fetcher`] backed by an HTTP extraction service.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    http: Client,
    config: ExtractorConfig,
    extract_url: Url,
}

impl HttpFetcher {
    pub fn new(config: ExtractorConfig) -> Result<Self, FetchError> {
        let extract_url = config.extract_url()?;
        let http = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.timeout)
            .use_rustls_tls()
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .build()
            .map_err(|e| FetchError::Network(Arc::new(e)))?;

        Ok(Self { http, config, extract_url })
    }

    pub fn from_app_config(config: &AppConfig) -> Result<Self, FetchError> {
        Self::new(ExtractorConfig::from_app_config(config)?)
    }

    pub fn config(&self) -> &ExtractorConfig {
        &self.config
    }

    /// Ask the extraction service for the records behind `resource`.
    pub async fn extract(&self, resource: &ResourceInfo) -> Result<Vec<Record>, FetchError> {
        let target = canonicalize_target(&resource.url)?;
        let start = Instant::now();

        tracing::debug!(target = %target, website_type = %resource.website_type, "requesting extraction");

        let response = self
            .http
            .post(self.extract_url.clone())
            .header(header::ACCEPT, "application/json")
            .json(&ExtractRequest { url: target.as_str(), website_type: &resource.website_type, query: &resource.query })
            .send()
            .await?;

        let status = response.status();
        if status == 429 {
            return Err(FetchError::RateLimited);
        }
        if !status.is_success() {
            return Err(FetchError::HttpError { status: status.as_u16() });
        }

        if let Some(len) = response.content_length()
            && len as usize > self.config.max_bytes
        {
            return Err(FetchError::TooLarge { size: len as usize, limit: self.config.max_bytes });
        }

        let body = response.bytes().await?;
        if body.len() > self.config.max_bytes {
            return Err(FetchError::TooLarge { size: body.len(), limit: self.config.max_bytes });
        }

        let records = parse_records(&body)?;
        tracing::debug!(
            target = %target,
            records = records.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "extraction completed"
        );
        Ok(records)
    }
}

#[async_trait::async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, resource: &ResourceInfo) -> Result<Vec<Record>, Error> {
        self.extract(resource).await.map_err(Error::from)
    }
}
