//! Core types and shared functionality for harvest.
//!
//! This crate provides:
//! - A bounded in-memory result cache with per-website-type strategies
//! - Background refresh scheduling and sampled change detection
//! - A schema-less query engine (search, filter, sort, project, paginate)
//! - The serving facade tying them to an injected [`Fetcher`]
//! - Unified error types and layered configuration

pub mod cache;
pub mod change;
pub mod config;
pub mod error;
pub mod metrics;
pub mod query;
pub mod record;
pub mod refresh;
pub mod serve;

pub use cache::{CacheStats, CacheStore, CacheStrategy, compute_cache_key};
pub use change::{ChangeReport, ChangeType, Severity};
pub use config::{AppConfig, ConfigError};
pub use error::Error;
pub use query::{QueryEngine, QueryParams, QueryResult};
pub use record::{Record, Value};
pub use refresh::{RefreshJob, RefreshScheduler, ResourceInfo};
pub use serve::{Fetcher, ServeResponse, ServingFacade};
