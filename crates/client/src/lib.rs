//! HTTP collaborators for harvest.
//!
//! This crate provides the [`HttpFetcher`], the production [`Fetcher`]
//! implementation that asks an external extraction service for the records
//! behind a resource URL.
//!
//! [`Fetcher`]: harvest_core::Fetcher

pub mod error;
pub mod extractor;
pub mod target;

pub use error::FetchError;
pub use extractor::{ExtractorConfig, HttpFetcher};
pub use target::canonicalize_target;
