//! In-memory result cache with lazy expiry and LRU eviction.
//!
//! This module provides the bounded store that sits in front of the
//! extraction step. It supports:
//!
//! - Deterministic cache keys from (resource, canonical query parameters)
//! - Per-website-type TTL and refresh strategies
//! - Lazy expiry on read plus explicit purging
//! - Least-recently-accessed eviction at capacity

pub mod hash;
pub mod store;
pub mod strategy;

pub use hash::compute_cache_key;
pub use store::{CacheEntry, CacheStats, CacheStore};
pub use strategy::{CacheStrategy, RefreshRate};
