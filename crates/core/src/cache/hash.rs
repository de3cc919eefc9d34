//! Deterministic cache key generation.

use crate::query::QueryParams;
use sha2::{Digest, Sha256};

/// Compute the cache key for a resource queried with `params`.
///
/// Parameters are canonicalized first (trimmed search, key-sorted maps), so
/// logically identical requests always map to the same key.
pub fn compute_cache_key(resource_id: &str, params: &QueryParams) -> String {
    let canonical = serde_json::to_value(params.canonical()).map(|v| v.to_string()).unwrap_or_default();

    let mut hasher = Sha256::new();
    hasher.update(resource_id.trim().as_bytes());
    hasher.update(b"\n");
    hasher.update(canonical.as_bytes());
    hex::encode(hasher.finalize())
}
