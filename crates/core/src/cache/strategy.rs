//! Per-website-type caching strategies.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// How aggressively a website type should be kept fresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum RefreshRate {
    Low,
    Medium,
    High,
    Critical,
}

impl RefreshRate {
    /// Job priority; higher runs first among jobs due at the same instant.
    pub fn priority(self) -> u8 {
        match self {
            RefreshRate::Low => 1,
            RefreshRate::Medium => 2,
            RefreshRate::High => 3,
            RefreshRate::Critical => 4,
        }
    }
}

/// Immutable caching policy looked up by website-type label.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CacheStrategy {
    pub ttl: Duration,
    pub refresh_rate: RefreshRate,
    /// Fraction of `ttl` after which a hit warrants a refresh.
    pub refresh_threshold: f64,
}

const DEFAULT_STRATEGY: CacheStrategy =
    CacheStrategy { ttl: Duration::from_secs(10 * 60), refresh_rate: RefreshRate::Medium, refresh_threshold: 0.8 };

const STRATEGIES: &[(&str, CacheStrategy)] = &[
    (
        "ecommerce",
        CacheStrategy { ttl: Duration::from_secs(5 * 60), refresh_rate: RefreshRate::High, refresh_threshold: 0.8 },
    ),
    (
        "news",
        CacheStrategy { ttl: Duration::from_secs(2 * 60), refresh_rate: RefreshRate::Critical, refresh_threshold: 0.7 },
    ),
    (
        "social",
        CacheStrategy { ttl: Duration::from_secs(60), refresh_rate: RefreshRate::Critical, refresh_threshold: 0.6 },
    ),
    (
        "jobs",
        CacheStrategy { ttl: Duration::from_secs(30 * 60), refresh_rate: RefreshRate::Medium, refresh_threshold: 0.8 },
    ),
    (
        "real_estate",
        CacheStrategy { ttl: Duration::from_secs(30 * 60), refresh_rate: RefreshRate::Medium, refresh_threshold: 0.8 },
    ),
    (
        "blog",
        CacheStrategy { ttl: Duration::from_secs(60 * 60), refresh_rate: RefreshRate::Low, refresh_threshold: 0.9 },
    ),
];

/// Normalize a website-type label for table lookups.
///
/// Case-insensitive, trimmed, with `-` treated as `_`.
pub fn normalize_label(label: &str) -> String {
    label.trim().to_lowercase().replace('-', "_")
}

impl CacheStrategy {
    /// Look up the strategy for a website type, falling back to the default.
    pub fn for_website_type(label: &str) -> CacheStrategy {
        let label = normalize_label(label);
        STRATEGIES
            .iter()
            .find(|(name, _)| *name == label)
            .map(|(_, strategy)| *strategy)
            .unwrap_or(DEFAULT_STRATEGY)
    }

    /// Age after which a live entry is considered stale.
    pub fn refresh_after(&self) -> Duration {
        self.ttl.mul_f64(self.refresh_threshold.clamp(0.0, 1.0))
    }
}

impl Default for CacheStrategy {
    fn default() -> Self {
        DEFAULT_STRATEGY
    }
}
