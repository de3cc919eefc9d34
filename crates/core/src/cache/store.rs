//! Bounded in-memory store of cached result sets.
//!
//! Uses a `HashMap` behind a std `RwLock`. Reads take the shared lock and
//! record access statistics through atomics, so lookups of different keys
//! never wait on each other. Insertion, eviction and expiry removal take the
//! exclusive lock.

use super::strategy::CacheStrategy;
use crate::metrics::content_hash;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

/// A point-in-time view of a cached entry.
#[derive(Debug)]
pub struct CacheEntry<T> {
    pub data: Arc<T>,
    pub created_at: DateTime<Utc>,
    pub ttl: Duration,
    pub content_hash: String,
    pub hit_count: u64,
    pub last_accessed_at: DateTime<Utc>,
}

impl<T> Clone for CacheEntry<T> {
    fn clone(&self) -> Self {
        Self {
            data: Arc::clone(&self.data),
            created_at: self.created_at,
            ttl: self.ttl,
            content_hash: self.content_hash.clone(),
            hit_count: self.hit_count,
            last_accessed_at: self.last_accessed_at,
        }
    }
}

impl<T> CacheEntry<T> {
    /// Time elapsed since the entry was stored. Clock skew reads as zero.
    pub fn age(&self, now: DateTime<Utc>) -> Duration {
        age_since(self.created_at, now)
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.age(now) > self.ttl
    }

    /// Past the strategy's refresh threshold, whether or not it has expired.
    pub fn is_stale(&self, strategy: &CacheStrategy, now: DateTime<Utc>) -> bool {
        self.age(now) > strategy.refresh_after()
    }
}

fn age_since(created_at: DateTime<Utc>, now: DateTime<Utc>) -> Duration {
    (now - created_at).to_std().unwrap_or_default()
}

/// Counters exposed for observability.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct CacheStats {
    pub entries: usize,
    pub max_size: usize,
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub expirations: u64,
}

struct Slot<T> {
    data: Arc<T>,
    created_at: DateTime<Utc>,
    ttl: Duration,
    content_hash: String,
    hit_count: AtomicU64,
    last_accessed_ms: AtomicI64,
}

impl<T> Slot<T> {
    fn is_expired(&self, now: DateTime<Utc>) -> bool {
        age_since(self.created_at, now) > self.ttl
    }

    fn touch(&self, now: DateTime<Utc>) {
        self.hit_count.fetch_add(1, Ordering::Relaxed);
        self.last_accessed_ms.fetch_max(now.timestamp_millis(), Ordering::Relaxed);
    }

    fn last_accessed_ms(&self) -> i64 {
        self.last_accessed_ms.load(Ordering::Relaxed)
    }

    fn snapshot(&self) -> CacheEntry<T> {
        let last_ms = self.last_accessed_ms();
        CacheEntry {
            data: Arc::clone(&self.data),
            created_at: self.created_at,
            ttl: self.ttl,
            content_hash: self.content_hash.clone(),
            hit_count: self.hit_count.load(Ordering::Relaxed),
            last_accessed_at: DateTime::from_timestamp_millis(last_ms).unwrap_or(self.created_at),
        }
    }
}

/// Bounded key/value store with lazy expiry and least-recently-accessed eviction.
pub struct CacheStore<T> {
    slots: RwLock<HashMap<String, Slot<T>>>,
    max_size: usize,
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
    expirations: AtomicU64,
}

impl<T: Serialize> CacheStore<T> {
    /// Create a store holding at most `max_size` entries (minimum 1).
    pub fn new(max_size: usize) -> Self {
        Self {
            slots: RwLock::new(HashMap::new()),
            max_size: max_size.max(1),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
            expirations: AtomicU64::new(0),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, Slot<T>>> {
        self.slots.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, Slot<T>>> {
        self.slots.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Store or overwrite `key`, evicting one entry first when at capacity.
    pub fn put(&self, key: &str, data: T, strategy: &CacheStrategy) -> CacheEntry<T> {
        self.put_at(key, data, strategy, Utc::now())
    }

    pub fn put_at(&self, key: &str, data: T, strategy: &CacheStrategy, now: DateTime<Utc>) -> CacheEntry<T> {
        let hash = content_hash(&data);
        let slot = Slot {
            data: Arc::new(data),
            created_at: now,
            ttl: strategy.ttl,
            content_hash: hash,
            hit_count: AtomicU64::new(0),
            last_accessed_ms: AtomicI64::new(now.timestamp_millis()),
        };
        let entry = slot.snapshot();

        let mut slots = self.write();
        if !slots.contains_key(key) && slots.len() >= self.max_size {
            Self::evict_one(&mut slots, &self.evictions);
        }
        slots.insert(key.to_string(), slot);

        entry
    }

    fn evict_one(slots: &mut HashMap<String, Slot<T>>, evictions: &AtomicU64) {
        let victim = slots
            .iter()
            .min_by(|(_, a), (_, b)| {
                a.last_accessed_ms()
                    .cmp(&b.last_accessed_ms())
                    .then(a.created_at.cmp(&b.created_at))
            })
            .map(|(key, _)| key.clone());

        if let Some(key) = victim {
            slots.remove(&key);
            evictions.fetch_add(1, Ordering::Relaxed);
            tracing::debug!(key = %key, "evicted least recently accessed cache entry");
        }
    }

    /// Look up a live entry, recording the access.
    ///
    /// Expired entries read as absent and are removed on the way out.
    pub fn get(&self, key: &str) -> Option<CacheEntry<T>> {
        self.get_at(key, Utc::now())
    }

    pub fn get_at(&self, key: &str, now: DateTime<Utc>) -> Option<CacheEntry<T>> {
        {
            let slots = self.read();
            match slots.get(key) {
                None => {
                    self.misses.fetch_add(1, Ordering::Relaxed);
                    return None;
                }
                Some(slot) if !slot.is_expired(now) => {
                    slot.touch(now);
                    self.hits.fetch_add(1, Ordering::Relaxed);
                    return Some(slot.snapshot());
                }
                Some(_) => {}
            }
        }

        // Re-check under the exclusive lock; a writer may have replaced the entry.
        let mut slots = self.write();
        let expired = match slots.get(key) {
            Some(slot) if !slot.is_expired(now) => {
                slot.touch(now);
                self.hits.fetch_add(1, Ordering::Relaxed);
                return Some(slot.snapshot());
            }
            Some(_) => true,
            None => false,
        };

        if expired {
            slots.remove(key);
            self.expirations.fetch_add(1, Ordering::Relaxed);
            tracing::debug!(key = %key, "cache entry expired");
        }
        self.misses.fetch_add(1, Ordering::Relaxed);
        None
    }

    /// Read a live entry without recording an access or touching counters.
    pub fn peek(&self, key: &str) -> Option<CacheEntry<T>> {
        self.peek_at(key, Utc::now())
    }

    pub fn peek_at(&self, key: &str, now: DateTime<Utc>) -> Option<CacheEntry<T>> {
        self.read()
            .get(key)
            .filter(|slot| !slot.is_expired(now))
            .map(Slot::snapshot)
    }

    /// Whether `entry` has crossed the strategy's refresh threshold.
    pub fn is_stale(entry: &CacheEntry<T>, strategy: &CacheStrategy) -> bool {
        entry.is_stale(strategy, Utc::now())
    }

    /// Remove a single key. Returns whether it was present.
    pub fn remove(&self, key: &str) -> bool {
        self.write().remove(key).is_some()
    }

    /// Delete expired entries.
    ///
    /// Returns the number of deleted entries.
    pub fn purge_expired(&self) -> u64 {
        self.purge_expired_at(Utc::now())
    }

    pub fn purge_expired_at(&self, now: DateTime<Utc>) -> u64 {
        let mut slots = self.write();
        let before = slots.len();
        slots.retain(|_, slot| !slot.is_expired(now));
        let purged = (before - slots.len()) as u64;
        self.expirations.fetch_add(purged, Ordering::Relaxed);
        purged
    }

    /// Drop every entry. Returns the number of deleted entries.
    pub fn clear(&self) -> u64 {
        let mut slots = self.write();
        let count = slots.len() as u64;
        slots.clear();
        count
    }

    /// Number of occupied slots, including expired entries not yet reaped.
    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.len(),
            max_size: self.max_size,
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            expirations: self.expirations.load(Ordering::Relaxed),
        }
    }
}
