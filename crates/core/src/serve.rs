//! The serving facade: cache lookup, fetch on miss or staleness, change
//! detection, storage, refresh scheduling and query execution.
//!
//! Availability wins over freshness. When a fetch fails and a live entry is
//! still cached, that entry is served and flagged `stale`.

use crate::cache::{CacheEntry, CacheStore, CacheStrategy, compute_cache_key};
use crate::change::{self, ChangeReport};
use crate::config::AppConfig;
use crate::error::Error;
use crate::query::{QueryEngine, QueryParams, QueryResult};
use crate::record::Record;
use crate::refresh::{FailureOutcome, RefreshJob, RefreshScheduler, ResourceInfo};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tokio::time::timeout;

type Records = Vec<Record>;
type InflightMap = Mutex<HashMap<String, Arc<AsyncMutex<()>>>>;

/// The extraction collaborator: produces fresh records for a resource.
///
/// Implementations may be slow and may fail. The facade bounds every call with
/// the configured fetch timeout.
#[async_trait::async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, resource: &ResourceInfo) -> Result<Records, Error>;
}

/// What `serve` hands back to callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServeResponse {
    #[serde(flatten)]
    pub result: QueryResult,
    /// Cached data served because a fetch failed or timed out.
    pub stale: bool,
    /// Present whenever a fetch happened during this call.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub change: Option<ChangeReport>,
}

pub struct ServingFacade {
    cache: CacheStore<Records>,
    scheduler: RefreshScheduler,
    engine: QueryEngine,
    fetcher: Arc<dyn Fetcher>,
    config: AppConfig,
    inflight: InflightMap,
}

impl ServingFacade {
    pub fn new(config: AppConfig, fetcher: Arc<dyn Fetcher>) -> Self {
        Self {
            cache: CacheStore::new(config.max_entries),
            scheduler: RefreshScheduler::new(
                config.background_refresh,
                config.max_refresh_attempts,
                config.refresh_backoff(),
            ),
            engine: QueryEngine::from_config(&config),
            fetcher,
            config,
            inflight: Mutex::new(HashMap::new()),
        }
    }

    pub fn cache(&self) -> &CacheStore<Records> {
        &self.cache
    }

    pub fn scheduler(&self) -> &RefreshScheduler {
        &self.scheduler
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Serve `params` against `resource_id`, fetching only when the cached
    /// entry is missing or stale for `website_type`.
    ///
    /// # Errors
    ///
    /// `InvalidInput` for an empty resource id. Fetch errors and timeouts are
    /// returned only when no live cached entry exists to fall back on.
    pub async fn serve(&self, resource_id: &str, params: &QueryParams, website_type: &str) -> Result<ServeResponse, Error> {
        let start = Instant::now();
        let resource_id = resource_id.trim();
        if resource_id.is_empty() {
            return Err(Error::InvalidInput("resource_id must not be empty".into()));
        }

        let key = compute_cache_key(resource_id, params);
        let strategy = CacheStrategy::for_website_type(website_type);

        if let Some(entry) = self.cache.get(&key) {
            if !entry.is_stale(&strategy, Utc::now()) {
                tracing::debug!(key = %key, resource = %resource_id, "cache hit");
                return Ok(self.respond(&entry.data, params, website_type, start, Delivery::Hit));
            }
            tracing::debug!(key = %key, resource = %resource_id, "cache entry stale");
        } else {
            tracing::debug!(key = %key, resource = %resource_id, "cache miss");
        }

        let resource = ResourceInfo {
            id: resource_id.to_string(),
            url: resource_id.to_string(),
            website_type: website_type.to_string(),
            query: params.canonical(),
        };

        let guard = self.key_guard(&key);
        match self.acquire(&guard.lock).await {
            Ok(_permit) => self.serve_locked(&key, &strategy, &resource, params, start).await,
            Err(err) => self.fall_back(&key, params, website_type, start, err),
        }
    }

    async fn serve_locked(
        &self, key: &str, strategy: &CacheStrategy, resource: &ResourceInfo, params: &QueryParams, start: Instant,
    ) -> Result<ServeResponse, Error> {
        // A sibling request may have refreshed the entry while we waited.
        let previous = self.cache.peek(key);
        if let Some(entry) = &previous {
            if !entry.is_stale(strategy, Utc::now()) {
                return Ok(self.respond(&entry.data, params, &resource.website_type, start, Delivery::Hit));
            }
        }

        let fetched = self.fetch_and_store(key, strategy, resource, previous.as_ref()).await;
        self.scheduler.schedule_if_needed(key, strategy, resource);
        match fetched {
            Ok((data, report)) => {
                Ok(self.respond(&data, params, &resource.website_type, start, Delivery::Fetched(report)))
            }
            Err(err) => self.fall_back(key, params, &resource.website_type, start, err),
        }
    }

    /// Re-fetch a scheduled job's resource. Called by the background worker
    /// after it has marked the job in flight.
    ///
    /// Returns `Ok(None)` when the entry is no longer cached; the job is
    /// discarded without fetching. On success the job is finished, and the next
    /// refresh is queued only if the entry was read since it was last stored.
    /// On failure the scheduler decides between retry and drop.
    pub async fn refresh(&self, job: &RefreshJob) -> Result<Option<ChangeReport>, Error> {
        let strategy = CacheStrategy::for_website_type(&job.resource.website_type);
        let guard = self.key_guard(&job.key);
        let _permit = match self.acquire(&guard.lock).await {
            Ok(permit) => permit,
            Err(err) => return Err(self.refresh_failed(job, err)),
        };

        let Some(previous) = self.cache.peek(&job.key) else {
            self.scheduler.mark_done(&job.key);
            tracing::debug!(key = %job.key, "entry no longer cached, refresh job discarded");
            return Ok(None);
        };
        let was_read = previous.hit_count > 0;

        match self.fetch_and_store(&job.key, &strategy, &job.resource, Some(&previous)).await {
            Ok((_, report)) => {
                self.scheduler.mark_done(&job.key);
                if was_read {
                    self.scheduler.schedule_if_needed(&job.key, &strategy, &job.resource);
                } else {
                    tracing::debug!(key = %job.key, "entry unread since last refresh, not rescheduled");
                }
                Ok(Some(report))
            }
            Err(err) => Err(self.refresh_failed(job, err)),
        }
    }

    fn refresh_failed(&self, job: &RefreshJob, err: Error) -> Error {
        if let Some(FailureOutcome::Retry { attempts, next_at }) = self.scheduler.mark_failed(&job.key) {
            tracing::debug!(key = %job.key, attempts, %next_at, error = %err, "refresh failed, will retry");
        }
        err
    }

    async fn fetch_and_store(
        &self, key: &str, strategy: &CacheStrategy, resource: &ResourceInfo, previous: Option<&CacheEntry<Records>>,
    ) -> Result<(Arc<Records>, ChangeReport), Error> {
        let fetch_timeout = self.config.fetch_timeout();
        tracing::debug!(key = %key, resource = %resource.id, "fetching fresh data");

        let records = timeout(fetch_timeout, self.fetcher.fetch(resource))
            .await
            .map_err(|_| Error::FetchTimeout(format!("fetch exceeded {} ms", fetch_timeout.as_millis())))??;

        let report = change::detect(previous.map(|entry| entry.data.as_slice()), Some(records.as_slice()));
        if report.has_changed {
            tracing::info!(
                key = %key,
                resource = %resource.id,
                change_type = ?report.change_type,
                severity = ?report.severity,
                confidence = report.confidence,
                "content changed"
            );
        }

        let entry = self.cache.put(key, records, strategy);
        Ok((entry.data, report))
    }

    fn fall_back(
        &self, key: &str, params: &QueryParams, website_type: &str, start: Instant, err: Error,
    ) -> Result<ServeResponse, Error> {
        match self.cache.peek(key) {
            Some(entry) => {
                tracing::warn!(key = %key, error = %err, "fetch failed, serving stale data");
                Ok(self.respond(&entry.data, params, website_type, start, Delivery::Stale))
            }
            None => Err(err),
        }
    }

    fn respond(
        &self, data: &[Record], params: &QueryParams, website_type: &str, start: Instant, delivery: Delivery,
    ) -> ServeResponse {
        let mut result = if params.is_empty() {
            QueryResult::passthrough(data.to_vec(), self.engine.max_limit())
        } else {
            self.engine.execute(data.to_vec(), params, website_type)
        };
        result.metadata.cache_hit = !matches!(delivery, Delivery::Fetched(_));
        result.metadata.execution_time_ms = start.elapsed().as_millis() as u64;

        let stale = matches!(delivery, Delivery::Stale);
        let change = match delivery {
            Delivery::Fetched(report) => Some(report),
            Delivery::Hit | Delivery::Stale => None,
        };
        ServeResponse { result, stale, change }
    }

    fn key_guard(&self, key: &str) -> KeyGuard<'_> {
        let mut inflight = self.inflight.lock().unwrap_or_else(PoisonError::into_inner);
        let lock = Arc::clone(inflight.entry(key.to_string()).or_default());
        KeyGuard { inflight: &self.inflight, key: key.to_string(), lock }
    }

    /// Wait for the per-key guard, bounded by the fetch timeout.
    async fn acquire(&self, lock: &Arc<AsyncMutex<()>>) -> Result<OwnedMutexGuard<()>, Error> {
        let wait = self.config.fetch_timeout();
        timeout(wait, Arc::clone(lock).lock_owned())
            .await
            .map_err(|_| Error::FetchTimeout(format!("waited {} ms for a concurrent fetch", wait.as_millis())))
    }
}

/// A claim on one key's in-flight lock. Dropping it removes the map entry once
/// nobody else holds or awaits the lock, including when the owning future is
/// cancelled mid-fetch.
struct KeyGuard<'a> {
    inflight: &'a InflightMap,
    key: String,
    lock: Arc<AsyncMutex<()>>,
}

impl Drop for KeyGuard<'_> {
    fn drop(&mut self) {
        let mut inflight = self.inflight.lock().unwrap_or_else(PoisonError::into_inner);
        // the map's copy plus ours
        if Arc::strong_count(&self.lock) <= 2
            && inflight.get(&self.key).is_some_and(|lock| Arc::ptr_eq(lock, &self.lock))
        {
            inflight.remove(&self.key);
        }
    }
}

enum Delivery {
    Hit,
    Stale,
    Fetched(ChangeReport),
}
