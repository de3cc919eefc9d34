//! Background refresh scheduling.
//!
//! The scheduler only decides and queues. Execution belongs to a worker that
//! pulls due jobs, marks them in flight and reports back. Each cache key has
//! at most one outstanding job.

use crate::cache::strategy::CacheStrategy;
use crate::query::QueryParams;
use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// Fraction of the TTL after which a scheduled refresh becomes due.
const REFRESH_LEAD: f64 = 0.9;

/// What a refresh needs in order to re-fetch a cache key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceInfo {
    pub id: String,
    /// Target URL, opaque to the core.
    pub url: String,
    pub website_type: String,
    pub query: QueryParams,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    Pending,
    InFlight,
}

/// A scheduled unit of background work.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RefreshJob {
    pub key: String,
    pub resource: ResourceInfo,
    pub priority: u8,
    pub scheduled_at: DateTime<Utc>,
    pub attempts: u32,
    pub max_attempts: u32,
    pub state: JobState,
}

/// What happened to a job after a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureOutcome {
    /// Back to pending, due again at `next_at`.
    Retry { attempts: u32, next_at: DateTime<Utc> },
    /// Out of attempts; the job was removed.
    Dropped { attempts: u32 },
}

/// Idempotent queue of refresh jobs keyed by cache key.
pub struct RefreshScheduler {
    jobs: Mutex<HashMap<String, RefreshJob>>,
    enabled: bool,
    max_attempts: u32,
    backoff: Duration,
}

fn delta(d: Duration) -> TimeDelta {
    TimeDelta::from_std(d).unwrap_or(TimeDelta::MAX)
}

impl RefreshScheduler {
    pub fn new(enabled: bool, max_attempts: u32, backoff: Duration) -> Self {
        Self { jobs: Mutex::new(HashMap::new()), enabled, max_attempts: max_attempts.max(1), backoff }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, RefreshJob>> {
        self.jobs.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Queue a refresh for `key` unless one is already pending or in flight.
    ///
    /// Returns whether a new job was created.
    pub fn schedule_if_needed(&self, key: &str, strategy: &CacheStrategy, resource: &ResourceInfo) -> bool {
        self.schedule_if_needed_at(key, strategy, resource, Utc::now())
    }

    pub fn schedule_if_needed_at(
        &self, key: &str, strategy: &CacheStrategy, resource: &ResourceInfo, now: DateTime<Utc>,
    ) -> bool {
        if !self.enabled {
            return false;
        }

        let mut jobs = self.lock();
        if jobs.contains_key(key) {
            return false;
        }

        let scheduled_at = now.checked_add_signed(delta(strategy.ttl.mul_f64(REFRESH_LEAD))).unwrap_or(now);
        jobs.insert(
            key.to_string(),
            RefreshJob {
                key: key.to_string(),
                resource: resource.clone(),
                priority: strategy.refresh_rate.priority(),
                scheduled_at,
                attempts: 0,
                max_attempts: self.max_attempts,
                state: JobState::Pending,
            },
        );

        tracing::debug!(key = %key, resource = %resource.id, %scheduled_at, "refresh scheduled");
        true
    }

    /// Pending jobs due at `now`, earliest first; ties go to higher priority.
    pub fn next_due_jobs(&self, now: DateTime<Utc>) -> Vec<RefreshJob> {
        let mut due: Vec<RefreshJob> = self
            .lock()
            .values()
            .filter(|job| job.state == JobState::Pending && job.scheduled_at <= now)
            .cloned()
            .collect();

        due.sort_by(|a, b| a.scheduled_at.cmp(&b.scheduled_at).then(b.priority.cmp(&a.priority)));
        due
    }

    /// Claim a pending job. Returns `false` if there is nothing pending for `key`.
    pub fn mark_in_flight(&self, key: &str) -> bool {
        match self.lock().get_mut(key) {
            Some(job) if job.state == JobState::Pending => {
                job.state = JobState::InFlight;
                true
            }
            _ => false,
        }
    }

    /// Finish a job successfully and remove it.
    pub fn mark_done(&self, key: &str) -> bool {
        self.lock().remove(key).is_some()
    }

    /// Record a failed attempt.
    ///
    /// Retries go back to pending with linear backoff. A job that reaches its
    /// attempt limit is dropped and logged; the failure never reaches a caller.
    pub fn mark_failed(&self, key: &str) -> Option<FailureOutcome> {
        self.mark_failed_at(key, Utc::now())
    }

    pub fn mark_failed_at(&self, key: &str, now: DateTime<Utc>) -> Option<FailureOutcome> {
        let mut jobs = self.lock();
        let job = jobs.get_mut(key)?;
        job.attempts += 1;

        if job.attempts >= job.max_attempts {
            let attempts = job.attempts;
            let resource = job.resource.id.clone();
            jobs.remove(key);
            tracing::warn!(key = %key, resource = %resource, attempts, "refresh job dropped after max attempts");
            return Some(FailureOutcome::Dropped { attempts });
        }

        let next_at = now.checked_add_signed(delta(self.backoff * job.attempts)).unwrap_or(now);
        job.state = JobState::Pending;
        job.scheduled_at = next_at;
        tracing::debug!(key = %key, attempts = job.attempts, %next_at, "refresh job will retry");
        Some(FailureOutcome::Retry { attempts: job.attempts, next_at })
    }

    /// Drop a pending job. In-flight jobs are left alone.
    pub fn cancel(&self, key: &str) -> bool {
        let mut jobs = self.lock();
        if jobs.get(key).is_some_and(|job| job.state == JobState::Pending) {
            jobs.remove(key);
            return true;
        }
        false
    }

    pub fn get(&self, key: &str) -> Option<RefreshJob> {
        self.lock().get(key).cloned()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn pending_count(&self) -> usize {
        self.lock().values().filter(|job| job.state == JobState::Pending).count()
    }
}
