//! Background refresh worker.
//!
//! Ticks every `refresh_poll_interval_ms`, claims the scheduler's due jobs and
//! refreshes them concurrently. Failures stay inside the scheduler's retry
//! bookkeeping; nothing here reaches a caller.

use chrono::{DateTime, Utc};
use harvest_core::ServingFacade;
use std::sync::Arc;
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::{MissedTickBehavior, interval};

/// Start the worker loop. Returns immediately when background refresh is disabled.
pub fn spawn(facade: Arc<ServingFacade>) -> JoinHandle<()> {
    tokio::spawn(async move {
        if !facade.scheduler().is_enabled() {
            tracing::info!("background refresh disabled");
            return;
        }

        let mut ticker = interval(facade.config().refresh_poll_interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            let refreshed = run_once(&facade, Utc::now()).await;
            if refreshed > 0 {
                tracing::debug!(refreshed, "refresh tick completed");
            }
        }
    })
}

/// Claim and run every job due at `now`. Returns how many jobs were claimed.
pub async fn run_once(facade: &Arc<ServingFacade>, now: DateTime<Utc>) -> usize {
    let mut tasks = JoinSet::new();

    for job in facade.scheduler().next_due_jobs(now) {
        if !facade.scheduler().mark_in_flight(&job.key) {
            continue;
        }

        let facade = Arc::clone(facade);
        tasks.spawn(async move {
            match facade.refresh(&job).await {
                Ok(Some(report)) => {
                    tracing::debug!(key = %job.key, changed = report.has_changed, "background refresh completed");
                }
                Ok(None) => {}
                Err(err) => {
                    tracing::debug!(key = %job.key, attempts = job.attempts + 1, error = %err, "background refresh failed");
                }
            }
        });
    }

    let claimed = tasks.len();
    while let Some(joined) = tasks.join_next().await {
        if let Err(err) = joined {
            tracing::warn!(error = %err, "refresh task panicked");
        }
    }
    claimed
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeDelta;
    use harvest_core::{AppConfig, Error, Fetcher, QueryParams, Record, ResourceInfo, compute_cache_key};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Counting(AtomicUsize, bool);

    #[async_trait::async_trait]
    impl Fetcher for Counting {
        async fn fetch(&self, _resource: &ResourceInfo) -> Result<Vec<Record>, Error> {
            self.0.fetch_add(1, Ordering::SeqCst);
            if self.1 { Ok(vec![Record::new()]) } else { Err(Error::FetchFailed("down".into())) }
        }
    }

    #[tokio::test]
    async fn test_run_once_refreshes_due_jobs() {
        let fetcher = Arc::new(Counting(AtomicUsize::new(0), true));
        let facade = Arc::new(ServingFacade::new(AppConfig::default(), fetcher.clone()));
        facade.serve("feed", &QueryParams::default(), "social").await.unwrap();
        // a read since the fetch keeps the entry on the refresh cycle
        facade.serve("feed", &QueryParams::default(), "social").await.unwrap();

        assert_eq!(run_once(&facade, Utc::now()).await, 0);

        let later = Utc::now() + TimeDelta::minutes(5);
        assert_eq!(run_once(&facade, later).await, 1);
        assert_eq!(fetcher.0.load(Ordering::SeqCst), 2);

        // rescheduled for the next cycle
        let key = compute_cache_key("feed", &QueryParams::default());
        assert!(facade.scheduler().get(&key).is_some());

        // nobody read it after the refresh, so the next cycle ends it
        assert_eq!(run_once(&facade, later + TimeDelta::minutes(5)).await, 1);
        assert_eq!(fetcher.0.load(Ordering::SeqCst), 3);
        assert!(facade.scheduler().is_empty());
    }

    #[tokio::test]
    async fn test_failed_refresh_is_retried_then_dropped() {
        let fetcher = Arc::new(Counting(AtomicUsize::new(0), false));
        let config = AppConfig { max_refresh_attempts: 2, ..AppConfig::default() };
        let facade = Arc::new(ServingFacade::new(config, fetcher));

        let key = compute_cache_key("feed", &QueryParams::default());
        let resource = ResourceInfo {
            id: "feed".into(),
            url: "feed".into(),
            website_type: "social".into(),
            query: QueryParams::default(),
        };
        let strategy = harvest_core::CacheStrategy::for_website_type("social");
        facade.cache().put(&key, vec![Record::new()], &strategy);
        facade.scheduler().schedule_if_needed(&key, &strategy, &resource);

        let far = Utc::now() + TimeDelta::hours(1);
        assert_eq!(run_once(&facade, far).await, 1);
        assert_eq!(facade.scheduler().get(&key).map(|j| j.attempts), Some(1));

        assert_eq!(run_once(&facade, far + TimeDelta::hours(1)).await, 1);
        assert!(facade.scheduler().get(&key).is_none());
    }
}
