//! Worker pool driving the per-URL pipeline
//!
//! This module handles:
//! - Spawning a fixed number of workers against one shared frontier
//! - Global concurrency limiting via a semaphore
//! - Idle backoff when the frontier is empty
//! - Releasing abandoned claims on cancellation
//! - Periodic recovery of expired claims
//!
//! Workers share no mutable state beyond the semaphore. Who works on what is
//! decided entirely by `FrontierStore::claim_one`.

use crate::config::Config;
use crate::crawler::fetcher::{FetchOutcome, Fetcher};
use crate::crawler::parser::extract_page;
use crate::storage::{Claim, FrontierStore, NewDocument, StorageError, StorageResult};
use crate::url::LinkFilter;
use crate::CrawlError;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;
use url::Url;

/// Lower bound for the expired-claim sweep interval
const MIN_REAP_INTERVAL: Duration = Duration::from_millis(100);

/// Pause after a failed claim before the worker tries again
const CLAIM_ERROR_BACKOFF: Duration = Duration::from_millis(250);

/// Pool sizing and timing
#[derive(Debug, Clone)]
pub struct PoolSettings {
    /// Number of worker tasks
    pub workers: usize,

    /// Maximum number of workers holding a claimed URL at once
    pub max_concurrency: usize,

    /// Wait after finding the frontier empty
    pub idle_wait: Duration,

    /// Age after which an IN_PROGRESS claim is requeued
    pub claim_lease: Duration,
}

impl PoolSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            workers: config.crawler.workers as usize,
            max_concurrency: config.crawler.max_concurrency as usize,
            idle_wait: config.crawler.idle_wait(),
            claim_lease: config.frontier.claim_lease(),
        }
    }

    fn reap_interval(&self) -> Duration {
        (self.claim_lease / 2).max(MIN_REAP_INTERVAL)
    }
}

/// What happened to one claimed URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageOutcome {
    /// Links, document and completion were committed together
    Completed { links: usize, new_links: usize },

    /// The fetch failed; the failure was recorded against the retry budget
    FetchFailed { outcome: FetchOutcome },

    /// The page was fetched but could not be persisted; recorded as a failure
    PersistFailed { reason: String },

    /// Cancelled mid-pipeline; the claim was handed back untouched
    Released,

    /// The lease expired and another worker holds the URL; nothing was recorded
    ClaimLost,
}

/// Counters summed over every worker of a run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolReport {
    pub claimed: u64,
    pub completed: u64,
    pub fetch_failed: u64,
    pub persist_failed: u64,
    pub released: u64,
    pub claims_lost: u64,
    pub links_discovered: u64,
    pub storage_errors: u64,
    pub idle_waits: u64,
}

impl PoolReport {
    fn record(&mut self, outcome: &PageOutcome) {
        match outcome {
            PageOutcome::Completed { new_links, .. } => {
                self.completed += 1;
                self.links_discovered += *new_links as u64;
            }
            PageOutcome::FetchFailed { .. } => self.fetch_failed += 1,
            PageOutcome::PersistFailed { .. } => self.persist_failed += 1,
            PageOutcome::Released => self.released += 1,
            PageOutcome::ClaimLost => self.claims_lost += 1,
        }
    }

    fn merge(&mut self, other: &PoolReport) {
        self.claimed += other.claimed;
        self.completed += other.completed;
        self.fetch_failed += other.fetch_failed;
        self.persist_failed += other.persist_failed;
        self.released += other.released;
        self.claims_lost += other.claims_lost;
        self.links_discovered += other.links_discovered;
        self.storage_errors += other.storage_errors;
        self.idle_waits += other.idle_waits;
    }
}

/// Runs a blocking store operation on the blocking thread pool
async fn with_store<S, T, F>(store: &Arc<S>, op: F) -> StorageResult<T>
where
    S: FrontierStore + 'static,
    T: Send + 'static,
    F: FnOnce(&S) -> StorageResult<T> + Send + 'static,
{
    let store = Arc::clone(store);
    tokio::task::spawn_blocking(move || op(&*store))
        .await
        .map_err(|e| StorageError::Task(e.to_string()))?
}

/// A fixed set of workers sharing one frontier, fetcher and filter
pub struct WorkerPool<S> {
    store: Arc<S>,
    fetcher: Arc<Fetcher>,
    filter: Arc<LinkFilter>,
    slots: Arc<Semaphore>,
    settings: PoolSettings,
}

impl<S: FrontierStore + 'static> WorkerPool<S> {
    pub fn new(store: Arc<S>, fetcher: Fetcher, filter: LinkFilter, settings: PoolSettings) -> Self {
        let slots = Arc::new(Semaphore::new(settings.max_concurrency.max(1)));

        Self {
            store,
            fetcher: Arc::new(fetcher),
            filter: Arc::new(filter),
            slots,
            settings,
        }
    }

    /// Builds a pool with the fetcher and filter described by the configuration
    pub fn from_config(store: Arc<S>, config: &Config) -> Result<Self, CrawlError> {
        let fetcher = Fetcher::from_config(&config.crawler, &config.user_agent)?;
        let filter = LinkFilter::new(&config.filter);
        Ok(Self::new(store, fetcher, filter, PoolSettings::from_config(config)))
    }

    /// Runs every worker until `cancel` fires, then waits for them to drain
    ///
    /// Claims left behind by a previous run are requeued first; failure to do
    /// so means the store is unavailable and aborts the run.
    pub async fn run(&self, cancel: CancellationToken) -> Result<PoolReport, CrawlError> {
        let lease = self.settings.claim_lease;
        let recovered = with_store(&self.store, move |store| store.requeue_expired(lease)).await?;
        if recovered > 0 {
            tracing::info!(requeued = recovered, "Requeued expired claims from a previous run");
        }

        let reaper_cancel = cancel.child_token();
        let reaper = tokio::spawn(reap_expired(
            Arc::clone(&self.store),
            lease,
            self.settings.reap_interval(),
            reaper_cancel.clone(),
        ));

        tracing::info!(
            workers = self.settings.workers,
            max_concurrency = self.settings.max_concurrency,
            "Starting worker pool"
        );

        let mut workers = JoinSet::new();
        for id in 0..self.settings.workers {
            let worker = Worker {
                id,
                store: Arc::clone(&self.store),
                fetcher: Arc::clone(&self.fetcher),
                filter: Arc::clone(&self.filter),
                slots: Arc::clone(&self.slots),
                idle_wait: self.settings.idle_wait,
                cancel: cancel.clone(),
            };
            workers.spawn(worker.run().instrument(tracing::info_span!("worker", id)));
        }

        let mut report = PoolReport::default();
        let mut task_error = None;
        while let Some(joined) = workers.join_next().await {
            match joined {
                Ok(worker_report) => report.merge(&worker_report),
                Err(e) => {
                    tracing::error!(error = %e, "Worker task failed");
                    task_error.get_or_insert_with(|| e.to_string());
                }
            }
        }

        // Workers only stop on cancellation or panic; make sure the reaper stops too
        reaper_cancel.cancel();
        if let Err(e) = reaper.await {
            tracing::warn!(error = %e, "Reaper task failed");
        }

        tracing::info!(
            claimed = report.claimed,
            completed = report.completed,
            fetch_failed = report.fetch_failed,
            persist_failed = report.persist_failed,
            released = report.released,
            claims_lost = report.claims_lost,
            "Worker pool stopped"
        );

        match task_error {
            Some(e) => Err(CrawlError::Task(e)),
            None => Ok(report),
        }
    }
}

/// Periodically returns abandoned claims to the frontier
async fn reap_expired<S: FrontierStore + 'static>(
    store: Arc<S>,
    lease: Duration,
    interval: Duration,
    cancel: CancellationToken,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick completes immediately; the pool has just swept
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {}
        }

        match with_store(&store, move |store| store.requeue_expired(lease)).await {
            Ok(0) => {}
            Ok(requeued) => tracing::info!(requeued, "Requeued expired claims"),
            Err(e) => tracing::warn!(error = %e, "Failed to requeue expired claims"),
        }
    }
}

/// One sequential pipeline: claim, fetch, extract, filter, persist
struct Worker<S> {
    id: usize,
    store: Arc<S>,
    fetcher: Arc<Fetcher>,
    filter: Arc<LinkFilter>,
    slots: Arc<Semaphore>,
    idle_wait: Duration,
    cancel: CancellationToken,
}

impl<S: FrontierStore + 'static> Worker<S> {
    async fn run(self) -> PoolReport {
        let mut report = PoolReport::default();
        tracing::debug!(worker = self.id, "Worker started");

        loop {
            if self.cancel.is_cancelled() {
                break;
            }

            let permit = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => break,
                permit = self.slots.acquire() => match permit {
                    Ok(permit) => permit,
                    Err(_) => break,
                },
            };

            match with_store(&self.store, |store| store.claim_one()).await {
                Ok(Some(claim)) => {
                    report.claimed += 1;
                    let outcome = self.process(&claim).await;
                    drop(permit);
                    report.record(&outcome);
                }
                Ok(None) => {
                    drop(permit);
                    report.idle_waits += 1;
                    tracing::debug!(worker = self.id, "Frontier empty, idling");
                    if !self.idle(self.idle_wait).await {
                        break;
                    }
                }
                Err(e) => {
                    drop(permit);
                    report.storage_errors += 1;
                    tracing::error!(worker = self.id, error = %e, "Claim failed");
                    if !self.idle(self.idle_wait.min(CLAIM_ERROR_BACKOFF)).await {
                        break;
                    }
                }
            }
        }

        tracing::debug!(worker = self.id, "Worker stopped");
        report
    }

    /// Sleeps for `wait`; returns false if cancelled meanwhile
    async fn idle(&self, wait: Duration) -> bool {
        tokio::select! {
            _ = self.cancel.cancelled() => false,
            _ = tokio::time::sleep(wait) => true,
        }
    }

    async fn process(&self, claim: &Claim) -> PageOutcome {
        let url = claim.url.as_str();
        tracing::info!(worker = self.id, url, "Claimed URL");

        if self.cancel.is_cancelled() {
            return self.release(claim).await;
        }

        let page_url = match Url::parse(url) {
            Ok(page_url) => page_url,
            Err(e) => {
                let outcome = FetchOutcome::OtherError(format!("invalid URL: {}", e));
                return self.fetch_failed(claim, outcome).await;
            }
        };

        let fetched = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => None,
            result = self.fetcher.fetch(url) => Some(result),
        };
        let Some(fetched) = fetched else {
            return self.release(claim).await;
        };

        if !fetched.outcome.is_success() {
            return self.fetch_failed(claim, fetched.outcome).await;
        }

        let filter = Arc::clone(&self.filter);
        let content = fetched.content;
        let extracted = tokio::task::spawn_blocking(move || {
            let page = extract_page(&content);
            let links = filter.filter(&page_url, &page.links);
            (page, links)
        })
        .await;

        let (page, links) = match extracted {
            Ok(extracted) => extracted,
            Err(e) => {
                let outcome = FetchOutcome::OtherError(format!("extraction failed: {}", e));
                return self.fetch_failed(claim, outcome).await;
            }
        };

        let links: Vec<String> = links.into_iter().collect();
        let link_count = links.len();
        let document = NewDocument {
            title: page.title,
            content: page.text,
            url: url.to_string(),
        };

        let held = claim.clone();
        match with_store(&self.store, move |store| store.record_page(&held, &links, &document)).await
        {
            Ok(new_links) => {
                tracing::info!(
                    worker = self.id,
                    url,
                    links = link_count,
                    new_links,
                    "Page completed"
                );
                PageOutcome::Completed {
                    links: link_count,
                    new_links,
                }
            }
            Err(StorageError::ClaimLost(_)) => {
                tracing::warn!(
                    worker = self.id,
                    url,
                    "Lease expired before the page was persisted; discarding result"
                );
                PageOutcome::ClaimLost
            }
            Err(e) => {
                let reason = format!("persistence failed: {}", e);
                tracing::error!(worker = self.id, url, reason = %reason, "Page not persisted");
                self.record_failure(claim, &reason).await;
                PageOutcome::PersistFailed { reason }
            }
        }
    }

    async fn fetch_failed(&self, claim: &Claim, outcome: FetchOutcome) -> PageOutcome {
        let reason = outcome.to_string();
        if self.record_failure(claim, &reason).await {
            PageOutcome::FetchFailed { outcome }
        } else {
            PageOutcome::ClaimLost
        }
    }

    /// Records a failed attempt; returns false if the claim was lost
    async fn record_failure(&self, claim: &Claim, reason: &str) -> bool {
        let url = claim.url.as_str();
        let held = claim.clone();
        let stored_reason = reason.to_string();

        match with_store(&self.store, move |store| store.mark_failed(&held, &stored_reason)).await {
            Ok(record) => tracing::warn!(
                worker = self.id,
                url,
                reason,
                status = %record.status,
                retry_count = record.retry_count,
                "Attempt failed"
            ),
            Err(StorageError::ClaimLost(_)) => {
                tracing::warn!(
                    worker = self.id,
                    url,
                    reason,
                    "Lease expired before the failure was recorded"
                );
                return false;
            }
            Err(e) => tracing::error!(
                worker = self.id,
                url,
                reason,
                error = %e,
                "Failed to record failure"
            ),
        }
        true
    }

    async fn release(&self, claim: &Claim) -> PageOutcome {
        let url = claim.url.as_str();
        let held = claim.clone();
        match with_store(&self.store, move |store| store.release(&held)).await {
            Ok(()) => tracing::info!(worker = self.id, url, "Released claim on shutdown"),
            Err(StorageError::ClaimLost(_)) => {
                tracing::info!(worker = self.id, url, "Claim already requeued by another worker");
                return PageOutcome::ClaimLost;
            }
            Err(e) => tracing::error!(
                worker = self.id,
                url,
                error = %e,
                "Failed to release claim; it will be requeued when the lease expires"
            ),
        }
        PageOutcome::Released
    }
}
