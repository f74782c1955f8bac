//! Crawler coordinator - wires the store, seeds and worker pool together
//!
//! This module contains the crawl entry point, including:
//! - Opening the shared store (fatal if unavailable)
//! - Seeding the frontier
//! - Building the HTTP fetcher and link filter
//! - Running the worker pool until cancelled

use crate::config::Config;
use crate::crawler::scheduler::{PoolReport, WorkerPool};
use crate::storage::{open_store, FrontierStore};
use crate::url::normalize_url;
use crate::CrawlError;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Normalizes seed URLs and inserts them as PENDING
///
/// Seeds that fail normalization are skipped with a warning. Seeds already in
/// the frontier keep their current status.
///
/// # Returns
///
/// The number of seeds that were newly inserted
pub fn seed_frontier<S: FrontierStore + ?Sized>(
    store: &S,
    seeds: &[String],
) -> Result<usize, CrawlError> {
    let mut normalized = Vec::with_capacity(seeds.len());
    for seed in seeds {
        match normalize_url(seed) {
            Ok(url) => normalized.push(url),
            Err(e) => tracing::warn!(seed = %seed, error = %e, "Skipping invalid seed"),
        }
    }

    let inserted = store.enqueue(&normalized)?;
    tracing::info!(
        seeds = normalized.len(),
        inserted,
        "Seeded frontier"
    );
    Ok(inserted)
}

/// Runs the main crawl operation
///
/// This function orchestrates the entire crawl process:
///
/// 1. Open the store (failure is fatal)
/// 2. Insert configured seed URLs
/// 3. Build the HTTP client and link filter
/// 4. Spawn workers and run until `cancel` fires
/// 5. Return the summed worker report
///
/// # Example
///
/// ```no_run
/// use frontier_crawler::config::load_config;
/// use frontier_crawler::crawler::run_crawl;
/// use std::path::Path;
/// use tokio_util::sync::CancellationToken;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = load_config(Path::new("config.toml"))?;
/// let cancel = CancellationToken::new();
/// let report = run_crawl(&config, cancel).await?;
/// println!("{} pages completed", report.completed);
/// # Ok(())
/// # }
/// ```
pub async fn run_crawl(config: &Config, cancel: CancellationToken) -> Result<PoolReport, CrawlError> {
    let store = {
        let config = config.clone();
        tokio::task::spawn_blocking(move || open_store(&config))
            .await
            .map_err(|e| CrawlError::Task(e.to_string()))??
    };
    tracing::info!(database = %config.storage.database_path, "Opened frontier store");

    let store = Arc::new(store);
    if !config.frontier.seeds.is_empty() {
        let seeder = Arc::clone(&store);
        let seeds = config.frontier.seeds.clone();
        tokio::task::spawn_blocking(move || seed_frontier(seeder.as_ref(), &seeds))
            .await
            .map_err(|e| CrawlError::Task(e.to_string()))??;
    }

    let pool = WorkerPool::from_config(store, config)?;
    pool.run(cancel).await
}
