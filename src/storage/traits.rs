//! Storage traits and error types
//!
//! This module defines the trait interface for frontier backends and
//! associated error types.

use crate::state::UrlStatus;
use crate::storage::{Claim, Document, FailureRecord, FrontierEntry, NewDocument};
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Connection pool error: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("URL not in frontier: {0}")]
    NotFound(String),

    #[error("Claim on {0} is no longer held")]
    ClaimLost(String),

    #[error("Unknown status in url_queue: {0}")]
    InvalidStatus(String),

    #[error("Storage task failed: {0}")]
    Task(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Durable, concurrency-safe work queue keyed by URL
///
/// Every method is one atomic unit against the shared store: it either
/// commits completely or leaves the store untouched. Implementations must be
/// usable from many threads and processes at once; the only coordination
/// between workers is what these operations provide.
///
/// Methods block. Async callers run them on the blocking thread pool.
pub trait FrontierStore: Send + Sync {
    // ===== Frontier =====

    /// Atomically moves one PENDING URL to IN_PROGRESS and returns the claim
    ///
    /// No two callers ever receive the same URL while it is held. Returns
    /// `None` if nothing is pending.
    fn claim_one(&self) -> StorageResult<Option<Claim>>;

    /// Inserts each URL as PENDING
    ///
    /// URLs already present, in any status, are left untouched. The whole
    /// batch commits or fails together.
    ///
    /// # Returns
    ///
    /// The number of newly inserted URLs
    fn enqueue(&self, urls: &[String]) -> StorageResult<usize>;

    /// Marks a URL COMPLETED (idempotent)
    fn mark_completed(&self, url: &str) -> StorageResult<()>;

    /// Records a failed attempt on a claimed URL
    ///
    /// Increments the retry count and stores `reason`. The URL goes back to
    /// PENDING while the count is below the retry threshold and to FAILED
    /// once it reaches it. Fails with `ClaimLost` if `claim` is no longer
    /// the current claim on its URL.
    fn mark_failed(&self, claim: &Claim, reason: &str) -> StorageResult<FailureRecord>;

    /// Hands a claimed URL back to the frontier without counting a retry
    ///
    /// Fails with `ClaimLost` if `claim` is no longer the current claim.
    fn release(&self, claim: &Claim) -> StorageResult<()>;

    /// Returns claims older than `lease` to PENDING
    ///
    /// # Returns
    ///
    /// The number of claims recovered
    fn requeue_expired(&self, lease: Duration) -> StorageResult<usize>;

    // ===== Documents =====

    /// Persists the result of one successful page visit
    ///
    /// Enqueues `links`, appends `document` and marks the claimed URL
    /// COMPLETED in a single transaction. If any step fails, including the
    /// claim having been lost to another worker, nothing is committed.
    ///
    /// # Returns
    ///
    /// The number of newly inserted links
    fn record_page(&self, claim: &Claim, links: &[String], document: &NewDocument)
        -> StorageResult<usize>;

    // ===== Inspection =====

    /// Gets the frontier row for a URL
    fn get_entry(&self, url: &str) -> StorageResult<Option<FrontierEntry>>;

    /// Counts URLs in a status
    fn count_by_status(&self, status: UrlStatus) -> StorageResult<u64>;

    /// Counts stored documents
    fn count_documents(&self) -> StorageResult<u64>;

    /// Gets all documents crawled from a URL, oldest first
    fn documents_for_url(&self, url: &str) -> StorageResult<Vec<Document>>;

    /// Most common failure reasons with their counts
    fn top_fail_reasons(&self, limit: usize) -> StorageResult<Vec<(String, u64)>>;
}
