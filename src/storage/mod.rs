//! Storage module for the shared crawl frontier
//!
//! This module handles all database operations for the crawler, including:
//! - SQLite database initialization and schema management
//! - Atomic claim of pending URLs
//! - Retry accounting and terminal failure
//! - Link insertion with de-duplication
//! - Append-only document persistence

mod schema;
mod sqlite;
mod traits;

pub use sqlite::SqliteStore;
pub use traits::{FrontierStore, StorageError, StorageResult};

use crate::config::Config;
use crate::state::UrlStatus;
use std::path::Path;

/// Opens the store described by the configuration
///
/// Failure here is fatal for the crawler: nothing can run without the store.
pub fn open_store(config: &Config) -> StorageResult<SqliteStore> {
    Ok(SqliteStore::open_with(
        Path::new(&config.storage.database_path),
        config.storage.busy_timeout(),
        config.storage.pool_size,
    )?
    .with_retry_threshold(config.frontier.retry_threshold))
}

/// One worker's hold on an IN_PROGRESS URL
///
/// `token` is unique to this claim. After the lease expires and the URL is
/// claimed again, operations carrying the old token are rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Claim {
    pub url: String,
    pub token: String,
}

/// Represents a row of `url_queue`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrontierEntry {
    pub url: String,
    pub status: UrlStatus,
    pub retry_count: u32,
    pub fail_reason: Option<String>,
    pub claimed_at: Option<String>,
}

/// Outcome of recording a failed attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FailureRecord {
    /// Status after the failure was recorded
    pub status: UrlStatus,
    /// Retry count after the failure was recorded
    pub retry_count: u32,
}

/// Page content ready to be stored
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewDocument {
    pub title: Option<String>,
    pub content: String,
    pub url: String,
}

/// Represents a row of `documents`
#[derive(Debug, Clone)]
pub struct Document {
    pub id: String,
    pub title: Option<String>,
    pub content: String,
    pub url: String,
    pub created_at: String,
}
