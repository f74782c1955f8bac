//! Statistics generation from the frontier database
//!
//! This module provides functionality for extracting and displaying
//! frontier statistics from the storage layer.

use crate::state::UrlStatus;
use crate::storage::{FrontierStore, StorageResult};
use std::collections::BTreeMap;

/// Number of failure reasons shown in the summary
pub const TOP_FAIL_REASONS: usize = 10;

/// Frontier statistics summary
#[derive(Debug, Clone, Default)]
pub struct FrontierStatistics {
    /// Total number of URLs known to the frontier
    pub total_urls: u64,

    /// Count of URLs by status
    pub urls_by_status: BTreeMap<UrlStatus, u64>,

    /// Number of stored documents
    pub documents: u64,

    /// Most common failure reasons, most frequent first
    pub top_fail_reasons: Vec<(String, u64)>,
}

impl FrontierStatistics {
    pub fn count(&self, status: UrlStatus) -> u64 {
        self.urls_by_status.get(&status).copied().unwrap_or(0)
    }

    /// Share of known URLs that finished successfully, in percent
    pub fn completion_rate(&self) -> f64 {
        if self.total_urls == 0 {
            return 0.0;
        }
        (self.count(UrlStatus::Completed) as f64 / self.total_urls as f64) * 100.0
    }
}

/// Loads statistics from storage
pub fn load_statistics<S: FrontierStore + ?Sized>(store: &S) -> StorageResult<FrontierStatistics> {
    let mut urls_by_status = BTreeMap::new();
    let mut total_urls = 0;

    for status in UrlStatus::all() {
        let count = store.count_by_status(status)?;
        total_urls += count;
        urls_by_status.insert(status, count);
    }

    Ok(FrontierStatistics {
        total_urls,
        urls_by_status,
        documents: store.count_documents()?,
        top_fail_reasons: store.top_fail_reasons(TOP_FAIL_REASONS)?,
    })
}

/// Prints statistics to stdout in a formatted manner
pub fn print_statistics(stats: &FrontierStatistics) {
    println!("=== Frontier Statistics ===\n");

    println!("Overview:");
    println!("  Total URLs: {}", stats.total_urls);
    println!("  Documents stored: {}", stats.documents);
    println!();

    println!("URLs by Status:");
    for (status, count) in &stats.urls_by_status {
        let percentage = if stats.total_urls > 0 {
            (*count as f64 / stats.total_urls as f64) * 100.0
        } else {
            0.0
        };
        println!("  {}: {} ({:.1}%)", status, count, percentage);
    }
    println!();

    if !stats.top_fail_reasons.is_empty() {
        println!("Failure Reasons:");
        for (reason, count) in &stats.top_fail_reasons {
            println!("  {}: {}", reason, count);
        }
        println!();
    }

    println!(
        "Completion Rate: {:.1}% ({} / {} URLs completed)",
        stats.completion_rate(),
        stats.count(UrlStatus::Completed),
        stats.total_urls
    );
}
