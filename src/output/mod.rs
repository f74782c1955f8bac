//! Output module for frontier statistics and run reports
//!
//! This module handles:
//! - Loading frontier statistics from the store
//! - Printing statistics and end-of-run summaries

pub mod stats;

pub use stats::{load_statistics, print_statistics, FrontierStatistics};

use crate::crawler::PoolReport;

/// Prints the summary of one crawl run to stdout
pub fn print_run_report(report: &PoolReport) {
    println!("=== Crawl Run Summary ===\n");
    println!("  URLs claimed: {}", report.claimed);
    println!("  Pages completed: {}", report.completed);
    println!("  Fetch failures: {}", report.fetch_failed);
    println!("  Persistence failures: {}", report.persist_failed);
    println!("  Claims released on shutdown: {}", report.released);
    println!("  Claims lost to lease expiry: {}", report.claims_lost);
    println!("  New links discovered: {}", report.links_discovered);
    println!("  Storage errors: {}", report.storage_errors);
    println!("  Idle waits: {}", report.idle_waits);
}
