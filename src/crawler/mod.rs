//! Crawler module for web page fetching and processing
//!
//! This module contains the core crawling logic, including:
//! - HTTP fetching with a hard timeout and outcome classification
//! - HTML parsing into links, visible text and title
//! - The concurrency-bounded worker pool
//! - Overall crawl coordination

mod coordinator;
mod fetcher;
mod parser;
mod scheduler;

pub use coordinator::{run_crawl, seed_frontier};
pub use fetcher::{build_http_client, FetchOutcome, FetchResult, Fetcher};
pub use parser::{extract_page, ExtractedPage};
pub use scheduler::{PageOutcome, PoolReport, PoolSettings, WorkerPool};
