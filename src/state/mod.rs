//! State module for tracking crawl progress
//!
//! # Components
//!
//! - `UrlStatus`: the per-URL frontier state machine (pending, in progress,
//!   completed, failed) including the bounded-retry transition

mod url_status;

pub use url_status::UrlStatus;

/// Default number of failed attempts before a URL is abandoned
pub const DEFAULT_RETRY_THRESHOLD: u32 = 3;
