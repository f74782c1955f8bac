/// Frontier status definitions for tracking crawl progress
///
/// Every URL in the frontier is in exactly one of these states.
use std::fmt;

/// Represents the crawl status of a URL in the frontier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum UrlStatus {
    /// Known to the frontier and waiting to be claimed
    Pending,

    /// Claimed by exactly one worker
    InProgress,

    /// Fetched, parsed and persisted
    Completed,

    /// Gave up after reaching the retry threshold
    Failed,
}

impl UrlStatus {
    /// Status a URL moves to after a failed attempt
    ///
    /// `retry_count` is the count *after* the failure has been recorded.
    pub fn after_failure(retry_count: u32, retry_threshold: u32) -> Self {
        if retry_count >= retry_threshold {
            Self::Failed
        } else {
            Self::Pending
        }
    }

    /// Converts the status to the string stored in `url_queue.status`
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::InProgress => "IN_PROGRESS",
            Self::Completed => "COMPLETED",
            Self::Failed => "FAILED",
        }
    }

    /// Parses a status from its database representation
    ///
    /// Returns None if the string doesn't match any known status.
    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "PENDING" => Some(Self::Pending),
            "IN_PROGRESS" => Some(Self::InProgress),
            "COMPLETED" => Some(Self::Completed),
            "FAILED" => Some(Self::Failed),
            _ => None,
        }
    }

    /// Returns all possible statuses
    pub fn all() -> [Self; 4] {
        [Self::Pending, Self::InProgress, Self::Completed, Self::Failed]
    }
}

impl fmt::Display for UrlStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_string())
    }
}
