use serde::Deserialize;
use std::time::Duration;

/// Main configuration structure for the crawler
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub crawler: CrawlerConfig,
    pub frontier: FrontierConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    pub storage: StorageConfig,
    pub filter: FilterConfig,
}

/// Worker pool configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CrawlerConfig {
    /// Number of worker tasks to spawn
    pub workers: u32,

    /// Maximum number of workers claiming or fetching at the same time
    #[serde(rename = "max-concurrency")]
    pub max_concurrency: u32,

    /// Hard limit on one fetch, connect through body (milliseconds)
    #[serde(rename = "fetch-timeout-ms")]
    pub fetch_timeout_ms: u64,

    /// How long a worker sleeps after finding the frontier empty (milliseconds)
    #[serde(rename = "idle-wait-ms")]
    pub idle_wait_ms: u64,
}

impl CrawlerConfig {
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_millis(self.fetch_timeout_ms)
    }

    pub fn idle_wait(&self) -> Duration {
        Duration::from_millis(self.idle_wait_ms)
    }
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            workers: 5,
            max_concurrency: 5,
            fetch_timeout_ms: 10_000,
            idle_wait_ms: 100_000,
        }
    }
}

/// Frontier behaviour configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FrontierConfig {
    /// Failed attempts after which a URL is marked FAILED
    #[serde(rename = "retry-threshold")]
    pub retry_threshold: u32,

    /// Age after which an IN_PROGRESS claim is considered abandoned (milliseconds)
    #[serde(rename = "claim-lease-ms")]
    pub claim_lease_ms: u64,

    /// URLs inserted as PENDING when the crawler starts
    pub seeds: Vec<String>,
}

impl FrontierConfig {
    pub fn claim_lease(&self) -> Duration {
        Duration::from_millis(self.claim_lease_ms)
    }
}

impl Default for FrontierConfig {
    fn default() -> Self {
        Self {
            retry_threshold: crate::state::DEFAULT_RETRY_THRESHOLD,
            claim_lease_ms: 600_000,
            seeds: Vec::new(),
        }
    }
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UserAgentConfig {
    /// Name of the crawler
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    /// Version of the crawler
    #[serde(rename = "crawler-version")]
    pub crawler_version: String,

    /// URL with information about the crawler
    #[serde(rename = "contact-url")]
    pub contact_url: String,

    /// Email address for crawler-related contact
    #[serde(rename = "contact-email")]
    pub contact_email: String,
}

impl UserAgentConfig {
    /// Formats the User-Agent header value
    ///
    /// Format: `CrawlerName/Version (+ContactURL; ContactEmail)`
    pub fn header_value(&self) -> String {
        format!(
            "{}/{} (+{}; {})",
            self.crawler_name, self.crawler_version, self.contact_url, self.contact_email
        )
    }
}

impl Default for UserAgentConfig {
    fn default() -> Self {
        Self {
            crawler_name: "frontier-crawler".to_string(),
            crawler_version: env!("CARGO_PKG_VERSION").to_string(),
            contact_url: "https://example.com/crawler".to_string(),
            contact_email: "crawler@example.com".to_string(),
        }
    }
}

/// Shared store configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Path to the SQLite database file
    #[serde(rename = "database-path")]
    pub database_path: String,

    /// How long an operation waits for another connection's write lock (milliseconds)
    #[serde(rename = "busy-timeout-ms")]
    pub busy_timeout_ms: u64,

    /// Maximum number of pooled connections per process
    #[serde(rename = "pool-size")]
    pub pool_size: u32,
}

impl StorageConfig {
    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: "./frontier.db".to_string(),
            busy_timeout_ms: 5_000,
            pool_size: 8,
        }
    }
}

/// Link filter configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    /// Schemes a discovered link may use
    pub schemes: Vec<String>,

    /// Path suffixes of non-HTML assets
    #[serde(rename = "denied-extensions")]
    pub denied_extensions: Vec<String>,

    /// Path fragments that mark duplicate content (e.g. locale prefixes)
    #[serde(rename = "denied-path-substrings")]
    pub denied_path_substrings: Vec<String>,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            schemes: ["http", "https"].iter().map(|s| s.to_string()).collect(),
            denied_extensions: [".pdf", ".jpg", ".png", ".css", ".js", ".zip", ".ico"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            denied_path_substrings: [
                "/de/", "/es/", "/fr/", "/ja/", "/ko/", "/pt/", "/ru/", "/tr/", "/uk/", "/zh/",
                "/zh-hant/",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        }
    }
}
