use crate::config::types::{
    Config, CrawlerConfig, FilterConfig, FrontierConfig, StorageConfig, UserAgentConfig,
};
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_frontier_config(&config.frontier, &config.crawler)?;
    validate_user_agent_config(&config.user_agent)?;
    validate_storage_config(&config.storage)?;
    validate_filter_config(&config.filter)?;
    Ok(())
}

/// Validates worker pool configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.workers < 1 || config.workers > 256 {
        return Err(ConfigError::Validation(format!(
            "workers must be between 1 and 256, got {}",
            config.workers
        )));
    }

    if config.max_concurrency < 1 || config.max_concurrency > 100 {
        return Err(ConfigError::Validation(format!(
            "max_concurrency must be between 1 and 100, got {}",
            config.max_concurrency
        )));
    }

    if config.fetch_timeout_ms == 0 {
        return Err(ConfigError::Validation(
            "fetch_timeout_ms must be greater than 0".to_string(),
        ));
    }

    if config.idle_wait_ms == 0 {
        return Err(ConfigError::Validation(
            "idle_wait_ms must be greater than 0".to_string(),
        ));
    }

    Ok(())
}

/// Validates frontier configuration
fn validate_frontier_config(
    config: &FrontierConfig,
    crawler: &CrawlerConfig,
) -> Result<(), ConfigError> {
    if config.retry_threshold < 1 {
        return Err(ConfigError::Validation(format!(
            "retry_threshold must be >= 1, got {}",
            config.retry_threshold
        )));
    }

    // A lease shorter than one fetch would hand a live claim to a second worker
    if config.claim_lease_ms <= crawler.fetch_timeout_ms {
        return Err(ConfigError::Validation(format!(
            "claim_lease_ms ({}) must be greater than fetch_timeout_ms ({})",
            config.claim_lease_ms, crawler.fetch_timeout_ms
        )));
    }

    for seed in &config.seeds {
        let url = Url::parse(seed)
            .map_err(|e| ConfigError::InvalidUrl(format!("Invalid seed URL '{}': {}", seed, e)))?;

        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(ConfigError::Validation(format!(
                "Seed URL '{}' must use http or https",
                seed
            )));
        }

        if url.host_str().is_none() {
            return Err(ConfigError::InvalidUrl(format!(
                "Seed URL '{}' has no host",
                seed
            )));
        }
    }

    Ok(())
}

/// Validates user agent configuration
fn validate_user_agent_config(config: &UserAgentConfig) -> Result<(), ConfigError> {
    // Validate crawler name: non-empty, alphanumeric + hyphens only
    if config.crawler_name.is_empty() {
        return Err(ConfigError::Validation(
            "crawler_name cannot be empty".to_string(),
        ));
    }

    if !config
        .crawler_name
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-')
    {
        return Err(ConfigError::Validation(format!(
            "crawler_name must contain only alphanumeric characters and hyphens, got '{}'",
            config.crawler_name
        )));
    }

    Url::parse(&config.contact_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid contact_url: {}", e)))?;

    validate_email(&config.contact_email)?;

    Ok(())
}

/// Validates storage configuration
fn validate_storage_config(config: &StorageConfig) -> Result<(), ConfigError> {
    if config.database_path.is_empty() {
        return Err(ConfigError::Validation(
            "database_path cannot be empty".to_string(),
        ));
    }

    if config.pool_size < 1 || config.pool_size > 64 {
        return Err(ConfigError::Validation(format!(
            "pool_size must be between 1 and 64, got {}",
            config.pool_size
        )));
    }

    Ok(())
}

/// Validates link filter configuration
fn validate_filter_config(config: &FilterConfig) -> Result<(), ConfigError> {
    if config.schemes.is_empty() {
        return Err(ConfigError::Validation(
            "at least one scheme must be allowed".to_string(),
        ));
    }

    for scheme in &config.schemes {
        if scheme != "http" && scheme != "https" {
            return Err(ConfigError::Validation(format!(
                "unsupported scheme '{}', only http and https can be fetched",
                scheme
            )));
        }
    }

    for extension in &config.denied_extensions {
        if !extension.starts_with('.') || extension.len() < 2 {
            return Err(ConfigError::Validation(format!(
                "denied extension '{}' must start with '.'",
                extension
            )));
        }
    }

    if config.denied_path_substrings.iter().any(|s| s.is_empty()) {
        return Err(ConfigError::Validation(
            "denied path substrings cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Basic email validation
fn validate_email(email: &str) -> Result<(), ConfigError> {
    if email.is_empty() {
        return Err(ConfigError::Validation(
            "contact_email cannot be empty".to_string(),
        ));
    }

    // Basic email format check: must contain @ and have text on both sides
    let parts: Vec<&str> = email.split('@').collect();
    if parts.len() != 2 {
        return Err(ConfigError::Validation(format!(
            "Invalid email format: '{}'",
            email
        )));
    }

    let local = parts[0];
    let domain = parts[1];

    if local.is_empty() || domain.is_empty() {
        return Err(ConfigError::Validation(format!(
            "Invalid email format: '{}'",
            email
        )));
    }

    if !domain.contains('.') {
        return Err(ConfigError::Validation(format!(
            "Invalid email domain: '{}'",
            email
        )));
    }

    Ok(())
}
