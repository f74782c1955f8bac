//! Configuration module for Frontier-Crawler
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//! Every section and key has a default, so an empty file is a valid configuration.
//!
//! # Example
//!
//! ```no_run
//! use frontier_crawler::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("crawler.toml")).unwrap();
//! println!("Workers: {}", config.crawler.workers);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    Config, CrawlerConfig, FilterConfig, FrontierConfig, StorageConfig, UserAgentConfig,
};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};
pub use validation::validate;
