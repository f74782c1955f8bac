//! Frontier-Crawler main entry point
//!
//! This is the command-line interface for the Frontier-Crawler worker pool.

use anyhow::Context;
use clap::Parser;
use frontier_crawler::config::{load_config_with_hash, validate, Config};
use frontier_crawler::crawler::run_crawl;
use frontier_crawler::output::{load_statistics, print_run_report, print_statistics};
use frontier_crawler::storage::open_store;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

/// Frontier-Crawler: a resumable, multi-worker web crawler
///
/// Workers pull URLs from a shared SQLite frontier, fetch and parse each page,
/// store its text and feed same-host links back into the frontier. Several
/// processes may share one database.
#[derive(Parser, Debug)]
#[command(name = "frontier-crawler")]
#[command(version)]
#[command(about = "A resumable, multi-worker web crawler", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Additional seed URL to enqueue before crawling (repeatable)
    #[arg(long = "seed", value_name = "URL")]
    seeds: Vec<String>,

    /// Validate config and print the effective settings without crawling
    #[arg(long, conflicts_with = "stats")]
    dry_run: bool,

    /// Show frontier statistics from the database and exit
    #[arg(long, conflicts_with = "dry_run")]
    stats: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    // Load and validate configuration
    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (mut config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("failed to load configuration {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    if !cli.seeds.is_empty() {
        config.frontier.seeds.extend(cli.seeds);
        validate(&config).context("invalid --seed URL")?;
    }

    // Handle different modes
    if cli.dry_run {
        handle_dry_run(&config);
    } else if cli.stats {
        handle_stats(&config).await?;
    } else {
        handle_crawl(&config).await?;
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("frontier_crawler=info,warn"),
            1 => EnvFilter::new("frontier_crawler=debug,info"),
            2 => EnvFilter::new("frontier_crawler=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles the --dry-run mode: prints the effective configuration
fn handle_dry_run(config: &Config) {
    println!("=== Frontier-Crawler Dry Run ===\n");

    println!("Crawler Configuration:");
    println!("  Workers: {}", config.crawler.workers);
    println!("  Max concurrency: {}", config.crawler.max_concurrency);
    println!("  Fetch timeout: {}ms", config.crawler.fetch_timeout_ms);
    println!("  Idle wait: {}ms", config.crawler.idle_wait_ms);

    println!("\nFrontier:");
    println!("  Retry threshold: {}", config.frontier.retry_threshold);
    println!("  Claim lease: {}ms", config.frontier.claim_lease_ms);

    println!("\nUser Agent:");
    println!("  {}", config.user_agent.header_value());

    println!("\nStorage:");
    println!("  Database: {}", config.storage.database_path);
    println!("  Busy timeout: {}ms", config.storage.busy_timeout_ms);
    println!("  Pool size: {}", config.storage.pool_size);

    println!("\nLink Filter:");
    println!("  Schemes: {}", config.filter.schemes.join(", "));
    println!(
        "  Denied extensions: {}",
        config.filter.denied_extensions.join(" ")
    );
    println!(
        "  Denied path substrings: {}",
        config.filter.denied_path_substrings.join(" ")
    );

    println!("\nSeeds ({}):", config.frontier.seeds.len());
    for seed in &config.frontier.seeds {
        println!("  - {}", seed);
    }

    println!("\n✓ Configuration is valid");
}

/// Handles the --stats mode: shows statistics from the database
async fn handle_stats(config: &Config) -> anyhow::Result<()> {
    println!("Database: {}\n", config.storage.database_path);

    let config = config.clone();
    let stats = tokio::task::spawn_blocking(move || {
        let store = open_store(&config)?;
        load_statistics(&store)
    })
    .await
    .context("statistics task failed")?
    .context("failed to read frontier statistics")?;

    print_statistics(&stats);
    Ok(())
}

/// Handles the main crawl operation
async fn handle_crawl(config: &Config) -> anyhow::Result<()> {
    tracing::info!(
        workers = config.crawler.workers,
        seeds = config.frontier.seeds.len(),
        database = %config.storage.database_path,
        "Starting crawl"
    );

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                tracing::info!("Interrupt received, draining workers");
                on_signal.cancel();
            }
            Err(e) => tracing::error!(error = %e, "Failed to listen for Ctrl-C"),
        }
    });

    let report = run_crawl(config, cancel).await.map_err(|e| {
        tracing::error!("Crawl failed: {}", e);
        e
    })?;

    print_run_report(&report);
    Ok(())
}
