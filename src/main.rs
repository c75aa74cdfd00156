//! publiccode-crawler main entry point
//!
//! This is the command-line interface for the publiccode.yml crawler.

use anyhow::Context;
use clap::Parser;
use publiccode_crawler::config::{load_config_with_hash, Config};
use publiccode_crawler::crawler::run_crawl;
use publiccode_crawler::output::{load_checkpoints, print_checkpoints, print_report};
use publiccode_crawler::storage::open_progress_store;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// publiccode-crawler: collects publiccode.yml manifests from code-hosting platforms
///
/// The crawler walks the repository listings of every configured domain, downloads
/// each repository's manifest into the data directory and validates it. Interrupted
/// or abandoned listings are resumed from their last checkpoint.
#[derive(Parser, Debug)]
#[command(name = "publiccode-crawler")]
#[command(version)]
#[command(about = "A resumable publiccode.yml crawler", long_about = None)]
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

    /// Start every domain from its first page, discarding checkpoints
    #[arg(long)]
    fresh: bool,

    /// Validate config and show what would be crawled without actually crawling
    #[arg(long, conflicts_with_all = ["progress", "fresh"])]
    dry_run: bool,

    /// Show the pagination checkpoints left by previous runs and exit
    #[arg(long, conflicts_with_all = ["dry_run", "fresh"])]
    progress: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("failed to load {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    if cli.dry_run {
        handle_dry_run(&config);
    } else if cli.progress {
        handle_progress(&config)?;
    } else {
        handle_crawl(config, cli.fresh).await?;
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("publiccode_crawler=info,warn"),
            1 => EnvFilter::new("publiccode_crawler=debug,info"),
            2 => EnvFilter::new("publiccode_crawler=trace,debug"),
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

/// Handles the --dry-run mode: shows the effective configuration
fn handle_dry_run(config: &Config) {
    println!("=== publiccode-crawler Dry Run ===\n");

    println!("Crawler Configuration:");
    println!("  Manifest file: {}", config.crawler.crawled_filename);
    println!("  Data directory: {}", config.crawler.data_dir);
    println!(
        "  Max concurrent fetches: {}",
        config.crawler.max_concurrent_fetches
    );
    println!("  Request timeout: {}s", config.crawler.request_timeout);
    println!(
        "  Pagination retries: {} (backoff {}ms..{}ms)",
        config.crawler.pagination_max_attempts,
        config.crawler.pagination_initial_backoff,
        config.crawler.pagination_max_backoff
    );

    println!("\nUser Agent:");
    println!("  Name: {}", config.user_agent.crawler_name);
    println!("  Version: {}", config.user_agent.crawler_version);
    println!("  Contact URL: {}", config.user_agent.contact_url);

    println!("\nProgress database: {}", config.progress.database_path);
    if let Some(listen) = &config.metrics.listen {
        println!("Metrics endpoint: {}", listen);
    }

    println!("\nDomains ({}):", config.domains.len());
    for domain in &config.domains {
        println!("  - {} [{:?}] {}", domain.id, domain.client_api, domain.url);
        if !domain.description.is_empty() {
            println!("    {}", domain.description);
        }
        if !domain.headers.is_empty() {
            let names: Vec<_> = domain.headers.keys().map(String::as_str).collect();
            println!("    headers: {}", names.join(", "));
        }
    }

    println!("\n✓ Configuration is valid");
}

/// Handles the --progress mode: lists checkpoints from the progress database
fn handle_progress(config: &Config) -> anyhow::Result<()> {
    println!("Database: {}\n", config.progress.database_path);

    let store = open_progress_store(Path::new(&config.progress.database_path))?;
    let summary = load_checkpoints(&store)?;
    print_checkpoints(&summary);

    Ok(())
}

/// Handles the main crawl operation
async fn handle_crawl(config: Config, fresh: bool) -> anyhow::Result<()> {
    if fresh {
        tracing::info!("Starting fresh crawl (ignoring checkpoints)");
    } else {
        tracing::info!("Starting crawl (will resume from checkpoints)");
    }

    let report = run_crawl(config, fresh).await.context("crawl failed")?;
    print_report(&report);

    if !report.abandoned_domains.is_empty() {
        tracing::warn!(
            "{} domains were abandoned and will resume on the next run",
            report.abandoned_domains.len()
        );
    }

    tracing::info!("Crawl completed");
    Ok(())
}
