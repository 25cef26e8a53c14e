//! Quill crawler main entry point
//!
//! This is the command-line interface for the Quill source crawler.

use clap::{ArgGroup, Parser};
use quill_crawl::config::{load_config_with_hash, Config};
use quill_crawl::output::print_statistics;
use quill_crawl::storage::{open_storage, Storage};
use quill_crawl::CrawlEngine;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Quill: a polite source crawler and article finder
///
/// Quill discovers feeds and sitemaps for registered sources, crawls them
/// while respecting robots.txt and per-host delays, and stores the pages
/// that look like articles.
#[derive(Parser, Debug)]
#[command(name = "quill-crawl")]
#[command(version = "1.0.0")]
#[command(about = "A polite source crawler and article finder", long_about = None)]
#[command(group(
    ArgGroup::new("action")
        .args(["add_source", "list_sources", "crawl", "rediscover", "stats", "reset", "deactivate", "dry_run"])
        .multiple(false)
))]
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

    /// Register a source by its home URL
    #[arg(long, value_name = "URL")]
    add_source: Option<String>,

    /// List registered sources and exit
    #[arg(long)]
    list_sources: bool,

    /// Crawl a single source now, even if inactive
    #[arg(long, value_name = "ID")]
    crawl: Option<i64>,

    /// Re-run feed, sitemap and robots.txt discovery for a source
    #[arg(long, value_name = "ID")]
    rediscover: Option<i64>,

    /// Show crawl statistics for a source and exit
    #[arg(long, value_name = "ID")]
    stats: Option<i64>,

    /// Clear a source's crawl queue so the next crawl reseeds it
    #[arg(long, value_name = "ID")]
    reset: Option<i64>,

    /// Exclude a source from crawl cycles
    #[arg(long, value_name = "ID")]
    deactivate: Option<i64>,

    /// Validate config and show what would be crawled without crawling
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    // Load and validate configuration
    tracing::info!("Loading configuration from: {}", cli.config.display());
    let config = match load_config_with_hash(&cli.config) {
        Ok((cfg, hash)) => {
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            cfg
        }
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    if cli.dry_run {
        return handle_dry_run(&config);
    }

    let storage = open_storage(std::path::Path::new(&config.output.database_path))?;
    let mut engine = CrawlEngine::new(config, storage)?;

    if let Some(url) = cli.add_source {
        let id = engine.add_source(&url)?;
        println!("Source {} registered: {}", id, url);
    } else if cli.list_sources {
        handle_list_sources(&engine)?;
    } else if let Some(id) = cli.crawl {
        let result = engine.crawl_source(id).await?;
        print_results(&[result]);
    } else if let Some(id) = cli.rediscover {
        let result = engine.rediscover_source(id).await?;
        println!("Source {} re-discovered as {}", id, result.suggested_type);
        for feed in &result.feeds {
            println!("  feed: {}", feed);
        }
        for (sitemap, kind) in &result.sitemaps {
            println!("  sitemap ({}): {}", kind, sitemap);
        }
    } else if let Some(id) = cli.stats {
        print_statistics(&engine.crawl_stats(id)?);
    } else if let Some(id) = cli.reset {
        let removed = engine.reset_crawl_queue(id)?;
        println!("Source {}: {} queue entries removed", id, removed);
    } else if let Some(id) = cli.deactivate {
        engine.deactivate_source(id)?;
        println!("Source {} deactivated", id);
    } else {
        handle_crawl_cycle(&mut engine).await?;
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
            0 => EnvFilter::new("quill_crawl=info,warn"),
            1 => EnvFilter::new("quill_crawl=debug,info"),
            2 => EnvFilter::new("quill_crawl=trace,debug"),
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

/// Handles the --dry-run mode: validates config and shows the settings in effect
fn handle_dry_run(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    println!("=== Quill Dry Run ===\n");

    println!("Crawler Configuration:");
    println!("  Max depth: {}", config.crawler.max_depth);
    println!("  Max pages per source: {}", config.crawler.max_pages_per_source);
    println!("  Max pages per run: {}", config.crawler.max_pages_per_run);
    println!("  Request delay: {}ms", config.crawler.request_delay_ms);
    println!("  Timeout: {}ms", config.crawler.timeout_ms);
    println!("  Max redirects: {}", config.crawler.max_redirects);
    println!("  Respect robots.txt: {}", config.crawler.respect_robots_txt);

    println!("\nDetector:");
    println!("  Min word count: {}", config.detector.min_word_count);
    println!("  Min confidence: {}", config.detector.min_confidence);
    println!("  Min article words: {}", config.detector.min_article_words);

    println!("\nUser Agent: {}", config.user_agent.header_value());

    println!("\nOutput:");
    println!("  Database: {}", config.output.database_path);

    let path = std::path::Path::new(&config.output.database_path);
    if path.exists() {
        let storage = open_storage(path)?;
        let sources = storage.list_active_sources()?;
        println!("\nActive Sources ({}):", sources.len());
        for source in &sources {
            println!("  - [{}] {} ({})", source.id, source.home_url, source.source_type);
        }
    } else {
        println!("\nDatabase does not exist yet; no sources registered");
    }

    println!("\n✓ Configuration is valid");

    Ok(())
}

/// Handles the --list-sources mode
fn handle_list_sources(engine: &CrawlEngine) -> Result<(), Box<dyn std::error::Error>> {
    let sources = engine.storage().list_sources()?;
    println!("=== Sources ({}) ===\n", sources.len());
    for source in &sources {
        println!(
            "[{}] {} ({}{})",
            source.id,
            source.home_url,
            source.source_type,
            if source.active { "" } else { ", inactive" }
        );
        if let Some(feed) = &source.discovered_feed_url {
            println!("    feed: {}", feed);
        }
        println!(
            "    last crawl: {}",
            source.last_crawl_completed_at.as_deref().unwrap_or("never")
        );
    }
    Ok(())
}

/// Handles the default mode: one crawl cycle over all active sources
async fn handle_crawl_cycle(engine: &mut CrawlEngine) -> Result<(), Box<dyn std::error::Error>> {
    tracing::info!("Starting crawl cycle");
    match engine.run_crawl_cycle().await {
        Ok(results) => {
            print_results(&results);
            tracing::info!("Crawl cycle completed successfully");
            Ok(())
        }
        Err(e) => {
            tracing::error!("Crawl cycle failed: {}", e);
            Err(e.into())
        }
    }
}

fn print_results(results: &[quill_crawl::CrawlResult]) {
    for result in results {
        println!(
            "Source {}: {} pages, {} articles, {} new links, {} errors",
            result.source_id,
            result.pages_processed,
            result.articles_found,
            result.links_discovered,
            result.errors.len()
        );
        for error in &result.errors {
            println!("  ! {}", error);
        }
    }
}
