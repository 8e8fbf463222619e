//! Shelf-Harvest main entry point
//!
//! This is the command-line interface for the product harvesting pipeline.

use anyhow::Context;
use clap::Parser;
use shelf_harvest::config::{load_config_with_hash, Config, StoreConfig};
use shelf_harvest::frontier::open_store;
use shelf_harvest::harvest::{
    queue_status, HarvestOptions, HarvestSummary, Harvester, RefillOutcome,
};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Shelf-Harvest: a queue-driven product harvester
///
/// Shelf-Harvest refills a local working queue from a remote master queue
/// once per day, drains it with a pool of concurrent workers, and writes
/// validated product records in JSON Lines batches.
#[derive(Parser, Debug)]
#[command(name = "shelf-harvest")]
#[command(version = "1.0.0")]
#[command(about = "A queue-driven product harvester", long_about = None)]
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

    /// Validate config and show what would be harvested without touching any store
    #[arg(long, conflicts_with = "status")]
    dry_run: bool,

    /// Show queue sizes and the last refill date, then exit
    #[arg(long, conflicts_with = "dry_run")]
    status: bool,

    /// Run in test mode: no validation, no durable writes, capped sample
    #[arg(long)]
    test: bool,

    /// Drain the working queue without attempting a refill
    #[arg(long)]
    skip_refill: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    // Load and validate configuration
    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (mut config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("Failed to load configuration {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    if cli.test {
        config.test.enabled = true;
    }

    if cli.dry_run {
        handle_dry_run(&config);
    } else if cli.status {
        handle_status(&config).await?;
    } else {
        let options = HarvestOptions {
            skip_refill: cli.skip_refill,
        };
        handle_harvest(config, options).await?;
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("shelf_harvest=info,warn"),
            1 => EnvFilter::new("shelf_harvest=debug,info"),
            2 => EnvFilter::new("shelf_harvest=trace,debug"),
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

fn describe_store(store: &StoreConfig) -> String {
    match store {
        StoreConfig::Sqlite { path } => format!("sqlite ({})", path),
        StoreConfig::Redis { url } => format!("redis ({})", redact_password(url)),
        StoreConfig::Memory => "memory".to_string(),
    }
}

fn redact_password(url: &str) -> String {
    match url::Url::parse(url) {
        Ok(mut parsed) if parsed.password().is_some() => {
            let _ = parsed.set_password(Some("***"));
            parsed.to_string()
        }
        _ => url.to_string(),
    }
}

/// Handles the --dry-run mode: shows the resolved configuration
fn handle_dry_run(config: &Config) {
    let keys = config.queue_keys();

    println!("=== Shelf-Harvest Dry Run ===\n");

    println!("Source:");
    println!("  Name: {}", config.source.name);
    println!("  Retailer: {}", config.source.retailer);

    println!("\nQueues:");
    println!("  Master: {}", keys.master);
    println!("  Working: {}", keys.working);
    println!("  Refill marker: {}", keys.state);
    println!("  Proxies: {}", keys.proxies);

    println!("\nStores:");
    println!("  Local: {}", describe_store(&config.store.local));
    println!("  Remote: {}", describe_store(&config.store.remote));

    println!("\nWorkers:");
    println!("  Concurrency: {}", config.workers.concurrency);
    println!("  URLs per batch: {}", config.workers.urls_per_batch);
    println!("  Bulk size: {}", config.workers.bulk_size);
    println!("  Fetch timeout: {}s", config.workers.fetch_timeout_secs);
    println!("  Refill chunk size: {}", config.refill.chunk_size);
    println!(
        "  Proxies: {}",
        if config.proxy.enabled { "enabled" } else { "disabled" }
    );

    println!("\nOutput:");
    println!("  Bucket: {}", config.output.bucket);

    if config.is_test_mode() {
        println!("\nTest mode:");
        println!("  Sample size per worker: {}", config.test.sample_size);
        println!("  Test URLs: {}", config.test.urls.len());
        if let Some(proxy) = &config.test.proxy {
            println!("  Proxy override: {}", redact_password(proxy));
        }
    }

    println!("\n✓ Configuration is valid");
}

/// Handles the --status mode: shows queue sizes
async fn handle_status(config: &Config) -> anyhow::Result<()> {
    let keys = config.queue_keys();
    let local = open_store(&config.store.local)
        .await
        .context("Failed to open local store")?;
    let remote = open_store(&config.store.remote)
        .await
        .context("Failed to open remote store")?;

    let status = queue_status(local.as_ref(), remote.as_ref(), &keys).await?;

    println!("Source: {}\n", config.source.name);
    println!("  {:<28} {}", keys.master, status.master);
    println!("  {:<28} {}", keys.working, status.working);
    println!("  {:<28} {}", keys.proxies, status.proxies);
    println!(
        "  Last refill: {}",
        status.last_refill.as_deref().unwrap_or("never")
    );

    Ok(())
}

/// Handles the main harvest run
async fn handle_harvest(config: Config, options: HarvestOptions) -> anyhow::Result<()> {
    if config.is_test_mode() {
        tracing::info!(
            "Starting test run (sample size {} per worker)",
            config.test.sample_size
        );
    } else {
        tracing::info!("Starting harvest for {}", config.source.name);
    }

    let harvester = Harvester::connect(config, options).await?;

    match harvester.run().await {
        Ok(summary) => {
            log_summary(&summary);
            Ok(())
        }
        Err(e) => {
            tracing::error!("Harvest failed: {}", e);
            Err(e.into())
        }
    }
}

fn log_summary(summary: &HarvestSummary) {
    match &summary.refill {
        Some(RefillOutcome::Refilled { copied, date }) => {
            tracing::info!("Refill: copied {} items on {}", copied, date)
        }
        Some(RefillOutcome::Failed { error }) => tracing::warn!("Refill failed: {}", error),
        Some(other) => tracing::info!("Refill: {:?}", other),
        None => {}
    }

    let totals = summary.totals();
    tracing::info!(
        "Harvest of {} completed: {} urls, {} fetch failures, {} rejected, {} accepted, \
         {} records written in {} batches",
        summary.queue,
        totals.urls_processed,
        totals.fetch_failures,
        totals.rejected,
        totals.accepted,
        totals.records_flushed,
        totals.batches_flushed
    );
}
