//! Sumi-Mirror main entry point
//!
//! This is the command-line interface for the Sumi-Mirror site mirroring tool.

use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use sumi_mirror::config::{load_config, Config, DelayConfig};
use sumi_mirror::crawler::Coordinator;
use sumi_mirror::output::print_summary;
use tracing_subscriber::EnvFilter;

/// Sumi-Mirror: an incremental, resumable website mirror
///
/// Sumi-Mirror downloads every page and static resource under a target URL's
/// directory, rewrites references for offline browsing, and on later runs
/// only downloads what changed.
#[derive(Parser, Debug)]
#[command(name = "sumi-mirror")]
#[command(version)]
#[command(about = "An incremental, resumable website mirror", long_about = None)]
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

    /// Start a fresh crawl, ignoring saved state
    #[arg(long)]
    fresh: bool,

    /// Download everything again, ignoring local copies and saved state
    #[arg(long)]
    force: bool,

    /// Validate config and show the effective settings without crawling
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let mut config = load_config(&cli.config)
        .with_context(|| format!("Failed to load configuration from {}", cli.config.display()))?;
    if cli.force {
        config.incremental.force_download = true;
    }

    if cli.dry_run {
        handle_dry_run(&config);
        return Ok(());
    }

    handle_crawl(config, cli.fresh).await
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("sumi_mirror=info,warn"),
            1 => EnvFilter::new("sumi_mirror=debug,info"),
            2 => EnvFilter::new("sumi_mirror=trace,debug"),
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
    println!("=== Sumi-Mirror Dry Run ===\n");

    println!("Target: {}", config.target.url);
    println!("Output: {}", config.output.directory.display());

    println!("\nCrawler Configuration:");
    println!("  Max depth: {}", config.crawler.max_depth);
    println!("  Max files: {}", config.crawler.max_files);
    println!("  Crawl workers: {}", config.crawler.crawl_workers);
    println!("  Resource workers: {}", config.crawler.resource_workers);
    println!("  User agent: {}", config.crawler.user_agent);
    println!("  Request timeout: {}s", config.crawler.request_timeout_secs);

    match config.delay {
        DelayConfig::None => println!("  Delay: none"),
        DelayConfig::Fixed { ms } => println!("  Delay: {}ms", ms),
        DelayConfig::Random { min_ms, max_ms } => {
            println!("  Delay: {}-{}ms (random)", min_ms, max_ms)
        }
    }

    println!("\nRetry:");
    println!("  Max attempts: {}", config.retry.max_attempts);
    println!(
        "  Backoff: {}ms x{} (max {}ms, jitter {})",
        config.retry.base_delay_ms,
        config.retry.backoff_multiplier,
        config.retry.max_delay_ms,
        config.retry.jitter
    );
    println!("  On exhausted: {:?}", config.retry.on_exhausted);

    println!("\nIncremental: {}", config.incremental.enabled);
    println!("  Force download: {}", config.incremental.force_download);
    println!("Resume: {}", config.resume.enabled);
    println!("  State file: {}", config.resume.state_file.display());
    println!("Renderer: {}", config.renderer.enabled);

    println!("\nExclusion Rules ({}):", config.exclude.len());
    for rule in &config.exclude {
        println!("  - {}", rule);
    }

    println!("\n✓ Configuration is valid");
}

/// Handles the main crawl operation
async fn handle_crawl(config: Config, fresh: bool) -> anyhow::Result<()> {
    if fresh {
        tracing::info!("Starting fresh crawl (ignoring saved state)");
    }

    let coordinator = Coordinator::new(config)?.ignore_saved_state(fresh);

    let cancel = coordinator.cancel_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, stopping crawl");
            cancel.cancel();
        }
    });

    match coordinator.run().await {
        Ok(report) => {
            print_summary(&report);
            Ok(())
        }
        Err(e) => {
            tracing::error!("Crawl failed: {}", e);
            Err(e.into())
        }
    }
}
