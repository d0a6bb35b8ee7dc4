//! Pagesweep main entry point
//!
//! This is the command-line interface for the Pagesweep table scraper.

use anyhow::Context;
use clap::Parser;
use pagesweep::config::{load_config_with_hash, validate, validate_pool_size, Config};
use pagesweep::crawler::run_crawl;
use pagesweep::output::write_records;
use pagesweep::url::UrlTemplate;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Pagesweep: a concurrent paginated table scraper
///
/// Pagesweep walks a numbered resource page by page with a pool of reusable
/// fetch slots, extracts transaction rows from every page, and prints them
/// as one JSON array once the last page has been found.
#[derive(Parser, Debug)]
#[command(name = "pagesweep")]
#[command(version)]
#[command(about = "A concurrent paginated table scraper", long_about = None)]
struct Cli {
    /// Path to TOML configuration file (built-in defaults when omitted)
    #[arg(value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate config and show the crawl plan without crawling
    #[arg(long)]
    dry_run: bool,

    /// Indent the JSON output
    #[arg(long)]
    pretty: bool,

    /// Number of concurrent fetch slots (overrides the configuration)
    #[arg(long, value_name = "N")]
    pool_size: Option<usize>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    let mut config = match &cli.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            let (config, hash) = load_config_with_hash(path)
                .with_context(|| format!("Failed to load configuration {}", path.display()))?;
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            config
        }
        None => {
            tracing::info!("No configuration file given, using defaults");
            let config = Config::default();
            validate(&config)?;
            config
        }
    };

    if let Some(size) = cli.pool_size {
        validate_pool_size(size).context("Invalid --pool-size")?;
        config.pool.size = Some(size);
    }

    if cli.dry_run {
        handle_dry_run(&config)
    } else {
        handle_crawl(&config, cli.pretty).await
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
///
/// Logs go to standard error; standard output only carries the result.
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("pagesweep=info,warn"),
            1 => EnvFilter::new("pagesweep=debug,info"),
            2 => EnvFilter::new("pagesweep=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles the --dry-run mode: validates config and shows the crawl plan
fn handle_dry_run(config: &Config) -> anyhow::Result<()> {
    let template = UrlTemplate::parse(&config.target.url_template)?;
    let pagination = &config.pagination;

    println!("=== Pagesweep Dry Run ===\n");

    println!("Target:");
    println!("  Template: {}", template.as_str());
    println!("  First page: {}", template.render(pagination.start_min));

    println!("\nPagination:");
    println!(
        "  Offsets: {} to {} (step {})",
        pagination.start_min, pagination.start_max, pagination.step
    );

    println!("\nPages:");
    println!("  Retry budget: {}", config.page.retry_budget);
    println!("  Load timeout: {}ms", config.page.load_timeout_ms);
    println!(
        "  Interaction timeout: {}ms",
        config.page.interaction_timeout_ms
    );
    println!("  Content selector: {}", config.page.content_selector);
    println!("  Reload selector: {}", config.page.reload_selector);
    println!(
        "  Short-page confirmations: {}",
        config.page.short_page_confirmations
    );

    println!("\nPool:");
    println!("  Slots: {}", config.pool.resolved_size());

    println!("\nUser Agent: {}", config.user_agent.header_value());

    println!("\n✓ Configuration is valid");

    Ok(())
}

/// Handles the main crawl operation
async fn handle_crawl(config: &Config, pretty: bool) -> anyhow::Result<()> {
    let report = match run_crawl(config).await {
        Ok(report) => report,
        Err(e) => {
            tracing::error!("Crawl failed: {}", e);
            return Err(e.into());
        }
    };

    tracing::info!("Crawl completed with {} records", report.records.len());

    let stdout = std::io::stdout();
    write_records(stdout.lock(), &report.records, pretty).context("Failed to write records")?;

    Ok(())
}
