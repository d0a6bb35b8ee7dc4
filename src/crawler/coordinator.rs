//! Crawl coordinator
//!
//! Wires a validated configuration into a running crawl:
//! - Building the shared HTTP client
//! - Creating one rendering context and fetch slot per pool entry
//! - Creating the sequencer over the configured offset range
//! - Running the scheduler to completion

use crate::config::{validate_pool_size, Config};
use crate::crawler::fetcher::{PageFetcher, PageSettings};
use crate::crawler::scheduler::{CrawlReport, Scheduler};
use crate::crawler::sequencer::Sequencer;
use crate::render::{build_http_client, HttpRenderer};
use crate::SweepError;
use std::sync::Arc;

/// Builds the slots, sequencer, and scheduler for a crawl
pub struct Coordinator {
    scheduler: Scheduler<PageFetcher<HttpRenderer>>,
}

impl Coordinator {
    /// Creates a coordinator
    ///
    /// # Arguments
    ///
    /// * `config` - The validated configuration; `pool.size` already holds any
    ///   command-line override
    ///
    /// # Returns
    ///
    /// * `Ok(Coordinator)` - Every slot is ready
    /// * `Err(SweepError)` - The template, pool size, or HTTP client is invalid
    pub fn new(config: &Config) -> Result<Self, SweepError> {
        let pool_size = config.pool.resolved_size();
        validate_pool_size(pool_size)?;

        let settings = Arc::new(PageSettings::from_config(config)?);
        let client = build_http_client(&config.user_agent)?;

        let slots = (0..pool_size)
            .map(|worker_id| {
                let renderer = HttpRenderer::new(client.clone(), settings.interaction_timeout);
                PageFetcher::new(worker_id, renderer, Arc::clone(&settings))
            })
            .collect();

        let sequencer = Arc::new(Sequencer::from_config(&config.pagination));

        tracing::debug!(
            "Prepared {} slots for {}",
            pool_size,
            settings.url_template.as_str()
        );

        Ok(Self {
            scheduler: Scheduler::new(slots, sequencer),
        })
    }

    pub fn pool_size(&self) -> usize {
        self.scheduler.pool_size()
    }

    /// Runs the crawl
    pub async fn run(self) -> Result<CrawlReport, SweepError> {
        self.scheduler.run().await
    }
}

/// Runs a complete crawl
///
/// This is the main entry point for a crawl. It will:
/// 1. Build the HTTP client and one rendering context per slot
/// 2. Reserve offsets and fetch pages until termination
/// 3. Return every record found, or the fatal error that ended the crawl
///
/// # Arguments
///
/// * `config` - The crawler configuration
///
/// # Returns
///
/// * `Ok(CrawlReport)` - Crawl completed successfully
/// * `Err(SweepError)` - Crawl failed; no partial result is returned
pub async fn run_crawl(config: &Config) -> Result<CrawlReport, SweepError> {
    let coordinator = Coordinator::new(config)?;
    coordinator.run().await
}
