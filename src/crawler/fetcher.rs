//! Page fetcher
//!
//! This module turns one page offset into a [`FetchOutcome`]:
//! - Building the page URL from the template
//! - Loading it with a bounded timeout, retrying load failures up to the budget
//! - Triggering the optional reveal control and waiting for content markers
//! - Extracting records from the first surface that has any, walking
//!   surfaces only as far as needed
//!
//! Only load failures are retried and counted. The reveal interaction and the
//! content wait are advisory: their failures are logged and absorbed.

use crate::config::Config;
use crate::crawler::parser::{Extraction, Record, SurfaceSelection};
use crate::render::RenderContext;
use crate::url::UrlTemplate;
use crate::UrlError;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

/// Result of one fetch-and-extract of a page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchOutcome {
    /// Slot that produced this outcome
    pub worker_id: usize,

    /// Page offset that was fetched
    pub offset: u64,

    /// Resource locator built for the offset
    pub url: String,

    /// Records found on the page (empty when fatal)
    pub records: Vec<Record>,

    /// Number of records found; meaningful only when not fatal
    pub record_count: usize,

    /// True when the load retry budget was exhausted
    pub fatal: bool,

    /// Load attempts made, including the successful one
    pub load_attempts: u32,

    /// Rows consumed but rejected by the extractor
    pub rejected_rows: usize,

    /// Cells dropped because they did not form a full row
    pub leftover_cells: usize,
}

impl FetchOutcome {
    /// Outcome of a page that could not be loaded within the retry budget
    pub fn fatal(worker_id: usize, offset: u64, url: String, load_attempts: u32) -> Self {
        Self {
            worker_id,
            offset,
            url,
            records: Vec::new(),
            record_count: 0,
            fatal: true,
            load_attempts,
            rejected_rows: 0,
            leftover_cells: 0,
        }
    }

    /// Outcome of a loaded page
    pub fn extracted(
        worker_id: usize,
        offset: u64,
        url: String,
        load_attempts: u32,
        extraction: Extraction,
    ) -> Self {
        Self {
            worker_id,
            offset,
            url,
            record_count: extraction.records.len(),
            records: extraction.records,
            fatal: false,
            load_attempts,
            rejected_rows: extraction.rejected.len(),
            leftover_cells: extraction.leftover_cells,
        }
    }

    /// Returns true if the page holds fewer records than a full page
    pub fn is_short(&self, step: u64) -> bool {
        (self.record_count as u64) < step
    }
}

/// Per-page settings shared by every slot
#[derive(Debug, Clone)]
pub struct PageSettings {
    pub url_template: UrlTemplate,

    /// Records per full page
    pub step: u64,

    /// Total load attempts per offset
    pub retry_budget: u32,

    pub load_timeout: Duration,

    /// Bound for the reveal interaction and for the content wait
    pub interaction_timeout: Duration,

    pub content_selector: String,

    pub reload_selector: String,

    /// Extra reloads attempted before accepting a short page
    pub short_page_confirmations: u32,
}

impl PageSettings {
    /// Builds the settings from a validated configuration
    pub fn from_config(config: &Config) -> Result<Self, UrlError> {
        Ok(Self {
            url_template: UrlTemplate::parse(&config.target.url_template)?,
            step: config.pagination.step,
            retry_budget: config.page.retry_budget.max(1),
            load_timeout: config.page.load_timeout(),
            interaction_timeout: config.page.interaction_timeout(),
            content_selector: config.page.content_selector.clone(),
            reload_selector: config.page.reload_selector.clone(),
            short_page_confirmations: config.page.short_page_confirmations,
        })
    }
}

/// One reusable fetch slot of the worker pool
///
/// A slot is moved into its fetch task and handed back with the outcome, so
/// its execution context survives from one offset to the next.
#[async_trait]
pub trait FetchSlot: Send + 'static {
    fn worker_id(&self) -> usize;

    /// Fetches and extracts the page at `offset`
    async fn fetch(&mut self, offset: u64) -> FetchOutcome;
}

/// Fetch slot driving a rendering context
pub struct PageFetcher<R> {
    worker_id: usize,
    context: R,
    settings: Arc<PageSettings>,
}

impl<R: RenderContext> PageFetcher<R> {
    pub fn new(worker_id: usize, context: R, settings: Arc<PageSettings>) -> Self {
        Self {
            worker_id,
            context,
            settings,
        }
    }

    /// Loads `url`, retrying until the budget is spent
    ///
    /// Returns the number of attempts made: `Ok` once a load succeeds, `Err`
    /// when every attempt failed.
    async fn load_with_retries(&mut self, url: &str) -> Result<u32, u32> {
        let budget = self.settings.retry_budget;
        let mut attempts = 0;

        while attempts < budget {
            attempts += 1;

            match self.context.load(url, self.settings.load_timeout).await {
                Ok(()) => return Ok(attempts),
                Err(e) => {
                    tracing::warn!(
                        "Worker {}: load {}/{} of {} failed: {}",
                        self.worker_id,
                        attempts,
                        budget,
                        url,
                        e
                    );
                }
            }
        }

        Err(attempts)
    }

    /// Runs the advisory steps, then extracts from the loaded page
    async fn reveal_and_extract(&mut self) -> Extraction {
        let settings = Arc::clone(&self.settings);

        match tokio::time::timeout(
            settings.interaction_timeout,
            self.context.interact(&settings.reload_selector),
        )
        .await
        {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::debug!("Worker {}: reveal skipped: {}", self.worker_id, e),
            Err(_) => tracing::debug!("Worker {}: reveal timed out", self.worker_id),
        }

        if let Err(e) = self
            .context
            .wait_for(&settings.content_selector, settings.interaction_timeout)
            .await
        {
            tracing::debug!("Worker {}: content wait failed: {}", self.worker_id, e);
        }

        self.context.rewind_surfaces();
        let mut selection = SurfaceSelection::new();

        while let Some(surface) = self.context.next_surface().await {
            if let Some(extraction) = selection.offer(&surface) {
                return extraction;
            }
        }

        tracing::trace!(
            "Worker {}: no records on {} surfaces",
            self.worker_id,
            selection.tried()
        );
        selection.finish()
    }

    /// Reloads a short page, keeping the largest extraction
    async fn confirm_short_page(&mut self, url: &str, mut extraction: Extraction) -> Extraction {
        let step = self.settings.step;
        let mut confirmations = 0;

        while (extraction.len() as u64) < step
            && confirmations < self.settings.short_page_confirmations
        {
            confirmations += 1;
            tracing::debug!(
                "Worker {}: short page {} ({} records), confirming {}/{}",
                self.worker_id,
                url,
                extraction.len(),
                confirmations,
                self.settings.short_page_confirmations
            );

            if let Err(e) = self.context.load(url, self.settings.load_timeout).await {
                tracing::debug!("Worker {}: confirmation reload failed: {}", self.worker_id, e);
                continue;
            }

            let again = self.reveal_and_extract().await;
            if again.len() > extraction.len() {
                extraction = again;
            }
        }

        extraction
    }
}

#[async_trait]
impl<R: RenderContext + 'static> FetchSlot for PageFetcher<R> {
    fn worker_id(&self) -> usize {
        self.worker_id
    }

    async fn fetch(&mut self, offset: u64) -> FetchOutcome {
        let url = self.settings.url_template.render(offset);
        tracing::debug!("Worker {}: fetching {}", self.worker_id, url);

        let attempts = match self.load_with_retries(&url).await {
            Ok(attempts) => attempts,
            Err(attempts) => {
                tracing::error!(
                    "Worker {}: giving up on {} after {} attempts",
                    self.worker_id,
                    url,
                    attempts
                );
                return FetchOutcome::fatal(self.worker_id, offset, url, attempts);
            }
        };

        let extraction = self.reveal_and_extract().await;
        let extraction = self.confirm_short_page(&url, extraction).await;

        tracing::debug!(
            "Worker {}: offset {} yielded {} records",
            self.worker_id,
            offset,
            extraction.len()
        );

        FetchOutcome::extracted(self.worker_id, offset, url, attempts, extraction)
    }
}
