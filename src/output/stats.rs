//! Crawl statistics
//!
//! Counters gathered by the scheduler from every fetch outcome, logged once
//! the crawl is over.

use crate::crawler::FetchOutcome;
use std::time::Duration;

/// Crawl statistics summary
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrawlStatistics {
    /// Fetch outcomes received, fatal ones included
    pub pages_fetched: u64,

    /// Pages holding a full page of records
    pub full_pages: u64,

    /// Pages holding fewer records than a full page
    pub short_pages: u64,

    /// Pages that exhausted their load retry budget
    pub fatal_pages: u64,

    /// Load attempts across all pages
    pub load_attempts: u64,

    /// Records kept
    pub records: u64,

    /// Rows dropped because their amount could not be parsed
    pub rejected_rows: u64,

    /// Cells dropped because they did not form a full row
    pub leftover_cells: u64,

    /// Wall-clock duration of the crawl
    pub elapsed: Duration,
}

impl CrawlStatistics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accounts for one fetch outcome
    ///
    /// # Arguments
    ///
    /// * `outcome` - The completed fetch
    /// * `step` - Number of records on a full page
    pub fn record_outcome(&mut self, outcome: &FetchOutcome, step: u64) {
        self.pages_fetched += 1;
        self.load_attempts += u64::from(outcome.load_attempts);

        if outcome.fatal {
            self.fatal_pages += 1;
            return;
        }

        if outcome.is_short(step) {
            self.short_pages += 1;
        } else {
            self.full_pages += 1;
        }

        self.records += outcome.record_count as u64;
        self.rejected_rows += outcome.rejected_rows as u64;
        self.leftover_cells += outcome.leftover_cells as u64;
    }

    /// Load attempts beyond the first one of each page
    pub fn retries(&self) -> u64 {
        self.load_attempts.saturating_sub(self.pages_fetched)
    }

    /// Pages per second over the whole crawl
    pub fn page_rate(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.pages_fetched as f64 / secs
        } else {
            0.0
        }
    }
}

/// Logs statistics at info level
///
/// Standard output carries the result set, so the summary goes through
/// `tracing` instead.
pub fn log_statistics(stats: &CrawlStatistics) {
    tracing::info!("=== Crawl Statistics ===");
    tracing::info!(
        "Pages: {} fetched ({} full, {} short, {} fatal)",
        stats.pages_fetched,
        stats.full_pages,
        stats.short_pages,
        stats.fatal_pages
    );
    tracing::info!(
        "Loads: {} attempts ({} retries)",
        stats.load_attempts,
        stats.retries()
    );
    tracing::info!("Records: {}", stats.records);

    if stats.rejected_rows > 0 || stats.leftover_cells > 0 {
        tracing::info!(
            "Dropped: {} malformed rows, {} leftover cells",
            stats.rejected_rows,
            stats.leftover_cells
        );
    }

    tracing::info!(
        "Elapsed: {:.2}s ({:.2} pages/sec)",
        stats.elapsed.as_secs_f64(),
        stats.page_rate()
    );
}
