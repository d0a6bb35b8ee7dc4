//! Crawler module for paginated table extraction
//!
//! This module contains the core crawling logic, including:
//! - Record extraction from rendered table cells
//! - Page fetching with load retries
//! - Offset reservation over the paginated resource
//! - Scheduling a pool of reusable fetch slots
//! - Overall crawl coordination

mod coordinator;
mod fetcher;
mod parser;
mod scheduler;
mod sequencer;

pub use coordinator::{run_crawl, Coordinator};
pub use fetcher::{FetchOutcome, FetchSlot, PageFetcher, PageSettings};
pub use parser::{
    extract_records, split_amount_and_currency, ExtractError, Extraction, Record, SurfaceSelection,
    CELLS_PER_RECORD,
};
pub use scheduler::{CrawlReport, Scheduler};
pub use sequencer::Sequencer;
