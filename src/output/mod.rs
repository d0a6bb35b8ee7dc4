//! Output module for crawl results
//!
//! This module handles:
//! - Collecting the records of every page into one result set
//! - Serializing the result set as JSON
//! - Recording and logging crawl statistics

mod aggregator;
mod json;
pub mod stats;

pub use aggregator::ResultAggregator;
pub use json::write_records;
pub use stats::{log_statistics, CrawlStatistics};
