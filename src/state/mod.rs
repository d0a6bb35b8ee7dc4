//! State module for tracking crawl progress
//!
//! # Components
//!
//! - `CrawlState`: termination flag, its trigger, and the fatal error of a crawl
//! - `SlotState`: lifecycle of one worker slot (idle, fetching, retired)
//! - `SlotTable`: slot states of the whole pool

mod crawl_state;
mod slot_state;

// Re-export main types
pub use crawl_state::{CrawlState, TerminationReason};
pub use slot_state::{SlotState, SlotTable};
