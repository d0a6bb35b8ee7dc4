//! Result aggregator
//!
//! Append-only collection of the records produced by every page. It has a
//! single owner, the scheduler's completion loop, so appends never overlap.

use crate::crawler::Record;

/// Unordered, append-only result set
#[derive(Debug, Clone, Default)]
pub struct ResultAggregator {
    records: Vec<Record>,
}

impl ResultAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends the records of one page
    ///
    /// Arrival order is completion order; no ordering across pages is kept.
    pub fn append(&mut self, records: Vec<Record>) {
        self.records.extend(records);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Drops everything collected so far
    pub fn discard(&mut self) {
        if !self.records.is_empty() {
            tracing::debug!("Discarding {} collected records", self.records.len());
        }
        self.records.clear();
    }

    /// Consumes the aggregator, yielding the result set
    pub fn into_records(self) -> Vec<Record> {
        self.records
    }
}
