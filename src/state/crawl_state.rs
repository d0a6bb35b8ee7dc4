/// Crawl-wide termination bookkeeping
///
/// The scheduler owns one `CrawlState` for the whole run. `terminated` is set
/// once and never cleared; the fatal error is recorded at most once.
use crate::SweepError;
use std::fmt;

/// Why the scheduler stopped admitting new work
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminationReason {
    /// A page returned fewer records than a full page holds
    ShortPage { offset: u64, records: usize },

    /// The sequencer ran past the watchdog bound
    BoundReached,

    /// A page exhausted its load retry budget
    Fatal { offset: u64 },

    /// A fetch task panicked
    WorkerLost,
}

impl fmt::Display for TerminationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ShortPage { offset, records } => {
                write!(f, "short page at offset {} ({} records)", offset, records)
            }
            Self::BoundReached => write!(f, "offset bound reached"),
            Self::Fatal { offset } => write!(f, "fatal fetch at offset {}", offset),
            Self::WorkerLost => write!(f, "fetch worker lost"),
        }
    }
}

/// Termination state of one crawl
#[derive(Debug, Default)]
pub struct CrawlState {
    termination: Option<TerminationReason>,
    fatal_error: Option<SweepError>,
    exhausted_at: Option<u64>,
}

impl CrawlState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true once no further offset may be reserved
    pub fn is_terminated(&self) -> bool {
        self.termination.is_some()
    }

    /// Sets `terminated`
    ///
    /// Only the first call records its reason; returns true for that call.
    pub fn terminate(&mut self, reason: TerminationReason) -> bool {
        if self.termination.is_some() {
            tracing::trace!("Already terminated, ignoring {}", reason);
            return false;
        }

        tracing::info!("Crawl terminating: {}", reason);
        self.termination = Some(reason);
        true
    }

    /// The reason that set `terminated`, if any
    pub fn termination(&self) -> Option<TerminationReason> {
        self.termination
    }

    /// Records a short page; keeps the lowest offset seen
    pub fn record_short_page(&mut self, offset: u64) {
        self.exhausted_at = Some(match self.exhausted_at {
            Some(current) => current.min(offset),
            None => offset,
        });
    }

    /// Lowest offset that produced a short page
    pub fn exhausted_at(&self) -> Option<u64> {
        self.exhausted_at
    }

    /// Records the crawl's fatal error; later errors are logged and dropped
    pub fn record_fatal(&mut self, error: SweepError) -> bool {
        if self.fatal_error.is_some() {
            tracing::warn!("Additional fatal error while draining: {}", error);
            return false;
        }

        self.fatal_error = Some(error);
        true
    }

    /// Takes the fatal error out, leaving none recorded
    pub fn take_fatal(&mut self) -> Option<SweepError> {
        self.fatal_error.take()
    }
}
