//! Worker pool scheduler
//!
//! This module drives a fixed pool of fetch slots over the paginated resource:
//! - Reserving an initial offset for every slot
//! - Racing the in-flight fetches and handling whichever completes first
//! - Rebinding a completed slot to the next offset while the crawl is live
//! - Draining in-flight fetches once termination is set
//!
//! The completion loop is the single owner of the result set, the slot table,
//! and the termination state. Only the sequencer is shared, and it is atomic.

use crate::crawler::fetcher::{FetchOutcome, FetchSlot};
use crate::crawler::parser::Record;
use crate::crawler::sequencer::Sequencer;
use crate::output::{log_statistics, CrawlStatistics, ResultAggregator};
use crate::state::{CrawlState, SlotState, SlotTable, TerminationReason};
use crate::SweepError;
use std::sync::Arc;
use std::time::Instant;
use tokio::task::JoinSet;

/// Result of a crawl that did not fail
#[derive(Debug, Clone)]
pub struct CrawlReport {
    /// Every record found, in completion order
    pub records: Vec<Record>,

    /// The first reason that stopped new reservations
    pub termination: Option<TerminationReason>,

    /// Lowest offset that produced a short page
    pub exhausted_at: Option<u64>,

    pub stats: CrawlStatistics,
}

/// Scheduler of a pool of fetch slots
///
/// Slot `worker_id`s must be `0..N` for a pool of `N` slots.
pub struct Scheduler<S: FetchSlot> {
    slots: Vec<S>,
    sequencer: Arc<Sequencer>,
    step: u64,
}

/// Everything the completion loop owns
struct RunState {
    crawl: CrawlState,
    slots: SlotTable,
    aggregator: ResultAggregator,
    stats: CrawlStatistics,
}

impl<S: FetchSlot> Scheduler<S> {
    /// Creates a scheduler
    ///
    /// # Arguments
    ///
    /// * `slots` - The fetch slots, one per concurrent fetch
    /// * `sequencer` - Source of page offsets
    pub fn new(slots: Vec<S>, sequencer: Arc<Sequencer>) -> Self {
        let step = sequencer.step();
        Self {
            slots,
            sequencer,
            step,
        }
    }

    pub fn pool_size(&self) -> usize {
        self.slots.len()
    }

    /// Runs the crawl to completion
    ///
    /// # Returns
    ///
    /// * `Ok(CrawlReport)` - Every in-flight fetch completed and none was fatal
    /// * `Err(SweepError)` - A page exhausted its retry budget or a fetch task
    ///   panicked; the collected records are discarded
    pub async fn run(self) -> Result<CrawlReport, SweepError> {
        let started = Instant::now();
        let Self {
            slots,
            sequencer,
            step,
        } = self;

        tracing::info!(
            "Starting crawl with {} slots from offset {} (step {}, bound {})",
            slots.len(),
            sequencer.min(),
            step,
            sequencer.max()
        );

        let mut run = RunState {
            crawl: CrawlState::new(),
            slots: SlotTable::new(slots.len()),
            aggregator: ResultAggregator::new(),
            stats: CrawlStatistics::new(),
        };
        let mut tasks = JoinSet::new();

        for slot in slots {
            let worker_id = slot.worker_id();
            if run.crawl.is_terminated() {
                run.slots.transition(worker_id, SlotState::Retired);
                continue;
            }

            match sequencer.reserve_next() {
                Some(offset) => {
                    run.slots
                        .transition(worker_id, SlotState::Fetching { offset });
                    spawn_fetch(&mut tasks, slot, offset);
                }
                None => {
                    run.crawl.terminate(TerminationReason::BoundReached);
                    run.slots.transition(worker_id, SlotState::Retired);
                }
            }
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((slot, outcome)) => {
                    handle_completion(&mut run, &mut tasks, &sequencer, step, slot, outcome)
                }
                Err(e) => {
                    tracing::error!("Fetch task failed: {}", e);
                    run.crawl
                        .record_fatal(SweepError::WorkerPanicked(e.to_string()));
                    run.crawl.terminate(TerminationReason::WorkerLost);
                }
            }
        }

        // Slots lost to a panic never report back
        if run.slots.busy_count() > 0 {
            tracing::warn!("{} slots did not report back", run.slots.busy_count());
            for worker_id in 0..run.slots.len() {
                if run.slots.get(worker_id).is_some_and(|s| s.is_busy()) {
                    run.slots.transition(worker_id, SlotState::Retired);
                }
            }
        }

        run.stats.elapsed = started.elapsed();
        log_statistics(&run.stats);

        if let Some(error) = run.crawl.take_fatal() {
            run.aggregator.discard();
            tracing::error!("Crawl failed: {}", error);
            return Err(error);
        }

        if let Some(reason) = run.crawl.termination() {
            tracing::info!("Crawl complete: {}", reason);
        }

        Ok(CrawlReport {
            records: run.aggregator.into_records(),
            termination: run.crawl.termination(),
            exhausted_at: run.crawl.exhausted_at(),
            stats: run.stats,
        })
    }
}

/// Moves `slot` into a new fetch task bound to `offset`
fn spawn_fetch<S: FetchSlot>(tasks: &mut JoinSet<(S, FetchOutcome)>, mut slot: S, offset: u64) {
    tasks.spawn(async move {
        let outcome = slot.fetch(offset).await;
        (slot, outcome)
    });
}

/// Folds one completed fetch into the run and rebinds its slot if allowed
fn handle_completion<S: FetchSlot>(
    run: &mut RunState,
    tasks: &mut JoinSet<(S, FetchOutcome)>,
    sequencer: &Sequencer,
    step: u64,
    slot: S,
    outcome: FetchOutcome,
) {
    let worker_id = slot.worker_id();
    let offset = outcome.offset;
    run.stats.record_outcome(&outcome, step);
    run.slots.transition(worker_id, SlotState::Idle);

    tracing::debug!(
        "Worker {}: offset {} done ({} records, fatal: {})",
        worker_id,
        offset,
        outcome.record_count,
        outcome.fatal
    );

    if outcome.fatal {
        run.crawl.record_fatal(SweepError::FetchExhausted {
            offset,
            url: outcome.url,
            attempts: outcome.load_attempts,
        });
        run.crawl.terminate(TerminationReason::Fatal { offset });
        run.slots.transition(worker_id, SlotState::Retired);
        return;
    }

    let short = outcome.is_short(step);
    let record_count = outcome.record_count;
    run.aggregator.append(outcome.records);

    if short {
        run.crawl.record_short_page(offset);
        run.crawl.terminate(TerminationReason::ShortPage {
            offset,
            records: record_count,
        });
        run.slots.transition(worker_id, SlotState::Retired);
        return;
    }

    if run.crawl.is_terminated() {
        run.slots.transition(worker_id, SlotState::Retired);
        return;
    }

    match sequencer.reserve_next() {
        Some(next) => {
            run.slots
                .transition(worker_id, SlotState::Fetching { offset: next });
            spawn_fetch(tasks, slot, next);
        }
        None => {
            run.crawl.terminate(TerminationReason::BoundReached);
            run.slots.transition(worker_id, SlotState::Retired);
        }
    }
}
