//! Pagination sequencer
//!
//! Hands out page offsets `min, min + step, min + 2·step, ...` up to an
//! inclusive bound. Every offset is handed out at most once, whatever the
//! number of concurrent callers.

use crate::config::PaginationConfig;
use std::sync::atomic::{AtomicU64, Ordering};

/// Generator of the next page offset to fetch
///
/// The shared counter holds the index of the next offset, not the offset
/// itself, so no arithmetic ever runs past the bound.
#[derive(Debug)]
pub struct Sequencer {
    /// Index of the next offset to hand out
    next_index: AtomicU64,

    /// Index of the highest offset within the bound; `None` when `min > max`
    last_index: Option<u64>,

    min: u64,

    /// Increment between offsets
    step: u64,

    /// Highest offset that may be handed out
    max: u64,
}

impl Sequencer {
    /// Creates a sequencer starting at `min`
    ///
    /// `step` must be non-zero; the configuration validator guarantees it.
    pub fn new(min: u64, step: u64, max: u64) -> Self {
        debug_assert!(step > 0, "step must be non-zero");

        let last_index = max.checked_sub(min).map(|span| span / step.max(1));

        Self {
            next_index: AtomicU64::new(0),
            last_index,
            min,
            step,
            max,
        }
    }

    /// Creates a sequencer over the configured offset range
    pub fn from_config(config: &PaginationConfig) -> Self {
        Self::new(config.start_min, config.step, config.start_max)
    }

    /// Reserves the next offset
    ///
    /// Returns `None` once every offset up to the bound has been handed out.
    /// Otherwise the index advances by exactly one in a single atomic
    /// read-and-increment, and the offset at that index is returned.
    pub fn reserve_next(&self) -> Option<u64> {
        let last_index = self.last_index?;

        self.next_index
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |index| {
                if index > last_index {
                    None
                } else {
                    index.checked_add(1)
                }
            })
            .ok()
            .map(|index| self.offset_at(index))
    }

    /// Offset at `index`; only called with `index <= last_index`, which keeps
    /// the result at or below `max`
    fn offset_at(&self, index: u64) -> u64 {
        self.min + index * self.step
    }

    pub fn min(&self) -> u64 {
        self.min
    }

    pub fn step(&self) -> u64 {
        self.step
    }

    pub fn max(&self) -> u64 {
        self.max
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Arc;

    #[test]
    fn test_reserves_in_steps() {
        let sequencer = Sequencer::new(0, 50, 150);

        assert_eq!(sequencer.reserve_next(), Some(0));
        assert_eq!(sequencer.reserve_next(), Some(50));
        assert_eq!(sequencer.reserve_next(), Some(100));
        assert_eq!(sequencer.reserve_next(), Some(150));
        assert_eq!(sequencer.reserve_next(), None);
        assert_eq!(sequencer.reserve_next(), None);
    }

    #[test]
    fn test_none_leaves_counter_untouched() {
        let sequencer = Sequencer::new(0, 50, 60);

        assert_eq!(sequencer.reserve_next(), Some(0));
        assert_eq!(sequencer.reserve_next(), Some(50));
        assert_eq!(sequencer.reserve_next(), None);
        assert_eq!(sequencer.reserve_next(), None);
        assert_eq!(sequencer.next_index.load(Ordering::Acquire), 2);
    }

    #[test]
    fn test_bound_is_inclusive() {
        let sequencer = Sequencer::new(100, 25, 100);
        assert_eq!(sequencer.reserve_next(), Some(100));
        assert_eq!(sequencer.reserve_next(), None);
    }

    #[test]
    fn test_min_above_max_yields_nothing() {
        let sequencer = Sequencer::new(200, 50, 100);
        assert_eq!(sequencer.reserve_next(), None);
    }

    #[test]
    fn test_stops_below_top_of_range() {
        let sequencer = Sequencer::new(u64::MAX - 10, 50, u64::MAX - 1);
        assert_eq!(sequencer.reserve_next(), Some(u64::MAX - 10));
        assert_eq!(sequencer.reserve_next(), None);
    }

    #[test]
    fn test_bound_at_u64_max_never_repeats() {
        let sequencer = Sequencer::new(u64::MAX - 10, 50, u64::MAX);
        assert_eq!(sequencer.reserve_next(), Some(u64::MAX - 10));
        assert_eq!(sequencer.reserve_next(), None);
        assert_eq!(sequencer.reserve_next(), None);

        let sequencer = Sequencer::new(u64::MAX - 10, 5, u64::MAX);
        let reserved: Vec<u64> = std::iter::from_fn(|| sequencer.reserve_next()).collect();
        assert_eq!(reserved, vec![u64::MAX - 10, u64::MAX - 5, u64::MAX]);

        let sequencer = Sequencer::new(u64::MAX - 2, 1, u64::MAX);
        let reserved: Vec<u64> = std::iter::from_fn(|| sequencer.reserve_next()).collect();
        assert_eq!(reserved, vec![u64::MAX - 2, u64::MAX - 1, u64::MAX]);
        assert_eq!(sequencer.reserve_next(), None);
    }

    #[test]
    fn test_bound_at_u64_max_under_contention() {
        let sequencer = Arc::new(Sequencer::new(u64::MAX - 99, 1, u64::MAX));
        let mut handles = Vec::new();

        for _ in 0..4 {
            let sequencer = Arc::clone(&sequencer);
            handles.push(std::thread::spawn(move || {
                std::iter::from_fn(|| sequencer.reserve_next()).collect::<Vec<u64>>()
            }));
        }

        let mut all = Vec::new();
        for handle in handles {
            all.extend(handle.join().unwrap());
        }

        let unique: HashSet<u64> = all.iter().copied().collect();
        assert_eq!(all.len(), 100);
        assert_eq!(unique.len(), 100);
        assert!(unique.contains(&u64::MAX));
    }

    #[test]
    fn test_from_config() {
        let sequencer = Sequencer::from_config(&PaginationConfig::default());
        assert_eq!(sequencer.step(), 50);
        assert_eq!(sequencer.min(), 0);
        assert_eq!(sequencer.max(), 100_100);
        assert_eq!(sequencer.reserve_next(), Some(0));
    }

    #[test]
    fn test_concurrent_reservations_are_unique_and_contiguous() {
        let sequencer = Arc::new(Sequencer::new(0, 10, 99_990));
        let mut handles = Vec::new();

        for _ in 0..8 {
            let sequencer = Arc::clone(&sequencer);
            handles.push(std::thread::spawn(move || {
                let mut reserved = Vec::new();
                while let Some(offset) = sequencer.reserve_next() {
                    reserved.push(offset);
                }
                reserved
            }));
        }

        let mut all = Vec::new();
        for handle in handles {
            all.extend(handle.join().unwrap());
        }

        let unique: HashSet<u64> = all.iter().copied().collect();
        assert_eq!(unique.len(), all.len(), "an offset was reserved twice");
        assert_eq!(all.len(), 10_000);

        all.sort_unstable();
        let expected: Vec<u64> = (0..10_000).map(|i| i * 10).collect();
        assert_eq!(all, expected, "an offset was skipped");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_reservations_from_tasks() {
        let sequencer = Arc::new(Sequencer::new(0, 50, 50 * 499));
        let mut tasks = tokio::task::JoinSet::new();

        for _ in 0..16 {
            let sequencer = Arc::clone(&sequencer);
            tasks.spawn(async move {
                let mut reserved = Vec::new();
                while let Some(offset) = sequencer.reserve_next() {
                    reserved.push(offset);
                    tokio::task::yield_now().await;
                }
                reserved
            });
        }

        let mut seen = HashSet::new();
        while let Some(joined) = tasks.join_next().await {
            for offset in joined.unwrap() {
                assert!(seen.insert(offset), "offset {} reserved twice", offset);
            }
        }
        assert_eq!(seen.len(), 500);
    }
}
