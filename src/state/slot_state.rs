/// Worker slot lifecycle
///
/// A slot is created once, bound to one offset at a time, and retired when the
/// scheduler stops handing it work.
use std::fmt;

/// Represents the current state of a fetch slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SlotState {
    /// Slot has no work bound to it
    Idle,

    /// Slot is fetching the page at `offset`
    Fetching { offset: u64 },

    /// Slot will not receive further work
    Retired,
}

impl SlotState {
    /// Returns true if the slot has an in-flight fetch
    pub fn is_busy(&self) -> bool {
        matches!(self, Self::Fetching { .. })
    }

    /// Checks whether a transition to `next` is valid
    ///
    /// Valid transitions:
    /// - Idle → Fetching, Retired
    /// - Fetching → Idle (completed, about to be rebound), Retired
    pub fn can_transition_to(&self, next: &SlotState) -> bool {
        match (self, next) {
            (Self::Idle, Self::Fetching { .. }) => true,
            (Self::Idle, Self::Retired) => true,
            (Self::Fetching { .. }, Self::Idle) => true,
            (Self::Fetching { .. }, Self::Retired) => true,
            _ => false,
        }
    }
}

impl fmt::Display for SlotState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Fetching { offset } => write!(f, "fetching offset {}", offset),
            Self::Retired => write!(f, "retired"),
        }
    }
}

/// Slot states of a whole pool, indexed by worker id
#[derive(Debug, Clone)]
pub struct SlotTable {
    states: Vec<SlotState>,
}

impl SlotTable {
    /// Creates `size` idle slots
    pub fn new(size: usize) -> Self {
        Self {
            states: vec![SlotState::Idle; size],
        }
    }

    /// Moves slot `worker_id` to `next`
    ///
    /// Invalid transitions are refused and logged; the state is left unchanged.
    pub fn transition(&mut self, worker_id: usize, next: SlotState) -> bool {
        let Some(current) = self.states.get_mut(worker_id) else {
            tracing::warn!("Unknown worker slot {}", worker_id);
            return false;
        };

        if !current.can_transition_to(&next) {
            tracing::warn!(
                "Invalid slot transition for worker {}: {} -> {}",
                worker_id,
                current,
                next
            );
            return false;
        }

        *current = next;
        true
    }

    pub fn get(&self, worker_id: usize) -> Option<SlotState> {
        self.states.get(worker_id).copied()
    }

    /// Number of slots with an in-flight fetch
    pub fn busy_count(&self) -> usize {
        self.states.iter().filter(|s| s.is_busy()).count()
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }
}
