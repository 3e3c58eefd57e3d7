use std::cell::RefCell;

///
/// TrackerCounters
/// Ephemeral, in-memory counters for tracker operations.
///

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct TrackerCounters {
    // Setup
    pub meta_resolved: u64,
    pub meta_cache_hits: u64,
    pub config_errors: u64,

    // Checkpoints
    pub snapshots: u64,
    pub fields_snapshotted: u64,
    pub checkpoints_cleared: u64,

    // Diffs and restores
    pub diffs: u64,
    pub fields_changed: u64,
    pub rollbacks: u64,
    pub fields_rolled_back: u64,
}

thread_local! {
    static COUNTERS: RefCell<TrackerCounters> = RefCell::new(TrackerCounters::default());
}

/// Borrow counters mutably.
pub(crate) fn with_state_mut<R>(f: impl FnOnce(&mut TrackerCounters) -> R) -> R {
    COUNTERS.with(|m| f(&mut m.borrow_mut()))
}

/// Copy of the current thread's counters.
#[must_use]
pub fn counters() -> TrackerCounters {
    COUNTERS.with(|m| m.borrow().clone())
}

/// Reset all counters (useful in tests).
pub fn reset() {
    with_state_mut(|m| *m = TrackerCounters::default());
}

/// Saturating add for a counter field.
pub(crate) const fn bump(counter: &mut u64, by: u64) {
    *counter = counter.saturating_add(by);
}
