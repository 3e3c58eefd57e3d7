//! Tracker event sink boundary.
//!
//! This module is the only allowed bridge between tracker logic and the
//! thread-local counter state.
use crate::obs::metrics;
use std::cell::RefCell;

thread_local! {
    static SINK_OVERRIDE: RefCell<Option<*const dyn TrackerSink>> = RefCell::new(None);
}

///
/// TrackerEvent
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum TrackerEvent {
    MetaResolved {
        model: &'static str,
        fields: usize,
    },
    MetaCacheHit {
        model: &'static str,
    },
    ConfigRejected {
        model: &'static str,
    },
    Snapshot {
        model: &'static str,
        fields: usize,
    },
    CheckpointCleared {
        model: &'static str,
    },
    Diff {
        model: &'static str,
        changed: usize,
    },
    Rollback {
        model: &'static str,
        fields: usize,
    },
}

///
/// TrackerSink
///

pub trait TrackerSink {
    fn record(&self, event: TrackerEvent);
}

/// GlobalTrackerSink
/// Default sink that writes into the thread-local counters.
/// Acts as the concrete sink when no scoped override is installed.

pub(crate) struct GlobalTrackerSink;

impl TrackerSink for GlobalTrackerSink {
    fn record(&self, event: TrackerEvent) {
        metrics::with_state_mut(|m| match event {
            TrackerEvent::MetaResolved { .. } => metrics::bump(&mut m.meta_resolved, 1),
            TrackerEvent::MetaCacheHit { .. } => metrics::bump(&mut m.meta_cache_hits, 1),
            TrackerEvent::ConfigRejected { .. } => metrics::bump(&mut m.config_errors, 1),
            TrackerEvent::Snapshot { fields, .. } => {
                metrics::bump(&mut m.snapshots, 1);
                metrics::bump(&mut m.fields_snapshotted, fields as u64);
            }
            TrackerEvent::CheckpointCleared { .. } => {
                metrics::bump(&mut m.checkpoints_cleared, 1);
            }
            TrackerEvent::Diff { changed, .. } => {
                metrics::bump(&mut m.diffs, 1);
                metrics::bump(&mut m.fields_changed, changed as u64);
            }
            TrackerEvent::Rollback { fields, .. } => {
                metrics::bump(&mut m.rollbacks, 1);
                metrics::bump(&mut m.fields_rolled_back, fields as u64);
            }
        });
    }
}

pub(crate) const GLOBAL_TRACKER_SINK: GlobalTrackerSink = GlobalTrackerSink;

pub(crate) fn record(event: TrackerEvent) {
    let override_ptr = SINK_OVERRIDE.with(|cell| *cell.borrow());
    if let Some(ptr) = override_ptr {
        // SAFETY:
        // - `ptr` was produced from a valid `&dyn TrackerSink` in `with_tracker_sink`.
        // - `with_tracker_sink` restores the previous pointer before returning,
        //   including unwind paths via `Guard::drop`.
        // - `record` is synchronous and never stores `ptr` beyond this call.
        unsafe { (&*ptr).record(event) };
    } else {
        GLOBAL_TRACKER_SINK.record(event);
    }
}

/// Run a closure with a temporary tracker sink override.
pub fn with_tracker_sink<T>(sink: &dyn TrackerSink, f: impl FnOnce() -> T) -> T {
    struct Guard(Option<*const dyn TrackerSink>);

    impl Drop for Guard {
        fn drop(&mut self) {
            SINK_OVERRIDE.with(|cell| {
                *cell.borrow_mut() = self.0;
            });
        }
    }

    // SAFETY:
    // - `sink_ptr` is installed only for this dynamic scope.
    // - `Guard` restores the previous slot on all exits, including panic.
    // - `record` only dereferences synchronously and never persists `sink_ptr`.
    let sink_ptr = unsafe { std::mem::transmute::<&dyn TrackerSink, *const dyn TrackerSink>(sink) };
    let prev = SINK_OVERRIDE.with(|cell| cell.borrow_mut().replace(sink_ptr));
    let _guard = Guard(prev);

    f()
}
