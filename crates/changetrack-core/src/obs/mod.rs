//! Observability for the tracker.
//!
//! Tracker logic MUST NOT touch `obs::metrics` directly; every count flows
//! through a [`sink::TrackerEvent`] recorded into the active sink.
pub mod metrics;
pub mod sink;

pub use metrics::{TrackerCounters, counters, reset};
pub use sink::{TrackerEvent, TrackerSink, with_tracker_sink};
