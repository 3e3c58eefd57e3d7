//! Outgoing payload filtering.
//!
//! A serializer asks a [`SerializeHook`] before writing each attribute or
//! relationship key; [`KeepOnlyChanged`] vetoes keys that did not change.

use crate::{
    detect::ChangeDetector,
    record::{NativeChanges, RecordSource},
};
use serde_json::{Map, Value};

///
/// SerializeHook
///

pub trait SerializeHook {
    fn keep_attribute(&self, key: &str) -> bool;

    fn keep_relationship(&self, key: &str) -> bool;
}

///
/// KeepOnlyChanged
///
/// Keeps every key of a new record; otherwise only keys that changed since
/// the checkpoint. The native diff is read once on construction.
///

pub struct KeepOnlyChanged<'a, R: ?Sized> {
    record: &'a R,
    detector: ChangeDetector<'a>,
    native: NativeChanges,
    is_new: bool,
}

impl<'a, R> KeepOnlyChanged<'a, R>
where
    R: RecordSource + ?Sized,
{
    #[must_use]
    pub fn new(record: &'a R, detector: ChangeDetector<'a>) -> Self {
        Self {
            record,
            detector,
            native: record.changed_attributes(),
            is_new: record.is_new(),
        }
    }

    fn keep(&self, key: &str) -> bool {
        self.is_new || self.detector.did_change(self.record, key, Some(&self.native))
    }
}

impl<R> SerializeHook for KeepOnlyChanged<'_, R>
where
    R: RecordSource + ?Sized,
{
    fn keep_attribute(&self, key: &str) -> bool {
        self.keep(key)
    }

    fn keep_relationship(&self, key: &str) -> bool {
        self.keep(key)
    }
}

/// Drop vetoed keys from already-built `attributes` and `relationships`
/// maps. Returns the number of keys removed.
pub fn filter_payload(
    hook: &dyn SerializeHook,
    attributes: &mut Map<String, Value>,
    relationships: &mut Map<String, Value>,
) -> usize {
    let before = attributes.len() + relationships.len();

    attributes.retain(|key, _| hook.keep_attribute(key));
    relationships.retain(|key, _| hook.keep_relationship(key));

    before - attributes.len() - relationships.len()
}
