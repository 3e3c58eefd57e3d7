use crate::{
    meta::TrackerMeta,
    obs::sink::{self, TrackerEvent},
    record::RecordSource,
    serialize::serialize_field,
    value::SerializedValue,
};
use std::collections::BTreeMap;
use tracing::trace;

///
/// Checkpoint
///
/// Last known serialized value per tracked field for one record instance.
/// A field mapped to `None` was recorded as absent: the record had never
/// been persisted when the snapshot was taken.
///

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Checkpoint {
    values: BTreeMap<String, Option<SerializedValue>>,
}

impl Checkpoint {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            values: BTreeMap::new(),
        }
    }

    /// Freeze every tracked field, or only the named subset, into the
    /// checkpoint. Returns the number of fields written.
    pub fn snapshot<R>(&mut self, record: &R, meta: &TrackerMeta, fields: Option<&[&str]>) -> usize
    where
        R: RecordSource + ?Sized,
    {
        let is_new = record.is_new();
        let mut written = 0;

        for field in meta.fields() {
            if fields.is_some_and(|subset| !subset.contains(&field.name)) {
                continue;
            }

            let value = (!is_new).then(|| serialize_field(record, field));
            self.values.insert(field.name.to_string(), value);
            written += 1;
        }

        trace!(model = meta.model().name, fields = written, is_new, "checkpoint taken");
        sink::record(TrackerEvent::Snapshot {
            model: meta.model().name,
            fields: written,
        });

        written
    }

    /// Saved value for a field; `None` when absent or never recorded.
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&SerializedValue> {
        self.values.get(field).and_then(Option::as_ref)
    }

    /// Whether the field has an entry, even an absent one.
    #[must_use]
    pub fn contains(&self, field: &str) -> bool {
        self.values.contains_key(field)
    }

    /// Drop every saved value.
    pub fn clear(&mut self) {
        self.values.clear();
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }
}
