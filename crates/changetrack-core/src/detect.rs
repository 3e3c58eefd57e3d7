//! Change detection against a checkpoint.
//!
//! The free functions compare two serialized values of one field kind; the
//! [`ChangeDetector`] applies them to a live record.

use crate::{
    checkpoint::Checkpoint,
    meta::{FieldDescriptor, TrackedKind, TrackerMeta},
    obs::sink::{self, TrackerEvent},
    options::HasManyOrder,
    record::{NativeChanges, RecordSource},
    serialize::{current_field, deserialize_field, serialize_field},
    value::{FieldValue, RecordRef, SerializedValue, is_blank},
};
use serde::{Serialize, Serializer};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use tracing::trace;

/// Attribute comparison: blank against blank never changes, blank against
/// non-blank always does, otherwise exact equality.
#[must_use]
pub fn values_changed(current: Option<&SerializedValue>, last: Option<&SerializedValue>) -> bool {
    match (is_blank(current), is_blank(last)) {
        (true, true) => false,
        (true, false) | (false, true) => true,
        (false, false) => current != last,
    }
}

/// To-one comparison. The type discriminator only counts for polymorphic
/// associations.
#[must_use]
pub fn belongs_to_changed(
    current: Option<&SerializedValue>,
    last: Option<&SerializedValue>,
    polymorphic: bool,
) -> bool {
    let current = current.and_then(SerializedValue::as_one);
    let last = last.and_then(SerializedValue::as_one);

    match (current, last) {
        (None, None) => false,
        (Some(_), None) | (None, Some(_)) => true,
        (Some(current), Some(last)) => identity(current, polymorphic) != identity(last, polymorphic),
    }
}

/// To-many comparison under the given ordering policy.
#[must_use]
pub fn has_many_changed(
    current: Option<&SerializedValue>,
    last: Option<&SerializedValue>,
    polymorphic: bool,
    order: HasManyOrder,
) -> bool {
    let current = current.map(SerializedValue::members).unwrap_or_default();
    let last = last.map(SerializedValue::members).unwrap_or_default();

    if current.is_empty() && last.is_empty() {
        return false;
    }
    if current.len() != last.len() {
        return true;
    }

    let mut current: Vec<_> = current.iter().map(|r| identity(r, polymorphic)).collect();
    let mut last: Vec<_> = last.iter().map(|r| identity(r, polymorphic)).collect();
    if order == HasManyOrder::Unordered {
        current.sort_unstable();
        last.sort_unstable();
    }

    current != last
}

fn identity(reference: &RecordRef, polymorphic: bool) -> (&str, Option<&str>) {
    let model = if polymorphic {
        reference.model.as_deref()
    } else {
        None
    };

    (reference.id.as_str(), model)
}

///
/// ChangeSet
///
/// Names of every changed field, native and tracked.
///

#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ChangeSet {
    keys: BTreeSet<String>,
}

impl ChangeSet {
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.keys.contains(key)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.keys.iter().map(String::as_str)
    }
}

impl<'a> IntoIterator for &'a ChangeSet {
    type Item = &'a String;
    type IntoIter = std::collections::btree_set::Iter<'a, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.keys.iter()
    }
}

///
/// Change
/// Previous and current value of one changed field.
///

#[derive(Clone, Debug, PartialEq)]
pub struct Change {
    pub previous: FieldValue,
    pub current: FieldValue,
}

impl Change {
    #[must_use]
    pub const fn attribute(previous: Value, current: Value) -> Self {
        Self {
            previous: FieldValue::Attribute(previous),
            current: FieldValue::Attribute(current),
        }
    }
}

// `[previous, current]`
impl Serialize for Change {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        (&self.previous, &self.current).serialize(serializer)
    }
}

///
/// ChangeDetector
///
/// Borrowing view over one record's metadata and checkpoint.
///

#[derive(Clone, Copy, Debug)]
pub struct ChangeDetector<'a> {
    meta: &'a TrackerMeta,
    checkpoint: &'a Checkpoint,
}

impl<'a> ChangeDetector<'a> {
    #[must_use]
    pub const fn new(meta: &'a TrackerMeta, checkpoint: &'a Checkpoint) -> Self {
        Self { meta, checkpoint }
    }

    /// Whether `key` changed. A field present in the native diff is changed
    /// outright; the native diff is read from the record when no hint is
    /// given. Untracked, non-native keys never change.
    pub fn did_change<R>(&self, record: &R, key: &str, native: Option<&NativeChanges>) -> bool
    where
        R: RecordSource + ?Sized,
    {
        let changed = match native {
            Some(native) => native.contains_key(key),
            None => record.changed_attributes().contains_key(key),
        };
        if changed {
            return true;
        }

        self.meta
            .field(key)
            .is_some_and(|field| self.field_changed(record, field))
    }

    /// Compare one tracked field against its checkpoint.
    pub fn field_changed<R>(&self, record: &R, field: &FieldDescriptor) -> bool
    where
        R: RecordSource + ?Sized,
    {
        let current = serialize_field(record, field);
        let last = self.checkpoint.get(field.name);

        match field.kind {
            TrackedKind::Attribute => values_changed(Some(&current), last),
            TrackedKind::BelongsTo => belongs_to_changed(Some(&current), last, field.polymorphic),
            TrackedKind::HasMany => has_many_changed(
                Some(&current),
                last,
                field.polymorphic,
                self.meta.options().has_many_order,
            ),
        }
    }

    /// Tracked fields that currently differ from the checkpoint.
    pub fn changed_fields<R>(&self, record: &R) -> Vec<&'a FieldDescriptor>
    where
        R: RecordSource + ?Sized,
    {
        self.meta
            .fields()
            .iter()
            .filter(|field| self.field_changed(record, field))
            .collect()
    }

    /// Every changed key: the native diff plus changed tracked fields.
    pub fn changed<R>(&self, record: &R) -> ChangeSet
    where
        R: RecordSource + ?Sized,
    {
        let mut keys: BTreeSet<String> = record.changed_attributes().into_keys().collect();
        keys.extend(
            self.changed_fields(record)
                .into_iter()
                .map(|field| field.name.to_string()),
        );

        let model = self.meta.model().name;
        trace!(model, changed = keys.len(), "diffed record");
        sink::record(TrackerEvent::Diff {
            model,
            changed: keys.len(),
        });

        ChangeSet { keys }
    }

    /// Paired previous/current values for every changed key. Previous values
    /// of tracked fields are rebuilt from the checkpoint.
    pub fn model_changes<R>(&self, record: &R) -> BTreeMap<String, Change>
    where
        R: RecordSource + ?Sized,
    {
        let mut changes: BTreeMap<String, Change> = record
            .changed_attributes()
            .into_iter()
            .map(|(key, (previous, current))| {
                let change = Change {
                    previous: FieldValue::Attribute(previous),
                    current: FieldValue::Attribute(current),
                };
                (key, change)
            })
            .collect();

        for field in self.changed_fields(record) {
            let change = Change {
                previous: deserialize_field(record, field, self.checkpoint.get(field.name)),
                current: current_field(record, field),
            };
            changes.insert(field.name.to_string(), change);
        }

        changes
    }

    /// Checkpoint value for one field rebuilt into its live shape.
    pub fn previous_value<R>(&self, record: &R, key: &str) -> Option<FieldValue>
    where
        R: RecordSource + ?Sized,
    {
        self.meta
            .field(key)
            .map(|field| deserialize_field(record, field, self.checkpoint.get(field.name)))
    }
}

///
/// TESTS
///
