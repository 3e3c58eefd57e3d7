//! Opt-in dirtiness aggregate.
//!
//! One listener per observed field maps a change notification onto the group
//! it belongs to. Reads recompute a group only after it was invalidated.

use crate::meta::{TrackedKind, TrackerMeta};
use std::{cell::Cell, collections::HashMap};

///
/// DirtyGroup
///

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum DirtyGroup {
    Attributes,
    Relations,
}

///
/// DirtyState
///
/// Cached attribute/relation dirtiness for one record instance.
///

#[derive(Debug)]
pub struct DirtyState {
    listeners: HashMap<&'static str, DirtyGroup>,
    attributes: Cell<Option<bool>>,
    relations: Cell<Option<bool>>,
    recomputes: Cell<u64>,
}

impl DirtyState {
    /// Register listeners: every model attribute feeds the attribute group,
    /// every tracked relationship feeds the relation group.
    #[must_use]
    pub fn new(meta: &TrackerMeta) -> Self {
        let mut listeners: HashMap<&'static str, DirtyGroup> = meta
            .model()
            .attributes
            .iter()
            .map(|attr| (attr.name, DirtyGroup::Attributes))
            .collect();

        for field in meta.fields() {
            let group = match field.kind {
                TrackedKind::Attribute => DirtyGroup::Attributes,
                TrackedKind::BelongsTo | TrackedKind::HasMany => DirtyGroup::Relations,
            };
            listeners.insert(field.name, group);
        }

        Self {
            listeners,
            attributes: Cell::new(None),
            relations: Cell::new(None),
            recomputes: Cell::new(0),
        }
    }

    /// Group a field reports to, if it is observed at all.
    #[must_use]
    pub fn group(&self, field: &str) -> Option<DirtyGroup> {
        self.listeners.get(field).copied()
    }

    /// A field's live value may have changed. Unknown fields invalidate both
    /// groups.
    pub fn notify(&self, field: &str) {
        match self.group(field) {
            Some(DirtyGroup::Attributes) => self.attributes.set(None),
            Some(DirtyGroup::Relations) => self.relations.set(None),
            None => self.reset(),
        }
    }

    /// Force recomputation of both groups (lifecycle events, save, rollback).
    pub fn reset(&self) {
        self.attributes.set(None);
        self.relations.set(None);
    }

    pub fn has_dirty_attributes(&self, compute: impl FnOnce() -> bool) -> bool {
        self.read(&self.attributes, compute)
    }

    pub fn has_dirty_relations(&self, compute: impl FnOnce() -> bool) -> bool {
        self.read(&self.relations, compute)
    }

    /// Number of group recomputations so far.
    #[must_use]
    pub const fn recomputes(&self) -> u64 {
        self.recomputes.get()
    }

    fn read(&self, slot: &Cell<Option<bool>>, compute: impl FnOnce() -> bool) -> bool {
        if let Some(cached) = slot.get() {
            return cached;
        }

        let value = compute();
        slot.set(Some(value));
        self.recomputes.set(self.recomputes.get() + 1);

        value
    }
}
