//! In-memory record host.
//!
//! A small reference implementation of the record-framework boundary: an
//! identity map of known records plus owned record instances with a native
//! scalar diff. Useful for tests, demos, and as a template for real hosts.

use crate::{
    model::RecordModel,
    record::{NativeChanges, RecordSink, RecordSource, RelatedRecord},
    rollback::RollbackPayload,
    transform::is_natively_tracked,
    value::FieldValue,
};
use serde_json::Value;
use std::{
    cell::RefCell,
    collections::{BTreeMap, BTreeSet},
    rc::Rc,
};

///
/// MemoryStore
///
/// Shared identity map. Cloning yields another handle to the same store.
///

#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    inner: Rc<RefCell<StoreState>>,
}

#[derive(Debug, Default)]
struct StoreState {
    known: BTreeSet<RelatedRecord>,
    next_id: u64,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a persisted record of `model` under a fresh id.
    pub fn make(&self, model: &str) -> RelatedRecord {
        let id = self.next_id();
        self.make_with_id(model, id)
    }

    /// Register a persisted record under an explicit id.
    pub fn make_with_id(&self, model: &str, id: impl Into<String>) -> RelatedRecord {
        let related = RelatedRecord::new(model, id);
        self.inner.borrow_mut().known.insert(related.clone());
        related
    }

    /// Drop a record from the identity map (unload).
    pub fn unload(&self, related: &RelatedRecord) -> bool {
        self.inner.borrow_mut().known.remove(related)
    }

    #[must_use]
    pub fn peek(&self, model: &str, id: &str) -> Option<RelatedRecord> {
        let key = RelatedRecord::new(model, id);
        self.inner.borrow().known.get(&key).cloned()
    }

    /// A persisted, empty record instance of `model`.
    #[must_use]
    pub fn load_record(&self, model: &'static RecordModel) -> MemoryRecord {
        let related = self.make(model.name);
        MemoryRecord {
            model,
            store: self.clone(),
            id: Some(related.id),
            is_new: false,
            attributes: BTreeMap::new(),
            canonical: BTreeMap::new(),
            belongs_to: BTreeMap::new(),
            has_many: BTreeMap::new(),
        }
    }

    /// A brand-new, never persisted record instance of `model`.
    #[must_use]
    pub fn create_record(&self, model: &'static RecordModel) -> MemoryRecord {
        MemoryRecord {
            model,
            store: self.clone(),
            id: None,
            is_new: true,
            attributes: BTreeMap::new(),
            canonical: BTreeMap::new(),
            belongs_to: BTreeMap::new(),
            has_many: BTreeMap::new(),
        }
    }

    fn next_id(&self) -> String {
        let mut state = self.inner.borrow_mut();
        state.next_id += 1;
        state.next_id.to_string()
    }
}

///
/// MemoryRecord
///
/// Owned record instance. Scalar attributes of natively tracked types are
/// diffed against their canonical (last persisted) value, like a typical
/// host framework would.
///

#[derive(Clone, Debug)]
pub struct MemoryRecord {
    model: &'static RecordModel,
    store: MemoryStore,
    id: Option<String>,
    is_new: bool,
    attributes: BTreeMap<String, Value>,
    canonical: BTreeMap<String, Value>,
    belongs_to: BTreeMap<String, Option<RelatedRecord>>,
    has_many: BTreeMap<String, Vec<RelatedRecord>>,
}

impl MemoryRecord {
    pub fn set_attr(&mut self, name: &str, value: Value) {
        self.attributes.insert(name.to_string(), value);
    }

    /// Mutable access to an attribute value for in-place edits.
    pub fn attr_mut(&mut self, name: &str) -> &mut Value {
        self.attributes.entry(name.to_string()).or_insert(Value::Null)
    }

    pub fn set_one(&mut self, name: &str, related: Option<&RelatedRecord>) {
        self.belongs_to.insert(name.to_string(), related.cloned());
    }

    pub fn set_many(&mut self, name: &str, members: &[RelatedRecord]) {
        self.has_many.insert(name.to_string(), members.to_vec());
    }

    /// Identity of this record as seen from an association.
    #[must_use]
    pub fn as_related(&self) -> Option<RelatedRecord> {
        self.id
            .as_ref()
            .map(|id| RelatedRecord::new(self.model.name, id.clone()))
    }

    /// Simulate a successful save: assign an id when missing, mark the record
    /// persisted, and adopt current scalars as canonical.
    pub fn commit(&mut self) {
        if self.id.is_none() {
            self.id = Some(self.store.next_id());
        }
        if let Some(related) = self.as_related() {
            self.store.inner.borrow_mut().known.insert(related);
        }
        self.is_new = false;
        self.canonical = self.attributes.clone();
    }

    fn is_native(&self, name: &str) -> bool {
        self.model
            .attribute(name)
            .and_then(|attr| attr.value_type)
            .is_some_and(is_natively_tracked)
    }
}

impl RecordSource for MemoryRecord {
    fn model(&self) -> &'static RecordModel {
        self.model
    }

    fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    fn is_new(&self) -> bool {
        self.is_new
    }

    fn attribute(&self, name: &str) -> Value {
        self.attributes.get(name).cloned().unwrap_or(Value::Null)
    }

    fn belongs_to(&self, name: &str) -> Option<RelatedRecord> {
        self.belongs_to.get(name).cloned().flatten()
    }

    fn has_many(&self, name: &str) -> Option<Vec<RelatedRecord>> {
        self.has_many.get(name).cloned()
    }

    fn changed_attributes(&self) -> NativeChanges {
        self.model
            .attributes
            .iter()
            .filter(|attr| self.is_native(attr.name))
            .filter_map(|attr| {
                let previous = self.canonical.get(attr.name).cloned().unwrap_or(Value::Null);
                let current = self.attribute(attr.name);
                (previous != current).then(|| (attr.name.to_string(), (previous, current)))
            })
            .collect()
    }

    fn peek_record(&self, model: &str, id: &str) -> Option<RelatedRecord> {
        self.store.peek(model, id)
    }
}

impl RecordSink for MemoryRecord {
    fn clear_has_many(&mut self, name: &str) {
        self.has_many.insert(name.to_string(), Vec::new());
    }

    fn push_payload(&mut self, payload: &RollbackPayload) {
        for (name, value) in &payload.fields {
            match value {
                FieldValue::Attribute(value) => {
                    self.attributes.insert(name.clone(), value.clone());
                    self.canonical.insert(name.clone(), value.clone());
                }
                FieldValue::One(related) => {
                    self.belongs_to.insert(name.clone(), related.clone());
                }
                FieldValue::Many(members) => {
                    self.has_many
                        .entry(name.clone())
                        .or_default()
                        .extend(members.iter().cloned());
                }
            }
        }
    }

    fn rollback_native(&mut self, field: Option<&str>) {
        let names: Vec<&'static str> = self
            .model
            .attributes
            .iter()
            .map(|attr| attr.name)
            .filter(|name| field.is_none_or(|only| only == *name) && self.is_native(name))
            .collect();

        for name in names {
            match self.canonical.get(name) {
                Some(value) => {
                    self.attributes.insert(name.to_string(), value.clone());
                }
                None => {
                    self.attributes.remove(name);
                }
            }
        }
    }
}
