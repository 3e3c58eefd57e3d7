//! Record integration layer.
//!
//! [`Tracked`] wraps one host record together with its checkpoint and the
//! shared per-type metadata; [`TrackerRuntime`] owns the process-wide state
//! every wrapper resolves its metadata from.

use crate::{
    checkpoint::Checkpoint,
    detect::{Change, ChangeDetector, ChangeSet},
    dirty::DirtyState,
    error::TrackerError,
    filter::KeepOnlyChanged,
    meta::{MetaRegistry, TrackedKind, TrackerMeta},
    model::RecordModel,
    obs::sink::{self, TrackerEvent},
    options::OptionLayer,
    record::{Lifecycle, NativeChanges, RecordSink, RecordSource},
    rollback::{RollbackPayload, apply_rollback, compute_rollback_payload},
    transform::{Transform, TransformRegistry},
    value::SerializedValue,
};
use std::{collections::BTreeMap, rc::Rc};
use tracing::debug;

static NO_CHECKPOINT: Checkpoint = Checkpoint::new();

///
/// TrackerRuntime
///
/// Transform registry, process-wide option layer, and the metadata cache.
///

#[derive(Debug, Default)]
pub struct TrackerRuntime {
    transforms: TransformRegistry,
    process: OptionLayer,
    registry: MetaRegistry,
}

impl TrackerRuntime {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Runtime with a process-wide option layer.
    #[must_use]
    pub fn with_config(process: OptionLayer) -> Self {
        Self {
            process,
            ..Self::default()
        }
    }

    /// Register a transform for a declared attribute type. Cached metadata
    /// is dropped since it may have resolved against the old set.
    pub fn register_transform(&mut self, name: impl Into<String>, transform: impl Transform + 'static) {
        self.transforms.register(name, transform);
        self.registry.clear();
    }

    #[must_use]
    pub const fn transforms(&self) -> &TransformRegistry {
        &self.transforms
    }

    #[must_use]
    pub const fn process_options(&self) -> &OptionLayer {
        &self.process
    }

    #[must_use]
    pub const fn registry(&self) -> &MetaRegistry {
        &self.registry
    }

    /// Resolved metadata for a record type; configuration errors surface here.
    pub fn meta_for(&self, model: &'static RecordModel) -> Result<Rc<TrackerMeta>, TrackerError> {
        self.registry
            .get_or_resolve(model, &self.process, &self.transforms)
    }

    pub fn invalidate(&self, model: &str) -> bool {
        self.registry.invalidate(model)
    }
}

///
/// SaveOptions
/// Which checkpoints `save_changes` refreshes.
///

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub enum SaveOptions {
    #[default]
    All,
    Only(Vec<String>),
    Except(Vec<String>),
}

impl SaveOptions {
    #[must_use]
    pub const fn all() -> Self {
        Self::All
    }

    pub fn only<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Only(fields.into_iter().map(Into::into).collect())
    }

    pub fn except<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Except(fields.into_iter().map(Into::into).collect())
    }

    fn admits(&self, key: &str) -> bool {
        match self {
            Self::All => true,
            Self::Only(fields) => fields.iter().any(|field| field == key),
            Self::Except(fields) => !fields.iter().any(|field| field == key),
        }
    }
}

///
/// Tracked
///
/// A host record with change tracking attached. The checkpoint is absent
/// until the first snapshot and after deletion; queries then compare
/// against nothing, so every non-blank tracked field reads as changed.
///

#[derive(Debug)]
pub struct Tracked<R> {
    record: R,
    meta: Rc<TrackerMeta>,
    checkpoint: Option<Checkpoint>,
    dirty: Option<DirtyState>,
}

impl<R> Tracked<R>
where
    R: RecordSource,
{
    /// Attach tracking to a record. Fails when the record type's tracker
    /// setup is invalid.
    pub fn new(runtime: &TrackerRuntime, record: R) -> Result<Self, TrackerError> {
        let meta = runtime.meta_for(record.model())?;
        let dirty = meta.enable_is_dirty().then(|| DirtyState::new(&meta));

        Ok(Self {
            record,
            meta,
            checkpoint: None,
            dirty,
        })
    }

    /// Attach tracking to a record fresh from the host and checkpoint it.
    pub fn loaded(runtime: &TrackerRuntime, record: R) -> Result<Self, TrackerError> {
        let mut tracked = Self::new(runtime, record)?;
        tracked.handle(Lifecycle::Loaded);

        Ok(tracked)
    }

    #[must_use]
    pub const fn record(&self) -> &R {
        &self.record
    }

    /// Mutable access without naming a field; invalidates all dirtiness.
    pub fn record_mut(&mut self) -> &mut R {
        self.reset_dirty();
        &mut self.record
    }

    /// Mutate one field and notify its dirtiness listener.
    pub fn update<T>(&mut self, field: &str, f: impl FnOnce(&mut R) -> T) -> T {
        let out = f(&mut self.record);
        self.notify(field);

        out
    }

    /// Report an out-of-band change to a field's live value.
    pub fn notify(&self, field: &str) {
        if let Some(dirty) = &self.dirty {
            dirty.notify(field);
        }
    }

    pub fn into_inner(self) -> R {
        self.record
    }

    #[must_use]
    pub fn meta(&self) -> &TrackerMeta {
        &self.meta
    }

    #[must_use]
    pub const fn has_checkpoint(&self) -> bool {
        self.checkpoint.is_some()
    }

    /// Checkpoint every tracked field from the current live values.
    pub fn start_track(&mut self) {
        self.snapshot(None);
    }

    /// Refresh the checkpoint for the selected tracked fields.
    pub fn save_changes(&mut self, options: &SaveOptions) {
        match options {
            SaveOptions::All => self.snapshot(None),
            _ => {
                let fields: Vec<&str> = self.meta.keys().filter(|key| options.admits(key)).collect();
                self.snapshot(Some(fields.as_slice()));
            }
        }
    }

    /// Raw checkpoint value of a tracked field.
    #[must_use]
    pub fn saved_tracker_value(&self, key: &str) -> Option<&SerializedValue> {
        self.checkpoint.as_ref().and_then(|checkpoint| checkpoint.get(key))
    }

    pub fn did_change(&self, key: &str, native: Option<&NativeChanges>) -> bool {
        self.detector().did_change(&self.record, key, native)
    }

    pub fn changed(&self) -> ChangeSet {
        self.detector().changed(&self.record)
    }

    pub fn model_changes(&self) -> BTreeMap<String, Change> {
        self.detector().model_changes(&self.record)
    }

    /// `None` when dirtiness tracking is disabled for the record type.
    pub fn is_dirty(&self) -> Option<bool> {
        Some(self.has_dirty_attributes()? || self.has_dirty_relations()?)
    }

    pub fn has_dirty_attributes(&self) -> Option<bool> {
        let dirty = self.dirty.as_ref()?;

        Some(dirty.has_dirty_attributes(|| {
            let detector = self.detector();
            let model = self.meta.model();
            let native = self.record.changed_attributes();

            native.keys().any(|key| model.is_attribute(key))
                || self
                    .meta
                    .fields()
                    .iter()
                    .filter(|field| field.kind == TrackedKind::Attribute)
                    .any(|field| detector.field_changed(&self.record, field))
        }))
    }

    pub fn has_dirty_relations(&self) -> Option<bool> {
        let dirty = self.dirty.as_ref()?;

        Some(dirty.has_dirty_relations(|| {
            let detector = self.detector();

            self.meta
                .fields()
                .iter()
                .filter(|field| field.kind.is_relation())
                .any(|field| detector.field_changed(&self.record, field))
        }))
    }

    /// Serializer hook that drops unchanged keys from outgoing payloads.
    #[must_use]
    pub fn keep_only_changed(&self) -> KeepOnlyChanged<'_, R> {
        KeepOnlyChanged::new(&self.record, self.detector())
    }

    /// Apply a host lifecycle event.
    pub fn handle(&mut self, event: Lifecycle) {
        let model = self.meta.model().name;
        debug!(model, ?event, auto = self.meta.auto_save(), "lifecycle event");

        match event {
            Lifecycle::Loaded | Lifecycle::Reloaded | Lifecycle::Saved => self.snapshot(None),
            Lifecycle::Created | Lifecycle::Updated => {
                if self.meta.auto_save() {
                    self.snapshot(None);
                } else {
                    self.reset_dirty();
                }
            }
            Lifecycle::Deleted => {
                if self.checkpoint.take().is_some() {
                    sink::record(TrackerEvent::CheckpointCleared { model });
                }
                self.reset_dirty();
            }
        }
    }

    fn snapshot(&mut self, fields: Option<&[&str]>) {
        self.checkpoint
            .get_or_insert_with(Checkpoint::new)
            .snapshot(&self.record, &self.meta, fields);
        self.reset_dirty();
    }

    fn detector(&self) -> ChangeDetector<'_> {
        let checkpoint = self.checkpoint.as_ref().unwrap_or(&NO_CHECKPOINT);

        ChangeDetector::new(&self.meta, checkpoint)
    }

    fn reset_dirty(&self) {
        if let Some(dirty) = &self.dirty {
            dirty.reset();
        }
    }
}

impl<R> Tracked<R>
where
    R: RecordSink,
{
    /// Restore changed tracked fields to their checkpoint values, and native
    /// attributes through the host. `Some(field)` limits both to one field.
    pub fn rollback(&mut self, field: Option<&str>) -> RollbackPayload {
        let scope = field.as_ref().map(std::slice::from_ref);
        let payload = compute_rollback_payload(&self.record, &self.detector(), scope);

        apply_rollback(&mut self.record, &self.meta, &payload, Some(field));
        self.reset_dirty();

        payload
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        memory::{MemoryRecord, MemoryStore},
        obs::metrics,
        test_fixtures::{PROJECT, USER},
    };
    use serde_json::json;

    fn dirty_runtime() -> TrackerRuntime {
        TrackerRuntime::with_config(OptionLayer::new().set("enable_is_dirty", true))
    }

    fn loaded_user(runtime: &TrackerRuntime, store: &MemoryStore) -> Tracked<MemoryRecord> {
        Tracked::loaded(runtime, store.load_record(&USER)).expect("user should track")
    }

    #[test]
    fn metadata_is_resolved_once_per_type() {
        metrics::reset();
        let runtime = TrackerRuntime::new();
        let store = MemoryStore::new();

        let first = loaded_user(&runtime, &store);
        let second = loaded_user(&runtime, &store);

        assert!(std::ptr::eq(first.meta(), second.meta()));
        let counters = metrics::counters();
        assert_eq!(counters.meta_resolved, 1);
        assert_eq!(counters.meta_cache_hits, 1);
    }

    #[test]
    fn in_place_mutation_is_detected() {
        let runtime = TrackerRuntime::new();
        let store = MemoryStore::new();
        let mut record = store.load_record(&USER);
        record.set_attr("info", json!({"dude": 1}));
        let mut user = Tracked::loaded(&runtime, record).expect("user should track");

        user.update("info", |r| r.attr_mut("info")["dude"] = json!(3));

        assert!(user.did_change("info", None));
        assert!(user.changed().contains("info"));
    }

    #[test]
    fn save_changes_is_idempotent() {
        let runtime = TrackerRuntime::new();
        let store = MemoryStore::new();
        let mut user = loaded_user(&runtime, &store);
        user.update("info", |r| r.set_attr("info", json!({"a": 1})));

        user.save_changes(&SaveOptions::all());
        assert!(user.changed().is_empty());
        user.save_changes(&SaveOptions::all());
        assert!(user.changed().is_empty());
    }

    #[test]
    fn save_options_select_fields() {
        let runtime = TrackerRuntime::new();
        let store = MemoryStore::new();
        let mut user = loaded_user(&runtime, &store);
        user.update("info", |r| r.set_attr("info", json!({"a": 1})));
        user.update("blob", |r| r.set_attr("blob", json!({"b": 1})));

        user.save_changes(&SaveOptions::except(["blob"]));
        assert!(!user.did_change("info", None));
        assert!(user.did_change("blob", None));

        user.update("info", |r| r.set_attr("info", json!({"a": 2})));
        user.save_changes(&SaveOptions::only(["blob"]));
        assert!(user.did_change("info", None));
        assert!(!user.did_change("blob", None));
    }

    #[test]
    fn dirtiness_is_absent_when_disabled() {
        let runtime = TrackerRuntime::new();
        let store = MemoryStore::new();
        let user = loaded_user(&runtime, &store);

        assert_eq!(user.is_dirty(), None);
        assert_eq!(user.has_dirty_attributes(), None);
        assert_eq!(user.has_dirty_relations(), None);
    }

    #[test]
    fn dirtiness_follows_attribute_changes_and_rollback() {
        let runtime = dirty_runtime();
        let store = MemoryStore::new();
        let mut user = loaded_user(&runtime, &store);

        assert_eq!(user.is_dirty(), Some(false));
        assert_eq!(user.has_dirty_attributes(), Some(false));
        assert_eq!(user.has_dirty_relations(), Some(false));

        user.update("name", |r| r.set_attr("name", json!("Bob")));
        assert_eq!(user.has_dirty_attributes(), Some(true));
        assert_eq!(user.has_dirty_relations(), Some(false));
        assert_eq!(user.is_dirty(), Some(true));

        user.rollback(None);
        assert_eq!(user.has_dirty_attributes(), Some(false));
        assert_eq!(user.is_dirty(), Some(false));
    }

    #[test]
    fn dirtiness_follows_relation_changes() {
        let runtime = dirty_runtime();
        let store = MemoryStore::new();
        let pet = store.make("cat");
        let mut user = loaded_user(&runtime, &store);

        assert_eq!(user.has_dirty_relations(), Some(false));
        user.update("pets", |r| r.set_many("pets", &[pet]));

        assert_eq!(user.has_dirty_relations(), Some(true));
        assert_eq!(user.has_dirty_attributes(), Some(false));
    }

    #[test]
    fn auto_save_refreshes_on_update() {
        let runtime = TrackerRuntime::new();
        let store = MemoryStore::new();
        let mut project =
            Tracked::loaded(&runtime, store.load_record(&PROJECT)).expect("project should track");

        project.update("blob", |r| r.set_attr("blob", json!({"v": 1})));
        project.record_mut().commit();
        project.handle(Lifecycle::Updated);

        assert!(project.changed().is_empty());
    }

    #[test]
    fn auto_save_checkpoints_on_create() {
        let runtime = TrackerRuntime::new();
        let store = MemoryStore::new();
        let mut project =
            Tracked::new(&runtime, store.create_record(&PROJECT)).expect("project should track");

        project.update("blob", |r| r.set_attr("blob", json!({"v": 1})));
        assert!(project.did_change("blob", None), "new record differs from nothing");

        project.record_mut().commit();
        project.handle(Lifecycle::Created);

        assert!(project.has_checkpoint());
        assert_eq!(
            project.saved_tracker_value("blob"),
            Some(&SerializedValue::Text("{\"v\":1}".to_string()))
        );
        assert!(project.changed().is_empty());
    }

    #[test]
    fn create_without_auto_leaves_no_checkpoint() {
        let runtime = TrackerRuntime::new();
        let store = MemoryStore::new();
        let mut user =
            Tracked::new(&runtime, store.create_record(&USER)).expect("user should track");

        user.update("blob", |r| r.set_attr("blob", json!({"v": 1})));
        user.record_mut().commit();
        user.handle(Lifecycle::Created);

        assert!(!user.has_checkpoint());
        assert!(user.did_change("blob", None));
    }

    #[test]
    fn updates_without_auto_keep_the_diff() {
        let runtime = TrackerRuntime::new();
        let store = MemoryStore::new();
        let mut user = loaded_user(&runtime, &store);

        user.update("blob", |r| r.set_attr("blob", json!({"v": 1})));
        user.handle(Lifecycle::Updated);

        assert!(user.did_change("blob", None));
    }

    #[test]
    fn deletion_drops_the_checkpoint() {
        metrics::reset();
        let runtime = TrackerRuntime::new();
        let store = MemoryStore::new();
        let mut record = store.load_record(&USER);
        record.set_attr("info", json!({"a": 1}));
        let mut user = Tracked::loaded(&runtime, record).expect("user should track");
        assert!(user.saved_tracker_value("info").is_some());

        user.handle(Lifecycle::Deleted);

        assert!(!user.has_checkpoint());
        assert!(user.saved_tracker_value("info").is_none());
        assert_eq!(metrics::counters().checkpoints_cleared, 1);
    }

    #[test]
    fn scoped_rollback_leaves_other_fields_changed() {
        let runtime = TrackerRuntime::new();
        let store = MemoryStore::new();
        let mut user = loaded_user(&runtime, &store);

        user.update("info", |r| r.set_attr("info", json!({"a": 1})));
        user.update("blob", |r| r.set_attr("blob", json!({"b": 1})));

        let payload = user.rollback(Some("info"));

        assert_eq!(payload.fields.keys().collect::<Vec<_>>(), ["info"]);
        assert!(!user.did_change("info", None));
        assert!(user.did_change("blob", None));
    }

    #[test]
    fn registering_a_transform_drops_cached_metadata() {
        let mut runtime = TrackerRuntime::new();
        let store = MemoryStore::new();
        loaded_user(&runtime, &store);
        assert_eq!(runtime.registry().len(), 1);

        runtime.register_transform("point", crate::transform::JsonTransform);

        assert!(runtime.registry().is_empty());
    }
}
