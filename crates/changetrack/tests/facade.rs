//! Tracking through the public facade.

use changetrack::{
    core::memory::MemoryStore,
    error::{ConfigErrorKind, ErrorKind},
    prelude::*,
};
use serde_json::json;

static NOTE_ATTRIBUTES: [AttributeModel; 2] = [
    AttributeModel::new("title", "string"),
    AttributeModel::new("body", "json"),
];

static NOTE_RELATIONS: [RelationModel; 1] = [RelationModel::has_many("tags", "tag")];

static NOTE: RecordModel = RecordModel::new("note", &NOTE_ATTRIBUTES, &NOTE_RELATIONS);

static BROKEN_ATTRIBUTES: [AttributeModel; 1] = [AttributeModel::new("shape", "polygon")];

static BROKEN: RecordModel = RecordModel::new("broken", &BROKEN_ATTRIBUTES, &[]);

fn edit_and_roll_back(runtime: &TrackerRuntime, store: &MemoryStore) -> Result<ChangeSet, Error> {
    let tag = store.make("tag");
    let mut record = store.load_record(&NOTE);
    record.set_attr("body", json!({"blocks": [1]}));

    let mut note = Tracked::loaded(runtime, record)?;
    note.update("body", |r| r.attr_mut("body")["blocks"] = json!([1, 2]));
    note.update("tags", |r| r.set_many("tags", &[tag]));

    let changed = note.changed();
    note.rollback(None);
    assert!(note.changed().is_empty());

    Ok(changed)
}

#[test]
fn json_attributes_and_relations_round_trip_through_rollback() {
    let runtime = TrackerRuntime::new();
    let store = MemoryStore::new();

    let changed = edit_and_roll_back(&runtime, &store).expect("note should track");

    assert_eq!(changed.iter().collect::<Vec<_>>(), ["body", "tags"]);
}

#[test]
fn setup_errors_convert_into_the_public_error() {
    let runtime = TrackerRuntime::new();
    let store = MemoryStore::new();

    let err: Error = Tracked::new(&runtime, store.load_record(&BROKEN))
        .map_err(Error::from)
        .expect_err("unregistered type should fail");

    assert_eq!(err.kind, ErrorKind::Config(ConfigErrorKind::MissingTransform));
    assert!(err.message.contains("polygon"));
}
