use crate::{
    memory::{MemoryRecord, MemoryStore},
    meta::{TrackerMeta, extract_field_descriptors},
    model::{AttributeModel, RecordModel, RelationModel},
    options::{OptionLayer, TrackerOptions},
    record::RelatedRecord,
    transform::TransformRegistry,
};

///
/// Test schema
///
/// A user with every field shape the tracker distinguishes, plus the records
/// it points at.
///

static USER_ATTRIBUTES: [AttributeModel; 4] = [
    AttributeModel::new("name", "string"),
    AttributeModel::new("style", "string"),
    AttributeModel::new("info", "object"),
    AttributeModel::untyped("blob"),
];

static USER_RELATIONS: [RelationModel; 4] = [
    RelationModel::belongs_to("company", "company").polymorphic(),
    RelationModel::belongs_to("profile", "profile"),
    RelationModel::has_many("projects", "project"),
    RelationModel::has_many("pets", "pet").polymorphic(),
];

pub(crate) static USER: RecordModel = RecordModel::new("user", &USER_ATTRIBUTES, &USER_RELATIONS);

static COMPANY_ATTRIBUTES: [AttributeModel; 2] = [
    AttributeModel::new("name", "string"),
    AttributeModel::untyped("blob"),
];

static COMPANY_RELATIONS: [RelationModel; 1] = [RelationModel::has_many("users", "user")];

pub(crate) static COMPANY: RecordModel =
    RecordModel::new("company", &COMPANY_ATTRIBUTES, &COMPANY_RELATIONS);

static PROJECT_ATTRIBUTES: [AttributeModel; 2] = [
    AttributeModel::new("title", "string"),
    AttributeModel::untyped("blob"),
];

static PROJECT_RELATIONS: [RelationModel; 1] = [RelationModel::belongs_to("company", "company")];

fn project_tracker() -> OptionLayer {
    OptionLayer::new()
        .set("track_has_many", true)
        .set("auto", true)
}

pub(crate) static PROJECT: RecordModel =
    RecordModel::new("project", &PROJECT_ATTRIBUTES, &PROJECT_RELATIONS)
        .with_tracker(project_tracker);

///
/// Fixture
/// One in-memory store per test.
///

pub(crate) struct Fixture {
    pub(crate) store: MemoryStore,
}

impl Fixture {
    pub(crate) fn new() -> Self {
        Self {
            store: MemoryStore::new(),
        }
    }

    /// Register a persisted related record of the named type.
    pub(crate) fn make(&self, model: &str) -> RelatedRecord {
        self.store.make(model)
    }

    /// A persisted, empty record instance.
    pub(crate) fn make_record(&self, model: &'static RecordModel) -> MemoryRecord {
        self.store.load_record(model)
    }
}

/// User metadata under default options.
pub(crate) fn user_meta() -> TrackerMeta {
    meta_for(&USER, TrackerOptions::default())
}

pub(crate) fn meta_for(model: &'static RecordModel, options: TrackerOptions) -> TrackerMeta {
    extract_field_descriptors(model, options, &TransformRegistry::new())
        .expect("fixture metadata should resolve")
}
