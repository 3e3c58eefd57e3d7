//! Schema introspection: which fields of a record type are tracked, and how.
//!
//! Metadata is computed once per record type and cached in a
//! [`MetaRegistry`]; all instances of a type share the same descriptors and
//! options until the entry is explicitly invalidated.

use crate::{
    error::{ConfigError, TrackerError},
    model::{RecordModel, RelationKind},
    obs::sink::{TrackerEvent, record},
    options::{OptionLayer, TrackerOptions, resolve_options},
    transform::{FieldCodec, TransformRegistry, is_natively_tracked},
};
use std::{cell::RefCell, collections::HashMap, rc::Rc};
use tracing::{debug, warn};

///
/// TrackedKind
///

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum TrackedKind {
    Attribute,
    BelongsTo,
    HasMany,
}

impl TrackedKind {
    #[must_use]
    pub const fn is_relation(self) -> bool {
        matches!(self, Self::BelongsTo | Self::HasMany)
    }
}

impl From<RelationKind> for TrackedKind {
    fn from(kind: RelationKind) -> Self {
        match kind {
            RelationKind::BelongsTo => Self::BelongsTo,
            RelationKind::HasMany => Self::HasMany,
        }
    }
}

///
/// FieldDescriptor
/// One tracked attribute or relationship.
///

#[derive(Clone, Debug)]
pub struct FieldDescriptor {
    pub name: &'static str,
    pub kind: TrackedKind,
    /// Declared attribute type; `None` for untyped attributes and relations.
    pub value_type: Option<&'static str>,
    /// Related record type for relations.
    pub target: Option<&'static str>,
    pub polymorphic: bool,
    pub codec: FieldCodec,
}

///
/// TrackerMeta
///
/// Resolved tracking metadata for one record type: effective options plus the
/// tracked field descriptors in declaration order (attributes first).
///

#[derive(Debug)]
pub struct TrackerMeta {
    model: &'static RecordModel,
    options: TrackerOptions,
    fields: Vec<FieldDescriptor>,
    has_many_fields: Vec<&'static str>,
}

impl TrackerMeta {
    #[must_use]
    pub const fn model(&self) -> &'static RecordModel {
        self.model
    }

    #[must_use]
    pub const fn options(&self) -> &TrackerOptions {
        &self.options
    }

    #[must_use]
    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    #[must_use]
    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|field| field.name == name)
    }

    /// Tracked field names in declaration order.
    pub fn keys(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.fields.iter().map(|field| field.name)
    }

    /// Every to-many association declared on the model, tracked or not.
    #[must_use]
    pub fn has_many_fields(&self) -> &[&'static str] {
        &self.has_many_fields
    }

    #[must_use]
    pub const fn auto_save(&self) -> bool {
        self.options.auto
    }

    #[must_use]
    pub const fn enable_is_dirty(&self) -> bool {
        self.options.enable_is_dirty
    }
}

/// Enumerate the tracked fields of a record type under resolved options.
pub fn extract_field_descriptors(
    model: &'static RecordModel,
    options: TrackerOptions,
    transforms: &TransformRegistry,
) -> Result<TrackerMeta, ConfigError> {
    let mut fields = Vec::new();

    for attribute in model.attributes {
        if attribute.value_type.is_some_and(is_natively_tracked) {
            continue;
        }
        if !options.tracks_key(attribute.name) {
            continue;
        }

        let Some(codec) = transforms.lookup(None, attribute.value_type) else {
            return Err(ConfigError::MissingTransform {
                model: model.name.to_string(),
                field: attribute.name.to_string(),
                value_type: attribute.value_type.unwrap_or_default().to_string(),
            });
        };

        fields.push(FieldDescriptor {
            name: attribute.name,
            kind: TrackedKind::Attribute,
            value_type: attribute.value_type,
            target: None,
            polymorphic: false,
            codec,
        });
    }

    let mut has_many_fields = Vec::new();
    for relation in model.relations {
        if relation.kind == RelationKind::HasMany {
            has_many_fields.push(relation.name);
        }
        if !options.tracks_key(relation.name) {
            continue;
        }

        let codec = match relation.kind {
            RelationKind::BelongsTo => FieldCodec::BelongsTo,
            RelationKind::HasMany => FieldCodec::HasMany,
        };
        fields.push(FieldDescriptor {
            name: relation.name,
            kind: relation.kind.into(),
            value_type: None,
            target: Some(relation.target),
            polymorphic: relation.polymorphic,
            codec,
        });
    }

    // applied after only/except
    if !options.track_has_many {
        fields.retain(|field| field.kind != TrackedKind::HasMany);
    }

    Ok(TrackerMeta {
        model,
        options,
        fields,
        has_many_fields,
    })
}

///
/// MetaRegistry
///
/// Per-type metadata cache keyed by model name. Population is idempotent:
/// resolving the same type twice yields equal metadata.
///

#[derive(Debug, Default)]
pub struct MetaRegistry {
    entries: RefCell<HashMap<&'static str, Rc<TrackerMeta>>>,
}

impl MetaRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Return cached metadata for the model, resolving it on first access.
    pub fn get_or_resolve(
        &self,
        model: &'static RecordModel,
        process: &OptionLayer,
        transforms: &TransformRegistry,
    ) -> Result<Rc<TrackerMeta>, TrackerError> {
        if let Some(meta) = self.get(model.name) {
            record(TrackerEvent::MetaCacheHit { model: model.name });
            return Ok(meta);
        }

        let meta = Rc::new(Self::resolve(model, process, transforms)?);
        self.entries
            .borrow_mut()
            .insert(model.name, Rc::clone(&meta));

        Ok(meta)
    }

    fn resolve(
        model: &'static RecordModel,
        process: &OptionLayer,
        transforms: &TransformRegistry,
    ) -> Result<TrackerMeta, TrackerError> {
        let per_type = (model.tracker)();
        let resolved = resolve_options(model.name, process, &per_type)
            .and_then(|options| extract_field_descriptors(model, options, transforms));

        match resolved {
            Ok(meta) => {
                debug!(
                    model = model.name,
                    fields = meta.fields.len(),
                    auto = meta.options.auto,
                    "resolved tracker metadata"
                );
                record(TrackerEvent::MetaResolved {
                    model: model.name,
                    fields: meta.fields.len(),
                });
                Ok(meta)
            }
            Err(err) => {
                warn!(model = model.name, error = %err, "invalid change tracker setup");
                record(TrackerEvent::ConfigRejected { model: model.name });
                Err(err.into())
            }
        }
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<Rc<TrackerMeta>> {
        self.entries.borrow().get(name).cloned()
    }

    /// Drop the cached metadata for one model; returns whether it was cached.
    pub fn invalidate(&self, name: &str) -> bool {
        self.entries.borrow_mut().remove(name).is_some()
    }

    pub fn clear(&self) {
        self.entries.borrow_mut().clear();
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        error::ErrorOrigin,
        model::{AttributeModel, RelationModel},
        obs::metrics,
        test_fixtures::{COMPANY, USER},
    };

    fn keys(process: OptionLayer, per_type: OptionLayer) -> Vec<&'static str> {
        let options =
            resolve_options(USER.name, &process, &per_type).expect("options should resolve");
        extract_field_descriptors(&USER, options, &TransformRegistry::new())
            .expect("user descriptors should resolve")
            .keys()
            .collect()
    }

    #[test]
    fn tracked_keys_follow_inclusion_policy() {
        let cases = [
            (
                OptionLayer::new(),
                OptionLayer::new(),
                vec!["info", "blob", "company", "profile", "projects", "pets"],
            ),
            (
                OptionLayer::new().set("track_has_many", false),
                OptionLayer::new(),
                vec!["info", "blob", "company", "profile"],
            ),
            (
                OptionLayer::new().set("track_has_many", true),
                OptionLayer::new().only(["info"]),
                vec!["info"],
            ),
            (
                OptionLayer::new(),
                OptionLayer::new().except(["info"]),
                vec!["blob", "company", "profile", "projects", "pets"],
            ),
            (
                OptionLayer::new().set("track_has_many", false),
                OptionLayer::new().only(["info", "projects"]),
                vec!["info"],
            ),
        ];

        for (process, per_type, expected) in cases {
            assert_eq!(keys(process, per_type), expected);
        }
    }

    #[test]
    fn descriptors_carry_kind_and_codec() {
        let meta = extract_field_descriptors(&USER, TrackerOptions::default(), &TransformRegistry::new())
            .expect("user descriptors should resolve");

        let info = meta.field("info").expect("info is tracked");
        assert_eq!(info.kind, TrackedKind::Attribute);
        assert_eq!(info.value_type, Some("object"));
        assert!(matches!(info.codec, FieldCodec::Attribute(_)));

        let company = meta.field("company").expect("company is tracked");
        assert_eq!(company.kind, TrackedKind::BelongsTo);
        assert!(company.polymorphic);
        assert_eq!(company.target, Some("company"));

        let projects = meta.field("projects").expect("projects is tracked");
        assert_eq!(projects.kind, TrackedKind::HasMany);
        assert!(!projects.polymorphic);

        assert!(meta.field("name").is_none(), "string attributes are native");
        assert_eq!(meta.has_many_fields(), ["projects", "pets"]);
    }

    #[test]
    fn missing_custom_transform_is_a_configuration_error() {
        static ATTRS: [AttributeModel; 1] = [AttributeModel::new("location", "point")];
        static PLACE: RecordModel = RecordModel::new("place", &ATTRS, &[]);

        let err = extract_field_descriptors(&PLACE, TrackerOptions::default(), &TransformRegistry::new())
            .expect_err("unregistered type should fail");

        assert_eq!(
            err,
            ConfigError::MissingTransform {
                model: "place".to_string(),
                field: "location".to_string(),
                value_type: "point".to_string(),
            }
        );
    }

    #[test]
    fn excluded_custom_attribute_does_not_need_a_transform() {
        static ATTRS: [AttributeModel; 2] = [
            AttributeModel::new("location", "point"),
            AttributeModel::untyped("extra"),
        ];
        static RELS: [RelationModel; 0] = [];
        static PLACE: RecordModel = RecordModel::new("place", &ATTRS, &RELS);

        let options = TrackerOptions {
            except: Some(vec!["location".to_string()]),
            ..TrackerOptions::default()
        };
        let meta = extract_field_descriptors(&PLACE, options, &TransformRegistry::new())
            .expect("excluded field should not need a transform");

        assert_eq!(meta.keys().collect::<Vec<_>>(), ["extra"]);
    }

    #[test]
    fn registry_resolves_each_type_once() {
        metrics::reset();
        let registry = MetaRegistry::new();
        let transforms = TransformRegistry::new();

        let first = registry
            .get_or_resolve(&USER, &OptionLayer::new(), &transforms)
            .expect("user should resolve");
        let second = registry
            .get_or_resolve(&USER, &OptionLayer::new().set("auto", true), &transforms)
            .expect("cached user should resolve");

        assert!(Rc::ptr_eq(&first, &second), "second call must hit the cache");
        assert!(!second.auto_save(), "cached options are not recomputed");

        let counters = metrics::counters();
        assert_eq!(counters.meta_resolved, 1);
        assert_eq!(counters.meta_cache_hits, 1);
    }

    #[test]
    fn invalidate_forces_recomputation() {
        let registry = MetaRegistry::new();
        let transforms = TransformRegistry::new();

        let first = registry
            .get_or_resolve(&COMPANY, &OptionLayer::new(), &transforms)
            .expect("company should resolve");
        assert!(registry.invalidate(COMPANY.name));
        assert!(!registry.invalidate(COMPANY.name));

        let second = registry
            .get_or_resolve(&COMPANY, &OptionLayer::new().set("auto", true), &transforms)
            .expect("company should resolve again");

        assert!(!Rc::ptr_eq(&first, &second));
        assert!(second.auto_save());
        assert_eq!(first.keys().collect::<Vec<_>>(), second.keys().collect::<Vec<_>>());
    }

    #[test]
    fn setup_errors_are_not_cached() {
        let registry = MetaRegistry::new();
        let err = registry
            .get_or_resolve(
                &USER,
                &OptionLayer::new().set("dude", "where's my car"),
                &TransformRegistry::new(),
            )
            .expect_err("unknown option should fail setup");

        assert_eq!(err.origin, ErrorOrigin::Options);
        assert!(registry.is_empty());
    }
}
