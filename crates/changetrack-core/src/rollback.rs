//! Rollback payload construction and application.

use crate::{
    detect::ChangeDetector,
    meta::{TrackedKind, TrackerMeta},
    obs::sink::{self, TrackerEvent},
    record::{RecordSink, RecordSource},
    value::FieldValue,
};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::debug;

///
/// RollbackPayload
///
/// Previous values of the changed tracked fields, keyed by field name, in
/// the shape the host pushes back into the record.
///

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct RollbackPayload {
    pub id: Option<String>,
    #[serde(flatten)]
    pub fields: BTreeMap<String, FieldValue>,
}

impl RollbackPayload {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }
}

/// Collect checkpoint values for every tracked field that currently differs,
/// optionally limited to the named fields. Unchanged fields are left out.
pub fn compute_rollback_payload<R>(
    record: &R,
    detector: &ChangeDetector<'_>,
    fields: Option<&[&str]>,
) -> RollbackPayload
where
    R: RecordSource + ?Sized,
{
    let fields = detector
        .changed_fields(record)
        .into_iter()
        .filter(|field| fields.is_none_or(|subset| subset.contains(&field.name)))
        .filter_map(|field| {
            detector
                .previous_value(record, field.name)
                .map(|value| (field.name.to_string(), value))
        })
        .collect();

    RollbackPayload {
        id: record.id().map(ToString::to_string),
        fields,
    }
}

/// Push a payload into the record. To-many fields in the payload are cleared
/// first; pushing alone only adds members.
///
/// `native` selects native scalar rollback: `None` skips it, `Some(None)`
/// rolls back every native attribute, `Some(Some(field))` just one.
pub fn apply_rollback<R>(
    record: &mut R,
    meta: &TrackerMeta,
    payload: &RollbackPayload,
    native: Option<Option<&str>>,
) where
    R: RecordSink + ?Sized,
{
    if let Some(field) = native {
        record.rollback_native(field);
    }

    for name in payload.fields.keys() {
        if meta
            .field(name)
            .is_some_and(|field| field.kind == TrackedKind::HasMany)
        {
            record.clear_has_many(name);
        }
    }

    if !payload.is_empty() {
        record.push_payload(payload);
    }

    let model = meta.model().name;
    debug!(model, fields = payload.len(), "rolled back tracked fields");
    sink::record(TrackerEvent::Rollback {
        model,
        fields: payload.len(),
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        checkpoint::Checkpoint,
        test_fixtures::{Fixture, USER, user_meta},
    };
    use serde_json::json;

    #[test]
    fn payload_holds_only_changed_fields() {
        let fx = Fixture::new();
        let meta = user_meta();
        let company = fx.make("small-company");
        let mut user = fx.make_record(&USER);
        user.set_attr("info", json!({"dude": 1}));
        user.set_attr("blob", json!({"foo": 1}));
        user.set_one("company", Some(&company));

        let mut checkpoint = Checkpoint::new();
        checkpoint.snapshot(&user, &meta, None);

        user.attr_mut("info")["dude"] = json!(2);
        user.set_one("company", None);

        let detector = ChangeDetector::new(&meta, &checkpoint);
        let payload = compute_rollback_payload(&user, &detector, None);

        assert_eq!(payload.id.as_deref(), user.id());
        assert_eq!(payload.fields.keys().collect::<Vec<_>>(), ["company", "info"]);
        assert_eq!(payload.fields["info"], FieldValue::Attribute(json!({"dude": 1})));
        assert_eq!(payload.fields["company"], FieldValue::One(Some(company)));
    }

    #[test]
    fn payload_can_be_scoped_to_one_field() {
        let fx = Fixture::new();
        let meta = user_meta();
        let mut user = fx.make_record(&USER);

        let mut checkpoint = Checkpoint::new();
        checkpoint.snapshot(&user, &meta, None);
        user.set_attr("info", json!({"a": 1}));
        user.set_attr("blob", json!({"b": 1}));

        let detector = ChangeDetector::new(&meta, &checkpoint);
        let payload = compute_rollback_payload(&user, &detector, Some(&["blob"][..]));

        assert_eq!(payload.fields.keys().collect::<Vec<_>>(), ["blob"]);
    }

    #[test]
    fn payload_serializes_flat() {
        let fx = Fixture::new();
        let meta = user_meta();
        let mut user = fx.make_record(&USER);
        user.set_attr("info", json!({"a": 1}));

        let mut checkpoint = Checkpoint::new();
        checkpoint.snapshot(&user, &meta, None);
        user.set_attr("info", json!({"a": 2}));

        let detector = ChangeDetector::new(&meta, &checkpoint);
        let payload = compute_rollback_payload(&user, &detector, None);

        assert_eq!(
            serde_json::to_value(&payload).expect("payload should serialize"),
            json!({"id": user.id(), "info": {"a": 1}})
        );
    }

    #[test]
    fn apply_resets_has_many_before_pushing() {
        let fx = Fixture::new();
        let meta = user_meta();
        let a = fx.make("project");
        let b = fx.make("project");
        let c = fx.make("project");
        let mut user = fx.make_record(&USER);
        user.set_many("projects", &[a.clone(), b.clone()]);

        let mut checkpoint = Checkpoint::new();
        checkpoint.snapshot(&user, &meta, None);
        user.set_many("projects", &[c]);

        let payload = {
            let detector = ChangeDetector::new(&meta, &checkpoint);
            compute_rollback_payload(&user, &detector, None)
        };
        apply_rollback(&mut user, &meta, &payload, None);

        assert_eq!(user.has_many("projects"), Some(vec![a, b]));
        assert!(
            !ChangeDetector::new(&meta, &checkpoint).did_change(&user, "projects", None),
            "projects should match the checkpoint again"
        );
    }

    #[test]
    fn rollback_to_empty_clears_members() {
        let fx = Fixture::new();
        let meta = user_meta();
        let cat = fx.make("cat");
        let mut user = fx.make_record(&USER);

        let mut checkpoint = Checkpoint::new();
        checkpoint.snapshot(&user, &meta, None);
        user.set_many("pets", &[cat]);

        let payload = {
            let detector = ChangeDetector::new(&meta, &checkpoint);
            compute_rollback_payload(&user, &detector, None)
        };
        assert_eq!(payload.fields["pets"], FieldValue::Many(Vec::new()));

        apply_rollback(&mut user, &meta, &payload, None);
        assert_eq!(user.has_many("pets"), Some(Vec::new()));
    }

    #[test]
    fn native_rollback_is_delegated_to_the_host() {
        let fx = Fixture::new();
        let meta = user_meta();
        let mut user = fx.make_record(&USER);
        user.set_attr("name", json!("Ann"));
        user.commit();
        user.set_attr("name", json!("Bob"));

        apply_rollback(&mut user, &meta, &RollbackPayload::default(), Some(None));

        assert_eq!(user.attribute("name"), json!("Ann"));
    }
}
