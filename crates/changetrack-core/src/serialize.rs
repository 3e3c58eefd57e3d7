//! Field-level freeze and thaw between live records and checkpoint values.

use crate::{
    meta::FieldDescriptor,
    record::{RecordSource, RelatedRecord},
    transform::{FieldCodec, Transform},
    value::{FieldValue, RecordRef, SerializedValue},
};
use serde_json::Value;

/// Freeze the current value of one tracked field.
pub fn serialize_field<R>(record: &R, field: &FieldDescriptor) -> SerializedValue
where
    R: RecordSource + ?Sized,
{
    match &field.codec {
        FieldCodec::Attribute(transform) => {
            serialize_attribute(transform.as_ref(), &record.attribute(field.name))
        }
        FieldCodec::BelongsTo => record.belongs_to(field.name).map_or(SerializedValue::Null, |related| {
            SerializedValue::One(RecordRef::from_related(&related, field.polymorphic))
        }),
        FieldCodec::HasMany => match record.has_many(field.name) {
            None => SerializedValue::Null,
            Some(members) => SerializedValue::Many(
                members
                    .iter()
                    .map(|related| RecordRef::from_related(related, field.polymorphic))
                    .collect(),
            ),
        },
    }
}

/// Run an attribute value through its transform and freeze it as text.
/// Transforms may return structured values; those are JSON-encoded.
#[must_use]
pub fn serialize_attribute(transform: &dyn Transform, value: &Value) -> SerializedValue {
    match transform.serialize(value) {
        Value::String(text) => SerializedValue::Text(text),
        other => SerializedValue::Text(other.to_string()),
    }
}

/// Rebuild a live value from a checkpoint value. Absent checkpoints rebuild
/// to the empty value of the field's kind; related records the host no
/// longer holds are dropped.
pub fn deserialize_field<R>(
    record: &R,
    field: &FieldDescriptor,
    saved: Option<&SerializedValue>,
) -> FieldValue
where
    R: RecordSource + ?Sized,
{
    match &field.codec {
        FieldCodec::Attribute(transform) => FieldValue::Attribute(match saved {
            Some(SerializedValue::Text(text)) => transform.deserialize(&Value::String(text.clone())),
            _ => Value::Null,
        }),
        FieldCodec::BelongsTo => FieldValue::One(
            saved
                .and_then(SerializedValue::as_one)
                .and_then(|reference| resolve(record, field, reference)),
        ),
        FieldCodec::HasMany => FieldValue::Many(
            saved
                .map(SerializedValue::members)
                .unwrap_or_default()
                .iter()
                .filter_map(|reference| resolve(record, field, reference))
                .collect(),
        ),
    }
}

/// Read the current value of one tracked field without freezing it.
pub fn current_field<R>(record: &R, field: &FieldDescriptor) -> FieldValue
where
    R: RecordSource + ?Sized,
{
    match &field.codec {
        FieldCodec::Attribute(_) => FieldValue::Attribute(record.attribute(field.name)),
        FieldCodec::BelongsTo => FieldValue::One(record.belongs_to(field.name)),
        FieldCodec::HasMany => FieldValue::Many(record.has_many(field.name).unwrap_or_default()),
    }
}

fn resolve<R>(record: &R, field: &FieldDescriptor, reference: &RecordRef) -> Option<RelatedRecord>
where
    R: RecordSource + ?Sized,
{
    let model = reference.model.as_deref().or(field.target)?;

    record.peek_record(model, &reference.id)
}
