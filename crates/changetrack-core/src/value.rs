//! Checkpoint and live value shapes.

use crate::record::RelatedRecord;
use serde::{Serialize, Serializer, ser::SerializeStruct};
use serde_json::Value;

///
/// RecordRef
///
/// Frozen identity of a related record. `model` is present only for
/// polymorphic associations; otherwise the schema fixes the type.
///

#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct RecordRef {
    pub id: String,
    pub model: Option<String>,
}

impl RecordRef {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            model: None,
        }
    }

    #[must_use]
    pub fn typed(id: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            model: Some(model.into()),
        }
    }

    /// Freeze a live related record, keeping its type only when the
    /// association is polymorphic.
    #[must_use]
    pub fn from_related(related: &RelatedRecord, polymorphic: bool) -> Self {
        if polymorphic {
            Self::typed(related.id.clone(), related.model.clone())
        } else {
            Self::new(related.id.clone())
        }
    }
}

// Bare id for fixed-type references, `{id, type}` for polymorphic ones.
impl Serialize for RecordRef {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match &self.model {
            None => serializer.serialize_str(&self.id),
            Some(model) => {
                let mut state = serializer.serialize_struct("RecordRef", 2)?;
                state.serialize_field("id", &self.id)?;
                state.serialize_field("type", model)?;
                state.end()
            }
        }
    }
}

///
/// SerializedValue
///
/// Stable comparison form of one tracked field. Attributes are always text so
/// that in-place mutation of a live object cannot leak into the checkpoint.
///

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SerializedValue {
    /// No related record / no members.
    Null,
    Text(String),
    One(RecordRef),
    Many(Vec<RecordRef>),
}

impl SerializedValue {
    /// Whether this value belongs to the single "blank" class: null, empty
    /// text, and JSON text for `null`, `[]`, or `{}`.
    #[must_use]
    pub fn is_blank(&self) -> bool {
        match self {
            Self::Null => true,
            Self::Text(text) => is_blank_text(text),
            Self::One(_) => false,
            Self::Many(members) => members.is_empty(),
        }
    }

    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_one(&self) -> Option<&RecordRef> {
        match self {
            Self::One(reference) => Some(reference),
            _ => None,
        }
    }

    /// Members of a to-many value; blank values yield an empty slice.
    #[must_use]
    pub fn members(&self) -> &[RecordRef] {
        match self {
            Self::Many(members) => members,
            Self::One(reference) => std::slice::from_ref(reference),
            Self::Null | Self::Text(_) => &[],
        }
    }
}

/// Blank test for an optional checkpoint value; absent counts as blank.
#[must_use]
pub fn is_blank(value: Option<&SerializedValue>) -> bool {
    value.is_none_or(SerializedValue::is_blank)
}

fn is_blank_text(text: &str) -> bool {
    matches!(text, "" | "null" | "[]" | "{}")
}

///
/// FieldValue
///
/// Live (or rebuilt) value of one field, as handed to and from the record
/// framework.
///

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    Attribute(Value),
    One(Option<RelatedRecord>),
    Many(Vec<RelatedRecord>),
}

impl FieldValue {
    #[must_use]
    pub const fn as_attribute(&self) -> Option<&Value> {
        match self {
            Self::Attribute(value) => Some(value),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_one(&self) -> Option<&RelatedRecord> {
        match self {
            Self::One(related) => related.as_ref(),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_many(&self) -> &[RelatedRecord] {
        match self {
            Self::Many(members) => members,
            _ => &[],
        }
    }
}
