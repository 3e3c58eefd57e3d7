//! Serialization strategies for tracked attributes.
//!
//! A transform turns a live attribute value into something that can be frozen
//! into a checkpoint and later turned back into a live value. Relationship
//! fields never go through a transform; their identity is read directly from
//! the record (see [`FieldCodec`]).

mod builtin;

pub use builtin::{JsonTransform, ObjectTransform};

use crate::model::RelationKind;
use serde_json::Value;
use std::{collections::HashMap, fmt, rc::Rc};

/// Type name used for attributes declared without a type.
pub const DEFAULT_TRANSFORM: &str = "object";

///
/// Transform
///

pub trait Transform {
    /// Convert a live value into its checkpoint form.
    fn serialize(&self, value: &Value) -> Value;

    /// Rebuild a live value from its checkpoint form.
    fn deserialize(&self, serialized: &Value) -> Value;
}

///
/// FieldCodec
///
/// How one tracked field is read and rebuilt.
///

#[derive(Clone)]
pub enum FieldCodec {
    Attribute(Rc<dyn Transform>),
    BelongsTo,
    HasMany,
}

impl fmt::Debug for FieldCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Attribute(_) => f.write_str("Attribute(..)"),
            Self::BelongsTo => f.write_str("BelongsTo"),
            Self::HasMany => f.write_str("HasMany"),
        }
    }
}

/// Whether the record framework already diffs this declared type natively.
///
/// Matches any type name containing `string`, `boolean` or `date`, and the
/// exact name `number`.
#[must_use]
pub fn is_natively_tracked(value_type: &str) -> bool {
    value_type.contains("string")
        || value_type.contains("boolean")
        || value_type.contains("date")
        || value_type == "number"
}

///
/// TransformRegistry
/// Named attribute transforms, seeded with `object` and `json`.
///

#[derive(Clone)]
pub struct TransformRegistry {
    transforms: HashMap<String, Rc<dyn Transform>>,
}

impl TransformRegistry {
    /// Create a registry holding the built-in transforms.
    #[must_use]
    pub fn new() -> Self {
        let mut registry = Self::empty();
        registry.register(DEFAULT_TRANSFORM, ObjectTransform);
        registry.register("json", JsonTransform);
        registry
    }

    /// Create a registry with nothing registered.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            transforms: HashMap::new(),
        }
    }

    /// Register (or replace) the transform for a declared type name.
    pub fn register(&mut self, name: impl Into<String>, transform: impl Transform + 'static) {
        self.transforms.insert(name.into(), Rc::new(transform));
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<Rc<dyn Transform>> {
        self.transforms.get(name).cloned()
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.transforms.contains_key(name)
    }

    /// Resolve the transform for an attribute's declared type.
    /// Untyped attributes use the `object` transform.
    #[must_use]
    pub fn attribute(&self, value_type: Option<&str>) -> Option<Rc<dyn Transform>> {
        self.get(value_type.unwrap_or(DEFAULT_TRANSFORM))
    }

    /// Resolve the codec for a field: attributes by declared type,
    /// relationships by kind.
    #[must_use]
    pub fn lookup(&self, relation: Option<RelationKind>, value_type: Option<&str>) -> Option<FieldCodec> {
        match relation {
            Some(RelationKind::BelongsTo) => Some(FieldCodec::BelongsTo),
            Some(RelationKind::HasMany) => Some(FieldCodec::HasMany),
            None => self.attribute(value_type).map(FieldCodec::Attribute),
        }
    }
}

impl Default for TransformRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for TransformRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&str> = self.transforms.keys().map(String::as_str).collect();
        names.sort_unstable();
        f.debug_struct("TransformRegistry")
            .field("transforms", &names)
            .finish()
    }
}

///
/// TESTS
///
