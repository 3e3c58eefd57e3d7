//! Boundary with the host record framework.
//!
//! The engine never owns persistence, identity maps, or network I/O. A host
//! framework exposes its records through [`RecordSource`] (reads) and
//! [`RecordSink`] (the writes rollback needs), and reports lifecycle events
//! through [`Lifecycle`].

use crate::{model::RecordModel, rollback::RollbackPayload};
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;

/// Native scalar diff reported by the host: field → (previous, current).
pub type NativeChanges = BTreeMap<String, (Value, Value)>;

///
/// RelatedRecord
/// Live identity of a record reachable through an association.
///

#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub struct RelatedRecord {
    #[serde(rename = "type")]
    pub model: String,
    pub id: String,
}

impl RelatedRecord {
    #[must_use]
    pub fn new(model: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            id: id.into(),
        }
    }
}

///
/// RecordSource
///
/// Read access to one live record. Association accessors must report the
/// currently linked identities without loading anything.
///

pub trait RecordSource {
    fn model(&self) -> &'static RecordModel;

    /// Record id; `None` until the host assigns one.
    fn id(&self) -> Option<&str>;

    /// Whether the record has never been persisted.
    fn is_new(&self) -> bool;

    /// Current attribute value; `Value::Null` when unset.
    fn attribute(&self, name: &str) -> Value;

    fn belongs_to(&self, name: &str) -> Option<RelatedRecord>;

    /// Current members in iteration order; `None` when the association was
    /// never populated.
    fn has_many(&self, name: &str) -> Option<Vec<RelatedRecord>>;

    /// Scalar changes the host already detects on its own.
    fn changed_attributes(&self) -> NativeChanges;

    /// Look a record up in the host's local cache, without fetching.
    fn peek_record(&self, model: &str, id: &str) -> Option<RelatedRecord>;
}

///
/// RecordSink
/// Writes used to restore a record to its checkpoint.
///

pub trait RecordSink: RecordSource {
    /// Remove every member from a to-many association.
    fn clear_has_many(&mut self, name: &str);

    /// Normalize and push a payload into the record, as if it came from the
    /// server.
    fn push_payload(&mut self, payload: &RollbackPayload);

    /// The host's own scalar rollback, for one field or all of them.
    fn rollback_native(&mut self, field: Option<&str>);
}

///
/// Lifecycle
///
/// Host lifecycle events. Each is delivered only after the host's own
/// asynchronous work has settled.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Lifecycle {
    /// First materialization from the server or a push.
    Loaded,
    Reloaded,
    Created,
    Updated,
    /// An explicit save completed through the integration layer.
    Saved,
    Deleted,
}
