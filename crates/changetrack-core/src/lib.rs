//! Core runtime for changetrack: schema models, transforms, option
//! resolution, checkpoints, change detection, dirtiness, rollback, and the
//! record-integration wrapper exported via the `prelude`.
#![warn(unreachable_pub)]

// public exports are one module level down
pub mod checkpoint;
pub mod detect;
pub mod dirty;
pub mod error;
pub mod filter;
pub mod memory;
pub mod meta;
pub mod model;
pub mod obs;
pub mod options;
pub mod record;
pub mod rollback;
pub mod serialize;
pub mod tracked;
pub mod transform;
pub mod value;

// test
#[cfg(test)]
pub(crate) mod test_fixtures;

///
/// Prelude
///
/// Prelude contains only domain vocabulary.
/// No errors, sinks, or helpers are re-exported here.
///

pub mod prelude {
    pub use crate::{
        model::{AttributeModel, RecordModel, RelationKind, RelationModel},
        options::OptionLayer,
        record::{Lifecycle, RecordSink, RecordSource, RelatedRecord},
        tracked::{SaveOptions, Tracked, TrackerRuntime},
        value::{FieldValue, RecordRef, SerializedValue},
    };
}
