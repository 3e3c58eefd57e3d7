//! Declarative record schemas.
//!
//! Every tracked record type supplies one static [`RecordModel`] listing its
//! attributes and relationships. The introspector reads these lists instead of
//! reflecting over live records, so the engine never inspects runtime types.
//!
//! In general:
//! - `model` defines *what exists*
//! - `meta` defines *what is tracked*
mod field;
mod record;

pub use field::{AttributeModel, RelationKind, RelationModel};
pub use record::RecordModel;
