use crate::{
    model::{AttributeModel, RelationModel},
    options::OptionLayer,
};

///
/// RecordModel
/// Static schema description for one record type.
///

#[derive(Debug)]
pub struct RecordModel {
    /// Stable model name; also the key of the metadata registry.
    pub name: &'static str,
    /// Declared attributes, in declaration order.
    pub attributes: &'static [AttributeModel],
    /// Declared associations, in declaration order.
    pub relations: &'static [RelationModel],
    /// Per-type tracker option overrides.
    pub tracker: fn() -> OptionLayer,
}

impl RecordModel {
    /// Build a model with no per-type tracker overrides.
    #[must_use]
    pub const fn new(
        name: &'static str,
        attributes: &'static [AttributeModel],
        relations: &'static [RelationModel],
    ) -> Self {
        Self {
            name,
            attributes,
            relations,
            tracker: OptionLayer::new,
        }
    }

    #[must_use]
    pub const fn with_tracker(mut self, tracker: fn() -> OptionLayer) -> Self {
        self.tracker = tracker;
        self
    }

    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&'static AttributeModel> {
        self.attributes.iter().find(|attr| attr.name == name)
    }

    #[must_use]
    pub fn relation(&self, name: &str) -> Option<&'static RelationModel> {
        self.relations.iter().find(|rel| rel.name == name)
    }

    #[must_use]
    pub fn is_attribute(&self, name: &str) -> bool {
        self.attribute(name).is_some()
    }
}
