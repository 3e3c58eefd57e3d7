///
/// AttributeModel
/// One declared attribute on a record type.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct AttributeModel {
    /// Attribute key as used by the record framework.
    pub name: &'static str,
    /// Declared value type (drives transform lookup); `None` when untyped.
    pub value_type: Option<&'static str>,
}

impl AttributeModel {
    #[must_use]
    pub const fn new(name: &'static str, value_type: &'static str) -> Self {
        Self {
            name,
            value_type: Some(value_type),
        }
    }

    #[must_use]
    pub const fn untyped(name: &'static str) -> Self {
        Self {
            name,
            value_type: None,
        }
    }
}

///
/// RelationKind
///

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum RelationKind {
    BelongsTo,
    HasMany,
}

///
/// RelationModel
///
/// One declared association. `target` names the related record type; for
/// polymorphic associations it is only the base type and identity must carry
/// the concrete type alongside the id.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct RelationModel {
    pub name: &'static str,
    pub kind: RelationKind,
    pub target: &'static str,
    pub polymorphic: bool,
}

impl RelationModel {
    #[must_use]
    pub const fn belongs_to(name: &'static str, target: &'static str) -> Self {
        Self {
            name,
            kind: RelationKind::BelongsTo,
            target,
            polymorphic: false,
        }
    }

    #[must_use]
    pub const fn has_many(name: &'static str, target: &'static str) -> Self {
        Self {
            name,
            kind: RelationKind::HasMany,
            target,
            polymorphic: false,
        }
    }

    #[must_use]
    pub const fn polymorphic(mut self) -> Self {
        self.polymorphic = true;
        self
    }
}
