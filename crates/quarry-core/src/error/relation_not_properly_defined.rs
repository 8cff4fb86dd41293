use super::Error;

/// Error when a relation's key lists cannot be paired up.
#[derive(Debug)]
pub(super) struct RelationNotProperlyDefined {
    model: Box<str>,
    relation: Box<str>,
}

impl std::error::Error for RelationNotProperlyDefined {}

impl core::fmt::Display for RelationNotProperlyDefined {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        write!(
            f,
            "relation `{}.{}` is not properly defined; `from` and `to` keys must match",
            self.model, self.relation
        )
    }
}

impl Error {
    pub fn relation_not_properly_defined(
        model: impl Into<String>,
        relation: impl Into<String>,
    ) -> Error {
        Error::from(super::ErrorKind::RelationNotProperlyDefined(
            RelationNotProperlyDefined {
                model: model.into().into(),
                relation: relation.into().into(),
            },
        ))
    }

    pub fn is_relation_not_properly_defined(&self) -> bool {
        self.any_kind(|kind| matches!(kind, super::ErrorKind::RelationNotProperlyDefined(_)))
    }
}
