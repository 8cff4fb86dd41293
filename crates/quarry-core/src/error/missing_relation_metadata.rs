use super::Error;

/// Error when a relation is requested that the model does not describe.
#[derive(Debug)]
pub(super) struct MissingRelationMetadata {
    model: Box<str>,
    relation: Box<str>,
}

impl std::error::Error for MissingRelationMetadata {}

impl core::fmt::Display for MissingRelationMetadata {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        write!(
            f,
            "relation metadata not defined for `{}.{}`",
            self.model, self.relation
        )
    }
}

impl Error {
    /// Creates a missing relation metadata error.
    pub fn missing_relation_metadata(
        model: impl Into<String>,
        relation: impl Into<String>,
    ) -> Error {
        Error::from(super::ErrorKind::MissingRelationMetadata(
            MissingRelationMetadata {
                model: model.into().into(),
                relation: relation.into().into(),
            },
        ))
    }

    /// Returns `true` if this error is a missing relation metadata error.
    pub fn is_missing_relation_metadata(&self) -> bool {
        self.any_kind(|kind| matches!(kind, super::ErrorKind::MissingRelationMetadata(_)))
    }
}
