use super::Error;

/// Error when a nested write had to produce a related record and did not.
#[derive(Debug)]
pub(super) struct RelationProcessingFailed {
    relation: Box<str>,
}

impl std::error::Error for RelationProcessingFailed {}

impl core::fmt::Display for RelationProcessingFailed {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        write!(
            f,
            "failed to process related record for `{}`",
            self.relation
        )
    }
}

impl Error {
    /// Creates a relation processing failure for the named relation field.
    pub fn relation_processing_failed(relation: impl Into<String>) -> Error {
        Error::from(super::ErrorKind::RelationProcessingFailed(
            RelationProcessingFailed {
                relation: relation.into().into(),
            },
        ))
    }

    /// Returns `true` if this error is a relation processing failure.
    pub fn is_relation_processing_failed(&self) -> bool {
        self.any_kind(|kind| matches!(kind, super::ErrorKind::RelationProcessingFailed(_)))
    }
}
