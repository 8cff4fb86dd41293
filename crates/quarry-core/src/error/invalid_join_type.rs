use super::Error;

#[derive(Debug)]
pub(super) struct InvalidJoinType {
    join_type: Box<str>,
}

impl std::error::Error for InvalidJoinType {}

impl core::fmt::Display for InvalidJoinType {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        write!(
            f,
            "invalid join type `{}`; expected INNER, LEFT or RIGHT",
            self.join_type
        )
    }
}

impl Error {
    /// Creates an invalid join type error.
    pub fn invalid_join_type(join_type: impl Into<String>) -> Error {
        Error::from(super::ErrorKind::InvalidJoinType(InvalidJoinType {
            join_type: join_type.into().into(),
        }))
    }

    /// Returns `true` if this error is an invalid join type error.
    pub fn is_invalid_join_type(&self) -> bool {
        self.any_kind(|kind| matches!(kind, super::ErrorKind::InvalidJoinType(_)))
    }
}
