use super::Error;

/// Error when a criteria object has the wrong shape (for example `where` is
/// not an object or `take` is not an integer).
#[derive(Debug)]
pub(super) struct InvalidCriteria {
    message: Box<str>,
}

impl std::error::Error for InvalidCriteria {}

impl core::fmt::Display for InvalidCriteria {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        write!(f, "invalid criteria: {}", self.message)
    }
}

impl Error {
    /// Creates an invalid criteria error.
    pub fn invalid_criteria(message: impl Into<String>) -> Error {
        Error::from(super::ErrorKind::InvalidCriteria(InvalidCriteria {
            message: message.into().into(),
        }))
    }

    /// Returns `true` if this error is an invalid criteria error.
    pub fn is_invalid_criteria(&self) -> bool {
        self.any_kind(|kind| matches!(kind, super::ErrorKind::InvalidCriteria(_)))
    }
}
