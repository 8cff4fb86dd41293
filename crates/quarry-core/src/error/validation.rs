use super::Error;

/// Error when a value fails coercion or a data constraint (missing required
/// field, decimal scale, enum membership).
#[derive(Debug)]
pub(super) struct ValidationError {
    message: Box<str>,
}

impl std::error::Error for ValidationError {}

impl core::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        write!(f, "validation failed: {}", self.message)
    }
}

impl Error {
    /// Creates a validation error.
    pub fn validation(message: impl Into<String>) -> Error {
        Error::from(super::ErrorKind::Validation(ValidationError {
            message: message.into().into(),
        }))
    }

    /// Returns `true` if this error is a validation error.
    pub fn is_validation(&self) -> bool {
        self.any_kind(|kind| matches!(kind, super::ErrorKind::Validation(_)))
    }
}
