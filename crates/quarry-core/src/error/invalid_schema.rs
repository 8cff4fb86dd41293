use super::Error;

/// Error when a schema document is invalid.
///
/// This occurs when:
/// - The document is not valid JSON or misses required keys
/// - A relation's `from` and `to` key lists differ in length
/// - A scalar field carries relation keys
/// - A field references an unknown type
#[derive(Debug)]
pub(super) struct InvalidSchema {
    message: Box<str>,
}

impl std::error::Error for InvalidSchema {}

impl core::fmt::Display for InvalidSchema {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        write!(f, "invalid schema: {}", self.message)
    }
}

impl Error {
    /// Creates an invalid schema error.
    pub fn invalid_schema(message: impl Into<String>) -> Error {
        Error::from(super::ErrorKind::InvalidSchema(InvalidSchema {
            message: message.into().into(),
        }))
    }

    /// Returns `true` if this error is an invalid schema error.
    pub fn is_invalid_schema(&self) -> bool {
        self.any_kind(|kind| matches!(kind, super::ErrorKind::InvalidSchema(_)))
    }
}
