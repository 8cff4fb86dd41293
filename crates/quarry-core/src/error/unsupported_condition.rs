use super::Error;

#[derive(Debug)]
pub(super) struct UnsupportedCondition {
    message: Box<str>,
}

impl std::error::Error for UnsupportedCondition {}

impl core::fmt::Display for UnsupportedCondition {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        write!(f, "unsupported condition: {}", self.message)
    }
}

impl Error {
    /// Creates an unsupported condition error, raised for condition keys
    /// that are neither operators nor fields in operator position.
    pub fn unsupported_condition(message: impl Into<String>) -> Error {
        Error::from(super::ErrorKind::UnsupportedCondition(UnsupportedCondition {
            message: message.into().into(),
        }))
    }

    /// Returns `true` if this error is an unsupported condition error.
    pub fn is_unsupported_condition(&self) -> bool {
        self.any_kind(|kind| matches!(kind, super::ErrorKind::UnsupportedCondition(_)))
    }
}
