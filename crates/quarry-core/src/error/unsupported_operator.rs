use super::Error;

/// Error when an operator is used where it is not allowed (for example a
/// pattern match on an enum field).
#[derive(Debug)]
pub(super) struct UnsupportedOperator {
    operator: Box<str>,
    target: Box<str>,
}

impl std::error::Error for UnsupportedOperator {}

impl core::fmt::Display for UnsupportedOperator {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        write!(
            f,
            "operator `{}` is not supported for {}",
            self.operator, self.target
        )
    }
}

impl Error {
    /// Creates an unsupported operator error.
    pub fn unsupported_operator(operator: impl Into<String>, target: impl Into<String>) -> Error {
        Error::from(super::ErrorKind::UnsupportedOperator(UnsupportedOperator {
            operator: operator.into().into(),
            target: target.into().into(),
        }))
    }

    /// Returns `true` if this error is an unsupported operator error.
    pub fn is_unsupported_operator(&self) -> bool {
        self.any_kind(|kind| matches!(kind, super::ErrorKind::UnsupportedOperator(_)))
    }
}
