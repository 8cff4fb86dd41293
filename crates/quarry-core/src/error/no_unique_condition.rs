use super::Error;

/// Error when a unique lookup has no primary or unique field in its `where`.
#[derive(Debug)]
pub(super) struct NoUniqueCondition {
    model: Box<str>,
}

impl std::error::Error for NoUniqueCondition {}

impl core::fmt::Display for NoUniqueCondition {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        write!(
            f,
            "no primary or unique field in `where` for model `{}`",
            self.model
        )
    }
}

impl Error {
    /// Creates a no unique condition error.
    pub fn no_unique_condition(model: impl Into<String>) -> Error {
        Error::from(super::ErrorKind::NoUniqueCondition(NoUniqueCondition {
            model: model.into().into(),
        }))
    }

    /// Returns `true` if this error is a no unique condition error.
    pub fn is_no_unique_condition(&self) -> bool {
        self.any_kind(|kind| matches!(kind, super::ErrorKind::NoUniqueCondition(_)))
    }
}
