use super::Error;

/// Error when a criteria object carries a key the verb does not accept.
#[derive(Debug)]
pub(super) struct UnknownCriteriaKey {
    context: Box<str>,
    key: Box<str>,
    expected: Box<str>,
}

impl std::error::Error for UnknownCriteriaKey {}

impl core::fmt::Display for UnknownCriteriaKey {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        write!(
            f,
            "unknown key `{}` for `{}`; expected one of: {}",
            self.key, self.context, self.expected
        )
    }
}

impl Error {
    /// Creates an unknown criteria key error. `allowed` lists the keys the
    /// verb accepts.
    pub fn unknown_criteria_key(
        context: impl Into<String>,
        key: impl Into<String>,
        allowed: &[&str],
    ) -> Error {
        Error::from(super::ErrorKind::UnknownCriteriaKey(UnknownCriteriaKey {
            context: context.into().into(),
            key: key.into().into(),
            expected: allowed.join(", ").into(),
        }))
    }

    /// Returns `true` if this error is an unknown criteria key error.
    pub fn is_unknown_criteria_key(&self) -> bool {
        self.any_kind(|kind| matches!(kind, super::ErrorKind::UnknownCriteriaKey(_)))
    }
}
