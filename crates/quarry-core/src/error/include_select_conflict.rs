use super::Error;

/// Error when `select` and `include` are requested for the same node.
#[derive(Debug)]
pub(super) struct IncludeSelectConflict {
    context: Box<str>,
}

impl std::error::Error for IncludeSelectConflict {}

impl core::fmt::Display for IncludeSelectConflict {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        write!(
            f,
            "`select` and `include` cannot be used together: {}",
            self.context
        )
    }
}

impl Error {
    /// Creates an include/select conflict error for the named call site.
    pub fn include_select_conflict(context: impl Into<String>) -> Error {
        Error::from(super::ErrorKind::IncludeSelectConflict(
            IncludeSelectConflict {
                context: context.into().into(),
            },
        ))
    }

    /// Returns `true` if this error is an include/select conflict.
    pub fn is_include_select_conflict(&self) -> bool {
        self.any_kind(|kind| matches!(kind, super::ErrorKind::IncludeSelectConflict(_)))
    }
}
