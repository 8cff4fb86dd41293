mod adhoc;
mod driver_operation_failed;
mod include_select_conflict;
mod invalid_connection_url;
mod invalid_criteria;
mod invalid_join_type;
mod invalid_schema;
mod missing_relation_metadata;
mod multiple_connect_on_singular_relation;
mod no_unique_condition;
mod record_not_found;
mod relation_not_properly_defined;
mod relation_processing_failed;
mod unknown_criteria_key;
mod unknown_field;
mod unsupported_condition;
mod unsupported_operator;
mod validation;

use adhoc::AdhocError;
use driver_operation_failed::DriverOperationFailed;
use include_select_conflict::IncludeSelectConflict;
use invalid_connection_url::InvalidConnectionUrl;
use invalid_criteria::InvalidCriteria;
use invalid_join_type::InvalidJoinType;
use invalid_schema::InvalidSchema;
use missing_relation_metadata::MissingRelationMetadata;
use multiple_connect_on_singular_relation::MultipleConnectOnSingularRelation;
use no_unique_condition::NoUniqueCondition;
use record_not_found::RecordNotFound;
use relation_not_properly_defined::RelationNotProperlyDefined;
use relation_processing_failed::RelationProcessingFailed;
use std::sync::Arc;
use unknown_criteria_key::UnknownCriteriaKey;
use unknown_field::UnknownField;
use unsupported_condition::UnsupportedCondition;
use unsupported_operator::UnsupportedOperator;
use validation::ValidationError;

/// Returns early with an ad-hoc error built from a format string.
#[macro_export]
macro_rules! bail {
    ($($arg:tt)*) => {
        return Err($crate::Error::from_args(format_args!($($arg)*)))
    };
}

/// Builds an ad-hoc error from a format string.
#[macro_export]
macro_rules! err {
    ($($arg:tt)*) => {
        $crate::Error::from_args(format_args!($($arg)*))
    };
}

/// An error that can occur in Quarry.
#[derive(Clone)]
pub struct Error {
    inner: Option<Arc<ErrorInner>>,
}

#[derive(Debug)]
struct ErrorInner {
    kind: ErrorKind,
    cause: Option<Error>,
}

impl Error {
    /// Adds context to this error.
    ///
    /// Context is displayed in reverse order: the most recently added context is shown first,
    /// followed by earlier context, ending with the root cause.
    #[inline(always)]
    pub fn context(self, consequent: impl IntoError) -> Error {
        self.context_impl(consequent.into_error())
    }

    #[inline(never)]
    #[cold]
    fn context_impl(self, consequent: Error) -> Error {
        let mut err = consequent;
        if err.inner.is_none() {
            err = Error::from(ErrorKind::Unknown);
        }

        match err.inner.as_mut().and_then(Arc::get_mut) {
            Some(inner) if inner.cause.is_none() => {
                inner.cause = Some(self);
                err
            }
            // The consequent is shared or already chained; wrap it instead.
            _ => Error {
                inner: Some(Arc::new(ErrorInner {
                    kind: ErrorKind::Adhoc(AdhocError::new(err.to_string())),
                    cause: Some(self),
                })),
            },
        }
    }

    fn chain(&self) -> impl Iterator<Item = &Error> {
        let mut err = self;
        core::iter::once(err).chain(core::iter::from_fn(move || {
            err = err.inner.as_ref().and_then(|inner| inner.cause.as_ref())?;
            Some(err)
        }))
    }

    /// The innermost error of the context chain.
    pub fn root(&self) -> &Error {
        let mut root = self;
        for err in self.chain() {
            root = err;
        }
        root
    }

    fn kind(&self) -> &ErrorKind {
        self.inner
            .as_ref()
            .map(|inner| &inner.kind)
            .unwrap_or(&ErrorKind::Unknown)
    }

    /// Returns `true` if this error, or any error in its context chain,
    /// satisfies `f`.
    fn any_kind(&self, f: impl Fn(&ErrorKind) -> bool) -> bool {
        self.chain().any(|err| f(err.kind()))
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self.kind() {
            ErrorKind::DriverOperationFailed(err) => Some(err),
            _ => None,
        }
    }
}

impl core::fmt::Display for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        let mut it = self.chain().peekable();
        while let Some(err) = it.next() {
            core::fmt::Display::fmt(err.kind(), f)?;
            if it.peek().is_some() {
                f.write_str(": ")?;
            }
        }
        Ok(())
    }
}

impl core::fmt::Debug for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        if !f.alternate() {
            core::fmt::Display::fmt(self, f)
        } else {
            let Some(ref inner) = self.inner else {
                return f.debug_struct("Error").field("kind", &"None").finish();
            };
            f.debug_struct("Error")
                .field("kind", &inner.kind)
                .field("cause", &inner.cause)
                .finish()
        }
    }
}

#[derive(Debug)]
enum ErrorKind {
    Adhoc(AdhocError),
    DriverOperationFailed(DriverOperationFailed),
    IncludeSelectConflict(IncludeSelectConflict),
    InvalidConnectionUrl(InvalidConnectionUrl),
    InvalidCriteria(InvalidCriteria),
    InvalidJoinType(InvalidJoinType),
    InvalidSchema(InvalidSchema),
    MissingRelationMetadata(MissingRelationMetadata),
    MultipleConnectOnSingularRelation(MultipleConnectOnSingularRelation),
    NoUniqueCondition(NoUniqueCondition),
    RecordNotFound(RecordNotFound),
    RelationNotProperlyDefined(RelationNotProperlyDefined),
    RelationProcessingFailed(RelationProcessingFailed),
    UnknownCriteriaKey(UnknownCriteriaKey),
    UnknownField(UnknownField),
    UnsupportedCondition(UnsupportedCondition),
    UnsupportedOperator(UnsupportedOperator),
    Validation(ValidationError),
    Unknown,
}

impl core::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        use self::ErrorKind::*;

        match self {
            Adhoc(err) => core::fmt::Display::fmt(err, f),
            DriverOperationFailed(err) => core::fmt::Display::fmt(err, f),
            IncludeSelectConflict(err) => core::fmt::Display::fmt(err, f),
            InvalidConnectionUrl(err) => core::fmt::Display::fmt(err, f),
            InvalidCriteria(err) => core::fmt::Display::fmt(err, f),
            InvalidJoinType(err) => core::fmt::Display::fmt(err, f),
            InvalidSchema(err) => core::fmt::Display::fmt(err, f),
            MissingRelationMetadata(err) => core::fmt::Display::fmt(err, f),
            MultipleConnectOnSingularRelation(err) => core::fmt::Display::fmt(err, f),
            NoUniqueCondition(err) => core::fmt::Display::fmt(err, f),
            RecordNotFound(err) => core::fmt::Display::fmt(err, f),
            RelationNotProperlyDefined(err) => core::fmt::Display::fmt(err, f),
            RelationProcessingFailed(err) => core::fmt::Display::fmt(err, f),
            UnknownCriteriaKey(err) => core::fmt::Display::fmt(err, f),
            UnknownField(err) => core::fmt::Display::fmt(err, f),
            UnsupportedCondition(err) => core::fmt::Display::fmt(err, f),
            UnsupportedOperator(err) => core::fmt::Display::fmt(err, f),
            Validation(err) => core::fmt::Display::fmt(err, f),
            Unknown => f.write_str("unknown quarry error"),
        }
    }
}

impl From<ErrorKind> for Error {
    fn from(kind: ErrorKind) -> Error {
        Error {
            inner: Some(Arc::new(ErrorInner { kind, cause: None })),
        }
    }
}

/// Trait for types that can be converted into an Error.
pub trait IntoError {
    /// Converts this type into an Error.
    fn into_error(self) -> Error;
}

impl IntoError for Error {
    #[inline(always)]
    fn into_error(self) -> Error {
        self
    }
}

impl IntoError for &str {
    fn into_error(self) -> Error {
        Error::from(ErrorKind::Adhoc(AdhocError::new(self)))
    }
}

impl IntoError for String {
    fn into_error(self) -> Error {
        Error::from(ErrorKind::Adhoc(AdhocError::new(self)))
    }
}
