use super::Error;

#[derive(Debug)]
pub(super) struct MultipleConnectOnSingularRelation {
    relation: Box<str>,
    action: Box<str>,
}

impl std::error::Error for MultipleConnectOnSingularRelation {}

impl core::fmt::Display for MultipleConnectOnSingularRelation {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        write!(
            f,
            "multiple `{}` operations are not allowed on singular relation `{}`",
            self.action, self.relation
        )
    }
}

impl Error {
    /// Creates an error for a list payload given to a to-one relation's
    /// `connect`, `create` or `connectOrCreate`.
    pub fn multiple_connect_on_singular_relation(
        relation: impl Into<String>,
        action: impl Into<String>,
    ) -> Error {
        Error::from(super::ErrorKind::MultipleConnectOnSingularRelation(
            MultipleConnectOnSingularRelation {
                relation: relation.into().into(),
                action: action.into().into(),
            },
        ))
    }

    pub fn is_multiple_connect_on_singular_relation(&self) -> bool {
        self.any_kind(|kind| {
            matches!(
                kind,
                super::ErrorKind::MultipleConnectOnSingularRelation(_)
            )
        })
    }
}
