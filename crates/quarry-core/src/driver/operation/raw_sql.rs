use super::Operation;

use crate::stmt::Value;

/// SQL text written by the caller, using the dialect's own placeholders.
#[derive(Debug, Clone)]
pub struct RawSql {
    pub sql: String,
    pub params: Vec<Value>,
    pub returns_rows: bool,
}

impl From<RawSql> for Operation {
    fn from(value: RawSql) -> Self {
        Self::Raw(value)
    }
}
