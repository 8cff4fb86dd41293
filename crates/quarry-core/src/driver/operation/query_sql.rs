use super::Operation;

use crate::stmt::Sql;

#[derive(Debug, Clone)]
pub struct QuerySql {
    /// The SQL statement to execute
    pub stmt: Sql,

    /// When true the statement produces rows (`SELECT`, `RETURNING`);
    /// otherwise the affected row count is returned.
    pub returns_rows: bool,

    /// Report the auto-increment id generated by the statement. Only
    /// consulted by drivers without `RETURNING` support.
    pub last_insert_id: bool,
}

impl QuerySql {
    pub fn query(stmt: Sql) -> QuerySql {
        QuerySql {
            stmt,
            returns_rows: true,
            last_insert_id: false,
        }
    }

    pub fn execute(stmt: Sql) -> QuerySql {
        QuerySql {
            stmt,
            returns_rows: false,
            last_insert_id: false,
        }
    }
}

impl From<QuerySql> for Operation {
    fn from(value: QuerySql) -> Self {
        Self::QuerySql(value)
    }
}
