mod query_sql;
pub use query_sql::QuerySql;

mod raw_sql;
pub use raw_sql::RawSql;

mod transaction;
pub use transaction::Transaction;

#[derive(Debug, Clone)]
pub enum Operation {
    /// Execute a statement built by the query assembler
    QuerySql(QuerySql),

    /// Execute caller-provided SQL with positional parameters
    Raw(RawSql),

    /// Execute a transaction lifecycle op
    Transaction(Transaction),
}
