//! Executes the verbs of a model against a connection.
//!
//! Every function takes a [`Cx`]: the shared `Db` state plus the connection
//! taken for the current call. Writes open a transaction through the
//! connection's savepoint tracker, so verbs nest freely inside each other and
//! inside caller transactions.

pub(crate) mod aggregate;
pub(crate) mod args;
pub(crate) mod create;
mod defaults;
pub(crate) mod delete;
mod hydrate;
mod mutation;
mod pivot;
mod populate;
pub(crate) mod read;
pub(crate) mod update;

use crate::{
    db::{ModelRuntime, Shared},
    Result,
};

use quarry_core::{
    driver::{
        operation::{QuerySql, Transaction},
        Capability, Connection, Operation, Response,
    },
    stmt::{Record, Sql, Value},
    Schema,
};
use quarry_sql::{Scope, Serializer};
use tracing::{debug, enabled, Level};

use std::sync::Arc;

pub(crate) struct Cx<'a> {
    pub(crate) shared: &'a Shared,
    conn: &'a mut dyn Connection,
}

impl<'a> Cx<'a> {
    pub(crate) fn new(shared: &'a Shared, conn: &'a mut dyn Connection) -> Cx<'a> {
        Cx { shared, conn }
    }

    pub(crate) fn capability(&self) -> &'static Capability {
        self.shared.capability
    }

    pub(crate) fn schema(&self) -> &'a Schema {
        &self.shared.schema
    }

    pub(crate) fn runtime(&self, name: &str) -> Result<Arc<ModelRuntime>> {
        self.shared.registry.get(name)
    }

    /// Scope over the table of `runtime`.
    pub(crate) fn scope<'s>(&self, runtime: &'s ModelRuntime) -> Scope<'s>
    where
        'a: 's,
    {
        Scope::new(
            self.shared.capability,
            self.schema(),
            Some(&runtime.model),
            &runtime.table,
        )
    }

    async fn exec(&mut self, op: QuerySql) -> Result<Response> {
        if enabled!(Level::DEBUG) {
            let mut params: Vec<Value> = vec![];
            let sql = Serializer::for_capability(self.capability()).serialize(&op.stmt, &mut params);
            debug!(sql = %sql, params = params.len(), "executing statement");
        }
        self.conn.exec(Operation::QuerySql(op)).await
    }

    /// Runs a statement producing rows.
    pub(crate) async fn query(&mut self, stmt: Sql) -> Result<Vec<Record>> {
        let response = self.exec(QuerySql::query(stmt)).await?;
        Ok(response.rows.into_values())
    }

    /// Runs a statement and returns the affected row count.
    pub(crate) async fn execute(&mut self, stmt: Sql) -> Result<u64> {
        let response = self.exec(QuerySql::execute(stmt)).await?;
        Ok(response.rows.into_count())
    }

    /// Runs an `INSERT`. Rows come back when the statement has a
    /// `RETURNING` clause; otherwise the auto-increment id is reported.
    pub(crate) async fn insert(&mut self, stmt: Sql, returns_rows: bool) -> Result<Response> {
        self.exec(QuerySql {
            stmt,
            returns_rows,
            last_insert_id: !returns_rows,
        })
        .await
    }

    pub(crate) async fn begin(&mut self) -> Result<()> {
        self.conn.exec(Transaction::Start.into()).await?;
        Ok(())
    }

    pub(crate) async fn commit(&mut self) -> Result<()> {
        self.conn.exec(Transaction::Commit.into()).await?;
        Ok(())
    }

    pub(crate) async fn rollback(&mut self) -> Result<()> {
        self.conn.exec(Transaction::Rollback.into()).await?;
        Ok(())
    }

    /// Commits on success and rolls back on failure. The error of the
    /// operation is returned unchanged.
    pub(crate) async fn finish<T>(&mut self, result: Result<T>) -> Result<T> {
        match result {
            Ok(value) => {
                self.commit().await?;
                Ok(value)
            }
            Err(err) => {
                if let Err(rollback) = self.rollback().await {
                    debug!(error = %rollback, "rollback failed");
                }
                Err(err)
            }
        }
    }
}
