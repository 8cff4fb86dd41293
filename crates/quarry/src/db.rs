mod builder;
pub use builder::Builder;

mod connect;
pub use connect::connect;

mod registry;
pub(crate) use registry::{ModelRegistry, ModelRuntime};

mod transaction;
pub use transaction::Transaction;

use crate::{engine::Cx, Model, Result};

use quarry_core::{
    driver::{operation::RawSql, Capability, Connection, Operation},
    stmt::{Record, Value},
    Error, Schema,
};
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::warn;

use std::sync::Arc;

/// State shared by every handle of one `Db`.
#[derive(Debug)]
pub(crate) struct Shared {
    pub(crate) schema: Arc<Schema>,
    pub(crate) capability: &'static Capability,
    pub(crate) registry: ModelRegistry,
    connection: Arc<Mutex<Box<dyn Connection>>>,
}

/// A database handle bound to a schema.
///
/// The handle owns one connection. Every verb takes the connection for its
/// whole run, so calls through clones of the same `Db` are serialized.
#[derive(Debug, Clone)]
pub struct Db {
    shared: Arc<Shared>,
}

impl Db {
    pub fn builder() -> Builder {
        Builder::default()
    }

    /// Connects to the database named by the `DATABASE_URL` environment
    /// variable.
    pub async fn from_env(schema: Schema) -> Result<Db> {
        let url = std::env::var("DATABASE_URL").map_err(|_| {
            Error::invalid_connection_url("the `DATABASE_URL` environment variable is not set")
        })?;
        Db::builder().schema(schema).connect(&url).await
    }

    pub(crate) fn new(schema: Arc<Schema>, connection: Box<dyn Connection>) -> Db {
        let capability = connection.capability();
        Db {
            shared: Arc::new(Shared {
                registry: ModelRegistry::new(schema.clone(), capability),
                schema,
                capability,
                connection: Arc::new(Mutex::new(connection)),
            }),
        }
    }

    pub fn schema(&self) -> &Schema {
        &self.shared.schema
    }

    pub fn capability(&self) -> &'static Capability {
        self.shared.capability
    }

    /// A handle to the model named `name`.
    pub fn model(&self, name: &str) -> Result<Model<'_>> {
        let runtime = self.shared.registry.get(name)?;
        Ok(Model::new(&self.shared, None, runtime))
    }

    /// Runs caller-written SQL and returns the number of affected rows.
    /// Parameters are positional, using the placeholders of the database.
    pub async fn execute_raw(&self, sql: &str, params: Vec<Value>) -> Result<u64> {
        let mut conn = self.shared.acquire().await?;
        let response = conn
            .exec(Operation::Raw(RawSql {
                sql: sql.to_string(),
                params,
                returns_rows: false,
            }))
            .await?;
        Ok(response.rows.into_count())
    }

    /// Runs caller-written SQL and returns its rows.
    pub async fn query_raw(&self, sql: &str, params: Vec<Value>) -> Result<Vec<Record>> {
        let mut conn = self.shared.acquire().await?;
        let response = conn
            .exec(Operation::Raw(RawSql {
                sql: sql.to_string(),
                params,
                returns_rows: true,
            }))
            .await?;
        Ok(response.rows.into_values())
    }

    /// Starts a transaction on the connection. The connection stays taken
    /// until the transaction is committed, rolled back or dropped.
    pub async fn transaction(&self) -> Result<Transaction> {
        let mut conn = self.shared.acquire().await?;
        Cx::new(&self.shared, &mut **conn).begin().await?;
        Ok(Transaction::new(self.shared.clone(), conn))
    }
}

impl Shared {
    /// Takes the connection. Transactions left open by a dropped
    /// [`Transaction`] are rolled back first.
    pub(crate) async fn acquire(&self) -> Result<OwnedMutexGuard<Box<dyn Connection>>> {
        let mut conn = self.connection.clone().lock_owned().await;

        if conn.transaction_depth() > 0 {
            warn!(
                depth = conn.transaction_depth(),
                "rolling back a transaction that was dropped without commit or rollback"
            );
            while conn.transaction_depth() > 0 {
                Cx::new(self, &mut **conn).rollback().await?;
            }
        }

        Ok(conn)
    }
}
