mod capability;
pub use capability::{Capability, Dialect};

pub mod operation;
pub use operation::Operation;

mod response;
pub use response::{Response, Rows};

mod transaction_manager;
pub use transaction_manager::TransactionManager;

use crate::async_trait;

use std::fmt::Debug;

/// Opens connections to one database.
#[async_trait]
pub trait Driver: Debug + Send + Sync + 'static {
    /// Describes the database's SQL dialect and features.
    fn capability(&self) -> &'static Capability;

    /// Creates a new connection.
    async fn connect(&self) -> crate::Result<Box<dyn Connection>>;
}

/// A single database connection.
///
/// Drivers fully materialize result rows before `exec` returns, so no cursor
/// is left open between operations.
#[async_trait]
pub trait Connection: Debug + Send + 'static {
    fn capability(&self) -> &'static Capability;

    /// Current transaction nesting depth; zero outside a transaction.
    fn transaction_depth(&self) -> u32;

    /// Execute a database operation
    async fn exec(&mut self, op: Operation) -> crate::Result<Response>;
}
