#[macro_use]
mod macros;

pub mod db;

mod db_test;
pub use db_test::DbTest;

mod exec_log;
pub use exec_log::ExecLog;

pub mod fixture;

mod isolation;

pub use logging_connection::{ExecOp, LoggingConnection};

pub mod prelude;

use quarry::driver::{Capability, Connection};

#[async_trait::async_trait]
pub trait Setup: Send + Sync + 'static {
    /// Opens a connection to an empty database owned by this test.
    async fn connect(&self) -> quarry::Result<Box<dyn Connection>>;

    fn capability(&self) -> &'static Capability;

    /// Drops whatever this setup created on the server.
    async fn cleanup(&self) -> quarry::Result<()> {
        Ok(())
    }
}
