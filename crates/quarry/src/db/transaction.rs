use super::Shared;
use crate::{engine::Cx, Model, Result};

use quarry_core::driver::Connection;
use tokio::sync::OwnedMutexGuard;
use tracing::warn;

use std::sync::Arc;

/// A transaction holding the connection of its `Db`.
///
/// Verbs called through [`Transaction::model`] run inside the transaction;
/// their own transactions become savepoints. Dropping a `Transaction`
/// without calling [`commit`](Transaction::commit) or
/// [`rollback`](Transaction::rollback) releases the connection with the
/// transaction still open; it is rolled back the next time the connection
/// is taken.
#[derive(Debug)]
pub struct Transaction {
    shared: Arc<Shared>,
    conn: OwnedMutexGuard<Box<dyn Connection>>,
    finished: bool,
}

impl Transaction {
    pub(super) fn new(shared: Arc<Shared>, conn: OwnedMutexGuard<Box<dyn Connection>>) -> Self {
        Transaction {
            shared,
            conn,
            finished: false,
        }
    }

    /// A handle to the model named `name`, bound to this transaction.
    pub fn model(&mut self, name: &str) -> Result<Model<'_>> {
        let runtime = self.shared.registry.get(name)?;
        Ok(Model::new(&self.shared, Some(&mut **self.conn), runtime))
    }

    pub async fn commit(mut self) -> Result<()> {
        self.finished = true;
        Cx::new(&self.shared, &mut **self.conn).commit().await
    }

    pub async fn rollback(mut self) -> Result<()> {
        self.finished = true;
        Cx::new(&self.shared, &mut **self.conn).rollback().await
    }
}

impl Drop for Transaction {
    fn drop(&mut self) {
        if !self.finished {
            warn!("transaction dropped without commit or rollback");
        }
    }
}
