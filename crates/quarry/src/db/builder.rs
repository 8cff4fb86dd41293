use super::Db;
use crate::Result;

use quarry_core::{
    driver::{Connection, Driver},
    Error, Schema,
};

use std::sync::Arc;

#[derive(Debug, Default)]
pub struct Builder {
    schema: Option<Arc<Schema>>,
}

impl Builder {
    pub fn schema(&mut self, schema: impl Into<Arc<Schema>>) -> &mut Self {
        self.schema = Some(schema.into());
        self
    }

    /// Connects using the driver selected by the URL scheme.
    pub async fn connect(&mut self, url: &str) -> Result<Db> {
        let connection = super::connect(url).await?;
        self.build(connection)
    }

    /// Opens a connection through `driver`.
    pub async fn driver(&mut self, driver: impl Driver) -> Result<Db> {
        let connection = driver.connect().await?;
        self.build(connection)
    }

    /// Builds a `Db` over an already open connection.
    pub fn build(&mut self, connection: Box<dyn Connection>) -> Result<Db> {
        let Some(schema) = self.schema.clone() else {
            return Err(Error::invalid_schema("no schema was given to the builder"));
        };
        Ok(Db::new(schema, connection))
    }
}
