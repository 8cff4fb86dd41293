use quarry::driver::{Capability, Connection, Driver};
use quarry_driver_postgresql::PostgreSQL;
use tokio_postgres::{Client, Config, NoTls};

use crate::{isolation::TestIsolation, Setup};

/// Isolates each test in its own schema, selected through `search_path`.
pub struct SetupPostgreSQL {
    isolation: TestIsolation,
}

impl SetupPostgreSQL {
    pub fn new() -> Self {
        Self {
            isolation: TestIsolation::new(),
        }
    }
}

impl Default for SetupPostgreSQL {
    fn default() -> Self {
        Self::new()
    }
}

fn config() -> quarry::Result<Config> {
    let url = std::env::var("QUARRY_TEST_POSTGRES_URL")
        .unwrap_or_else(|_| "postgresql://localhost:5432/quarry_test".to_string());
    url.parse()
        .map_err(|e| quarry::err!("invalid PostgreSQL URL: {e}"))
}

async fn admin_client() -> quarry::Result<Client> {
    let (client, connection) = config()?
        .connect(NoTls)
        .await
        .map_err(quarry::Error::driver_operation_failed)?;

    tokio::spawn(async move {
        if let Err(e) = connection.await {
            eprintln!("PostgreSQL connection error during setup: {e}");
        }
    });

    Ok(client)
}

#[async_trait::async_trait]
impl Setup for SetupPostgreSQL {
    async fn connect(&self) -> quarry::Result<Box<dyn Connection>> {
        let schema = self.isolation.namespace();

        admin_client()
            .await?
            .batch_execute(&format!("CREATE SCHEMA \"{schema}\""))
            .await
            .map_err(quarry::Error::driver_operation_failed)?;

        let mut config = config()?;
        config.options(&format!("-c search_path={schema}"));
        PostgreSQL::from_config(config).connect().await
    }

    fn capability(&self) -> &'static Capability {
        &Capability::POSTGRESQL
    }

    async fn cleanup(&self) -> quarry::Result<()> {
        admin_client()
            .await?
            .batch_execute(&format!(
                "DROP SCHEMA IF EXISTS \"{}\" CASCADE",
                self.isolation.namespace()
            ))
            .await
            .map_err(quarry::Error::driver_operation_failed)
    }
}
