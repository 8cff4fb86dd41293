use crate::Result;

use quarry_core::{driver::Connection, Error};
use url::Url;

/// Opens a connection with the driver matching the URL scheme.
pub async fn connect(url: &str) -> Result<Box<dyn Connection>> {
    let parsed = Url::parse(url).map_err(|err| {
        Error::invalid_connection_url(format!("{url}: {err}"))
    })?;

    match parsed.scheme() {
        "sqlite" | "file" => connect_sqlite(url).await,
        "mysql" => connect_mysql(url).await,
        "postgres" | "postgresql" => connect_postgresql(url).await,
        scheme => Err(Error::invalid_connection_url(format!(
            "unsupported database scheme `{scheme}`; url={url}"
        ))),
    }
}

#[cfg(feature = "mysql")]
async fn connect_mysql(url: &str) -> Result<Box<dyn Connection>> {
    use quarry_core::driver::Driver;
    quarry_driver_mysql::MySQL::new(url)?.connect().await
}

#[cfg(not(feature = "mysql"))]
async fn connect_mysql(_url: &str) -> Result<Box<dyn Connection>> {
    Err(Error::invalid_connection_url("`mysql` feature not enabled"))
}

#[cfg(feature = "postgresql")]
async fn connect_postgresql(url: &str) -> Result<Box<dyn Connection>> {
    use quarry_core::driver::Driver;
    quarry_driver_postgresql::PostgreSQL::new(url)?.connect().await
}

#[cfg(not(feature = "postgresql"))]
async fn connect_postgresql(_url: &str) -> Result<Box<dyn Connection>> {
    Err(Error::invalid_connection_url("`postgresql` feature not enabled"))
}

#[cfg(feature = "sqlite")]
async fn connect_sqlite(url: &str) -> Result<Box<dyn Connection>> {
    use quarry_core::driver::Driver;
    quarry_driver_sqlite::Sqlite::new(url)?.connect().await
}

#[cfg(not(feature = "sqlite"))]
async fn connect_sqlite(_url: &str) -> Result<Box<dyn Connection>> {
    Err(Error::invalid_connection_url("`sqlite` feature not enabled"))
}
