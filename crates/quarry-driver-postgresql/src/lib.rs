mod value;
pub(crate) use value::Value;

use quarry_core::{
    async_trait,
    driver::{operation::Transaction, Capability, Driver, Operation, Response, TransactionManager},
    err,
    stmt::{self, Record},
    Error, Result,
};
use quarry_sql::Serializer;
use tokio_postgres::{
    tls::MakeTlsConnect,
    types::ToSql,
    Client, Config, Socket,
};
use url::Url;

#[derive(Debug)]
pub struct PostgreSQL {
    config: Config,
}

impl PostgreSQL {
    /// Parses a `postgres://` or `postgresql://` connection URL. The port
    /// defaults to 5432.
    pub fn new(url: impl Into<String>) -> Result<Self> {
        let url_str = url.into();
        let url = Url::parse(&url_str)
            .map_err(|err| Error::invalid_connection_url(format!("{err}; url={url_str}")))?;

        if !matches!(url.scheme(), "postgres" | "postgresql") {
            return Err(Error::invalid_connection_url(format!(
                "connection URL does not have a `postgresql` scheme; url={url}"
            )));
        }

        let host = url.host_str().ok_or_else(|| {
            Error::invalid_connection_url(format!("missing host in connection URL; url={url}"))
        })?;

        let dbname = url.path().trim_start_matches('/');
        if dbname.is_empty() {
            return Err(Error::invalid_connection_url(format!(
                "no database specified - missing path in connection URL; url={url}"
            )));
        }

        let mut config = Config::new();
        config.host(host);
        config.dbname(dbname);
        config.port(url.port().unwrap_or(5432));

        if !url.username().is_empty() {
            config.user(url.username());
        }

        if let Some(password) = url.password() {
            config.password(password);
        }

        Ok(Self { config })
    }

    pub fn from_config(config: Config) -> Self {
        Self { config }
    }
}

#[async_trait]
impl Driver for PostgreSQL {
    fn capability(&self) -> &'static Capability {
        &Capability::POSTGRESQL
    }

    async fn connect(&self) -> Result<Box<dyn quarry_core::driver::Connection>> {
        let connection =
            Connection::connect_with_config(self.config.clone(), tokio_postgres::NoTls).await?;
        Ok(Box::new(connection))
    }
}

#[derive(Debug)]
pub struct Connection {
    client: Client,
    transaction_manager: TransactionManager,
}

impl Connection {
    /// Initialize a connection from an already connected client.
    pub fn new(client: Client) -> Self {
        Self {
            client,
            transaction_manager: TransactionManager::postgresql(),
        }
    }

    /// Connects using a [`tokio_postgres::Config`]. The connection future is
    /// driven on its own task.
    pub async fn connect_with_config<T>(config: Config, tls: T) -> Result<Self>
    where
        T: MakeTlsConnect<Socket> + 'static,
        T::Stream: Send,
    {
        let (client, connection) = config
            .connect(tls)
            .await
            .map_err(Error::driver_operation_failed)?;

        tokio::spawn(async move {
            if let Err(e) = connection.await {
                tracing::error!(error = %e, "postgresql connection error");
            }
        });

        Ok(Self::new(client))
    }

    async fn transaction(&mut self, op: Transaction) -> Result<Response> {
        let sql = match op {
            Transaction::Start => Some(self.transaction_manager.start()),
            Transaction::Commit => self.transaction_manager.commit(),
            Transaction::Rollback => self.transaction_manager.rollback(),
        };

        if let Some(sql) = sql {
            tracing::trace!(sql = %sql, depth = self.transaction_manager.depth(), "transaction");
            self.client
                .batch_execute(&sql)
                .await
                .map_err(|e| failed(e, &sql))?;
        }

        Ok(Response::empty())
    }

    async fn run(&mut self, sql: &str, params: Vec<stmt::Value>, returns_rows: bool) -> Result<Response> {
        let params = params.into_iter().map(Value::from).collect::<Vec<_>>();
        let args = params
            .iter()
            .map(|param| param as &(dyn ToSql + Sync))
            .collect::<Vec<_>>();

        if !returns_rows {
            let count = self
                .client
                .execute(sql, &args)
                .await
                .map_err(|e| failed(e, sql))?;
            return Ok(Response::count(count));
        }

        let rows = self
            .client
            .query(sql, &args)
            .await
            .map_err(|e| failed(e, sql))?;

        let mut records = Vec::with_capacity(rows.len());
        for row in &rows {
            let mut record = Record::new();
            for (index, column) in row.columns().iter().enumerate() {
                let value = value::from_row(row, index, column).map_err(|e| failed(e, sql))?;
                record.insert(column.name(), value);
            }
            records.push(record);
        }

        Ok(Response::values(records))
    }
}

impl From<Client> for Connection {
    fn from(client: Client) -> Self {
        Self::new(client)
    }
}

#[async_trait]
impl quarry_core::driver::Connection for Connection {
    fn capability(&self) -> &'static Capability {
        &Capability::POSTGRESQL
    }

    fn transaction_depth(&self) -> u32 {
        self.transaction_manager.depth()
    }

    async fn exec(&mut self, op: Operation) -> Result<Response> {
        match op {
            Operation::QuerySql(op) => {
                let mut params = vec![];
                let sql = Serializer::postgresql().serialize(&op.stmt, &mut params);
                self.run(&sql, params, op.returns_rows).await
            }
            Operation::Raw(op) => self.run(&op.sql, op.params, op.returns_rows).await,
            Operation::Transaction(op) => self.transaction(op).await,
        }
    }
}

fn failed(err: tokio_postgres::Error, sql: &str) -> Error {
    Error::driver_operation_failed(err).context(err!("failed to execute `{sql}`"))
}
