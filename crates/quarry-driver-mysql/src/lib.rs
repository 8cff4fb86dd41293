mod value;
pub(crate) use value::Value;

use mysql_async::{
    prelude::{Queryable, ToValue},
    Conn, Pool,
};
use quarry_core::{
    async_trait,
    driver::{operation::Transaction, Capability, Driver, Operation, Response, TransactionManager},
    err,
    stmt::{self, Record},
    Error, Result,
};
use quarry_sql::Serializer;
use url::Url;

#[derive(Debug)]
pub struct MySQL {
    pool: Pool,
}

impl MySQL {
    pub fn new(url: impl Into<String>) -> Result<Self> {
        let url_str = url.into();
        let url = Url::parse(&url_str)
            .map_err(|err| Error::invalid_connection_url(format!("{err}; url={url_str}")))?;

        if url.scheme() != "mysql" {
            return Err(Error::invalid_connection_url(format!(
                "connection url does not have a `mysql` scheme; url={url}"
            )));
        }

        if url.host_str().is_none() {
            return Err(Error::invalid_connection_url(format!(
                "missing host in connection URL; url={url}"
            )));
        }

        if url.path().is_empty() || url.path() == "/" {
            return Err(Error::invalid_connection_url(format!(
                "no database specified - missing path in connection URL; url={url}"
            )));
        }

        let opts = mysql_async::Opts::from_url(url.as_ref())
            .map_err(|err| Error::invalid_connection_url(err.to_string()))?;
        let opts = mysql_async::OptsBuilder::from_opts(opts).client_found_rows(true);

        let pool = Pool::new(opts);
        Ok(Self { pool })
    }
}

impl From<Pool> for MySQL {
    fn from(pool: Pool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Driver for MySQL {
    fn capability(&self) -> &'static Capability {
        &Capability::MYSQL
    }

    async fn connect(&self) -> Result<Box<dyn quarry_core::driver::Connection>> {
        let conn = self
            .pool
            .get_conn()
            .await
            .map_err(Error::driver_operation_failed)?;
        Ok(Box::new(Connection::new(conn)))
    }
}

#[derive(Debug)]
pub struct Connection {
    conn: Conn,
    transaction_manager: TransactionManager,
}

impl Connection {
    pub fn new(conn: Conn) -> Self {
        Self {
            conn,
            transaction_manager: TransactionManager::mysql(),
        }
    }

    async fn transaction(&mut self, op: Transaction) -> Result<Response> {
        let sql = match op {
            Transaction::Start => Some(self.transaction_manager.start()),
            Transaction::Commit => self.transaction_manager.commit(),
            Transaction::Rollback => self.transaction_manager.rollback(),
        };

        if let Some(sql) = sql {
            tracing::trace!(sql = %sql, depth = self.transaction_manager.depth(), "transaction");
            self.conn
                .query_drop(sql.as_ref())
                .await
                .map_err(|e| failed(e, &sql))?;
        }

        Ok(Response::empty())
    }

    async fn run(
        &mut self,
        sql: &str,
        params: Vec<stmt::Value>,
        returns_rows: bool,
        last_insert_id: bool,
    ) -> Result<Response> {
        let args = params
            .into_iter()
            .map(|param| Value::from(param).to_value())
            .collect::<Vec<_>>();

        if !returns_rows {
            let result = self
                .conn
                .exec_iter(sql, mysql_async::Params::Positional(args))
                .await
                .map_err(|e| failed(e, sql))?;
            let count = result.affected_rows();
            let insert_id = result.last_insert_id();
            result.drop_result().await.map_err(|e| failed(e, sql))?;

            let mut response = Response::count(count);
            if last_insert_id {
                response.last_insert_id = insert_id;
            }
            return Ok(response);
        }

        let rows: Vec<mysql_async::Row> = self
            .conn
            .exec(sql, mysql_async::Params::Positional(args))
            .await
            .map_err(|e| failed(e, sql))?;

        let records = rows
            .into_iter()
            .map(|row| {
                let columns = row.columns();
                let values = row.unwrap();
                columns
                    .iter()
                    .zip(values)
                    .map(|(column, value)| {
                        (
                            column.name_str().into_owned(),
                            Value::from_sql(value).into_inner(),
                        )
                    })
                    .collect::<Record>()
            })
            .collect();

        Ok(Response::values(records))
    }
}

impl From<Conn> for Connection {
    fn from(conn: Conn) -> Self {
        Self::new(conn)
    }
}

#[async_trait]
impl quarry_core::driver::Connection for Connection {
    fn capability(&self) -> &'static Capability {
        &Capability::MYSQL
    }

    fn transaction_depth(&self) -> u32 {
        self.transaction_manager.depth()
    }

    async fn exec(&mut self, op: Operation) -> Result<Response> {
        match op {
            Operation::QuerySql(op) => {
                let mut params = vec![];
                let sql = Serializer::mysql().serialize(&op.stmt, &mut params);
                self.run(&sql, params, op.returns_rows, op.last_insert_id).await
            }
            Operation::Raw(op) => self.run(&op.sql, op.params, op.returns_rows, false).await,
            Operation::Transaction(op) => self.transaction(op).await,
        }
    }
}

fn failed(err: mysql_async::Error, sql: &str) -> Error {
    Error::driver_operation_failed(err).context(err!("failed to execute `{sql}`"))
}
