mod value;
pub(crate) use value::Value;

use quarry_core::{
    async_trait,
    driver::{
        operation::{Operation, Transaction},
        Capability, Driver, Response, TransactionManager,
    },
    err,
    stmt::{self, Record},
    Error, Result,
};
use quarry_sql::Serializer;
use rusqlite::Connection as RusqliteConnection;
use std::path::{Path, PathBuf};
use url::Url;

#[derive(Debug)]
pub enum Sqlite {
    File(PathBuf),
    InMemory,
}

impl Sqlite {
    /// Create a new SQLite driver from a `sqlite:` or `file:` URL. The path
    /// `:memory:` opens an in-memory database.
    pub fn new(url: impl Into<String>) -> Result<Self> {
        let url_str = url.into();
        let url = Url::parse(&url_str).map_err(|err| {
            Error::invalid_connection_url(format!("{err}; url={url_str}"))
        })?;

        if !matches!(url.scheme(), "sqlite" | "file") {
            return Err(Error::invalid_connection_url(format!(
                "connection URL does not have a `sqlite` scheme; url={url_str}"
            )));
        }

        // `Url::path` roots relative paths, so read the path from the raw string
        let rest = url_str
            .split_once(':')
            .map(|(_, rest)| rest)
            .unwrap_or_default();
        let rest = rest.strip_prefix("//").unwrap_or(rest);
        let path = rest.split(['?', '#']).next().unwrap_or_default();
        if path.is_empty() || path == ":memory:" {
            Ok(Self::InMemory)
        } else {
            Ok(Self::File(PathBuf::from(path)))
        }
    }

    /// Create an in-memory SQLite database
    pub fn in_memory() -> Self {
        Self::InMemory
    }

    /// Open a SQLite database at the specified file path
    pub fn open<P: AsRef<Path>>(path: P) -> Self {
        Self::File(path.as_ref().to_path_buf())
    }
}

#[async_trait]
impl Driver for Sqlite {
    fn capability(&self) -> &'static Capability {
        &Capability::SQLITE
    }

    async fn connect(&self) -> Result<Box<dyn quarry_core::Connection>> {
        let connection = match self {
            Sqlite::File(path) => Connection::open(path)?,
            Sqlite::InMemory => Connection::in_memory()?,
        };
        Ok(Box::new(connection))
    }
}

#[derive(Debug)]
pub struct Connection {
    connection: RusqliteConnection,
    transaction_manager: TransactionManager,
}

impl Connection {
    pub fn in_memory() -> Result<Self> {
        let connection =
            RusqliteConnection::open_in_memory().map_err(Error::driver_operation_failed)?;
        Ok(Self::from_rusqlite(connection))
    }

    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let connection = RusqliteConnection::open(path).map_err(Error::driver_operation_failed)?;
        Ok(Self::from_rusqlite(connection))
    }

    fn from_rusqlite(connection: RusqliteConnection) -> Self {
        Self {
            connection,
            transaction_manager: TransactionManager::sqlite(),
        }
    }

    fn transaction(&mut self, op: Transaction) -> Result<Response> {
        let sql = match op {
            Transaction::Start => Some(self.transaction_manager.start()),
            Transaction::Commit => self.transaction_manager.commit(),
            Transaction::Rollback => self.transaction_manager.rollback(),
        };

        if let Some(sql) = sql {
            tracing::trace!(sql = %sql, depth = self.transaction_manager.depth(), "transaction");
            self.connection
                .execute_batch(&sql)
                .map_err(|e| failed(e, &sql))?;
        }

        Ok(Response::empty())
    }

    fn run(
        &mut self,
        sql: &str,
        params: Vec<stmt::Value>,
        returns_rows: bool,
        last_insert_id: bool,
    ) -> Result<Response> {
        let params = params.into_iter().map(Value::from).collect::<Vec<_>>();
        let mut stmt = self
            .connection
            .prepare_cached(sql)
            .map_err(|e| failed(e, sql))?;

        if !returns_rows {
            let count = stmt
                .execute(rusqlite::params_from_iter(params.iter()))
                .map_err(|e| failed(e, sql))?;

            let mut response = Response::count(count as u64);
            if last_insert_id {
                response.last_insert_id = Some(self.connection.last_insert_rowid() as u64);
            }
            return Ok(response);
        }

        let columns = stmt
            .column_names()
            .into_iter()
            .map(String::from)
            .collect::<Vec<_>>();

        let mut rows = stmt
            .query(rusqlite::params_from_iter(params.iter()))
            .map_err(|e| failed(e, sql))?;

        let mut ret = vec![];

        while let Some(row) = rows.next().map_err(|e| failed(e, sql))? {
            let mut record = Record::new();
            for (index, column) in columns.iter().enumerate() {
                let value = Value::from_sql(row, index).map_err(|e| failed(e, sql))?;
                record.insert(column.as_str(), value.into_inner());
            }
            ret.push(record);
        }

        Ok(Response::values(ret))
    }
}

#[async_trait]
impl quarry_core::driver::Connection for Connection {
    fn capability(&self) -> &'static Capability {
        &Capability::SQLITE
    }

    fn transaction_depth(&self) -> u32 {
        self.transaction_manager.depth()
    }

    async fn exec(&mut self, op: Operation) -> Result<Response> {
        match op {
            Operation::QuerySql(op) => {
                let mut params = vec![];
                let sql = Serializer::sqlite().serialize(&op.stmt, &mut params);
                self.run(&sql, params, op.returns_rows, op.last_insert_id)
            }
            Operation::Raw(op) => self.run(&op.sql, op.params, op.returns_rows, false),
            Operation::Transaction(op) => self.transaction(op),
        }
    }
}

fn failed(err: rusqlite::Error, sql: &str) -> Error {
    Error::driver_operation_failed(err).context(err!("failed to execute `{sql}`"))
}
