use crate::{
    exec_log::ExecLog,
    fixture,
    logging_connection::{ExecOp, LoggingConnection},
    Setup,
};
use quarry::{driver::Capability, Db};
use std::sync::{Arc, Mutex};

/// Owns the Tokio runtime of one test and makes sure cleanup happens.
///
/// Tests are plain `#[test]` functions so cleanup can block before the
/// process exits. Every connection is wrapped in a [`LoggingConnection`] so
/// tests can assert on the statements that were sent.
pub struct DbTest {
    runtime: Option<tokio::runtime::Runtime>,
    setup: Box<dyn Setup>,
    ops_log: Arc<Mutex<Vec<ExecOp>>>,
}

impl DbTest {
    /// Create a new DbTest with a current-thread runtime.
    pub fn new(setup: Box<dyn Setup>) -> Self {
        let _ = env_logger::builder().is_test(true).try_init();

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .expect("Failed to create Tokio runtime");

        Self {
            runtime: Some(runtime),
            setup,
            ops_log: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Connects, creates the fixture tables and clears the log.
    pub async fn try_setup_db(&mut self) -> quarry::Result<Db> {
        let connection = LoggingConnection::new(self.setup.connect().await?);
        self.ops_log = connection.ops_log_handle();

        let db = Db::builder()
            .schema(fixture::schema())
            .build(Box::new(connection))?;

        for stmt in fixture::ddl(self.capability()) {
            db.execute_raw(&stmt, vec![]).await?;
        }

        self.log().clear();
        Ok(db)
    }

    pub async fn setup_db(&mut self) -> Db {
        self.try_setup_db().await.unwrap()
    }

    /// Operations sent since the database was set up
    pub fn log(&self) -> ExecLog {
        ExecLog::new(self.ops_log.clone())
    }

    pub fn capability(&self) -> &'static Capability {
        self.setup.capability()
    }

    /// Run a test function with a mutable reference to self on the managed
    /// runtime.
    pub fn run_test<F>(&mut self, test_fn: F)
    where
        F: for<'a> FnOnce(
            &'a mut DbTest,
        ) -> std::pin::Pin<Box<dyn std::future::Future<Output = ()> + 'a>>,
    {
        let runtime = self.runtime.take().expect("runtime already taken");
        runtime.block_on(test_fn(self));
        self.runtime = Some(runtime);
    }
}

impl Drop for DbTest {
    fn drop(&mut self) {
        // A panicking test leaves no runtime behind
        let runtime = self.runtime.take().or_else(|| {
            tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .ok()
        });

        if let Some(runtime) = runtime {
            if let Err(e) = runtime.block_on(self.setup.cleanup()) {
                eprintln!("test cleanup failed: {e}");
            }
        }
    }
}
