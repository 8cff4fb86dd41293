use std::borrow::Cow;

/// Manages transaction nesting depth and generates the SQL for
/// `BEGIN`/`SAVEPOINT`, `COMMIT`/`RELEASE SAVEPOINT`, and
/// `ROLLBACK`/`ROLLBACK TO SAVEPOINT` based on the current nesting level.
///
/// A rollback of a nested level only undoes that savepoint; the levels above
/// it stay open and can still commit.
///
/// Each SQL driver embeds one of these and calls `start`, `commit`, or
/// `rollback` to obtain the statement to execute.
#[derive(Debug)]
pub struct TransactionManager {
    depth: u32,
    begin_stmt: &'static str,
}

impl TransactionManager {
    fn with_begin(begin_stmt: &'static str) -> Self {
        Self {
            depth: 0,
            begin_stmt,
        }
    }

    /// Create a `TransactionManager` configured for SQLite (`BEGIN`).
    pub fn sqlite() -> Self {
        Self::with_begin("BEGIN")
    }

    /// Create a `TransactionManager` configured for MySQL (`START TRANSACTION`).
    pub fn mysql() -> Self {
        Self::with_begin("START TRANSACTION")
    }

    /// Create a `TransactionManager` configured for PostgreSQL (`BEGIN`).
    pub fn postgresql() -> Self {
        Self::with_begin("BEGIN")
    }

    pub fn depth(&self) -> u32 {
        self.depth
    }

    /// Returns the SQL to begin a transaction or create a savepoint, and
    /// increments the nesting depth.
    pub fn start(&mut self) -> Cow<'static, str> {
        let sql = if self.depth == 0 {
            Cow::Borrowed(self.begin_stmt)
        } else {
            Cow::Owned(format!("SAVEPOINT trans{}", self.depth))
        };
        self.depth += 1;
        sql
    }

    /// Returns the SQL to commit the current level, or `None` outside a
    /// transaction.
    pub fn commit(&mut self) -> Option<Cow<'static, str>> {
        if self.depth == 0 {
            return None;
        }
        self.depth -= 1;

        let sql = if self.depth == 0 {
            Cow::Borrowed("COMMIT")
        } else {
            Cow::Owned(format!("RELEASE SAVEPOINT trans{}", self.depth))
        };
        Some(sql)
    }

    /// Returns the SQL to roll back the current level, or `None` outside a
    /// transaction.
    pub fn rollback(&mut self) -> Option<Cow<'static, str>> {
        if self.depth == 0 {
            return None;
        }
        self.depth -= 1;

        let sql = if self.depth == 0 {
            Cow::Borrowed("ROLLBACK")
        } else {
            Cow::Owned(format!("ROLLBACK TO SAVEPOINT trans{}", self.depth))
        };
        Some(sql)
    }
}
