use crate::logging_connection::ExecOp;
use quarry::driver::{Operation, Response};
use quarry::driver::operation::Transaction;
use std::sync::{Arc, Mutex};

/// A wrapper around the operations log that provides a clean API for tests
pub struct ExecLog {
    ops: Arc<Mutex<Vec<ExecOp>>>,
}

impl ExecLog {
    pub(crate) fn new(ops: Arc<Mutex<Vec<ExecOp>>>) -> Self {
        Self { ops }
    }

    /// Get the number of logged operations
    pub fn len(&self) -> usize {
        self.ops.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.lock().unwrap().is_empty()
    }

    /// Check if any operation matches the given predicate
    pub fn any<F>(&self, predicate: F) -> bool
    where
        F: Fn(&Operation) -> bool,
    {
        self.ops
            .lock()
            .unwrap()
            .iter()
            .any(|op| predicate(&op.operation))
    }

    /// Count operations matching the given predicate
    pub fn count<F>(&self, predicate: F) -> usize
    where
        F: Fn(&Operation) -> bool,
    {
        self.ops
            .lock()
            .unwrap()
            .iter()
            .filter(|op| predicate(&op.operation))
            .count()
    }

    /// SQL text of every statement sent, in order. Bind markers render as
    /// `:name`.
    pub fn statements(&self) -> Vec<String> {
        self.ops
            .lock()
            .unwrap()
            .iter()
            .filter_map(|op| match &op.operation {
                Operation::QuerySql(query) => Some(query.stmt.to_string()),
                Operation::Raw(raw) => Some(raw.sql.clone()),
                Operation::Transaction(_) => None,
            })
            .collect()
    }

    /// Statements that start with `prefix`, such as `SELECT` or `INSERT`.
    pub fn statements_starting_with(&self, prefix: &str) -> Vec<String> {
        self.statements()
            .into_iter()
            .filter(|sql| sql.starts_with(prefix))
            .collect()
    }

    /// Transaction lifecycle operations, in order.
    pub fn transactions(&self) -> Vec<Transaction> {
        self.ops
            .lock()
            .unwrap()
            .iter()
            .filter_map(|op| match &op.operation {
                Operation::Transaction(tx) => Some(*tx),
                _ => None,
            })
            .collect()
    }

    /// Clear the log
    pub fn clear(&mut self) {
        self.ops.lock().unwrap().clear();
    }

    /// Remove and return the first operation from the log
    pub fn pop(&mut self) -> Option<(Operation, Response)> {
        let mut ops = self.ops.lock().unwrap();
        if ops.is_empty() {
            None
        } else {
            let op = ops.remove(0);
            Some((op.operation, op.response))
        }
    }
}
