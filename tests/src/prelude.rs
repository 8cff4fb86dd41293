//! Common imports for test files
//!
//! This module provides a convenient way to import frequently used items
//! in test files with `use tests::prelude::*;`

pub use crate::{tests, DbTest};
pub use quarry::{driver::operation::Transaction, Count, Db, Deleted, Record, Value};
pub use serde_json::json;

/// Field `name` of a record that must be present.
pub fn field<'a>(record: &'a Record, name: &str) -> &'a Value {
    record
        .get(name)
        .unwrap_or_else(|| panic!("record has no field `{name}`: {record:#?}"))
}

/// The `id` of a record as an integer.
pub fn id(record: &Record) -> i64 {
    field(record, "id").as_i64().expect("integer id")
}

/// Field `name` of every record, as strings.
pub fn strings<'a>(records: &'a [Record], name: &str) -> Vec<&'a str> {
    records
        .iter()
        .map(|r| field(r, name).as_str().expect("string field"))
        .collect()
}
