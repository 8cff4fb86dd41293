pub mod db;
pub use db::{Db, Transaction};

mod engine;

mod model;
pub use model::{Count, Deleted, Model};

pub mod driver {
    pub use quarry_core::driver::{
        operation, Capability, Connection, Dialect, Driver, Operation, Response, Rows,
    };
}

pub use quarry_core::{
    bail, err,
    stmt::{Record, Value},
    Error, Result, Schema,
};
