pub mod driver;
pub use driver::{Connection, Driver};

mod error;
pub use error::{Error, IntoError};

pub mod query;

pub mod schema;
pub use schema::Schema;

pub mod stmt;

pub mod validate;

/// A Result type alias that uses Quarry's [`Error`] type.
pub type Result<T> = core::result::Result<T, Error>;

pub use async_trait::async_trait;
