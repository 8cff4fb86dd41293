mod placeholders;
pub use placeholders::Placeholders;

mod record;
pub use record::Record;

mod sql;
pub use sql::{Bind, Part, Sql};

mod value;
pub use value::{Value, DATETIME_FORMAT};
