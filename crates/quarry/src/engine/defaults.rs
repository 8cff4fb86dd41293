use crate::Result;

use chrono::{Timelike, Utc};
use quarry_core::{
    schema::{DefaultValue, Field, Generator, Schema},
    stmt::Value,
    validate,
};

/// The current time, truncated to whole seconds.
pub(crate) fn now() -> Value {
    let now = Utc::now().naive_utc();
    Value::DateTime(now.with_nanosecond(0).unwrap_or(now))
}

/// The value to insert for `field` when the caller gave none. `None` leaves
/// the column to the database.
pub(crate) fn default_value(field: &Field, schema: &Schema) -> Result<Option<Value>> {
    if field.is_updated_at {
        return Ok(Some(now()));
    }

    match &field.default {
        Some(DefaultValue::Generator(generator)) => Ok(generate(*generator)),
        Some(DefaultValue::Literal(value)) => validate::validate(value, field, schema).map(Some),
        None => Ok(None),
    }
}

fn generate(generator: Generator) -> Option<Value> {
    match generator {
        Generator::Uuid => Some(Value::String(uuid::Uuid::new_v4().to_string())),
        Generator::Ulid => Some(Value::String(ulid::Ulid::new().to_string())),
        Generator::Cuid => Some(Value::String(cuid2::create_id())),
        Generator::Now => Some(now()),
        Generator::Autoincrement | Generator::DbGenerated => None,
    }
}
