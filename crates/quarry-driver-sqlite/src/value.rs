use quarry_core::stmt::{self, DATETIME_FORMAT};
use rusqlite::{
    types::{ToSql, ToSqlOutput, Value as SqlValue, ValueRef},
    Row,
};

#[derive(Debug)]
pub struct Value(stmt::Value);

impl From<stmt::Value> for Value {
    fn from(value: stmt::Value) -> Self {
        Self(value)
    }
}

impl Value {
    /// Converts this SQLite driver value into the core Quarry value.
    pub fn into_inner(self) -> stmt::Value {
        self.0
    }

    /// Reads the column at `index` of a row. SQLite has no column types, so
    /// integers come back as `I64` and text as `String`; the runtime
    /// interprets them.
    pub fn from_sql(row: &Row<'_>, index: usize) -> rusqlite::Result<Self> {
        let value = match row.get_ref(index)? {
            ValueRef::Null => stmt::Value::Null,
            ValueRef::Integer(value) => stmt::Value::I64(value),
            ValueRef::Real(value) => stmt::Value::F64(value),
            ValueRef::Text(value) => stmt::Value::String(String::from_utf8_lossy(value).into_owned()),
            ValueRef::Blob(value) => stmt::Value::String(String::from_utf8_lossy(value).into_owned()),
        };

        Ok(Value(value))
    }
}

impl ToSql for Value {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        use stmt::Value;

        match &self.0 {
            Value::Null => Ok(ToSqlOutput::Owned(SqlValue::Null)),
            Value::Bool(true) => Ok(ToSqlOutput::Owned(SqlValue::Integer(1))),
            Value::Bool(false) => Ok(ToSqlOutput::Owned(SqlValue::Integer(0))),
            Value::I64(v) => Ok(ToSqlOutput::Owned(SqlValue::Integer(*v))),
            Value::F64(v) => Ok(ToSqlOutput::Owned(SqlValue::Real(*v))),
            Value::String(v) => Ok(ToSqlOutput::Borrowed(ValueRef::Text(v.as_bytes()))),
            Value::DateTime(v) => Ok(ToSqlOutput::Owned(SqlValue::Text(
                v.format(DATETIME_FORMAT).to_string(),
            ))),
            Value::Json(v) => Ok(ToSqlOutput::Owned(SqlValue::Text(v.to_string()))),
            value @ (Value::List(_) | Value::Record(_)) => {
                Ok(ToSqlOutput::Owned(SqlValue::Text(value.to_json().to_string())))
            }
        }
    }
}
