use super::Record;

use chrono::NaiveDateTime;
use serde::ser::{Serialize, SerializeSeq, Serializer};

/// Format used when a `DateTime` is rendered as text.
pub const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Default, Clone, PartialEq)]
pub enum Value {
    /// Null value
    #[default]
    Null,

    /// Boolean value
    Bool(bool),

    /// Signed 64-bit integer
    I64(i64),

    /// Double precision float
    F64(f64),

    /// String value. Decimals and enum members are carried as strings too.
    String(String),

    /// Timestamp without time zone
    DateTime(NaiveDateTime),

    /// An arbitrary JSON document
    Json(serde_json::Value),

    /// A list of values
    List(Vec<Value>),

    /// A nested record
    Record(Record),
}

impl Value {
    pub const fn null() -> Value {
        Value::Null
    }

    pub const fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn is_list(&self) -> bool {
        matches!(self, Value::List(_))
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match *self {
            Value::Bool(v) => Some(v),
            Value::I64(0) => Some(false),
            Value::I64(1) => Some(true),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match *self {
            Value::I64(v) => Some(v),
            Value::F64(v) if v.fract() == 0.0 => Some(v as i64),
            Value::Bool(v) => Some(v as i64),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::F64(v) => Some(*v),
            Value::I64(v) => Some(*v as f64),
            Value::String(v) => v.parse().ok(),
            _ => None,
        }
    }

    pub fn as_record(&self) -> Option<&Record> {
        match self {
            Value::Record(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(v) => Some(v),
            _ => None,
        }
    }

    pub fn into_record(self) -> Option<Record> {
        match self {
            Value::Record(v) => Some(v),
            _ => None,
        }
    }

    pub fn into_list(self) -> Option<Vec<Value>> {
        match self {
            Value::List(v) => Some(v),
            _ => None,
        }
    }

    /// Converts a JSON document into a value. Objects become records and
    /// arrays become lists.
    pub fn from_json(json: serde_json::Value) -> Value {
        use serde_json::Value as J;

        match json {
            J::Null => Value::Null,
            J::Bool(v) => Value::Bool(v),
            J::Number(n) => {
                if let Some(v) = n.as_i64() {
                    Value::I64(v)
                } else {
                    Value::F64(n.as_f64().unwrap_or_default())
                }
            }
            J::String(v) => Value::String(v),
            J::Array(items) => Value::List(items.into_iter().map(Value::from_json).collect()),
            J::Object(map) => Value::Record(Record::from_json(map)),
        }
    }

    /// Converts the value into a JSON document. Timestamps are rendered with
    /// [`DATETIME_FORMAT`].
    pub fn to_json(&self) -> serde_json::Value {
        use serde_json::Value as J;

        match self {
            Value::Null => J::Null,
            Value::Bool(v) => J::Bool(*v),
            Value::I64(v) => J::from(*v),
            Value::F64(v) => serde_json::Number::from_f64(*v)
                .map(J::Number)
                .unwrap_or(J::Null),
            Value::String(v) => J::String(v.clone()),
            Value::DateTime(v) => J::String(v.format(DATETIME_FORMAT).to_string()),
            Value::Json(v) => v.clone(),
            Value::List(items) => J::Array(items.iter().map(Value::to_json).collect()),
            Value::Record(record) => record.to_json(),
        }
    }

    /// A string usable to compare key values regardless of how the driver
    /// decoded them.
    pub fn key_string(&self) -> String {
        match self {
            Value::F64(v) if v.fract() == 0.0 => format!("{}", *v as i64),
            Value::Bool(v) => format!("{}", *v as i64),
            _ => self.to_string(),
        }
    }
}

impl core::fmt::Display for Value {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Value::Null => f.write_str("null"),
            Value::Bool(v) => write!(f, "{v}"),
            Value::I64(v) => write!(f, "{v}"),
            Value::F64(v) => write!(f, "{v}"),
            Value::String(v) => f.write_str(v),
            Value::DateTime(v) => write!(f, "{}", v.format(DATETIME_FORMAT)),
            Value::Json(v) => write!(f, "{v}"),
            Value::List(_) | Value::Record(_) => write!(f, "{}", self.to_json()),
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Null => serializer.serialize_unit(),
            Value::Bool(v) => serializer.serialize_bool(*v),
            Value::I64(v) => serializer.serialize_i64(*v),
            Value::F64(v) => serializer.serialize_f64(*v),
            Value::String(v) => serializer.serialize_str(v),
            Value::DateTime(v) => {
                serializer.collect_str(&format_args!("{}", v.format(DATETIME_FORMAT)))
            }
            Value::Json(v) => v.serialize(serializer),
            Value::List(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Value::Record(record) => record.serialize(serializer),
        }
    }
}

impl From<bool> for Value {
    fn from(src: bool) -> Value {
        Value::Bool(src)
    }
}

impl From<i64> for Value {
    fn from(src: i64) -> Value {
        Value::I64(src)
    }
}

impl From<i32> for Value {
    fn from(src: i32) -> Value {
        Value::I64(src as i64)
    }
}

impl From<u64> for Value {
    fn from(src: u64) -> Value {
        match i64::try_from(src) {
            Ok(v) => Value::I64(v),
            Err(_) => Value::F64(src as f64),
        }
    }
}

impl From<f64> for Value {
    fn from(src: f64) -> Value {
        Value::F64(src)
    }
}

impl From<String> for Value {
    fn from(src: String) -> Value {
        Value::String(src)
    }
}

impl From<&str> for Value {
    fn from(src: &str) -> Value {
        Value::String(src.to_string())
    }
}

impl From<NaiveDateTime> for Value {
    fn from(src: NaiveDateTime) -> Value {
        Value::DateTime(src)
    }
}

impl From<Record> for Value {
    fn from(src: Record) -> Value {
        Value::Record(src)
    }
}

impl From<Vec<Value>> for Value {
    fn from(src: Vec<Value>) -> Value {
        Value::List(src)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(src: Option<T>) -> Value {
        match src {
            Some(v) => v.into(),
            None => Value::Null,
        }
    }
}
