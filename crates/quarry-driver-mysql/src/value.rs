use chrono::NaiveDate;
use mysql_async::prelude::ToValue;
use quarry_core::stmt::{Value as CoreValue, DATETIME_FORMAT};

#[derive(Debug)]
pub struct Value(CoreValue);

impl From<CoreValue> for Value {
    fn from(value: CoreValue) -> Self {
        Self(value)
    }
}

impl Value {
    pub fn into_inner(self) -> CoreValue {
        self.0
    }

    /// Converts a MySQL value to a core value. Decimals and strings arrive
    /// as bytes and are kept as text.
    pub fn from_sql(value: mysql_async::Value) -> Self {
        use mysql_async::Value as V;

        let core = match value {
            V::NULL => CoreValue::Null,
            V::Bytes(bytes) => CoreValue::String(String::from_utf8_lossy(&bytes).into_owned()),
            V::Int(v) => CoreValue::I64(v),
            V::UInt(v) => i64::try_from(v)
                .map(CoreValue::I64)
                .unwrap_or(CoreValue::F64(v as f64)),
            V::Float(v) => CoreValue::F64(v as f64),
            V::Double(v) => CoreValue::F64(v),
            V::Date(year, month, day, hour, minute, second, micros) => {
                NaiveDate::from_ymd_opt(year as i32, month as u32, day as u32)
                    .and_then(|date| {
                        date.and_hms_micro_opt(hour as u32, minute as u32, second as u32, micros)
                    })
                    .map(CoreValue::DateTime)
                    .unwrap_or(CoreValue::Null)
            }
            V::Time(negative, days, hours, minutes, seconds, _) => {
                let hours = days * 24 + hours as u32;
                let sign = if negative { "-" } else { "" };
                CoreValue::String(format!("{sign}{hours:02}:{minutes:02}:{seconds:02}"))
            }
        };

        Value(core)
    }
}

impl ToValue for Value {
    fn to_value(&self) -> mysql_async::Value {
        match &self.0 {
            CoreValue::Null => mysql_async::Value::NULL,
            CoreValue::Bool(value) => value.to_value(),
            CoreValue::I64(value) => value.to_value(),
            CoreValue::F64(value) => value.to_value(),
            CoreValue::String(value) => value.to_value(),
            CoreValue::DateTime(value) => value.format(DATETIME_FORMAT).to_string().to_value(),
            CoreValue::Json(value) => value.to_string().to_value(),
            value @ (CoreValue::List(_) | CoreValue::Record(_)) => {
                value.to_json().to_string().to_value()
            }
        }
    }
}
