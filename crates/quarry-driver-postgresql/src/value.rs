use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use quarry_core::stmt::{self, Value as CoreValue, DATETIME_FORMAT};
use rust_decimal::Decimal;
use std::{error::Error as StdError, str::FromStr};
use tokio_postgres::{
    types::{private::BytesMut, to_sql_checked, FromSql, IsNull, ToSql, Type},
    Column, Row,
};

type BoxError = Box<dyn StdError + Sync + Send>;

/// A core value bound to a parameter whose type the server inferred.
///
/// Values are carried loosely (decimals and enum members as strings,
/// integers as `i64`), so the conversion follows the parameter type rather
/// than the value.
#[derive(Debug)]
pub struct Value(pub(crate) CoreValue);

impl From<CoreValue> for Value {
    fn from(value: CoreValue) -> Self {
        Self(value)
    }
}

impl ToSql for Value {
    fn to_sql(&self, ty: &Type, out: &mut BytesMut) -> Result<IsNull, BoxError> {
        match &self.0 {
            CoreValue::Null => Ok(IsNull::Yes),
            CoreValue::Bool(value) => match *ty {
                Type::BOOL => value.to_sql(ty, out),
                _ => int_to_sql(*value as i64, ty, out),
            },
            CoreValue::I64(value) => int_to_sql(*value, ty, out),
            CoreValue::F64(value) => match *ty {
                Type::FLOAT4 => (*value as f32).to_sql(ty, out),
                Type::NUMERIC => Decimal::try_from(*value)?.to_sql(ty, out),
                Type::INT2 | Type::INT4 | Type::INT8 => int_to_sql(*value as i64, ty, out),
                Type::TEXT | Type::VARCHAR => value.to_string().to_sql(ty, out),
                _ => value.to_sql(ty, out),
            },
            CoreValue::String(value) => text_to_sql(value, ty, out),
            CoreValue::DateTime(value) => match *ty {
                Type::TIMESTAMPTZ => value.and_utc().to_sql(ty, out),
                Type::DATE => value.date().to_sql(ty, out),
                Type::TEXT | Type::VARCHAR => {
                    value.format(DATETIME_FORMAT).to_string().to_sql(ty, out)
                }
                _ => value.to_sql(ty, out),
            },
            CoreValue::Json(value) => json_to_sql(value, ty, out),
            value @ (CoreValue::List(_) | CoreValue::Record(_)) => {
                json_to_sql(&value.to_json(), ty, out)
            }
        }
    }

    fn accepts(_: &Type) -> bool {
        true
    }

    to_sql_checked!();
}

fn int_to_sql(value: i64, ty: &Type, out: &mut BytesMut) -> Result<IsNull, BoxError> {
    match *ty {
        Type::INT2 => i16::try_from(value)?.to_sql(ty, out),
        Type::INT4 => i32::try_from(value)?.to_sql(ty, out),
        Type::FLOAT4 => (value as f32).to_sql(ty, out),
        Type::FLOAT8 => (value as f64).to_sql(ty, out),
        Type::NUMERIC => Decimal::from(value).to_sql(ty, out),
        Type::BOOL => (value != 0).to_sql(ty, out),
        Type::TEXT | Type::VARCHAR => value.to_string().to_sql(ty, out),
        _ => value.to_sql(ty, out),
    }
}

fn text_to_sql(value: &str, ty: &Type, out: &mut BytesMut) -> Result<IsNull, BoxError> {
    match *ty {
        Type::INT2 | Type::INT4 | Type::INT8 => int_to_sql(value.trim().parse()?, ty, out),
        Type::FLOAT4 | Type::FLOAT8 => value.trim().parse::<f64>()?.to_sql(ty, out),
        Type::NUMERIC => Decimal::from_str(value.trim())?.to_sql(ty, out),
        Type::BOOL => matches!(value, "1" | "true" | "TRUE" | "t").to_sql(ty, out),
        Type::UUID => uuid::Uuid::parse_str(value)?.to_sql(ty, out),
        Type::TIMESTAMP => parse_timestamp(value)?.to_sql(ty, out),
        Type::TIMESTAMPTZ => parse_timestamp(value)?.and_utc().to_sql(ty, out),
        Type::DATE => parse_timestamp(value)?.date().to_sql(ty, out),
        Type::JSON | Type::JSONB => {
            let json = serde_json::from_str(value)
                .unwrap_or_else(|_| serde_json::Value::String(value.to_string()));
            json.to_sql(ty, out)
        }
        _ => {
            // Enum members and other text-like types take the raw bytes
            out.extend_from_slice(value.as_bytes());
            Ok(IsNull::No)
        }
    }
}

fn json_to_sql(value: &serde_json::Value, ty: &Type, out: &mut BytesMut) -> Result<IsNull, BoxError> {
    match *ty {
        Type::JSON | Type::JSONB => value.to_sql(ty, out),
        _ => text_to_sql(&value.to_string(), ty, out),
    }
}

fn parse_timestamp(value: &str) -> Result<NaiveDateTime, BoxError> {
    quarry_core::validate::parse_datetime(value)
        .ok_or_else(|| format!("invalid timestamp `{value}`").into())
}

/// Reads any column as UTF-8 text.
struct RawText(String);

impl<'a> FromSql<'a> for RawText {
    fn from_sql(_: &Type, raw: &'a [u8]) -> Result<Self, BoxError> {
        Ok(RawText(String::from_utf8_lossy(raw).into_owned()))
    }

    fn accepts(_: &Type) -> bool {
        true
    }
}

/// Converts the column at `index` of a row to a core value.
pub(crate) fn from_row(row: &Row, index: usize, column: &Column) -> Result<CoreValue, tokio_postgres::Error> {
    let ty = column.type_();

    let value = match *ty {
        Type::BOOL => row.try_get::<_, Option<bool>>(index)?.map(CoreValue::Bool),
        Type::INT2 => row
            .try_get::<_, Option<i16>>(index)?
            .map(|v| CoreValue::I64(v as i64)),
        Type::INT4 => row
            .try_get::<_, Option<i32>>(index)?
            .map(|v| CoreValue::I64(v as i64)),
        Type::INT8 => row.try_get::<_, Option<i64>>(index)?.map(CoreValue::I64),
        Type::FLOAT4 => row
            .try_get::<_, Option<f32>>(index)?
            .map(|v| CoreValue::F64(v as f64)),
        Type::FLOAT8 => row.try_get::<_, Option<f64>>(index)?.map(CoreValue::F64),
        Type::NUMERIC => row
            .try_get::<_, Option<Decimal>>(index)?
            .map(|v| CoreValue::String(v.normalize().to_string())),
        Type::TIMESTAMP => row
            .try_get::<_, Option<NaiveDateTime>>(index)?
            .map(CoreValue::DateTime),
        Type::TIMESTAMPTZ => row
            .try_get::<_, Option<DateTime<Utc>>>(index)?
            .map(|v| CoreValue::DateTime(v.naive_utc())),
        Type::DATE => row
            .try_get::<_, Option<NaiveDate>>(index)?
            .map(|v| CoreValue::DateTime(v.and_time(Default::default()))),
        Type::JSON | Type::JSONB => row
            .try_get::<_, Option<serde_json::Value>>(index)?
            .map(CoreValue::Json),
        Type::UUID => row
            .try_get::<_, Option<uuid::Uuid>>(index)?
            .map(|v| CoreValue::String(v.to_string())),
        // Enums and any other type: read the wire bytes as text
        _ => row
            .try_get::<_, Option<RawText>>(index)?
            .map(|v| CoreValue::String(v.0)),
    };

    Ok(value.unwrap_or(stmt::Value::Null))
}
