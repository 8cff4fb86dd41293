//! Coercion of caller-provided values to the declared type of a field.

use crate::{
    schema::{Enum, Field, FieldKind, ScalarType, Schema},
    stmt::{Value, DATETIME_FORMAT},
    Error, Result,
};

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use std::str::FromStr;

/// Scale used for decimals without a native type.
pub const DEFAULT_DECIMAL_SCALE: u32 = 30;

#[derive(Debug, Clone, Copy)]
pub struct Constraints {
    /// Maximum number of fractional digits of a `Decimal`
    pub decimal_scale: u32,
}

impl Default for Constraints {
    fn default() -> Self {
        Constraints {
            decimal_scale: DEFAULT_DECIMAL_SCALE,
        }
    }
}

impl Constraints {
    pub fn for_field(field: &Field) -> Constraints {
        Constraints {
            decimal_scale: field.decimal_scale.unwrap_or(DEFAULT_DECIMAL_SCALE),
        }
    }
}

/// Validates a value for `field`: enum membership, scalar coercion, and
/// element-wise coercion for scalar lists (bound as a JSON array). `Null`
/// passes through; required checks belong to the caller.
pub fn validate(raw: &Value, field: &Field, schema: &Schema) -> Result<Value> {
    if raw.is_null() {
        return Ok(Value::Null);
    }

    if field.is_list {
        let Value::List(items) = raw else {
            return Err(Error::validation(format!(
                "expected a list for `{}`, got {raw}",
                field.name
            )));
        };
        let items = items
            .iter()
            .map(|item| validate_one(item, field, schema).map(|v| v.to_json()))
            .collect::<Result<Vec<_>>>()?;
        return Ok(Value::Json(serde_json::Value::Array(items)));
    }

    validate_one(raw, field, schema)
}

fn validate_one(raw: &Value, field: &Field, schema: &Schema) -> Result<Value> {
    match &field.kind {
        FieldKind::Scalar(ty) => coerce(raw, *ty, &Constraints::for_field(field))
            .map_err(|e| e.context(format!("field `{}`", field.name))),
        FieldKind::Enum(name) => {
            let values = schema.enum_(name).ok_or_else(|| {
                Error::validation(format!("unknown enum `{name}` for `{}`", field.name))
            })?;
            enum_coerce(raw, values).map(Value::String).ok_or_else(|| {
                Error::validation(format!(
                    "invalid value {raw} for enum `{name}` on `{}`; expected one of: {}",
                    field.name,
                    values.values.join(", ")
                ))
            })
        }
        FieldKind::Object(_) => Err(Error::validation(format!(
            "relation field `{}` cannot be used as a value",
            field.name
        ))),
    }
}

/// Returns the enum member named by `raw`, or `None` for non-members.
pub fn enum_coerce(raw: &Value, values: &Enum) -> Option<String> {
    let name = raw.as_str()?;
    values.contains(name).then(|| name.to_string())
}

/// Coerces `raw` to `ty`.
pub fn coerce(raw: &Value, ty: ScalarType, constraints: &Constraints) -> Result<Value> {
    if raw.is_null() {
        return Ok(Value::Null);
    }

    let invalid = || {
        Error::validation(format!(
            "expected {}, got {}",
            ty.name(),
            describe(raw)
        ))
    };

    match ty {
        ScalarType::Int | ScalarType::BigInt => match raw {
            Value::I64(v) => Ok(Value::I64(*v)),
            Value::F64(v) => integral(*v).map(Value::I64).ok_or_else(invalid),
            Value::String(s) => {
                let s = s.trim();
                s.parse::<i64>()
                    .ok()
                    .or_else(|| {
                        s.parse::<f64>().ok().and_then(integral)
                    })
                    .map(Value::I64)
                    .ok_or_else(invalid)
            }
            _ => Err(invalid()),
        },
        ScalarType::Float => match raw {
            Value::I64(v) => Ok(Value::F64(*v as f64)),
            Value::F64(v) => Ok(Value::F64(*v)),
            Value::String(s) => s
                .trim()
                .parse::<f64>()
                .map(Value::F64)
                .map_err(|_| invalid()),
            _ => Err(invalid()),
        },
        ScalarType::Decimal => {
            let decimal = match raw {
                Value::I64(v) => Decimal::from(*v),
                Value::F64(v) => Decimal::try_from(*v).map_err(|_| invalid())?,
                Value::String(s) => Decimal::from_str(s.trim())
                    .or_else(|_| Decimal::from_scientific(s.trim()))
                    .map_err(|_| invalid())?,
                _ => return Err(invalid()),
            };
            if decimal.normalize().scale() > constraints.decimal_scale {
                return Err(Error::validation(format!(
                    "decimal {decimal} has more than {} fractional digits",
                    constraints.decimal_scale
                )));
            }
            Ok(Value::String(decimal.to_string()))
        }
        ScalarType::String => match raw {
            Value::String(s) => Ok(Value::String(s.clone())),
            Value::I64(_) | Value::F64(_) | Value::Bool(_) | Value::DateTime(_) => {
                Ok(Value::String(raw.to_string()))
            }
            _ => Err(invalid()),
        },
        ScalarType::Boolean => match raw {
            Value::Bool(b) => Ok(Value::Bool(*b)),
            Value::I64(0) => Ok(Value::Bool(false)),
            Value::I64(1) => Ok(Value::Bool(true)),
            Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
                "true" | "1" => Ok(Value::Bool(true)),
                "false" | "0" => Ok(Value::Bool(false)),
                _ => Err(invalid()),
            },
            _ => Err(invalid()),
        },
        ScalarType::DateTime => match raw {
            Value::DateTime(dt) => Ok(Value::DateTime(*dt)),
            Value::String(s) => parse_datetime(s).map(Value::DateTime).ok_or_else(invalid),
            Value::I64(secs) => DateTime::from_timestamp(*secs, 0)
                .map(|dt| Value::DateTime(dt.naive_utc()))
                .ok_or_else(invalid),
            _ => Err(invalid()),
        },
        ScalarType::Json => Ok(match raw {
            Value::Json(json) => Value::Json(json.clone()),
            Value::String(s) => match serde_json::from_str(s) {
                Ok(json) => Value::Json(json),
                Err(_) => Value::Json(serde_json::Value::String(s.clone())),
            },
            other => Value::Json(other.to_json()),
        }),
    }
}

/// Parses the timestamp forms accepted for `DateTime` fields.
pub fn parse_datetime(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_utc());
    }

    for format in [
        DATETIME_FORMAT,
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%dT%H:%M:%S%.f",
    ] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, format) {
            return Some(dt);
        }
    }

    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

/// `f` as an integer when it has no fraction and fits in `i64`.
fn integral(f: f64) -> Option<i64> {
    // i64::MAX rounds up to 2^63 as a float, so the upper bound is exclusive
    const BOUND: f64 = 9_223_372_036_854_775_808.0;
    (f.fract() == 0.0 && (-BOUND..BOUND).contains(&f)).then_some(f as i64)
}

fn describe(raw: &Value) -> String {
    match raw {
        Value::String(s) => format!("{s:?}"),
        Value::List(_) => "a list".to_string(),
        Value::Record(_) => "an object".to_string(),
        other => other.to_string(),
    }
}
