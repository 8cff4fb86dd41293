//! Turns driver rows into records: values are decoded to the declared field
//! types and the dotted aliases of joined relations are folded back into
//! nested records.

use indexmap::IndexMap;
use quarry_core::{
    schema::{Field, FieldKind, Model, ScalarType, Schema},
    stmt::{Record, Value},
    validate,
};

/// Key under which relation counts are returned.
pub(crate) const COUNT_KEY: &str = "_count";

pub(crate) fn hydrate(schema: &Schema, model: &Model, row: Record) -> Record {
    let mut out = Record::new();
    let mut nested: IndexMap<String, Record> = IndexMap::new();

    for (key, value) in row {
        match key.split_once('.') {
            Some((head, rest)) => {
                nested
                    .entry(head.to_string())
                    .or_default()
                    .insert(rest, value);
            }
            None => {
                let value = match model.field(&key) {
                    Some(field) => decode(field, value),
                    None => value,
                };
                out.insert(key, value);
            }
        }
    }

    for (head, record) in nested {
        if head == COUNT_KEY {
            let counts = record
                .into_iter()
                .map(|(name, value)| (name, count(value)))
                .collect::<Record>();
            out.insert(COUNT_KEY, counts);
            continue;
        }

        let related = model
            .field(&head)
            .and_then(|field| schema.related_model(model, field).ok());

        let value = match related {
            // A LEFT join without a match yields only nulls
            _ if record.iter().all(|(_, v)| v.is_null()) => Value::Null,
            Some(related) => Value::Record(hydrate(schema, related, record)),
            None => Value::Record(record),
        };
        out.insert(head, value);
    }

    out
}

/// Decodes a value read from the database to the type of `field`. Values
/// that cannot be decoded are returned unchanged.
pub(crate) fn decode(field: &Field, value: Value) -> Value {
    if value.is_null() {
        return value;
    }

    match &field.kind {
        FieldKind::Scalar(ty) if field.is_list => match value {
            Value::String(s) => match serde_json::from_str::<serde_json::Value>(&s) {
                Ok(serde_json::Value::Array(items)) => Value::List(
                    items
                        .into_iter()
                        .map(|item| decode_scalar(*ty, Value::from_json(item)))
                        .collect(),
                ),
                _ => Value::String(s),
            },
            Value::Json(serde_json::Value::Array(items)) => Value::List(
                items
                    .into_iter()
                    .map(|item| decode_scalar(*ty, Value::from_json(item)))
                    .collect(),
            ),
            other => other,
        },
        FieldKind::Scalar(ty) => decode_scalar(*ty, value),
        FieldKind::Enum(_) => match value {
            Value::String(_) => value,
            other => Value::String(other.to_string()),
        },
        FieldKind::Object(_) => value,
    }
}

pub(crate) fn decode_scalar(ty: ScalarType, value: Value) -> Value {
    match (ty, value) {
        (_, Value::Null) => Value::Null,

        (ScalarType::Int | ScalarType::BigInt, Value::F64(v)) if v.fract() == 0.0 => {
            Value::I64(v as i64)
        }
        (ScalarType::Int | ScalarType::BigInt, Value::String(s)) => match integer(&s) {
            Some(v) => Value::I64(v),
            None => Value::String(s),
        },
        (ScalarType::Int | ScalarType::BigInt, Value::Bool(b)) => Value::I64(b as i64),

        (ScalarType::Float, Value::I64(v)) => Value::F64(v as f64),
        (ScalarType::Float, Value::String(s)) => match s.trim().parse::<f64>() {
            Ok(v) => Value::F64(v),
            Err(_) => Value::String(s),
        },

        (ScalarType::Decimal, Value::I64(v)) => Value::String(v.to_string()),
        (ScalarType::Decimal, Value::F64(v)) => Value::String(v.to_string()),

        (ScalarType::Boolean, Value::I64(v)) => Value::Bool(v != 0),
        (ScalarType::Boolean, Value::String(s)) => {
            match s.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "t" => Value::Bool(true),
                "0" | "false" | "f" => Value::Bool(false),
                _ => Value::String(s),
            }
        }

        (ScalarType::DateTime, Value::String(s)) => match validate::parse_datetime(&s) {
            Some(dt) => Value::DateTime(dt),
            None => Value::String(s),
        },

        (ScalarType::Json, Value::String(s)) => match serde_json::from_str(&s) {
            Ok(json) => Value::Json(json),
            Err(_) => Value::Json(serde_json::Value::String(s)),
        },
        (ScalarType::Json, Value::Json(json)) => Value::Json(json),
        (ScalarType::Json, other) => Value::Json(other.to_json()),

        (ScalarType::String, Value::I64(v)) => Value::String(v.to_string()),
        (ScalarType::String, Value::F64(v)) => Value::String(v.to_string()),

        (_, value) => value,
    }
}

/// Decodes a `COUNT(..)` result.
pub(crate) fn count(value: Value) -> Value {
    match value {
        Value::F64(v) => Value::I64(v as i64),
        Value::String(s) => integer(&s).map(Value::I64).unwrap_or(Value::String(s)),
        other => other,
    }
}

/// Decodes an `AVG(..)` result.
pub(crate) fn float(value: Value) -> Value {
    match value {
        Value::I64(v) => Value::F64(v as f64),
        Value::String(s) => match s.trim().parse::<f64>() {
            Ok(v) => Value::F64(v),
            Err(_) => Value::String(s),
        },
        other => other,
    }
}

fn integer(s: &str) -> Option<i64> {
    let s = s.trim();
    s.parse::<i64>().ok().or_else(|| {
        s.parse::<f64>()
            .ok()
            .filter(|v| v.fract() == 0.0)
            .map(|v| v as i64)
    })
}
