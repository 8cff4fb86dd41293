use super::{
    CompoundKey, DefaultValue, Enum, Field, FieldKind, Generator, Model, Relation, RelationKeys,
    ScalarType, Schema,
};
use crate::{stmt::Value, Error, Result};

use indexmap::IndexMap;
use serde::Deserialize;
use std::sync::Arc;

#[derive(Debug, Deserialize)]
pub(super) struct Document {
    models: Vec<RawModel>,
    #[serde(default)]
    enums: Vec<RawEnum>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawModel {
    name: String,
    #[serde(default)]
    db_name: Option<String>,
    fields: Vec<RawField>,
    #[serde(default)]
    primary_key: Option<RawKey>,
    #[serde(default)]
    unique_fields: Vec<Vec<String>>,
    #[serde(default)]
    unique_indexes: Vec<RawKey>,
}

#[derive(Debug, Deserialize)]
struct RawKey {
    #[serde(default)]
    name: Option<String>,
    fields: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawField {
    name: String,
    kind: String,
    #[serde(rename = "type")]
    ty: String,
    #[serde(default)]
    db_name: Option<String>,
    #[serde(default)]
    is_list: bool,
    #[serde(default)]
    is_required: bool,
    #[serde(default)]
    is_unique: bool,
    #[serde(default)]
    is_id: bool,
    #[serde(default)]
    is_read_only: bool,
    #[serde(default)]
    has_default_value: bool,
    #[serde(default)]
    default: Option<serde_json::Value>,
    #[serde(default)]
    is_updated_at: bool,
    #[serde(default)]
    native_type: Option<serde_json::Value>,
    #[serde(default)]
    relation_name: Option<String>,
    #[serde(default)]
    relation_from_fields: Option<Vec<String>>,
    #[serde(default)]
    relation_to_fields: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
struct RawEnum {
    name: String,
    values: Vec<RawEnumValue>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawEnumValue {
    Name(String),
    Detailed { name: String },
}

impl Document {
    pub(super) fn build(self) -> Result<Schema> {
        let enums = self
            .enums
            .into_iter()
            .map(|raw| {
                let values = raw
                    .values
                    .into_iter()
                    .map(|v| match v {
                        RawEnumValue::Name(name) | RawEnumValue::Detailed { name } => name,
                    })
                    .collect();
                (
                    raw.name.clone(),
                    Enum {
                        name: raw.name,
                        values,
                    },
                )
            })
            .collect();

        let mut models = IndexMap::new();
        for raw in self.models {
            let model = raw.build()?;
            models.insert(model.name.clone(), model);
        }

        resolve_relation_keys(&mut models);

        Ok(Schema {
            models: models
                .into_iter()
                .map(|(name, model)| (name, Arc::new(model)))
                .collect(),
            enums,
        })
    }
}

impl RawModel {
    fn build(self) -> Result<Model> {
        let mut fields = IndexMap::new();
        for raw in self.fields {
            let field = raw.build(&self.name)?;
            fields.insert(field.name.clone(), field);
        }

        let mut unique_indexes: Vec<CompoundKey> = vec![];
        let mut push_key = |name: Option<String>, key_fields: Vec<String>| {
            if key_fields.len() < 2 || unique_indexes.iter().any(|k| k.fields == key_fields) {
                return;
            }
            unique_indexes.push(CompoundKey {
                name: name.unwrap_or_else(|| key_fields.join("_")),
                fields: key_fields,
            });
        };

        let (primary_key, composite_key_fields) = match self.primary_key {
            Some(RawKey { fields: key, .. }) if key.len() == 1 => (key.into_iter().next(), vec![]),
            Some(RawKey { name, fields: key }) => {
                push_key(name, key.clone());
                (None, key)
            }
            None => (
                fields.values().find(|f| f.is_id).map(|f| f.name.clone()),
                vec![],
            ),
        };

        for key in self.unique_indexes {
            push_key(key.name, key.fields);
        }
        for key in self.unique_fields {
            push_key(None, key);
        }

        Ok(Model {
            table_name: self.db_name.unwrap_or_else(|| self.name.clone()),
            name: self.name,
            fields,
            primary_key,
            composite_key_fields,
            unique_indexes,
            relation_keys: IndexMap::new(),
        })
    }
}

impl RawField {
    fn build(self, model: &str) -> Result<Field> {
        let from_fields = self.relation_from_fields.unwrap_or_default();
        let to_fields = self.relation_to_fields.unwrap_or_default();

        let (kind, relation) = match self.kind.as_str() {
            "scalar" => {
                if !from_fields.is_empty() || !to_fields.is_empty() {
                    return Err(Error::invalid_schema(format!(
                        "scalar field `{model}.{}` cannot carry relation keys",
                        self.name
                    )));
                }
                let ty = ScalarType::from_name(&self.ty).ok_or_else(|| {
                    Error::invalid_schema(format!(
                        "field `{model}.{}` has unknown type `{}`",
                        self.name, self.ty
                    ))
                })?;
                (FieldKind::Scalar(ty), None)
            }
            "enum" => (FieldKind::Enum(self.ty.clone()), None),
            "object" => {
                if from_fields.len() != to_fields.len() {
                    return Err(Error::invalid_schema(format!(
                        "relation `{model}.{}` has {} `from` field(s) but {} `to` field(s)",
                        self.name,
                        from_fields.len(),
                        to_fields.len()
                    )));
                }
                let name = self
                    .relation_name
                    .unwrap_or_else(|| implicit_relation_name(model, &self.ty));
                (
                    FieldKind::Object(self.ty.clone()),
                    Some(Relation {
                        name,
                        from_fields,
                        to_fields,
                    }),
                )
            }
            other => {
                return Err(Error::invalid_schema(format!(
                    "field `{model}.{}` has unknown kind `{other}`",
                    self.name
                )))
            }
        };

        Ok(Field {
            db_name: self.db_name.unwrap_or_else(|| self.name.clone()),
            name: self.name,
            kind,
            is_list: self.is_list,
            is_required: self.is_required,
            is_unique: self.is_unique,
            is_id: self.is_id,
            is_read_only: self.is_read_only,
            has_default_value: self.has_default_value,
            default: self.default.and_then(parse_default),
            is_updated_at: self.is_updated_at,
            decimal_scale: self.native_type.as_ref().and_then(decimal_scale),
            relation,
        })
    }
}

fn parse_default(json: serde_json::Value) -> Option<DefaultValue> {
    match json {
        serde_json::Value::Null => None,
        serde_json::Value::Object(map) => match map.get("name").and_then(|n| n.as_str()) {
            Some(name) => Some(DefaultValue::Generator(Generator::from_name(name))),
            None => Some(DefaultValue::Literal(Value::from_json(
                serde_json::Value::Object(map),
            ))),
        },
        other => Some(DefaultValue::Literal(Value::from_json(other))),
    }
}

/// Scale of a `["Decimal", ["precision", "scale"]]` native type.
fn decimal_scale(native_type: &serde_json::Value) -> Option<u32> {
    let parts = native_type.as_array()?;
    if parts.first()?.as_str()? != "Decimal" {
        return None;
    }
    parts.get(1)?.as_array()?.get(1)?.as_str()?.parse().ok()
}

fn implicit_relation_name(a: &str, b: &str) -> String {
    if a <= b {
        format!("{a}To{b}")
    } else {
        format!("{b}To{a}")
    }
}

/// Fills `relation_keys` for every relation field. Back relations take the
/// keys of the opposite field with the same relation name.
fn resolve_relation_keys(models: &mut IndexMap<String, Model>) {
    let mut resolved = vec![];

    for model in models.values() {
        for field in model.fields.values() {
            let Some(relation) = &field.relation else {
                continue;
            };
            let FieldKind::Object(target) = &field.kind else {
                continue;
            };

            let keys = if !relation.from_fields.is_empty() {
                RelationKeys {
                    from_fields: relation.from_fields.clone(),
                    to_fields: relation.to_fields.clone(),
                }
            } else {
                models
                    .get(target)
                    .and_then(|related| {
                        related.fields.values().find_map(|other| {
                            let r = other.relation.as_ref()?;
                            let same_field = related.name == model.name && other.name == field.name;
                            (r.name == relation.name && !same_field && !r.from_fields.is_empty())
                                .then(|| RelationKeys {
                                    from_fields: r.from_fields.clone(),
                                    to_fields: r.to_fields.clone(),
                                })
                        })
                    })
                    .unwrap_or_default()
            };

            resolved.push((model.name.clone(), field.name.clone(), keys));
        }
    }

    for (model, field, keys) in resolved {
        if let Some(model) = models.get_mut(&model) {
            model.relation_keys.insert(field, keys);
        }
    }
}
