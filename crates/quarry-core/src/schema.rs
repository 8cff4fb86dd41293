mod field;
pub use field::{DefaultValue, Field, FieldKind, Generator, Relation, ScalarType};

mod model;
pub use model::{CompoundKey, Model, RelationKeys};

mod parse;

mod pivot;
pub use pivot::Pivot;

mod verify;

use crate::{Error, Result};

use indexmap::IndexMap;
use std::sync::Arc;

/// Model and enum descriptors loaded from a schema document.
///
/// Built once and never mutated; models are shared behind `Arc`.
#[derive(Debug, Default)]
pub struct Schema {
    pub models: IndexMap<String, Arc<Model>>,
    pub enums: IndexMap<String, Enum>,
}

#[derive(Debug, Clone)]
pub struct Enum {
    pub name: String,

    /// Member names, in declaration order
    pub values: Vec<String>,
}

impl Enum {
    pub fn contains(&self, value: &str) -> bool {
        self.values.iter().any(|v| v == value)
    }
}

impl Schema {
    /// Parses a DMMF-shaped schema document (`{"models": [...], "enums": [...]}`).
    pub fn from_json(json: serde_json::Value) -> Result<Schema> {
        let document: parse::Document = serde_json::from_value(json)
            .map_err(|e| Error::invalid_schema(e.to_string()))?;
        let schema = document.build()?;
        schema.verify()?;
        Ok(schema)
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(src: &str) -> Result<Schema> {
        let json: serde_json::Value =
            serde_json::from_str(src).map_err(|e| Error::invalid_schema(e.to_string()))?;
        Schema::from_json(json)
    }

    pub fn model(&self, name: &str) -> Option<&Arc<Model>> {
        self.models.get(name)
    }

    pub fn model_or_err(&self, name: &str) -> Result<&Arc<Model>> {
        self.model(name)
            .ok_or_else(|| Error::invalid_criteria(format!("unknown model `{name}`")))
    }

    pub fn enum_(&self, name: &str) -> Option<&Enum> {
        self.enums.get(name)
    }

    /// The model a relation field points to.
    pub fn related_model(&self, model: &Model, field: &Field) -> Result<&Arc<Model>> {
        match &field.kind {
            FieldKind::Object(target) => self
                .model(target)
                .ok_or_else(|| Error::missing_relation_metadata(&model.name, &field.name)),
            _ => Err(Error::missing_relation_metadata(&model.name, &field.name)),
        }
    }

    /// Finds the field on the other side of a relation: the field of the
    /// related model carrying the same relation name. For self relations the
    /// field with the opposite list-ness is preferred.
    pub fn opposite_field<'a>(&'a self, model: &Model, field: &Field) -> Option<&'a Field> {
        let relation = field.relation.as_ref()?;
        let FieldKind::Object(target) = &field.kind else {
            return None;
        };
        let related = self.model(target)?;

        let mut candidates = related.fields.values().filter(|f| {
            f.relation.as_ref().is_some_and(|r| r.name == relation.name)
                && !(related.name == model.name && f.name == field.name)
        });

        if related.name == model.name {
            let candidates: Vec<_> = candidates.collect();
            candidates
                .iter()
                .find(|f| f.is_list != field.is_list)
                .or_else(|| candidates.first())
                .copied()
        } else {
            candidates.next()
        }
    }
}
