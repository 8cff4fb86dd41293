use super::Field;
use crate::{Error, Result};

use indexmap::IndexMap;

#[derive(Debug, Clone)]
pub struct Model {
    /// The model name
    pub name: String,

    /// Table the model is stored in
    pub table_name: String,

    /// Fields in declaration order
    pub fields: IndexMap<String, Field>,

    /// Single-field primary key. `None` when the key is composite.
    pub primary_key: Option<String>,

    /// Fields of a composite primary key; empty otherwise.
    pub composite_key_fields: Vec<String>,

    /// Compound unique constraints
    pub unique_indexes: Vec<CompoundKey>,

    /// Join keys per relation field, resolved from the field itself or the
    /// opposite side of the relation.
    pub(super) relation_keys: IndexMap<String, RelationKeys>,
}

/// A named group of fields that together identify a record.
#[derive(Debug, Clone, PartialEq)]
pub struct CompoundKey {
    /// Name used in `where` (`a_b` unless the schema names it)
    pub name: String,
    pub fields: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RelationKeys {
    pub from_fields: Vec<String>,
    pub to_fields: Vec<String>,
}

impl RelationKeys {
    /// No keys on either side: an implicit many-to-many relation.
    pub fn is_empty(&self) -> bool {
        self.from_fields.is_empty() && self.to_fields.is_empty()
    }

    /// Pairs of `(from, to)` fields.
    pub fn pairs(&self) -> impl Iterator<Item = (&str, &str)> + '_ {
        self.from_fields
            .iter()
            .zip(&self.to_fields)
            .map(|(from, to)| (from.as_str(), to.as_str()))
    }
}

impl Model {
    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.get(name)
    }

    pub fn field_or_err(&self, name: &str) -> Result<&Field> {
        self.field(name)
            .ok_or_else(|| Error::unknown_field(&self.name, name))
    }

    /// Column name of a field, falling back to the given name.
    pub fn column_name<'a>(&'a self, name: &'a str) -> &'a str {
        self.field(name).map(|f| f.db_name.as_str()).unwrap_or(name)
    }

    pub fn relation_keys(&self, field: &str) -> Option<&RelationKeys> {
        self.relation_keys.get(field)
    }

    /// Returns `true` when every named field belongs to this model. Decides
    /// which side of a relation holds the foreign key.
    pub fn owns_fields(&self, names: &[String]) -> bool {
        !names.is_empty() && names.iter().all(|name| self.fields.contains_key(name))
    }

    pub fn scalar_fields(&self) -> impl Iterator<Item = &Field> + '_ {
        self.fields.values().filter(|f| !f.is_relation())
    }

    pub fn scalar_field_names(&self) -> impl Iterator<Item = &str> + '_ {
        self.scalar_fields().map(|f| f.name.as_str())
    }

    pub fn relation_fields(&self) -> impl Iterator<Item = &Field> + '_ {
        self.fields.values().filter(|f| f.is_relation())
    }

    /// Fields identifying a record: the primary key, or the fields of the
    /// composite key.
    pub fn key_fields(&self) -> Vec<&str> {
        match &self.primary_key {
            Some(pk) => vec![pk.as_str()],
            None => self.composite_key_fields.iter().map(String::as_str).collect(),
        }
    }

    /// The composite primary key followed by compound unique constraints.
    pub fn compound_keys(&self) -> &[CompoundKey] {
        &self.unique_indexes
    }

    /// Single fields that identify a record on their own.
    pub fn primary_and_unique_field_names(&self) -> impl Iterator<Item = &str> + '_ {
        self.fields
            .values()
            .filter(|f| (f.is_id || f.is_unique) && !f.is_relation())
            .map(|f| f.name.as_str())
    }

    /// Returns `true` when the given `where` keys identify at most one
    /// record: a primary or unique field, a compound key name, or every field
    /// of a compound key.
    pub fn is_unique_selector<'a>(&self, keys: impl IntoIterator<Item = &'a str>) -> bool {
        let keys: Vec<&str> = keys.into_iter().collect();

        let single = keys.iter().any(|key| {
            self.field(key)
                .is_some_and(|f| (f.is_id || f.is_unique) && !f.is_relation())
                || self.compound_key(key).is_some()
        });

        single
            || self
                .unique_indexes
                .iter()
                .any(|c| c.fields.iter().all(|f| keys.contains(&f.as_str())))
    }

    /// The compound key registered under `name`.
    pub fn compound_key(&self, name: &str) -> Option<&CompoundKey> {
        self.unique_indexes.iter().find(|c| c.name == name)
    }
}
