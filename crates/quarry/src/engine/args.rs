//! Shape checks for verb arguments. Everything here runs before any SQL is
//! issued.

use crate::Result;

use indexmap::IndexMap;
use quarry_core::{
    query::{Query, RelationCounts, Selection},
    schema::{Model, Schema},
    Error,
};
use serde_json::{Map, Value as Json};

pub(crate) const FIND_UNIQUE: &[&str] = &["where", "select", "include", "omit"];
pub(crate) const FIND_MANY: &[&str] = &[
    "where", "orderBy", "take", "skip", "cursor", "select", "include", "omit", "distinct",
];
pub(crate) const CREATE: &[&str] = &["data", "select", "include", "omit"];
pub(crate) const CREATE_MANY: &[&str] = &["data", "skipDuplicates"];
pub(crate) const UPDATE: &[&str] = &["where", "data", "select", "include", "omit"];
pub(crate) const UPDATE_MANY: &[&str] = &["where", "data"];
pub(crate) const DELETE: &[&str] = &["where", "select", "include", "omit"];
pub(crate) const DELETE_MANY: &[&str] = &["where"];
pub(crate) const UPSERT: &[&str] = &["where", "create", "update", "select", "include", "omit"];
pub(crate) const AGGREGATE: &[&str] = &[
    "_avg", "_count", "_max", "_min", "_sum", "where", "cursor", "orderBy", "skip", "take",
];
pub(crate) const GROUP_BY: &[&str] = &[
    "by", "where", "having", "orderBy", "skip", "take", "_count", "_avg", "_sum", "_min", "_max",
];
pub(crate) const COUNT: &[&str] = &["where", "cursor", "orderBy", "select", "skip", "take"];

/// The argument object of a verb. `null` stands for no arguments.
pub(crate) fn object<'a>(args: &'a Json, context: &str) -> Result<&'a Map<String, Json>> {
    static EMPTY: std::sync::OnceLock<Map<String, Json>> = std::sync::OnceLock::new();

    match args {
        Json::Object(map) => Ok(map),
        Json::Null => Ok(EMPTY.get_or_init(Map::new)),
        _ => Err(Error::invalid_criteria(format!(
            "{context}: arguments must be an object"
        ))),
    }
}

/// Reads `key` as an object.
pub(crate) fn required_object<'a>(
    map: &'a Map<String, Json>,
    key: &str,
    context: &str,
) -> Result<&'a Map<String, Json>> {
    match map.get(key) {
        Some(Json::Object(data)) => Ok(data),
        Some(_) => Err(Error::invalid_criteria(format!(
            "{context}: `{key}` must be an object"
        ))),
        None => Err(Error::invalid_criteria(format!(
            "{context}: `{key}` is required"
        ))),
    }
}

/// Parses read options and checks every field they name against `model`.
pub(crate) fn query(
    schema: &Schema,
    model: &Model,
    map: &Map<String, Json>,
    allowed: &[&str],
    context: &str,
) -> Result<Query> {
    if let Some(filter) = map.get("where") {
        if !filter.is_object() && !filter.is_null() {
            return Err(Error::invalid_criteria(format!(
                "{context}: `where` must be an object"
            )));
        }
    }

    let query = Query::from_map(map, allowed, context)?;
    check_query(schema, model, &query, context)?;
    Ok(query)
}

/// Find verbs reject an explicitly empty `where`.
pub(crate) fn non_empty_where(map: &Map<String, Json>, context: &str) -> Result<()> {
    match map.get("where") {
        Some(Json::Object(filter)) if filter.is_empty() => Err(Error::invalid_criteria(format!(
            "{context}: `where` must not be empty"
        ))),
        _ => Ok(()),
    }
}

/// Fails with `NoUniqueCondition` unless `where` identifies one record.
pub(crate) fn unique_where(model: &Model, query: &Query) -> Result<()> {
    if model.is_unique_selector(query.filter.field_names()) {
        Ok(())
    } else {
        Err(Error::no_unique_condition(&model.name))
    }
}

/// Every key of `data` must be a field of `model`.
pub(crate) fn check_data(model: &Model, data: &Map<String, Json>) -> Result<()> {
    match data.keys().find(|key| model.field(key).is_none()) {
        Some(key) => Err(Error::unknown_field(&model.name, key.as_str())),
        None => Ok(()),
    }
}

fn check_query(schema: &Schema, model: &Model, query: &Query, context: &str) -> Result<()> {
    for name in &query.omit {
        model.field_or_err(name)?;
    }

    if let Some(select) = &query.select {
        check_selections(schema, model, select, false, context)?;
    }

    if let Some(include) = &query.include {
        check_selections(schema, model, include, true, context)?;
    }

    if let Some(RelationCounts::Fields(fields)) = &query.relation_counts {
        for name in fields {
            let field = model.field_or_err(name)?;
            if !field.is_relation() || !field.is_list {
                return Err(Error::invalid_criteria(format!(
                    "{context}: `_count` only applies to list relations, `{name}` is not one"
                )));
            }
        }
    }

    if let Some(cursor) = &query.cursor {
        for name in cursor.keys() {
            model.field_or_err(name)?;
        }
    }

    Ok(())
}

fn check_selections(
    schema: &Schema,
    model: &Model,
    selections: &IndexMap<String, Selection>,
    relations_only: bool,
    context: &str,
) -> Result<()> {
    for (name, selection) in selections {
        let field = model.field_or_err(name)?;

        if !field.is_relation() {
            if relations_only && selection.is_selected() {
                return Err(Error::invalid_criteria(format!(
                    "{context}: `include.{name}` is not a relation"
                )));
            }
            if selection.query().is_some() {
                return Err(Error::invalid_criteria(format!(
                    "{context}: scalar field `{name}` does not take nested options"
                )));
            }
            continue;
        }

        if let Some(nested) = selection.query() {
            let related = schema.related_model(model, field)?;
            check_query(schema, related, nested, &format!("{context}.{name}"))?;
        }
    }

    Ok(())
}
