mod aggregate;
pub use aggregate::{is_all, AggregateFn, Aggregates};

mod filter;
pub use filter::{FieldNode, Filter, FilterEntry, Logical, Operator};

mod having;
pub use having::{Having, HavingOp, HavingTerm};

mod order_by;
pub use order_by::{Direction, OrderTerm};

use crate::{stmt::Record, Error, Result};

use indexmap::IndexMap;
use serde_json::{Map, Value as Json};

/// Keys accepted by the options of a nested relation in `select`/`include`.
pub const NESTED_KEYS: &[&str] = &[
    "select",
    "include",
    "omit",
    "where",
    "orderBy",
    "take",
    "skip",
    "cursor",
    "distinct",
    "join.type",
    "join",
];

/// Read options shared by the find verbs and nested relation selections.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Query {
    pub filter: Filter,
    pub select: Option<IndexMap<String, Selection>>,
    pub include: Option<IndexMap<String, Selection>>,
    pub omit: Vec<String>,
    pub order_by: Vec<OrderTerm>,
    pub take: Option<u64>,
    pub skip: Option<u64>,
    pub cursor: Option<Record>,
    pub distinct: bool,

    /// Relation counts requested through `_count`
    pub relation_counts: Option<RelationCounts>,

    /// `"join.type"` (or `join: {type: ...}`) hint: populate this relation
    /// through a join
    pub join_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Selection {
    /// `field: false`
    Exclude,

    /// `field: true`
    All,

    /// `relation: {select, include, where, ...}`
    Nested(Box<Query>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum RelationCounts {
    /// `_count: true`: every list relation
    All,

    /// `_count: {select: {posts: true}}`
    Fields(Vec<String>),
}

impl Selection {
    pub fn is_selected(&self) -> bool {
        !matches!(self, Selection::Exclude)
    }

    /// Options of a nested selection, if any.
    pub fn query(&self) -> Option<&Query> {
        match self {
            Selection::Nested(query) => Some(query),
            _ => None,
        }
    }
}

impl Query {
    /// Parses read options, rejecting keys not in `allowed`. `context` names
    /// the call in error messages.
    pub fn from_map(map: &Map<String, Json>, allowed: &[&str], context: &str) -> Result<Query> {
        check_keys(map, allowed, context)?;

        let has = |key: &str| map.get(key).is_some_and(|v| !v.is_null());
        if has("select") && has("include") {
            return Err(Error::include_select_conflict(context));
        }

        let mut query = Query::default();

        if let Some(filter) = map.get("where") {
            query.filter = Filter::from_json(filter)?;
        }

        if let Some(select) = map.get("select").filter(|v| !v.is_null()) {
            let (fields, counts) = parse_selection(select, "select", context)?;
            query.select = Some(fields);
            query.relation_counts = counts;
        }

        if let Some(include) = map.get("include").filter(|v| !v.is_null()) {
            let (fields, counts) = parse_selection(include, "include", context)?;
            query.include = Some(fields);
            query.relation_counts = counts;
        }

        if let Some(omit) = map.get("omit") {
            query.omit = parse_omit(omit)?;
        }

        if let Some(order_by) = map.get("orderBy") {
            query.order_by = OrderTerm::parse(order_by)?;
        }

        query.take = parse_count(map, "take")?;
        query.skip = parse_count(map, "skip")?;

        match map.get("cursor") {
            Some(Json::Object(cursor)) => query.cursor = Some(Record::from_json(cursor.clone())),
            Some(Json::Null) | None => {}
            Some(_) => return Err(Error::invalid_criteria("`cursor` must be an object")),
        }

        query.distinct = match map.get("distinct") {
            Some(Json::Bool(b)) => *b,
            Some(Json::Array(fields)) => !fields.is_empty(),
            Some(Json::String(_)) => true,
            _ => false,
        };

        if let Some(join) = map.get("join") {
            query.join_type = match join {
                Json::Object(join) => join.get("type").and_then(Json::as_str).map(String::from),
                Json::String(ty) => Some(ty.clone()),
                _ => return Err(Error::invalid_criteria("`join` must be an object")),
            };
        }

        match map.get("join.type") {
            Some(Json::String(ty)) => query.join_type = Some(ty.clone()),
            Some(Json::Null) | None => {}
            Some(_) => return Err(Error::invalid_criteria("`join.type` must be a string")),
        }

        Ok(query)
    }

    /// The selection tree requested by `select` or `include`.
    pub fn selections(&self) -> Option<&IndexMap<String, Selection>> {
        self.select.as_ref().or(self.include.as_ref())
    }

    /// Whether the query pages through rows.
    pub fn is_paginated(&self) -> bool {
        self.take.is_some() || self.skip.is_some() || self.cursor.is_some()
    }
}

/// Fails with `UnknownCriteriaKey` for the first key not in `allowed`.
pub fn check_keys(map: &Map<String, Json>, allowed: &[&str], context: &str) -> Result<()> {
    match map.keys().find(|k| !allowed.contains(&k.as_str())) {
        Some(key) => Err(Error::unknown_criteria_key(context, key.as_str(), allowed)),
        None => Ok(()),
    }
}

/// The criteria value as an object, or `InvalidCriteria`.
pub fn expect_object<'a>(json: &'a Json, what: &str) -> Result<&'a Map<String, Json>> {
    json.as_object()
        .ok_or_else(|| Error::invalid_criteria(format!("`{what}` must be an object")))
}

fn parse_selection(
    json: &Json,
    key: &str,
    context: &str,
) -> Result<(IndexMap<String, Selection>, Option<RelationCounts>)> {
    let map = expect_object(json, key)?;
    let mut fields = IndexMap::new();
    let mut counts = None;

    for (name, value) in map {
        if name == "_count" {
            counts = parse_relation_counts(value)?;
            continue;
        }

        let selection = match value {
            Json::Bool(true) => Selection::All,
            Json::Bool(false) | Json::Null => Selection::Exclude,
            Json::Object(options) => Selection::Nested(Box::new(Query::from_map(
                options,
                NESTED_KEYS,
                &format!("{context}.{key}.{name}"),
            )?)),
            _ => {
                return Err(Error::invalid_criteria(format!(
                    "`{key}.{name}` must be a boolean or an object"
                )))
            }
        };
        fields.insert(name.clone(), selection);
    }

    Ok((fields, counts))
}

fn parse_relation_counts(json: &Json) -> Result<Option<RelationCounts>> {
    Ok(match json {
        Json::Bool(true) => Some(RelationCounts::All),
        Json::Bool(false) | Json::Null => None,
        Json::Object(options) => {
            let select = options.get("select").unwrap_or(&Json::Null);
            match select {
                Json::Object(fields) => Some(RelationCounts::Fields(
                    fields
                        .iter()
                        .filter(|(_, v)| v.as_bool() == Some(true))
                        .map(|(k, _)| k.clone())
                        .collect(),
                )),
                _ => Some(RelationCounts::All),
            }
        }
        _ => {
            return Err(Error::invalid_criteria(
                "`_count` must be a boolean or an object",
            ))
        }
    })
}

fn parse_omit(json: &Json) -> Result<Vec<String>> {
    match json {
        Json::Object(fields) => Ok(fields
            .iter()
            .filter(|(_, v)| v.as_bool() == Some(true))
            .map(|(k, _)| k.clone())
            .collect()),
        Json::Array(fields) => Ok(fields
            .iter()
            .filter_map(|f| f.as_str().map(String::from))
            .collect()),
        Json::Null => Ok(vec![]),
        _ => Err(Error::invalid_criteria("`omit` must be an object")),
    }
}

fn parse_count(map: &Map<String, Json>, key: &str) -> Result<Option<u64>> {
    match map.get(key) {
        None | Some(Json::Null) => Ok(None),
        Some(value) => value.as_u64().map(Some).ok_or_else(|| {
            Error::invalid_criteria(format!("`{key}` must be a non-negative integer"))
        }),
    }
}
