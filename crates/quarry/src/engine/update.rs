use super::{
    args::check_data,
    create, defaults,
    mutation::{self, UPDATE_ACTIONS},
    read, Cx,
};
use crate::{db::ModelRuntime, Result};

use async_recursion::async_recursion;
use indexmap::IndexMap;
use quarry_core::{
    query::{Filter, Query},
    schema::{Field, Model, ScalarType},
    stmt::{Placeholders, Record, Sql, Value},
    validate, Error, Schema,
};
use quarry_sql::{compile, Scope, Update};
use serde_json::{Map, Value as Json};

/// Atomic number operations accepted in place of a plain value.
const NUMBER_OPS: &[(&str, &str)] = &[
    ("increment", "+"),
    ("decrement", "-"),
    ("multiply", "*"),
    ("divide", "/"),
];

/// Updates the record matching `filter` and returns it shaped by `query`.
pub(crate) async fn update(
    cx: &mut Cx<'_>,
    rt: &ModelRuntime,
    filter: &Filter,
    data: &Map<String, Json>,
    query: &Query,
) -> Result<Record> {
    cx.begin().await?;
    let result = update_in_tx(cx, rt, filter, data, query).await;
    cx.finish(result).await
}

pub(crate) async fn update_in_tx(
    cx: &mut Cx<'_>,
    rt: &ModelRuntime,
    filter: &Filter,
    data: &Map<String, Json>,
    query: &Query,
) -> Result<Record> {
    let key = update_row(cx, rt, filter, data).await?;
    create::refetch(cx, rt, &key, query).await
}

/// Updates the first record matching `filter`, runs its relation writes and
/// returns its key after the update.
#[async_recursion]
pub(crate) async fn update_row(
    cx: &mut Cx<'_>,
    rt: &ModelRuntime,
    filter: &Filter,
    data: &Map<String, Json>,
) -> Result<Record> {
    let schema = cx.schema();
    let model = &*rt.model;
    check_data(model, data)?;

    let current = read::fetch(cx, rt, filter.clone())
        .await?
        .ok_or_else(|| Error::record_not_found(format!("`{}` to update", model.name)))?;
    let target = key_of(model, &current);
    let mut key = target.clone();

    let mut placeholders = Placeholders::new();
    let mut assignments: IndexMap<&str, Sql> = IndexMap::new();

    // Pass 1: relations whose foreign key lives on this row.
    let mut deferred = vec![];
    for (name, payload) in data {
        let Some(field) = model.field(name).filter(|f| f.is_relation()) else {
            continue;
        };
        if mutation::caller_owns(model, field) {
            let bindings = mutation::process_relation(
                cx,
                rt,
                field,
                payload,
                Some(&current),
                false,
                UPDATE_ACTIONS,
            )
            .await?;
            for (name, value) in bindings {
                let field = model.field_or_err(&name)?;
                assignments.insert(&field.name, placeholders.bind(name.as_str(), value));
            }
        } else {
            deferred.push((field, payload));
        }
    }

    let scope = cx.scope(rt);
    let changed = assign_scalars(schema, model, &scope, data, &mut placeholders, &mut assignments)?;
    for (name, value) in changed {
        if key.contains_key(name) {
            key.insert(name, value);
        }
    }

    if !assignments.is_empty() {
        let stmt = Update {
            table: rt.table.clone(),
            assignments: columns(model, &scope, assignments),
            conditions: compile(&Filter::from_record(&target), &scope, &mut placeholders)?,
        };
        cx.execute(stmt.into_sql()).await?;
    }

    // Pass 2: relations pointing back at this row, with the updated row as
    // their parent.
    if !deferred.is_empty() {
        let parent = read::fetch(cx, rt, Filter::from_record(&key))
            .await?
            .ok_or_else(|| Error::record_not_found(format!("`{}` after update", model.name)))?;
        for (field, payload) in deferred {
            mutation::process_relation(
                cx,
                rt,
                field,
                payload,
                Some(&parent),
                false,
                UPDATE_ACTIONS,
            )
            .await?;
        }
    }

    Ok(key)
}

/// Updates every record matching `filter`. Relation fields in `data` are
/// ignored.
pub(crate) async fn update_many(
    cx: &mut Cx<'_>,
    rt: &ModelRuntime,
    filter: &Filter,
    data: &Map<String, Json>,
) -> Result<u64> {
    let model = &*rt.model;
    check_data(model, data)?;

    let scope = cx.scope(rt);
    let mut placeholders = Placeholders::new();
    let mut assignments = IndexMap::new();
    assign_scalars(cx.schema(), model, &scope, data, &mut placeholders, &mut assignments)?;

    if assignments.is_empty() {
        return Err(Error::validation(format!(
            "no fields to update on `{}`",
            model.name
        )));
    }

    let stmt = Update {
        table: rt.table.clone(),
        assignments: columns(model, &scope, assignments),
        conditions: compile(filter, &scope, &mut placeholders)?,
    };

    cx.begin().await?;
    let result = cx.execute(stmt.into_sql()).await;
    cx.finish(result).await
}

/// Sets plain values on every record matching `filter`; used to write
/// foreign keys.
pub(crate) async fn assign(
    cx: &mut Cx<'_>,
    rt: &ModelRuntime,
    filter: &Filter,
    values: &Record,
) -> Result<u64> {
    let scope = cx.scope(rt);
    let mut placeholders = Placeholders::new();
    let mut assignments = IndexMap::new();
    for (name, value) in values.iter() {
        let field = rt.model.field_or_err(name)?;
        assignments.insert(field.name.as_str(), placeholders.bind(name, value.clone()));
    }

    let stmt = Update {
        table: rt.table.clone(),
        assignments: columns(&rt.model, &scope, assignments),
        conditions: compile(filter, &scope, &mut placeholders)?,
    };
    cx.execute(stmt.into_sql()).await
}

/// Updates the record matching `filter` when there is one and creates it
/// otherwise.
pub(crate) async fn upsert(
    cx: &mut Cx<'_>,
    rt: &ModelRuntime,
    filter: &Filter,
    create: &Map<String, Json>,
    update: &Map<String, Json>,
    query: &Query,
) -> Result<Record> {
    cx.begin().await?;
    let result = upsert_in_tx(cx, rt, filter, create, update, query).await;
    cx.finish(result).await
}

async fn upsert_in_tx(
    cx: &mut Cx<'_>,
    rt: &ModelRuntime,
    filter: &Filter,
    create: &Map<String, Json>,
    update: &Map<String, Json>,
    query: &Query,
) -> Result<Record> {
    if read::fetch(cx, rt, filter.clone()).await?.is_some() {
        update_in_tx(cx, rt, filter, update, query).await
    } else {
        create::create_in_tx(cx, rt, create, query).await
    }
}

/// Compiles the scalar entries of `data` into assignments and stamps
/// `@updatedAt` fields. Returns the plain values that were set.
fn assign_scalars<'a>(
    schema: &Schema,
    model: &'a Model,
    scope: &Scope<'_>,
    data: &Map<String, Json>,
    placeholders: &mut Placeholders,
    assignments: &mut IndexMap<&'a str, Sql>,
) -> Result<Vec<(&'a str, Value)>> {
    let mut changed = vec![];

    for field in model.scalar_fields() {
        let Some(raw) = data.get(&field.name) else {
            continue;
        };

        let sql = match number_op(field, raw) {
            Some((op, amount)) => {
                let amount = validate::validate(&Value::from_json(amount.clone()), field, schema)?;
                if amount.is_null() {
                    return Err(Error::validation(format!(
                        "`{}.{}`: arithmetic needs a number",
                        model.name, field.name
                    )));
                }
                let mut sql = Sql::raw(format!("{} {op} ", scope.column(&field.name)));
                sql.push_sql(placeholders.bind(field.name.as_str(), amount));
                sql
            }
            None => {
                let raw = match raw {
                    Json::Object(map) if map.len() == 1 && map.contains_key("set") => &map["set"],
                    raw => raw,
                };
                let value = validate::validate(&Value::from_json(raw.clone()), field, schema)?;
                if value.is_null() && field.is_required {
                    return Err(Error::validation(format!(
                        "`{}.{}` cannot be null",
                        model.name, field.name
                    )));
                }
                changed.push((field.name.as_str(), value.clone()));
                placeholders.bind(field.name.as_str(), value)
            }
        };
        assignments.insert(&field.name, sql);
    }

    for field in model.scalar_fields().filter(|f| f.is_updated_at) {
        if !assignments.contains_key(field.name.as_str()) {
            assignments.insert(&field.name, placeholders.bind(field.name.as_str(), defaults::now()));
        }
    }

    Ok(changed)
}

/// `{increment: n}` and friends on a numeric field. JSON fields take objects
/// as plain values.
fn number_op<'j>(field: &Field, raw: &'j Json) -> Option<(&'static str, &'j Json)> {
    let Json::Object(map) = raw else {
        return None;
    };
    if map.len() != 1 || !field.scalar_type().is_some_and(ScalarType::is_numeric) {
        return None;
    }
    let (key, amount) = map.iter().next()?;
    NUMBER_OPS
        .iter()
        .find(|(name, _)| name == key)
        .map(|(_, op)| (*op, amount))
}

/// The key fields of `record`.
pub(crate) fn key_of(model: &Model, record: &Record) -> Record {
    model
        .key_fields()
        .into_iter()
        .map(|name| (name.to_string(), record[name].clone()))
        .collect()
}

fn columns(model: &Model, scope: &Scope<'_>, assignments: IndexMap<&str, Sql>) -> Vec<(String, Sql)> {
    assignments
        .into_iter()
        .map(|(name, sql)| (scope.quote(model.column_name(name)), sql))
        .collect()
}
