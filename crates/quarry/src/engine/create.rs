use super::{
    args::check_data,
    defaults,
    hydrate::decode,
    mutation::{self, CREATE_ACTIONS},
    read, Cx,
};
use crate::{db::ModelRuntime, Result};

use async_recursion::async_recursion;
use indexmap::IndexMap;
use quarry_core::{
    query::{Filter, Query},
    schema::{Field, Model},
    stmt::{Placeholders, Record, Sql, Value},
    validate, Error,
};
use quarry_sql::{Insert, Scope};
use serde_json::{Map, Value as Json};

/// Creates one record with its nested relation writes and returns it
/// shaped by `query`.
pub(crate) async fn create(
    cx: &mut Cx<'_>,
    rt: &ModelRuntime,
    data: &Map<String, Json>,
    query: &Query,
) -> Result<Record> {
    cx.begin().await?;
    let result = create_in_tx(cx, rt, data, query).await;
    cx.finish(result).await
}

#[async_recursion]
pub(crate) async fn create_in_tx(
    cx: &mut Cx<'_>,
    rt: &ModelRuntime,
    data: &Map<String, Json>,
    query: &Query,
) -> Result<Record> {
    let key = insert(cx, rt, data).await?;
    refetch(cx, rt, &key, query).await
}

/// Inserts the row described by `data`, runs its relation writes and
/// returns the key of the new row.
#[async_recursion]
pub(crate) async fn insert(
    cx: &mut Cx<'_>,
    rt: &ModelRuntime,
    data: &Map<String, Json>,
) -> Result<Record> {
    let schema = cx.schema();
    let model = &*rt.model;
    check_data(model, data)?;

    // Pass 1: relations whose foreign key lives on this row.
    let mut bindings = Record::new();
    let mut deferred = vec![];
    for (name, payload) in data {
        let Some(field) = model.field(name).filter(|f| f.is_relation()) else {
            continue;
        };
        if mutation::caller_owns(model, field) {
            let linked =
                mutation::process_relation(cx, rt, field, payload, None, true, CREATE_ACTIONS)
                    .await?;
            for (k, v) in linked {
                bindings.insert(k, v);
            }
        } else {
            deferred.push((field, payload));
        }
    }

    let mut values: IndexMap<&str, Value> = IndexMap::new();
    for field in model.scalar_fields() {
        let value = match data.get(&field.name) {
            Some(raw) => {
                let value = validate::validate(&Value::from_json(raw.clone()), field, schema)?;
                if value.is_null() && field.is_required {
                    return Err(missing(model, field));
                }
                value
            }
            None => match bindings.remove(&field.name) {
                Some(value) => value,
                None => match defaults::default_value(field, schema)? {
                    Some(value) => value,
                    None if field.is_required && !field.has_default_value => {
                        return Err(missing(model, field));
                    }
                    None => continue,
                },
            },
        };
        values.insert(&field.name, value);
    }

    let key = write_row(cx, rt, &values).await?;

    // Pass 2: relations pointing back at the new row.
    if !deferred.is_empty() {
        let mut parent: Record = values
            .iter()
            .map(|(name, value)| (name.to_string(), value.clone()))
            .collect();
        for (name, value) in key.iter() {
            parent.insert(name, value.clone());
        }

        let complete = deferred.iter().all(|(field, _)| {
            read::link_fields(model, field)
                .iter()
                .all(|name| parent.contains_key(name))
        });
        if !complete {
            if let Some(row) = read::fetch(cx, rt, Filter::from_record(&key)).await? {
                parent = row;
            }
        }

        for (field, payload) in deferred {
            mutation::process_relation(
                cx,
                rt,
                field,
                payload,
                Some(&parent),
                false,
                CREATE_ACTIONS,
            )
            .await?;
        }
    }

    Ok(key)
}

/// Runs the `INSERT` and works out the key of the new row: from the bound
/// values, `RETURNING`, or the auto-increment id.
async fn write_row(
    cx: &mut Cx<'_>,
    rt: &ModelRuntime,
    values: &IndexMap<&str, Value>,
) -> Result<Record> {
    let model = &*rt.model;
    let scope = cx.scope(rt);
    let capability = cx.capability();
    let mut placeholders = Placeholders::new();

    let key_fields = model.key_fields();
    let missing_keys: Vec<&Field> = key_fields
        .iter()
        .filter(|name| !values.contains_key(*name))
        .filter_map(|name| model.field(name))
        .collect();

    let mut insert = Insert {
        table: rt.table.clone(),
        ..Insert::default()
    };
    let mut row = vec![];
    for (name, value) in values {
        let field = model.field_or_err(name)?;
        insert.columns.push(scope.quote(&field.db_name));
        row.push(placeholders.bind(*name, value.clone()));
    }
    insert.rows.push(row);

    if capability.returning {
        insert.returning = missing_keys
            .iter()
            .map(|field| returning(&scope, field))
            .collect();
    }
    let returns_rows = !insert.returning.is_empty();

    let response = cx.insert(insert.into_sql(capability), returns_rows).await?;

    let mut key = Record::new();
    for name in &key_fields {
        if let Some(value) = values.get(name) {
            key.insert(*name, value.clone());
        }
    }

    if !missing_keys.is_empty() {
        if returns_rows {
            let returned = response.rows.into_values().into_iter().next().ok_or_else(|| {
                Error::record_not_found(format!("`{}` insert returned no row", model.name))
            })?;
            for field in &missing_keys {
                key.insert(&field.name, decode(field, returned[field.name.as_str()].clone()));
            }
        } else {
            let [field] = missing_keys.as_slice() else {
                return Err(Error::relation_not_properly_defined(
                    &model.name,
                    key_fields.join(", "),
                ));
            };
            let id = response.last_insert_id.ok_or_else(|| {
                Error::validation(format!(
                    "no value for key `{}` of `{}` and the database reported no insert id",
                    field.name, model.name
                ))
            })?;
            key.insert(&field.name, Value::from(id));
        }
    }

    Ok(key)
}

/// Inserts many rows in one statement and returns the number inserted.
/// Rows may only set scalar fields.
pub(crate) async fn create_many(
    cx: &mut Cx<'_>,
    rt: &ModelRuntime,
    rows: &[&Map<String, Json>],
    skip_duplicates: bool,
) -> Result<u64> {
    let schema = cx.schema();
    let model = &*rt.model;
    let capability = cx.capability();
    let scope = cx.scope(rt);

    for row in rows {
        check_data(model, row)?;
        if let Some(name) = row.keys().find(|name| model.field(name).is_some_and(Field::is_relation)) {
            return Err(Error::validation(format!(
                "`{}.createMany` does not accept relation field `{name}`",
                model.name
            )));
        }
    }

    // Every field some row sets, plus the ones filled in here.
    let columns: Vec<&Field> = model
        .scalar_fields()
        .filter(|field| {
            rows.iter().any(|row| row.contains_key(&field.name))
                || field.is_updated_at
                || (field.default.is_some() && !field.is_db_generated())
                || (field.is_required && !field.has_default_value)
        })
        .collect();

    let mut placeholders = Placeholders::new();
    let mut insert = Insert {
        table: rt.table.clone(),
        columns: columns.iter().map(|f| scope.quote(&f.db_name)).collect(),
        on_conflict_ignore: skip_duplicates,
        ..Insert::default()
    };

    for (i, row) in rows.iter().enumerate() {
        let mut values = Vec::with_capacity(columns.len());
        for field in &columns {
            let value = match row.get(&field.name) {
                Some(raw) => Some(validate::validate(&Value::from_json(raw.clone()), field, schema)?),
                None => defaults::default_value(field, schema)?,
            };
            let sql = match value {
                Some(value) if value.is_null() && field.is_required => {
                    return Err(missing(model, field));
                }
                Some(value) => placeholders.bind(format!("{}_{i}", field.name), value),
                None if field.is_db_generated() || field.has_default_value => {
                    if capability.default_in_values {
                        Sql::raw("DEFAULT")
                    } else {
                        Sql::raw("NULL")
                    }
                }
                None if field.is_required => return Err(missing(model, field)),
                None => Sql::raw("NULL"),
            };
            values.push(sql);
        }
        insert.rows.push(values);
    }

    cx.begin().await?;
    let result = cx.execute(insert.into_sql(capability)).await;
    cx.finish(result).await
}

/// Reads a row back by its key, shaped by `query`.
pub(crate) async fn refetch(
    cx: &mut Cx<'_>,
    rt: &ModelRuntime,
    key: &Record,
    query: &Query,
) -> Result<Record> {
    let query = Query {
        filter: Filter::from_record(key),
        select: query.select.clone(),
        include: query.include.clone(),
        omit: query.omit.clone(),
        relation_counts: query.relation_counts.clone(),
        ..Query::default()
    };
    read::find_first(cx, rt, &query)
        .await?
        .ok_or_else(|| Error::record_not_found(format!("`{}` where {}", rt.model.name, key.to_json())))
}

fn returning(scope: &Scope<'_>, field: &Field) -> String {
    format!("{} AS {}", scope.quote(&field.db_name), scope.quote(&field.name))
}

fn missing(model: &Model, field: &Field) -> Error {
    Error::validation(format!(
        "missing required field `{}` on `{}`",
        field.name, model.name
    ))
}
