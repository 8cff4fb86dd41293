//! Attaches the relations requested by `include`/`select` to records that
//! were already read.

use super::{
    pivot::Link,
    read::{self, projects},
    Cx,
};
use crate::{db::ModelRuntime, Result};

use async_recursion::async_recursion;
use indexmap::IndexMap;
use quarry_core::{
    query::{Filter, Query, Selection},
    schema::{Field, RelationKeys},
    stmt::{Record, Value},
    Error,
};
use quarry_sql::single_key;

use std::collections::{HashMap, HashSet};

/// Populates every selected relation of `records`. Relations in `joined`
/// were read through joins already; only their own nested list relations
/// are populated here.
#[async_recursion]
pub(crate) async fn populate(
    cx: &mut Cx<'_>,
    rt: &ModelRuntime,
    records: &mut [Record],
    selections: &IndexMap<String, Selection>,
    joined: &HashSet<String>,
) -> Result<()> {
    if records.is_empty() {
        return Ok(());
    }

    let schema = cx.schema();

    for (name, selection) in selections {
        if !selection.is_selected() {
            continue;
        }
        let Some(field) = rt.model.field(name).filter(|f| f.is_relation()) else {
            continue;
        };

        let nested = selection.query().cloned().unwrap_or_default();
        let related = cx.runtime(&schema.related_model(&rt.model, field)?.name)?;

        if joined.contains(name) {
            populate_joined(cx, &related, records, name, &nested).await?;
            continue;
        }

        let keys = rt
            .model
            .relation_keys(name)
            .ok_or_else(|| Error::missing_relation_metadata(&rt.model.name, name))?;

        if keys.is_empty() {
            many_to_many(cx, rt, &related, records, field, &nested).await?;
        } else if field.is_list {
            if keys.from_fields.len() == 1 && !nested.is_paginated() {
                one_to_many(cx, &related, records, field, keys, &nested).await?;
            } else {
                for record in records.iter_mut() {
                    one_to_many_for(cx, &related, record, field, keys, &nested).await?;
                }
            }
        } else {
            let owner = field.holds_foreign_key();
            for record in records.iter_mut() {
                to_one(cx, &related, record, field, keys, owner, &nested).await?;
            }
        }
    }

    Ok(())
}

/// Nested to-one relations of a joined relation were joined as well, so
/// only list relations below it are left.
async fn populate_joined(
    cx: &mut Cx<'_>,
    related: &ModelRuntime,
    records: &mut [Record],
    name: &str,
    nested: &Query,
) -> Result<()> {
    let Some(selections) = nested.selections() else {
        return Ok(());
    };

    let mut joined = HashSet::new();
    let mut lists = false;
    for (field_name, selection) in selections {
        match related.model.field(field_name) {
            Some(f) if selection.is_selected() && f.is_relation() => {
                if f.is_list {
                    lists = true;
                } else {
                    joined.insert(field_name.clone());
                }
            }
            _ => {}
        }
    }
    if !lists && joined.is_empty() {
        return Ok(());
    }

    let mut slots = vec![];
    let mut inner = vec![];
    for (i, record) in records.iter_mut().enumerate() {
        if let Some(Value::Record(r)) = record.get_mut(name) {
            slots.push(i);
            inner.push(std::mem::take(r));
        }
    }

    populate(cx, related, &mut inner, selections, &joined).await?;

    for (i, r) in slots.into_iter().zip(inner) {
        records[i].insert(name, r);
    }
    Ok(())
}

/// One query for the children of every record, grouped by their foreign key.
async fn one_to_many(
    cx: &mut Cx<'_>,
    related: &ModelRuntime,
    records: &mut [Record],
    field: &Field,
    keys: &RelationKeys,
    nested: &Query,
) -> Result<()> {
    let (from, to) = (&keys.from_fields[0], &keys.to_fields[0]);

    let mut seen = HashSet::new();
    let ids: Vec<Value> = records
        .iter()
        .map(|record| &record[to.as_str()])
        .filter(|id| !id.is_null() && seen.insert(id.key_string()))
        .cloned()
        .collect();

    if ids.is_empty() {
        for record in records.iter_mut() {
            record.insert(&field.name, Value::List(vec![]));
        }
        return Ok(());
    }

    let query = Query {
        filter: Filter::and([nested.filter.clone(), Filter::is_in(from.clone(), ids)]),
        ..nested.clone()
    };
    let children = read::find_many(cx, related, &query, std::slice::from_ref(from)).await?;

    let strip = !projects(nested, from);
    let mut groups: HashMap<String, Vec<Value>> = HashMap::new();
    for mut child in children {
        let key = child[from.as_str()].key_string();
        if strip {
            child.remove(from);
        }
        groups.entry(key).or_default().push(Value::Record(child));
    }

    for record in records.iter_mut() {
        let id = &record[to.as_str()];
        let children = if id.is_null() {
            vec![]
        } else {
            groups.get(&id.key_string()).cloned().unwrap_or_default()
        };
        record.insert(&field.name, Value::List(children));
    }

    Ok(())
}

/// Children of one record; used when the nested options page per parent or
/// the foreign key is composite.
async fn one_to_many_for(
    cx: &mut Cx<'_>,
    related: &ModelRuntime,
    record: &mut Record,
    field: &Field,
    keys: &RelationKeys,
    nested: &Query,
) -> Result<()> {
    let link: Record = keys
        .pairs()
        .map(|(from, to)| (from.to_string(), record[to].clone()))
        .collect();

    let children = if link.iter().any(|(_, v)| v.is_null()) {
        vec![]
    } else {
        let query = Query {
            filter: Filter::and([nested.filter.clone(), Filter::from_record(&link)]),
            ..nested.clone()
        };
        read::find_many(cx, related, &query, &[]).await?
    };

    record.insert(
        &field.name,
        Value::List(children.into_iter().map(Value::Record).collect()),
    );
    Ok(())
}

async fn many_to_many(
    cx: &mut Cx<'_>,
    rt: &ModelRuntime,
    related: &ModelRuntime,
    records: &mut [Record],
    field: &Field,
    nested: &Query,
) -> Result<()> {
    let key = single_key(&rt.model, &field.name)?;
    let related_key = single_key(&related.model, &field.name)?;
    let link = Link::new(&rt.model, &related.model);

    for record in records.iter_mut() {
        let id = &record[key];
        let ids = if id.is_null() {
            vec![]
        } else {
            link.related_ids(cx, id).await?
        };

        let children = if ids.is_empty() {
            vec![]
        } else {
            let query = Query {
                filter: Filter::and([nested.filter.clone(), Filter::is_in(related_key, ids)]),
                ..nested.clone()
            };
            read::find_many(cx, related, &query, &[]).await?
        };

        record.insert(
            &field.name,
            Value::List(children.into_iter().map(Value::Record).collect()),
        );
    }

    Ok(())
}

async fn to_one(
    cx: &mut Cx<'_>,
    related: &ModelRuntime,
    record: &mut Record,
    field: &Field,
    keys: &RelationKeys,
    owner: bool,
    nested: &Query,
) -> Result<()> {
    // The owner reads the related row by its referenced fields; otherwise the
    // related row points back at this one.
    let link: Record = keys
        .pairs()
        .map(|(from, to)| {
            if owner {
                (to.to_string(), record[from].clone())
            } else {
                (from.to_string(), record[to].clone())
            }
        })
        .collect();

    let found = if link.iter().any(|(_, v)| v.is_null()) {
        None
    } else {
        let query = Query {
            filter: Filter::and([nested.filter.clone(), Filter::from_record(&link)]),
            ..nested.clone()
        };
        read::find_first(cx, related, &query).await?
    };

    record.insert(&field.name, found.map(Value::Record).unwrap_or(Value::Null));
    Ok(())
}
