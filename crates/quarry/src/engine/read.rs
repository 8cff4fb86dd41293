use super::{hydrate::hydrate, populate, Cx};
use crate::{db::ModelRuntime, Result};

use async_recursion::async_recursion;
use quarry_core::{
    query::{Filter, OrderTerm, Query, RelationCounts, Selection},
    schema::{Field, Model, Schema},
    stmt::{Placeholders, Record, Sql},
    validate, Error,
};
use quarry_sql::{
    apply_modifiers, compile, join_clause, plan_joins, relation_count, JoinType, Modifiers, Scope,
    Select,
};

use indexmap::IndexMap;
use std::collections::HashSet;

/// Runs a read and returns hydrated records with their relations populated.
///
/// Fields needed only to link relations are fetched and stripped again,
/// except the ones named in `keep`, which the caller strips itself.
#[async_recursion]
pub(crate) async fn find_many(
    cx: &mut Cx<'_>,
    rt: &ModelRuntime,
    query: &Query,
    keep: &[String],
) -> Result<Vec<Record>> {
    let schema = cx.schema();
    let model = &*rt.model;
    let scope = cx.scope(rt);
    let mut placeholders = Placeholders::new();
    let mut select = Select::new(rt.table.as_str());

    let selections = query.selections();

    // Top-level to-one relations carrying a `join` hint are read through
    // joins; every other relation is populated afterwards.
    let hinted: IndexMap<String, Selection> = selections
        .into_iter()
        .flatten()
        .filter(|(name, selection)| {
            selection.query().is_some_and(|q| q.join_type.is_some())
                && model
                    .field(name)
                    .is_some_and(|f| f.is_relation() && !f.is_list)
        })
        .map(|(name, selection)| (name.clone(), selection.clone()))
        .collect();
    let joined: HashSet<String> = hinted.keys().cloned().collect();

    let mut hidden = vec![];
    for field in model.scalar_fields() {
        if projects(query, &field.name) {
            select.columns.push(column(&scope, field));
        }
    }

    let mut needed: Vec<&str> = keep.iter().map(String::as_str).collect();
    for (name, selection) in selections.into_iter().flatten() {
        if !selection.is_selected() || joined.contains(name) {
            continue;
        }
        if let Some(field) = model.field(name).filter(|f| f.is_relation()) {
            needed.extend(link_fields(model, field));
        }
    }
    if select.columns.is_empty() && query.relation_counts.is_none() && joined.is_empty() {
        needed.extend(model.key_fields());
    }
    for name in needed {
        if projects(query, name) || hidden.iter().any(|h| h == name) {
            continue;
        }
        let field = model.field_or_err(name)?;
        select.columns.push(column(&scope, field));
        hidden.push(name.to_string());
    }

    if !hinted.is_empty() {
        let plan = plan_joins(&hinted, &rt.table, model, &scope, JoinType::Left, "")?;
        select.columns.extend(plan.columns);
        select.joins.extend(plan.joins);
    }

    let mut order_joined = joined.clone();
    for term in &query.order_by {
        let OrderTerm::Relation { relation, .. } = term else {
            continue;
        };
        if !order_joined.insert(relation.clone()) {
            continue;
        }
        let field = model.field_or_err(relation)?;
        if !field.is_relation() || field.is_list {
            return Err(Error::invalid_criteria(format!(
                "`orderBy.{relation}` requires a to-one relation"
            )));
        }
        let related = schema.related_model(model, field)?;
        let alias = scope.quote(relation);
        select.joins.push(join_clause(
            &scope,
            model,
            field,
            related,
            &rt.table,
            &alias,
            JoinType::Left,
        )?);
    }

    if let Some(counts) = &query.relation_counts {
        let fields: Vec<&Field> = match counts {
            RelationCounts::All => model
                .relation_fields()
                .filter(|f| f.is_list)
                .collect(),
            RelationCounts::Fields(names) => names
                .iter()
                .map(|name| model.field_or_err(name))
                .collect::<Result<_>>()?,
        };
        for field in fields {
            let mut sql = relation_count(field, &scope)?;
            sql.push_str(format!(
                " AS {}",
                scope.quote(&format!("{}.{}", super::hydrate::COUNT_KEY, field.name))
            ));
            select.columns.push(sql);
        }
    }

    select.conditions = compile(&query.filter, &scope, &mut placeholders)?;
    select.distinct = query.distinct;
    let skip = cursor(schema, &scope, query, &mut placeholders, &mut select)?;

    let modifiers = Modifiers {
        aggregates: None,
        order_by: &query.order_by,
        take: query.take,
        skip,
    };
    apply_modifiers(&modifiers, &mut select, &scope, false)?;

    let rows = cx.query(select.into_sql(cx.capability())).await?;
    let mut records: Vec<Record> = rows
        .into_iter()
        .map(|row| hydrate(schema, model, row))
        .collect();

    if let Some(selections) = selections {
        populate::populate(cx, rt, &mut records, selections, &joined).await?;
    }

    let strip: Vec<&String> = hidden.iter().filter(|h| !keep.contains(h)).collect();
    if !strip.is_empty() {
        for record in &mut records {
            for name in &strip {
                record.remove(name);
            }
        }
    }

    Ok(records)
}

/// `find_many` limited to one row.
pub(crate) async fn find_first(
    cx: &mut Cx<'_>,
    rt: &ModelRuntime,
    query: &Query,
) -> Result<Option<Record>> {
    let query = Query {
        take: Some(1),
        ..query.clone()
    };
    Ok(find_many(cx, rt, &query, &[]).await?.into_iter().next())
}

/// The scalar fields of the first record matching `filter`.
pub(crate) async fn fetch(
    cx: &mut Cx<'_>,
    rt: &ModelRuntime,
    filter: Filter,
) -> Result<Option<Record>> {
    let query = Query {
        filter,
        ..Query::default()
    };
    find_first(cx, rt, &query).await
}

/// Adds the `cursor` conditions of `query` to `select` and returns the rows
/// to skip: `skip` when given, one past the cursor row otherwise.
pub(crate) fn cursor(
    schema: &Schema,
    scope: &Scope<'_>,
    query: &Query,
    placeholders: &mut Placeholders,
    select: &mut Select,
) -> Result<Option<u64>> {
    let Some(cursor) = &query.cursor else {
        return Ok(query.skip);
    };

    let model = scope
        .model
        .ok_or_else(|| Error::invalid_criteria("`cursor` needs a model"))?;
    for (name, value) in cursor.iter() {
        let field = model.field_or_err(name)?;
        let value = validate::validate(value, field, schema)?;
        let mut sql = Sql::raw(format!("{} >= ", scope.column(name)));
        sql.push_sql(placeholders.bind(format!("cursor_{name}"), value));
        select.conditions.push(sql);
    }

    Ok(Some(query.skip.unwrap_or(1)))
}

/// Returns `true` when the record returned for `query` carries `field`.
pub(crate) fn projects(query: &Query, field: &str) -> bool {
    match &query.select {
        Some(select) => select.get(field).is_some_and(Selection::is_selected),
        None => !query.omit.iter().any(|name| name == field),
    }
}

/// Fields of `model` a relation is populated from: the foreign key when the
/// model owns it, the referenced fields otherwise, and the key for implicit
/// many-to-many relations.
pub(crate) fn link_fields<'a>(model: &'a Model, field: &Field) -> Vec<&'a str> {
    match model.relation_keys(&field.name) {
        Some(keys) if keys.is_empty() => model.key_fields(),
        Some(keys) if field.holds_foreign_key() => {
            keys.from_fields.iter().map(String::as_str).collect()
        }
        Some(keys) => keys.to_fields.iter().map(String::as_str).collect(),
        None => vec![],
    }
}

fn column(scope: &Scope<'_>, field: &Field) -> Sql {
    Sql::raw(format!(
        "{} AS {}",
        scope.column(&field.name),
        scope.quote(&field.name)
    ))
}
