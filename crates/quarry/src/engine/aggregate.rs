//! `aggregate`, `groupBy` and `count`.

use super::{
    hydrate::{count as decode_count, decode, float},
    read, Cx,
};
use crate::{db::ModelRuntime, model::Count, Result};

use indexmap::IndexMap;
use quarry_core::{
    query::{is_all, AggregateFn, Aggregates, Having, Query},
    schema::Model,
    stmt::{Placeholders, Record, Sql, Value},
    Error,
};
use quarry_sql::{
    apply_modifiers, assemble::aggregate_expr, compile, compile_having, Modifiers, Scope, Select,
};

const SUBQUERY: &str = "sub";

/// Aggregates over the rows selected by `query`, grouped per function:
/// `{_avg: {views: 2.5}, _count: {_all: 4}}`.
pub(crate) async fn aggregate(
    cx: &mut Cx<'_>,
    rt: &ModelRuntime,
    query: &Query,
    aggregates: &Aggregates,
) -> Result<Record> {
    if aggregates.is_empty() {
        return Err(Error::invalid_criteria(format!(
            "{}.aggregate: at least one of _avg, _count, _max, _min, _sum is required",
            rt.model.name
        )));
    }

    let mut placeholders = Placeholders::new();
    let scope = cx.scope(rt);
    let sub = scope.quote(SUBQUERY);
    let outer = scope.with(Some(&*rt.model), &sub);

    let mut select = Select::new(subquery(cx, rt, &scope, query, &mut placeholders)?);
    for (func, field) in aggregates.iter() {
        select.columns.push(Sql::raw(format!(
            "{} AS {}",
            aggregate_expr(func, field, &outer)?,
            scope.quote(&func.alias(field))
        )));
    }

    let row = cx
        .query(select.into_sql(cx.capability()))
        .await?
        .into_iter()
        .next()
        .unwrap_or_default();

    Ok(fold(&rt.model, &row, aggregates))
}

/// Groups the rows matching `query` by the `by` fields.
pub(crate) async fn group_by(
    cx: &mut Cx<'_>,
    rt: &ModelRuntime,
    by: &[String],
    query: &Query,
    aggregates: &Aggregates,
    having: &Having,
) -> Result<Vec<Record>> {
    let model = &*rt.model;
    if by.is_empty() {
        return Err(Error::invalid_criteria(format!(
            "{}.groupBy: `by` must name at least one field",
            model.name
        )));
    }

    let scope = cx.scope(rt);
    let mut placeholders = Placeholders::new();
    let mut select = Select::new(rt.table.as_str());

    for name in by {
        let field = model.field_or_err(name)?;
        if field.is_relation() {
            return Err(Error::invalid_criteria(format!(
                "{}.groupBy: cannot group by relation `{name}`",
                model.name
            )));
        }
        select.columns.push(Sql::raw(format!(
            "{} AS {}",
            scope.column(name),
            scope.quote(name)
        )));
        select.group_by.push(Sql::raw(scope.column(name)));
    }

    select.conditions = compile(&query.filter, &scope, &mut placeholders)?;
    select.having = compile_having(having, aggregates, &scope, &mut placeholders)?;

    let modifiers = Modifiers {
        aggregates: Some(aggregates),
        order_by: &query.order_by,
        take: query.take,
        skip: query.skip,
    };
    apply_modifiers(&modifiers, &mut select, &scope, true)?;

    let rows = cx.query(select.into_sql(cx.capability())).await?;
    Ok(rows
        .into_iter()
        .map(|row| {
            let mut record = Record::new();
            for name in by {
                let value = row[name.as_str()].clone();
                let value = match model.field(name) {
                    Some(field) => decode(field, value),
                    None => value,
                };
                record.insert(name.as_str(), value);
            }
            for (key, value) in fold(model, &row, aggregates) {
                record.insert(key, value);
            }
            record
        })
        .collect())
}

/// Counts the rows matching `query`; per field when `fields` is given.
pub(crate) async fn count(
    cx: &mut Cx<'_>,
    rt: &ModelRuntime,
    query: &Query,
    fields: Option<&[String]>,
) -> Result<Count> {
    let scope = cx.scope(rt);
    let mut placeholders = Placeholders::new();

    let paged = query.is_paginated();
    let sub = scope.quote(SUBQUERY);
    let (mut select, target) = if paged {
        let from = subquery(cx, rt, &scope, query, &mut placeholders)?;
        (Select::new(from), scope.with(Some(&*rt.model), &sub))
    } else {
        let mut select = Select::new(rt.table.as_str());
        select.conditions = compile(&query.filter, &scope, &mut placeholders)?;
        (select, scope)
    };

    let Some(fields) = fields else {
        select.columns.push(Sql::raw(format!("COUNT(*) AS {}", scope.quote("_all"))));
        let row = first_row(cx, select).await?;
        return Ok(Count::Total(as_count(&row["_all"])));
    };

    for name in fields {
        let expr = aggregate_expr(AggregateFn::Count, name, &target)?;
        select
            .columns
            .push(Sql::raw(format!("{expr} AS {}", scope.quote(&label(name)))));
    }

    let row = first_row(cx, select).await?;
    let counts: IndexMap<String, u64> = row
        .iter()
        .filter_map(|(label, value)| Some((field_of(label)?.to_string(), as_count(value))))
        .collect();
    Ok(Count::Fields(counts))
}

/// `(SELECT table.* FROM table WHERE ... ORDER BY ... LIMIT ...) AS "sub"`
fn subquery(
    cx: &Cx<'_>,
    rt: &ModelRuntime,
    scope: &Scope<'_>,
    query: &Query,
    placeholders: &mut Placeholders,
) -> Result<Sql> {
    let mut inner = Select::new(rt.table.as_str());
    inner.columns.push(Sql::raw(format!("{}.*", rt.table)));
    inner.conditions = compile(&query.filter, scope, placeholders)?;
    let skip = read::cursor(cx.schema(), scope, query, placeholders, &mut inner)?;

    let modifiers = Modifiers {
        aggregates: None,
        order_by: &query.order_by,
        take: query.take,
        skip,
    };
    apply_modifiers(&modifiers, &mut inner, scope, false)?;

    let mut from = inner.into_sql(cx.capability()).parenthesized();
    from.push_str(format!(" AS {}", scope.quote(SUBQUERY)));
    Ok(from)
}

async fn first_row(cx: &mut Cx<'_>, select: Select) -> Result<Record> {
    let rows = cx.query(select.into_sql(cx.capability())).await?;
    Ok(rows.into_iter().next().unwrap_or_default())
}

/// Nests the aggregate columns of `row` per function.
fn fold(model: &Model, row: &Record, aggregates: &Aggregates) -> Record {
    let mut out = Record::new();

    for (func, field) in aggregates.iter() {
        let value = row[func.alias(field).as_str()].clone();
        let value = match func {
            AggregateFn::Count => decode_count(value),
            AggregateFn::Avg => float(value),
            _ => match model.field(field) {
                Some(f) => decode(f, value),
                None => value,
            },
        };
        let key = if is_all(field) { "_all" } else { field };

        match out.get_mut(func.key()) {
            Some(Value::Record(entries)) => {
                entries.insert(key, value);
            }
            _ => {
                let mut entries = Record::new();
                entries.insert(key, value);
                out.insert(func.key(), entries);
            }
        }
    }

    out
}

fn label(field: &str) -> String {
    format!("COUNT({field})")
}

fn field_of(label: &str) -> Option<&str> {
    label.strip_prefix("COUNT(")?.strip_suffix(')')
}

fn as_count(value: &Value) -> u64 {
    decode_count(value.clone())
        .as_i64()
        .and_then(|n| u64::try_from(n).ok())
        .unwrap_or(0)
}
