use crate::{Scope, Select};

use quarry_core::{
    query::{is_all, AggregateFn, Aggregates, OrderTerm},
    stmt::Sql,
    Error, Result,
};

/// The parts of a read that shape the result set rather than filter it.
#[derive(Debug, Default, Clone, Copy)]
pub struct Modifiers<'a> {
    pub aggregates: Option<&'a Aggregates>,
    pub order_by: &'a [OrderTerm],
    pub take: Option<u64>,
    pub skip: Option<u64>,
}

/// Applies aggregates, ordering and pagination to `select`.
///
/// Aggregate projections (`FUNC(col) AS "func_col"`) go first in the select
/// list when `add_aggregates` is set. Ordering on a relation field expects
/// the caller to have joined the relation under its own name.
pub fn apply_modifiers(
    modifiers: &Modifiers<'_>,
    select: &mut Select,
    scope: &Scope<'_>,
    add_aggregates: bool,
) -> Result<()> {
    if add_aggregates {
        if let Some(aggregates) = modifiers.aggregates {
            let mut columns = Vec::with_capacity(aggregates.entries.len());
            for (func, field) in aggregates.iter() {
                let expr = aggregate_expr(func, field, scope)?;
                columns.push(Sql::raw(format!(
                    "{expr} AS {}",
                    scope.quote(&func.alias(field))
                )));
            }
            select.columns.splice(0..0, columns);
        }
    }

    for term in modifiers.order_by {
        let sql = match term {
            OrderTerm::Field { field, direction } => {
                check_scalar(scope, field)?;
                format!("{} {}", scope.column(field), direction.sql())
            }
            OrderTerm::Relation {
                relation,
                field,
                direction,
            } => {
                let column = match scope.model {
                    Some(model) => {
                        let relation_field = model.field_or_err(relation)?;
                        let related = scope.schema.related_model(model, relation_field)?;
                        related.field_or_err(field)?.db_name.as_str()
                    }
                    None => field.as_str(),
                };
                format!(
                    "{}.{} {}",
                    scope.quote(relation),
                    scope.quote(column),
                    direction.sql()
                )
            }
            OrderTerm::Aggregate {
                func,
                field,
                direction,
            } => format!("{} {}", scope.quote(&func.alias(field)), direction.sql()),
        };
        select.order_by.push(Sql::raw(sql));
    }

    select.limit = modifiers.take;
    select.offset = modifiers.skip;

    Ok(())
}

/// `FUNC(table.col)`, or `COUNT(*)` for `_all`.
pub fn aggregate_expr(func: AggregateFn, field: &str, scope: &Scope<'_>) -> Result<String> {
    if is_all(field) {
        if func != AggregateFn::Count {
            return Err(Error::invalid_criteria(format!(
                "`{}` cannot be applied to `_all`",
                func.key()
            )));
        }
        return Ok("COUNT(*)".to_string());
    }

    check_scalar(scope, field)?;
    Ok(format!("{}({})", func.sql(), scope.column(field)))
}

fn check_scalar(scope: &Scope<'_>, field: &str) -> Result<()> {
    if let Some(model) = scope.model {
        let f = model.field_or_err(field)?;
        if f.is_relation() {
            return Err(Error::invalid_criteria(format!(
                "relation field `{field}` cannot be used here"
            )));
        }
    }
    Ok(())
}
