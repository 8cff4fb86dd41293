use crate::{assemble::aggregate_expr, Scope};

use quarry_core::{
    query::{Aggregates, Having, HavingOp},
    stmt::{Placeholders, Sql, Value},
    Error, Result,
};

/// Compiles a `having` clause. Placeholders are named `h{n}` (`h{n}a` and
/// `h{n}b` for `between`). Databases that allow it reference the selected
/// aggregate by alias; otherwise the aggregate expression is repeated.
pub fn compile_having(
    having: &Having,
    aggregates: &Aggregates,
    scope: &Scope<'_>,
    placeholders: &mut Placeholders,
) -> Result<Vec<Sql>> {
    let mut out = Vec::with_capacity(having.terms.len());

    for (n, term) in having.terms.iter().enumerate() {
        let expr = if scope.capability.having_alias && aggregates.contains(term.func, &term.field)
        {
            scope.quote(&term.func.alias(&term.field))
        } else {
            aggregate_expr(term.func, &term.field, scope)?
        };

        let name = format!("h{n}");
        let sql = match term.op {
            HavingOp::Between => {
                let [low, high] = term.value.as_list().unwrap_or_default() else {
                    return Err(Error::validation(format!(
                        "`between` on `{}.{}` expects exactly two values",
                        term.func.key(),
                        term.field
                    )));
                };
                let mut sql = Sql::raw(format!("{expr} BETWEEN "));
                sql.push_sql(placeholders.bind(format!("{name}a"), low.clone()));
                sql.push_str(" AND ");
                sql.push_sql(placeholders.bind(format!("{name}b"), high.clone()));
                sql
            }
            HavingOp::In | HavingOp::NotIn => {
                let items = match &term.value {
                    Value::List(items) if !items.is_empty() => items,
                    _ => {
                        return Err(Error::validation(format!(
                            "`{}` on `{}.{}` expects a non-empty list",
                            term.op.name(),
                            term.func.key(),
                            term.field
                        )))
                    }
                };
                let binds = items
                    .iter()
                    .enumerate()
                    .map(|(i, item)| placeholders.bind(format!("{name}_{i}"), item.clone()))
                    .collect::<Vec<_>>();
                let keyword = if term.op == HavingOp::In { "IN" } else { "NOT IN" };
                let mut sql = Sql::raw(format!("{expr} {keyword} "));
                sql.push_sql(Sql::join(binds, ", ").parenthesized());
                sql
            }
            op => {
                if term.value.is_null() {
                    let test = if op == HavingOp::Not { "IS NOT NULL" } else { "IS NULL" };
                    Sql::raw(format!("{expr} {test}"))
                } else {
                    let cmp = match op {
                        HavingOp::Equals => "=",
                        HavingOp::Gt => ">",
                        HavingOp::Gte => ">=",
                        HavingOp::Lt => "<",
                        HavingOp::Lte => "<=",
                        _ => "!=",
                    };
                    let mut sql = Sql::raw(format!("{expr} {cmp} "));
                    sql.push_sql(placeholders.bind(name, term.value.clone()));
                    sql
                }
            }
        };
        out.push(sql);
    }

    Ok(out)
}
