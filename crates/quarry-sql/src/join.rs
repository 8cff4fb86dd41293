use crate::Scope;

use indexmap::IndexMap;
use quarry_core::{
    query::Selection,
    schema::{Field, Model},
    stmt::Sql,
    Error, Result,
};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum JoinType {
    #[default]
    Inner,
    Left,
    Right,
}

impl JoinType {
    /// Parses a `join.type` hint, ignoring case.
    pub fn parse(s: &str) -> Result<JoinType> {
        match s.to_ascii_uppercase().trim_end_matches(" JOIN") {
            "INNER" => Ok(JoinType::Inner),
            "LEFT" => Ok(JoinType::Left),
            "RIGHT" => Ok(JoinType::Right),
            _ => Err(Error::invalid_join_type(s)),
        }
    }

    pub fn sql(self) -> &'static str {
        match self {
            JoinType::Inner => "INNER JOIN",
            JoinType::Left => "LEFT JOIN",
            JoinType::Right => "RIGHT JOIN",
        }
    }
}

/// JOIN clauses and the aliased columns they contribute.
#[derive(Debug, Default, Clone)]
pub struct JoinPlan {
    pub joins: Vec<Sql>,

    /// `"author"."name" AS "author.name"`
    pub columns: Vec<Sql>,
}

/// Plans joins for the to-one relations in `include`, recursing into their
/// nested selections. Each joined table is aliased with its dotted path from
/// the root (`"author"`, `"author.profile"`) and each of its columns with
/// `"{path}.{field}"`. List relations are left to the population engine.
pub fn plan_joins(
    include: &IndexMap<String, Selection>,
    parent_alias: &str,
    model: &Model,
    scope: &Scope<'_>,
    join_type: JoinType,
    path_prefix: &str,
) -> Result<JoinPlan> {
    let mut plan = JoinPlan::default();
    plan_into(
        &mut plan,
        include,
        parent_alias,
        model,
        scope,
        join_type,
        path_prefix,
    )?;
    Ok(plan)
}

fn plan_into(
    plan: &mut JoinPlan,
    include: &IndexMap<String, Selection>,
    parent_alias: &str,
    model: &Model,
    scope: &Scope<'_>,
    default_join_type: JoinType,
    path_prefix: &str,
) -> Result<()> {
    for (name, selection) in include {
        if !selection.is_selected() {
            continue;
        }

        let field = model
            .field(name)
            .filter(|field| field.is_relation())
            .ok_or_else(|| Error::missing_relation_metadata(&model.name, name))?;

        if field.is_list {
            continue;
        }

        let query = selection.query();
        let join_type = match query.and_then(|query| query.join_type.as_deref()) {
            Some(ty) => JoinType::parse(ty)?,
            None => default_join_type,
        };

        let path = if path_prefix.is_empty() {
            name.clone()
        } else {
            format!("{path_prefix}.{name}")
        };
        let alias = scope.quote(&path);
        let related = scope.schema.related_model(model, field)?;

        plan.joins
            .push(join_clause(scope, model, field, related, parent_alias, &alias, join_type)?);

        let nested = query.and_then(|query| query.selections());
        let picked = nested.filter(|nested| {
            nested
                .iter()
                .any(|(name, s)| s.is_selected() && related.field(name).is_some_and(|f| !f.is_relation()))
        });
        let omit = query.map(|query| query.omit.as_slice()).unwrap_or_default();

        for f in related.scalar_fields() {
            let selected = match picked {
                Some(picked) => picked.get(&f.name).is_some_and(Selection::is_selected),
                None => !omit.contains(&f.name),
            };
            if selected {
                plan.columns.push(Sql::raw(format!(
                    "{alias}.{} AS {}",
                    scope.quote(&f.db_name),
                    scope.quote(&format!("{path}.{}", f.name))
                )));
            }
        }

        // Scalar keys of a nested select pick columns above, only relations join
        let relations: IndexMap<String, Selection> = nested
            .into_iter()
            .flatten()
            .filter(|(name, _)| related.field(name).is_some_and(Field::is_relation))
            .map(|(name, s)| (name.clone(), s.clone()))
            .collect();
        if !relations.is_empty() {
            plan_into(plan, &relations, &alias, related, scope, default_join_type, &path)?;
        }
    }

    Ok(())
}

/// `{JOIN} "table" AS alias ON ...` for one relation of `model`. The ON
/// direction follows which side owns the `from` fields.
pub fn join_clause(
    scope: &Scope<'_>,
    model: &Model,
    field: &Field,
    related: &Model,
    parent_alias: &str,
    alias: &str,
    join_type: JoinType,
) -> Result<Sql> {
    let keys = model
        .relation_keys(&field.name)
        .ok_or_else(|| Error::missing_relation_metadata(&model.name, &field.name))?;

    if keys.is_empty() || keys.from_fields.len() != keys.to_fields.len() {
        return Err(Error::relation_not_properly_defined(&model.name, &field.name));
    }

    let owner = model.owns_fields(&keys.from_fields);
    let on = keys
        .pairs()
        .map(|(from, to)| {
            let (parent_col, child_col) = if owner {
                (model.column_name(from), related.column_name(to))
            } else {
                (model.column_name(to), related.column_name(from))
            };
            format!(
                "{parent_alias}.{} = {alias}.{}",
                scope.quote(parent_col),
                scope.quote(child_col)
            )
        })
        .collect::<Vec<_>>()
        .join(" AND ");

    Ok(Sql::raw(format!(
        "{} {} AS {alias} ON {on}",
        join_type.sql(),
        scope.quote(&related.table_name)
    )))
}
