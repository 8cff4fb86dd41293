//! Compiles `where` trees to SQL conditions.
//!
//! Bind names follow the shape of the tree: `{prefix}{field}{level}` for a
//! plain value, `{prefix}{field}_{operator}{level}` for an operator and
//! `_{i}` per element of an `in` list. Branches of `AND`/`OR`/`NOT` extend
//! the prefix with `{key}{index}_`.

use crate::Scope;

use quarry_core::{
    query::{FieldNode, Filter, FilterEntry, Logical, Operator},
    schema::{Field, FieldKind, Model, Pivot},
    stmt::{Placeholders, Sql, Value, DATETIME_FORMAT},
    validate::{self, Constraints},
    Error, Result,
};

/// Compiles `filter` into conditions meant to be combined with `AND`.
pub fn compile(
    filter: &Filter,
    scope: &Scope<'_>,
    placeholders: &mut Placeholders,
) -> Result<Vec<Sql>> {
    Compiler { placeholders }.filter(filter, scope, "", 0)
}

/// `(SELECT COUNT(*) FROM related WHERE <link>)` for the list relation
/// `field` of the scope's model, counting the rows related to the outer row.
pub fn relation_count(field: &Field, scope: &Scope<'_>) -> Result<Sql> {
    let model = scope
        .model
        .ok_or_else(|| Error::missing_relation_metadata("", &field.name))?;
    let related = scope.schema.related_model(model, field)?;

    let alias_name = format!("_count_{}", field.name);
    let alias = scope.quote(&alias_name);
    let inner = scope.with(Some(related), &alias);
    let subquery = RelationSubquery::new(scope, &inner, &alias_name, model, field, related)?;
    Ok(subquery.count())
}

struct Compiler<'p> {
    placeholders: &'p mut Placeholders,
}

impl Compiler<'_> {
    fn filter(
        &mut self,
        filter: &Filter,
        scope: &Scope<'_>,
        prefix: &str,
        level: usize,
    ) -> Result<Vec<Sql>> {
        let mut out = vec![];

        for entry in &filter.entries {
            match entry {
                FilterEntry::Logical(op, branches) => {
                    if let Some(sql) = self.logical(*op, branches, scope, prefix, level)? {
                        out.push(sql);
                    }
                }
                FilterEntry::Field(key, node) => {
                    for name in key.split(',').map(str::trim).filter(|s| !s.is_empty()) {
                        out.extend(self.field(name, node, scope, prefix, level)?);
                    }
                }
            }
        }

        Ok(out)
    }

    fn logical(
        &mut self,
        op: Logical,
        branches: &[Filter],
        scope: &Scope<'_>,
        prefix: &str,
        level: usize,
    ) -> Result<Option<Sql>> {
        let mut parts = vec![];

        for (i, branch) in branches.iter().enumerate() {
            let branch_prefix = format!("{prefix}{}{i}_", op.key());
            let fragments = self.filter(branch, scope, &branch_prefix, level + 1)?;
            match fragments.len() {
                0 => {}
                1 => parts.extend(fragments),
                _ => parts.push(Sql::join(fragments, " AND ").parenthesized()),
            }
        }

        if parts.is_empty() {
            return Ok(None);
        }

        Ok(Some(match op {
            Logical::And => Sql::join(parts, " AND ").parenthesized(),
            Logical::Or => Sql::join(parts, " OR ").parenthesized(),
            Logical::Not => {
                let mut sql = Sql::raw("NOT ");
                sql.push_sql(Sql::join(parts, " OR ").parenthesized());
                sql
            }
        }))
    }

    fn field(
        &mut self,
        name: &str,
        node: &FieldNode,
        scope: &Scope<'_>,
        prefix: &str,
        level: usize,
    ) -> Result<Vec<Sql>> {
        let field = match scope.model {
            Some(model) => match model.field(name) {
                Some(field) => Some(field),
                None => {
                    // `a_b: {a: .., b: ..}` selects by a compound key
                    if let (Some(_), FieldNode::SubTree(sub)) = (model.compound_key(name), node) {
                        return self.filter(sub, scope, prefix, level);
                    }
                    return Err(Error::unknown_field(&model.name, name));
                }
            },
            None => None,
        };

        if let FieldNode::Leaf(Value::List(_)) = node {
            return Err(Error::invalid_criteria(format!(
                "`{name}` cannot be compared to a list; use `in`"
            )));
        }

        if let (Some(field), Some(model)) = (field, scope.model) {
            if field.is_relation() {
                return self.relation(model, field, node, scope, prefix, level);
            }
        }

        let column = scope.column(name);

        match node {
            FieldNode::Leaf(value) => {
                let sql = if value.is_null() {
                    Sql::raw(format!("{column} IS NULL"))
                } else if is_empty_string(value) {
                    Sql::raw(format!("{column} = ''"))
                } else {
                    let value = operand(field, value, Operator::Equals, scope)?;
                    let mut sql = Sql::raw(format!("{column} = "));
                    sql.push_sql(self.placeholders.bind(format!("{prefix}{name}{level}"), value));
                    sql
                };
                Ok(vec![sql])
            }
            FieldNode::Operators(ops) => ops
                .iter()
                .map(|(op, value)| {
                    self.operator(field, name, &column, *op, value, scope, prefix, level)
                })
                .collect(),
            FieldNode::SubTree(sub) => {
                if field.is_some() {
                    return Err(Error::unsupported_condition(format!(
                        "field `{name}` expects a value or an operator object"
                    )));
                }
                // Unknown model: the key names a table alias
                let alias = scope.quote(name);
                let inner = scope.with(None, &alias);
                self.filter(sub, &inner, &format!("{prefix}{name}_"), level + 1)
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn operator(
        &mut self,
        field: Option<&Field>,
        name: &str,
        column: &str,
        op: Operator,
        value: &Value,
        scope: &Scope<'_>,
        prefix: &str,
        level: usize,
    ) -> Result<Sql> {
        if let Some(field) = field {
            if field.is_enum() && !op.applies_to_enum() {
                return Err(Error::unsupported_operator(
                    op.name(),
                    format!(
                        "enum field `{}`; allowed operators: equals, not, in, notIn",
                        field.name
                    ),
                ));
            }
        }

        let placeholder = format!("{prefix}{name}_{}{level}", op.name());

        match op {
            Operator::Contains | Operator::StartsWith | Operator::EndsWith => {
                if value.is_null() || is_empty_string(value) {
                    return Ok(Sql::raw(format!("{column} LIKE '%'")));
                }
                let text = match value {
                    Value::String(s) => s.clone(),
                    Value::I64(_) | Value::F64(_) | Value::Bool(_) => value.to_string(),
                    _ => {
                        return Err(Error::invalid_criteria(format!(
                            "`{}` on `{name}` expects a string",
                            op.name()
                        )))
                    }
                };
                let pattern = match op {
                    Operator::Contains => format!("%{text}%"),
                    Operator::StartsWith => format!("{text}%"),
                    _ => format!("%{text}"),
                };
                let keyword = if op == Operator::Contains && scope.capability.ilike {
                    "ILIKE"
                } else {
                    "LIKE"
                };
                let mut sql = Sql::raw(format!("{column} {keyword} "));
                sql.push_sql(self.placeholders.bind(placeholder, pattern));
                Ok(sql)
            }
            Operator::Equals | Operator::Not => {
                let negate = op == Operator::Not;
                if value.is_null() {
                    let test = if negate { "IS NOT NULL" } else { "IS NULL" };
                    return Ok(Sql::raw(format!("{column} {test}")));
                }
                let cmp = if negate { "!=" } else { "=" };
                if is_empty_string(value) {
                    return Ok(Sql::raw(format!("{column} {cmp} ''")));
                }
                let value = operand(field, value, op, scope)?;
                let mut sql = Sql::raw(format!("{column} {cmp} "));
                sql.push_sql(self.placeholders.bind(placeholder, value));
                Ok(sql)
            }
            Operator::Gt | Operator::Gte | Operator::Lt | Operator::Lte => {
                if value.is_null() {
                    return Err(Error::invalid_criteria(format!(
                        "`{}` on `{name}` cannot compare with null",
                        op.name()
                    )));
                }
                let cmp = match op {
                    Operator::Gt => ">",
                    Operator::Gte => ">=",
                    Operator::Lt => "<",
                    _ => "<=",
                };
                let value = operand(field, value, op, scope)?;
                let mut sql = Sql::raw(format!("{column} {cmp} "));
                sql.push_sql(self.placeholders.bind(placeholder, value));
                Ok(sql)
            }
            Operator::In | Operator::NotIn => {
                let items = match value {
                    Value::List(items) => items.as_slice(),
                    Value::Null => &[],
                    single => std::slice::from_ref(single),
                };

                if items.is_empty() {
                    return Ok(Sql::raw(if op == Operator::In {
                        "1 = 0"
                    } else {
                        "1 = 1"
                    }));
                }

                let mut binds = Vec::with_capacity(items.len());
                for (i, item) in items.iter().enumerate() {
                    let item = operand(field, item, op, scope)?;
                    binds.push(self.placeholders.bind(format!("{placeholder}_{i}"), item));
                }

                let keyword = if op == Operator::In { "IN" } else { "NOT IN" };
                let mut sql = Sql::raw(format!("{column} {keyword} "));
                sql.push_sql(Sql::join(binds, ", ").parenthesized());
                Ok(sql)
            }
        }
    }

    /// Relation filters become `EXISTS` subqueries correlated with the outer
    /// table, or plain foreign key tests when the outer model holds the key.
    fn relation(
        &mut self,
        model: &Model,
        field: &Field,
        node: &FieldNode,
        scope: &Scope<'_>,
        prefix: &str,
        level: usize,
    ) -> Result<Vec<Sql>> {
        let related = scope.schema.related_model(model, field)?;
        let keys = model
            .relation_keys(&field.name)
            .ok_or_else(|| Error::missing_relation_metadata(&model.name, &field.name))?;
        let owner = !keys.is_empty() && model.owns_fields(&keys.from_fields);

        let alias_name = format!("{prefix}{}{level}", field.name);
        let alias = scope.quote(&alias_name);
        let inner = scope.with(Some(related), &alias);
        let subquery = RelationSubquery::new(scope, &inner, &alias_name, model, field, related)?;

        let sub_prefix = format!("{prefix}{}_", field.name);

        match node {
            FieldNode::Leaf(Value::Null) => {
                if owner {
                    Ok(keys
                        .from_fields
                        .iter()
                        .map(|from| Sql::raw(format!("{} IS NULL", scope.column(from))))
                        .collect())
                } else {
                    Ok(vec![subquery.exists(true, vec![])])
                }
            }
            FieldNode::Leaf(value) => {
                if owner && keys.from_fields.len() == 1 {
                    let from = &keys.from_fields[0];
                    let value = match model.field(from) {
                        Some(from_field) => operand(Some(from_field), value, Operator::Equals, scope)?,
                        None => value.clone(),
                    };
                    let mut sql = Sql::raw(format!("{} = ", scope.column(from)));
                    sql.push_sql(self.placeholders.bind(format!("{prefix}{from}{level}"), value));
                    return Ok(vec![sql]);
                }

                let pk = single_key(related, &field.name)?;
                let mut sql = Sql::raw(format!("{} = ", inner.column(pk)));
                sql.push_sql(
                    self.placeholders
                        .bind(format!("{sub_prefix}{pk}{}", level + 1), value.clone()),
                );
                Ok(vec![subquery.exists(false, vec![sql])])
            }
            FieldNode::Operators(_) => Err(Error::unsupported_condition(format!(
                "relation `{}` expects `some`, `every`, `none`, `is`, `isNot` or a nested filter",
                field.name
            ))),
            FieldNode::SubTree(sub) => {
                let quantified = !sub.is_empty()
                    && sub.entries.iter().all(|entry| {
                        matches!(entry, FilterEntry::Field(k, _) if Quantifier::from_key(k).is_some())
                    });

                if !quantified {
                    let conditions = self.filter(sub, &inner, &sub_prefix, level + 1)?;
                    return Ok(vec![subquery.exists(false, conditions)]);
                }

                let mut out = vec![];
                for entry in &sub.entries {
                    let FilterEntry::Field(key, node) = entry else {
                        continue;
                    };
                    let Some(quantifier) = Quantifier::from_key(key) else {
                        continue;
                    };
                    let key_prefix = format!("{sub_prefix}{key}_");

                    let conditions = match node {
                        FieldNode::SubTree(filter) => {
                            self.filter(filter, &inner, &key_prefix, level + 1)?
                        }
                        // `{}` parses as an empty operator list
                        FieldNode::Operators(ops) if ops.is_empty() => vec![],
                        FieldNode::Leaf(Value::Null) => {
                            // `is: null` / `isNot: null`
                            out.push(subquery.exists(quantifier.negated(), vec![]));
                            continue;
                        }
                        _ => {
                            return Err(Error::unsupported_condition(format!(
                                "`{}.{key}` expects a filter object",
                                field.name
                            )))
                        }
                    };

                    out.push(match quantifier {
                        Quantifier::Some | Quantifier::Is => subquery.exists(false, conditions),
                        Quantifier::None | Quantifier::IsNot => subquery.exists(true, conditions),
                        Quantifier::Every => {
                            if conditions.is_empty() {
                                continue;
                            }
                            let mut negated = Sql::raw("NOT ");
                            negated.push_sql(Sql::join(conditions, " AND ").parenthesized());
                            subquery.exists(true, vec![negated])
                        }
                    });
                }
                Ok(out)
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Quantifier {
    Some,
    Every,
    None,
    Is,
    IsNot,
}

impl Quantifier {
    fn from_key(key: &str) -> Option<Quantifier> {
        Some(match key {
            "some" => Quantifier::Some,
            "every" => Quantifier::Every,
            "none" => Quantifier::None,
            "is" => Quantifier::Is,
            "isNot" => Quantifier::IsNot,
            _ => return None,
        })
    }

    /// `is: null` matches when no related row exists, `isNot: null` when
    /// one does.
    fn negated(self) -> bool {
        matches!(self, Quantifier::Is)
    }
}

/// `SELECT 1 FROM related WHERE <link to outer row>`
struct RelationSubquery {
    from: String,
    link: Vec<String>,
}

impl RelationSubquery {
    fn new(
        outer: &Scope<'_>,
        inner: &Scope<'_>,
        alias_name: &str,
        model: &Model,
        field: &Field,
        related: &Model,
    ) -> Result<RelationSubquery> {
        let keys = model
            .relation_keys(&field.name)
            .ok_or_else(|| Error::missing_relation_metadata(&model.name, &field.name))?;

        let related_table = format!("{} AS {}", outer.quote(&related.table_name), inner.table);

        if keys.is_empty() {
            let pivot = Pivot::new(&model.name, &related.name);
            let pivot_alias = outer.quote(&format!("{alias_name}_pivot"));
            let model_pk = single_key(model, &field.name)?;
            let related_pk = single_key(related, &field.name)?;

            let from = format!(
                "{} AS {pivot_alias} INNER JOIN {related_table} ON {} = {pivot_alias}.{}",
                outer.quote(&pivot.table),
                inner.column(related_pk),
                outer.quote(pivot.other_column(&model.name)),
            );
            let link = vec![format!(
                "{pivot_alias}.{} = {}",
                outer.quote(pivot.column_for(&model.name)),
                outer.column(model_pk)
            )];
            return Ok(RelationSubquery { from, link });
        }

        if keys.from_fields.len() != keys.to_fields.len() {
            return Err(Error::relation_not_properly_defined(&model.name, &field.name));
        }

        let link = if model.owns_fields(&keys.from_fields) {
            keys.pairs()
                .map(|(from, to)| format!("{} = {}", inner.column(to), outer.column(from)))
                .collect()
        } else {
            keys.pairs()
                .map(|(from, to)| format!("{} = {}", inner.column(from), outer.column(to)))
                .collect()
        };

        Ok(RelationSubquery {
            from: related_table,
            link,
        })
    }

    fn count(&self) -> Sql {
        Sql::raw(format!(
            "(SELECT COUNT(*) FROM {} WHERE {})",
            self.from,
            self.link.join(" AND ")
        ))
    }

    fn exists(&self, negate: bool, conditions: Vec<Sql>) -> Sql {
        let mut sql = Sql::raw(if negate { "NOT EXISTS (" } else { "EXISTS (" });
        sql.push_str(format!("SELECT 1 FROM {} WHERE ", self.from));
        let all = self
            .link
            .iter()
            .map(|link| Sql::raw(link.as_str()))
            .chain(conditions);
        sql.push_sql(Sql::join(all, " AND "));
        sql.push_str(")");
        sql
    }
}

/// The single key field of a model on one side of an implicit
/// many-to-many relation.
pub fn single_key<'a>(model: &'a Model, relation: &str) -> Result<&'a str> {
    match model.key_fields().as_slice() {
        [pk] => Ok(*pk),
        _ => Err(Error::relation_not_properly_defined(&model.name, relation)),
    }
}

fn is_empty_string(value: &Value) -> bool {
    matches!(value, Value::String(s) if s.is_empty())
}

/// Coerces an operand to the field's type. Without a known field, integers
/// and floats pass as-is and date-like strings in comparisons are
/// normalized.
fn operand(field: Option<&Field>, value: &Value, op: Operator, scope: &Scope<'_>) -> Result<Value> {
    let Some(field) = field else {
        if op.is_comparison() {
            if let Value::String(s) = value {
                if s.parse::<f64>().is_err() {
                    if let Some(dt) = validate::parse_datetime(s) {
                        return Ok(Value::String(dt.format(DATETIME_FORMAT).to_string()));
                    }
                }
            }
        }
        return Ok(value.clone());
    };

    match &field.kind {
        FieldKind::Enum(name) => {
            let values = scope.schema.enum_(name).ok_or_else(|| {
                Error::validation(format!("unknown enum `{name}` for `{}`", field.name))
            })?;
            validate::enum_coerce(value, values)
                .map(Value::String)
                .ok_or_else(|| {
                    Error::validation(format!(
                        "invalid value {value} for enum `{name}` on `{}`; expected one of: {}",
                        field.name,
                        values.values.join(", ")
                    ))
                })
        }
        FieldKind::Scalar(ty) => validate::coerce(value, *ty, &Constraints::for_field(field))
            .map_err(|e| e.context(format!("field `{}`", field.name))),
        FieldKind::Object(_) => Ok(value.clone()),
    }
}
