use crate::{
    stmt::{Record, Value},
    Error, Result,
};

use serde_json::{Map, Value as Json};

/// A parsed `where` tree.
///
/// Entries are kept in the order they were written and are implicitly
/// combined with `AND`.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Filter {
    pub entries: Vec<FilterEntry>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FilterEntry {
    /// `AND`, `OR` or `NOT` over a list of branches
    Logical(Logical, Vec<Filter>),

    /// A condition on one field (or a comma-joined list of fields)
    Field(String, FieldNode),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Logical {
    And,
    Or,
    Not,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FieldNode {
    /// `field: value`, equality (or `IS NULL`)
    Leaf(Value),

    /// `field: {op: value, ...}`
    Operators(Vec<(Operator, Value)>),

    /// A nested map without operator keys: a relation filter or a compound
    /// key selector.
    SubTree(Filter),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Contains,
    StartsWith,
    EndsWith,
    Equals,
    Not,
    Gt,
    Gte,
    Lt,
    Lte,
    In,
    NotIn,
}

impl Operator {
    pub fn from_name(name: &str) -> Option<Operator> {
        Some(match name {
            "contains" => Operator::Contains,
            "startsWith" => Operator::StartsWith,
            "endsWith" => Operator::EndsWith,
            "equals" => Operator::Equals,
            "not" => Operator::Not,
            "gt" => Operator::Gt,
            "gte" => Operator::Gte,
            "lt" => Operator::Lt,
            "lte" => Operator::Lte,
            "in" => Operator::In,
            "notIn" => Operator::NotIn,
            _ => return None,
        })
    }

    pub fn name(self) -> &'static str {
        match self {
            Operator::Contains => "contains",
            Operator::StartsWith => "startsWith",
            Operator::EndsWith => "endsWith",
            Operator::Equals => "equals",
            Operator::Not => "not",
            Operator::Gt => "gt",
            Operator::Gte => "gte",
            Operator::Lt => "lt",
            Operator::Lte => "lte",
            Operator::In => "in",
            Operator::NotIn => "notIn",
        }
    }

    /// Operators allowed on enum fields.
    pub fn applies_to_enum(self) -> bool {
        matches!(
            self,
            Operator::Equals | Operator::Not | Operator::In | Operator::NotIn
        )
    }

    pub fn is_pattern(self) -> bool {
        matches!(
            self,
            Operator::Contains | Operator::StartsWith | Operator::EndsWith
        )
    }

    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            Operator::Gt | Operator::Gte | Operator::Lt | Operator::Lte
        )
    }
}

impl Logical {
    pub fn from_key(key: &str) -> Option<Logical> {
        match key {
            "AND" => Some(Logical::And),
            "OR" => Some(Logical::Or),
            "NOT" => Some(Logical::Not),
            _ => None,
        }
    }

    pub fn key(self) -> &'static str {
        match self {
            Logical::And => "AND",
            Logical::Or => "OR",
            Logical::Not => "NOT",
        }
    }
}

impl Filter {
    pub fn new() -> Filter {
        Filter::default()
    }

    /// Parses a `where` object.
    pub fn from_json(json: &Json) -> Result<Filter> {
        match json {
            Json::Object(map) => Filter::from_map(map),
            Json::Null => Ok(Filter::new()),
            _ => Err(Error::invalid_criteria("`where` must be an object")),
        }
    }

    pub fn from_map(map: &Map<String, Json>) -> Result<Filter> {
        let mut entries = Vec::with_capacity(map.len());

        for (key, value) in map {
            let entry = match Logical::from_key(key) {
                Some(op) => FilterEntry::Logical(op, parse_branches(op, value)?),
                None => FilterEntry::Field(key.clone(), parse_field(key, value)?),
            };
            entries.push(entry);
        }

        Ok(Filter { entries })
    }

    /// `field = value`
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Filter {
        Filter {
            entries: vec![FilterEntry::Field(field.into(), FieldNode::Leaf(value.into()))],
        }
    }

    /// `field IN (values)`
    pub fn is_in(field: impl Into<String>, values: Vec<Value>) -> Filter {
        Filter {
            entries: vec![FilterEntry::Field(
                field.into(),
                FieldNode::Operators(vec![(Operator::In, Value::List(values))]),
            )],
        }
    }

    /// Equality on every field of the record.
    pub fn from_record(record: &Record) -> Filter {
        Filter {
            entries: record
                .iter()
                .map(|(k, v)| FilterEntry::Field(k.to_string(), FieldNode::Leaf(v.clone())))
                .collect(),
        }
    }

    /// Combines filters into one; empty filters are dropped.
    pub fn and(filters: impl IntoIterator<Item = Filter>) -> Filter {
        Filter {
            entries: filters.into_iter().flat_map(|f| f.entries).collect(),
        }
    }

    /// `NOT (filter)`
    pub fn not(filter: Filter) -> Filter {
        Filter {
            entries: vec![FilterEntry::Logical(Logical::Not, vec![filter])],
        }
    }

    /// Matches when any of the filters match.
    pub fn any(filters: Vec<Filter>) -> Filter {
        Filter {
            entries: vec![FilterEntry::Logical(Logical::Or, filters)],
        }
    }

    pub fn push(&mut self, entry: FilterEntry) {
        self.entries.push(entry);
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Field names used at the top level of the filter.
    pub fn field_names(&self) -> impl Iterator<Item = &str> + '_ {
        self.entries.iter().filter_map(|entry| match entry {
            FilterEntry::Field(name, _) => Some(name.as_str()),
            FilterEntry::Logical(..) => None,
        })
    }

    /// The equality value given for `field` at the top level, if any.
    pub fn equality(&self, field: &str) -> Option<&Value> {
        self.entries.iter().find_map(|entry| match entry {
            FilterEntry::Field(name, FieldNode::Leaf(value)) if name == field => Some(value),
            FilterEntry::Field(name, FieldNode::Operators(ops)) if name == field => ops
                .iter()
                .find(|(op, _)| *op == Operator::Equals)
                .map(|(_, v)| v),
            _ => None,
        })
    }
}

fn parse_branches(op: Logical, value: &Json) -> Result<Vec<Filter>> {
    match value {
        Json::Array(items) => items
            .iter()
            .map(|item| match item {
                Json::Object(map) => Filter::from_map(map),
                _ => Err(Error::invalid_criteria(format!(
                    "`{}` branches must be objects",
                    op.key()
                ))),
            })
            .collect(),
        // `NOT` over a map negates the whole map, `AND`/`OR` treat every
        // entry as its own branch.
        Json::Object(map) if op == Logical::Not => Ok(vec![Filter::from_map(map)?]),
        Json::Object(map) => map
            .iter()
            .map(|(k, v)| {
                let mut branch = Map::new();
                branch.insert(k.clone(), v.clone());
                Filter::from_map(&branch)
            })
            .collect(),
        _ => Err(Error::invalid_criteria(format!(
            "`{}` expects an object or a list of objects",
            op.key()
        ))),
    }
}

fn parse_field(key: &str, value: &Json) -> Result<FieldNode> {
    match value {
        Json::Object(map) => {
            let operators = map
                .keys()
                .filter(|k| Operator::from_name(k).is_some())
                .count();

            if operators == map.len() {
                Ok(FieldNode::Operators(
                    map.iter()
                        .filter_map(|(k, v)| {
                            Operator::from_name(k).map(|op| (op, Value::from_json(v.clone())))
                        })
                        .collect(),
                ))
            } else if operators > 0 {
                let unknown = map
                    .keys()
                    .find(|k| Operator::from_name(k).is_none())
                    .map(String::as_str)
                    .unwrap_or_default();
                Err(Error::unsupported_condition(format!(
                    "`{unknown}` is not an operator (in `{key}`)"
                )))
            } else {
                Ok(FieldNode::SubTree(Filter::from_map(map)?))
            }
        }
        // Lists are kept as leaves so the compiler, knowing the field, can
        // tell a misplaced list from an unknown operator
        value => Ok(FieldNode::Leaf(Value::from_json(value.clone()))),
    }
}
