use crate::{Error, Result};

use serde_json::{Map, Value as Json};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregateFn {
    Avg,
    Count,
    Max,
    Min,
    Sum,
}

impl AggregateFn {
    pub const ALL: [AggregateFn; 5] = [
        AggregateFn::Avg,
        AggregateFn::Count,
        AggregateFn::Max,
        AggregateFn::Min,
        AggregateFn::Sum,
    ];

    /// Parses a criteria key such as `_avg`.
    pub fn from_key(key: &str) -> Option<AggregateFn> {
        AggregateFn::ALL.into_iter().find(|f| f.key() == key)
    }

    pub fn key(self) -> &'static str {
        match self {
            AggregateFn::Avg => "_avg",
            AggregateFn::Count => "_count",
            AggregateFn::Max => "_max",
            AggregateFn::Min => "_min",
            AggregateFn::Sum => "_sum",
        }
    }

    pub fn sql(self) -> &'static str {
        match self {
            AggregateFn::Avg => "AVG",
            AggregateFn::Count => "COUNT",
            AggregateFn::Max => "MAX",
            AggregateFn::Min => "MIN",
            AggregateFn::Sum => "SUM",
        }
    }

    /// Column alias of the aggregate over `field`: `avg_views`, `count__all`.
    pub fn alias(self, field: &str) -> String {
        let field = if is_all(field) { "_all" } else { field };
        format!("{}_{}", &self.key()[1..], field)
    }
}

/// `_all` and `*` select every row.
pub fn is_all(field: &str) -> bool {
    field == "_all" || field == "*"
}

/// Requested aggregates: `{_avg: {views: true}, _count: true, ...}`.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Aggregates {
    pub entries: Vec<(AggregateFn, Vec<String>)>,
}

impl Aggregates {
    /// Collects the aggregate keys of a criteria object; other keys are
    /// ignored.
    pub fn from_map(map: &Map<String, Json>) -> Result<Aggregates> {
        let mut entries = vec![];

        for (key, value) in map {
            let Some(func) = AggregateFn::from_key(key) else {
                continue;
            };

            let fields = match value {
                Json::Bool(true) if func == AggregateFn::Count => vec!["_all".to_string()],
                Json::Bool(_) => vec![],
                Json::Object(fields) => fields
                    .iter()
                    .filter(|(_, v)| v.as_bool() == Some(true))
                    .map(|(k, _)| k.clone())
                    .collect(),
                _ => {
                    return Err(Error::invalid_criteria(format!(
                        "`{key}` expects an object of fields"
                    )))
                }
            };

            if !fields.is_empty() {
                entries.push((func, fields));
            }
        }

        Ok(Aggregates { entries })
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates `(function, field)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (AggregateFn, &str)> + '_ {
        self.entries
            .iter()
            .flat_map(|(func, fields)| fields.iter().map(move |f| (*func, f.as_str())))
    }

    pub fn contains(&self, func: AggregateFn, field: &str) -> bool {
        self.iter().any(|(f, name)| f == func && name == field)
    }
}
