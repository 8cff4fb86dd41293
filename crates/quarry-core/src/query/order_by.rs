use super::AggregateFn;
use crate::{Error, Result};

use serde_json::Value as Json;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    #[default]
    Asc,
    Desc,
}

impl Direction {
    /// `desc` in any case sorts descending; anything else ascending.
    pub fn from_json(json: &Json) -> Direction {
        match json.as_str() {
            Some(dir) if dir.eq_ignore_ascii_case("desc") => Direction::Desc,
            _ => Direction::Asc,
        }
    }

    pub fn sql(self) -> &'static str {
        match self {
            Direction::Asc => "ASC",
            Direction::Desc => "DESC",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum OrderTerm {
    /// A column of the queried model
    Field { field: String, direction: Direction },

    /// A column of a to-one related model, reached through a join
    Relation {
        relation: String,
        field: String,
        direction: Direction,
    },

    /// An aggregate selected by the same query
    Aggregate {
        func: AggregateFn,
        field: String,
        direction: Direction,
    },
}

impl OrderTerm {
    /// Parses `orderBy`: an object or a list of objects.
    pub fn parse(json: &Json) -> Result<Vec<OrderTerm>> {
        let mut terms = vec![];
        match json {
            Json::Array(items) => {
                for item in items {
                    parse_object(item, &mut terms)?;
                }
            }
            Json::Null => {}
            other => parse_object(other, &mut terms)?,
        }
        Ok(terms)
    }
}

fn parse_object(json: &Json, terms: &mut Vec<OrderTerm>) -> Result<()> {
    let Json::Object(map) = json else {
        return Err(Error::invalid_criteria(
            "`orderBy` expects an object or a list of objects",
        ));
    };

    for (key, value) in map {
        match value {
            // `{field: {sort: "desc"}}`
            Json::Object(inner) if inner.contains_key("sort") => terms.push(OrderTerm::Field {
                field: key.clone(),
                direction: Direction::from_json(&inner["sort"]),
            }),
            Json::Object(inner) => {
                let func = AggregateFn::from_key(key);
                for (field, direction) in inner {
                    let direction = Direction::from_json(direction);
                    terms.push(match func {
                        Some(func) => OrderTerm::Aggregate {
                            func,
                            field: field.clone(),
                            direction,
                        },
                        None => OrderTerm::Relation {
                            relation: key.clone(),
                            field: field.clone(),
                            direction,
                        },
                    });
                }
            }
            direction => terms.push(OrderTerm::Field {
                field: key.clone(),
                direction: Direction::from_json(direction),
            }),
        }
    }

    Ok(())
}
