use super::AggregateFn;
use crate::{stmt::Value, Error, Result};

use serde_json::{Map, Value as Json};

/// A parsed `having` clause: `{_avg: {views: {gt: 10}}}`.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Having {
    pub terms: Vec<HavingTerm>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HavingTerm {
    pub func: AggregateFn,
    pub field: String,
    pub op: HavingOp,
    pub value: Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HavingOp {
    Equals,
    Gt,
    Gte,
    Lt,
    Lte,
    Not,
    In,
    NotIn,
    Between,
}

impl HavingOp {
    pub fn from_name(name: &str) -> Option<HavingOp> {
        Some(match name {
            "equals" => HavingOp::Equals,
            "gt" => HavingOp::Gt,
            "gte" => HavingOp::Gte,
            "lt" => HavingOp::Lt,
            "lte" => HavingOp::Lte,
            "not" => HavingOp::Not,
            "in" => HavingOp::In,
            "notIn" => HavingOp::NotIn,
            "between" => HavingOp::Between,
            _ => return None,
        })
    }

    pub fn name(self) -> &'static str {
        match self {
            HavingOp::Equals => "equals",
            HavingOp::Gt => "gt",
            HavingOp::Gte => "gte",
            HavingOp::Lt => "lt",
            HavingOp::Lte => "lte",
            HavingOp::Not => "not",
            HavingOp::In => "in",
            HavingOp::NotIn => "notIn",
            HavingOp::Between => "between",
        }
    }
}

impl Having {
    pub fn from_json(json: &Json) -> Result<Having> {
        let Json::Object(map) = json else {
            return Err(Error::invalid_criteria("`having` must be an object"));
        };
        Having::from_map(map)
    }

    pub fn from_map(map: &Map<String, Json>) -> Result<Having> {
        let mut terms = vec![];

        for (key, fields) in map {
            let func = AggregateFn::from_key(key).ok_or_else(|| {
                Error::unsupported_condition(format!("unknown aggregate `{key}` in `having`"))
            })?;
            let Json::Object(fields) = fields else {
                return Err(Error::invalid_criteria(format!(
                    "`having.{key}` expects an object of fields"
                )));
            };

            for (field, condition) in fields {
                match condition {
                    Json::Object(ops) => {
                        for (op, value) in ops {
                            let op = HavingOp::from_name(op).ok_or_else(|| {
                                Error::unsupported_operator(
                                    op.as_str(),
                                    format!("`having.{key}.{field}`"),
                                )
                            })?;
                            terms.push(HavingTerm {
                                func,
                                field: field.clone(),
                                op,
                                value: Value::from_json(value.clone()),
                            });
                        }
                    }
                    value => terms.push(HavingTerm {
                        func,
                        field: field.clone(),
                        op: HavingOp::Equals,
                        value: Value::from_json(value.clone()),
                    }),
                }
            }
        }

        Ok(Having { terms })
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }
}
