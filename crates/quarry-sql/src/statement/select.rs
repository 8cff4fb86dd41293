use super::push_where;

use quarry_core::{driver::Capability, stmt::Sql};

/// A `SELECT` under construction.
#[derive(Debug, Default, Clone)]
pub struct Select {
    pub distinct: bool,

    /// Select list; empty renders `*`
    pub columns: Vec<Sql>,

    /// Table (with alias) or subquery
    pub from: Sql,

    pub joins: Vec<Sql>,

    /// Conditions, combined with `AND`
    pub conditions: Vec<Sql>,

    pub group_by: Vec<Sql>,

    /// `HAVING` conditions, combined with `AND`
    pub having: Vec<Sql>,

    pub order_by: Vec<Sql>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

impl Select {
    pub fn new(from: impl Into<Sql>) -> Select {
        Select {
            from: from.into(),
            ..Select::default()
        }
    }

    pub fn into_sql(self, capability: &Capability) -> Sql {
        let mut sql = Sql::raw("SELECT ");
        if self.distinct {
            sql.push_str("DISTINCT ");
        }

        if self.columns.is_empty() {
            sql.push_str("*");
        } else {
            sql.push_sql(Sql::join(self.columns, ", "));
        }

        sql.push_str(" FROM ");
        sql.push_sql(self.from);

        for join in self.joins {
            sql.push_str(" ");
            sql.push_sql(join);
        }

        push_where(&mut sql, self.conditions);

        if !self.group_by.is_empty() {
            sql.push_str(" GROUP BY ");
            sql.push_sql(Sql::join(self.group_by, ", "));
        }

        if !self.having.is_empty() {
            sql.push_str(" HAVING ");
            sql.push_sql(Sql::join(self.having, " AND "));
        }

        if !self.order_by.is_empty() {
            sql.push_str(" ORDER BY ");
            sql.push_sql(Sql::join(self.order_by, ", "));
        }

        match (self.limit, self.offset) {
            (Some(limit), _) => {
                sql.push_str(format!(" LIMIT {limit}"));
            }
            (None, Some(_)) => {
                if let Some(limit) = capability.offset_without_limit {
                    sql.push_str(format!(" LIMIT {limit}"));
                }
            }
            (None, None) => {}
        }

        if let Some(offset) = self.offset {
            sql.push_str(format!(" OFFSET {offset}"));
        }

        sql
    }
}
