use super::push_where;

use quarry_core::stmt::Sql;

#[derive(Debug, Default, Clone)]
pub struct Update {
    pub table: String,

    /// `(quoted column, value)` pairs
    pub assignments: Vec<(String, Sql)>,

    pub conditions: Vec<Sql>,
}

impl Update {
    pub fn into_sql(self) -> Sql {
        let mut sql = Sql::raw("UPDATE ");
        sql.push_str(&self.table);
        sql.push_str(" SET ");
        let assignments = self.assignments.into_iter().map(|(column, value)| {
            let mut sql = Sql::raw(column);
            sql.push_str(" = ");
            sql.push_sql(value);
            sql
        });
        sql.push_sql(Sql::join(assignments, ", "));
        push_where(&mut sql, self.conditions);
        sql
    }
}
