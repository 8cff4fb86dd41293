use super::push_where;

use quarry_core::stmt::Sql;

#[derive(Debug, Default, Clone)]
pub struct Delete {
    pub table: String,
    pub conditions: Vec<Sql>,
}

impl Delete {
    pub fn into_sql(self) -> Sql {
        let mut sql = Sql::raw("DELETE FROM ");
        sql.push_str(&self.table);
        push_where(&mut sql, self.conditions);
        sql
    }
}
