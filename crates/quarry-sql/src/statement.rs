mod delete;
pub use delete::Delete;

mod insert;
pub use insert::Insert;

mod select;
pub use select::Select;

mod update;
pub use update::Update;

use quarry_core::stmt::Sql;

fn push_where(sql: &mut Sql, conditions: Vec<Sql>) {
    if !conditions.is_empty() {
        sql.push_str(" WHERE ");
        sql.push_sql(Sql::join(conditions, " AND "));
    }
}
