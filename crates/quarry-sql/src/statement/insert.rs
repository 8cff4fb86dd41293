use quarry_core::{driver::Capability, stmt::Sql};

/// A single or multi-row `INSERT`. Identifiers are already quoted.
#[derive(Debug, Default, Clone)]
pub struct Insert {
    pub table: String,
    pub columns: Vec<String>,

    /// One entry per row, in column order
    pub rows: Vec<Vec<Sql>>,

    /// Columns to return; ignored when the database has no `RETURNING`
    pub returning: Vec<String>,

    /// Skip rows violating a unique constraint
    pub on_conflict_ignore: bool,
}

impl Insert {
    pub fn into_sql(self, capability: &Capability) -> Sql {
        let mut sql = Sql::raw(if self.on_conflict_ignore && capability.is_mysql() {
            "INSERT IGNORE INTO "
        } else {
            "INSERT INTO "
        });
        sql.push_str(&self.table);

        if self.columns.is_empty() {
            if capability.is_mysql() {
                sql.push_str(" () VALUES ()");
            } else {
                sql.push_str(" DEFAULT VALUES");
            }
        } else {
            sql.push_str(" (");
            sql.push_str(self.columns.join(", "));
            sql.push_str(") VALUES ");
            let rows = self
                .rows
                .into_iter()
                .map(|row| Sql::join(row, ", ").parenthesized());
            sql.push_sql(Sql::join(rows, ", "));
        }

        if self.on_conflict_ignore && !capability.is_mysql() {
            sql.push_str(" ON CONFLICT DO NOTHING");
        }

        if capability.returning && !self.returning.is_empty() {
            sql.push_str(" RETURNING ");
            sql.push_str(self.returning.join(", "));
        }

        sql
    }
}
