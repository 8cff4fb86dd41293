use crate::stmt::Record;

#[derive(Debug)]
pub struct Response {
    pub rows: Rows,

    /// Auto-increment id generated by an insert, when the driver reports one
    pub last_insert_id: Option<u64>,
}

#[derive(Debug)]
pub enum Rows {
    /// Number of rows impacted by the operation
    Count(u64),

    /// Operation result, one record per row keyed by column label
    Values(Vec<Record>),
}

impl Response {
    pub fn count(count: u64) -> Self {
        Self {
            rows: Rows::Count(count),
            last_insert_id: None,
        }
    }

    pub fn values(values: Vec<Record>) -> Self {
        Self {
            rows: Rows::Values(values),
            last_insert_id: None,
        }
    }

    pub fn empty() -> Self {
        Self::count(0)
    }
}

impl Rows {
    pub fn is_count(&self) -> bool {
        matches!(self, Self::Count(_))
    }

    pub fn is_values(&self) -> bool {
        matches!(self, Self::Values(_))
    }

    /// The affected row count, or the number of returned rows.
    pub fn into_count(self) -> u64 {
        match self {
            Rows::Count(count) => count,
            Rows::Values(values) => values.len() as u64,
        }
    }

    /// The returned rows; empty for count responses.
    pub fn into_values(self) -> Vec<Record> {
        match self {
            Rows::Values(values) => values,
            Rows::Count(_) => vec![],
        }
    }
}
