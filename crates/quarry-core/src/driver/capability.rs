#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    Mysql,
    Postgresql,
    Sqlite,
}

#[derive(Debug)]
pub struct Capability {
    pub dialect: Dialect,

    /// Supports `INSERT ... RETURNING`.
    pub returning: bool,

    /// Supports case-insensitive `ILIKE`.
    pub ilike: bool,

    /// Accepts the `DEFAULT` keyword inside a multi-row `VALUES` list.
    pub default_in_values: bool,

    /// `HAVING` may reference select-list aliases.
    pub having_alias: bool,

    /// The `LIMIT` to render when only an `OFFSET` is requested. `None` means
    /// `OFFSET` may appear on its own.
    pub offset_without_limit: Option<&'static str>,
}

impl Capability {
    /// SQLite capabilities.
    pub const SQLITE: Self = Self {
        dialect: Dialect::Sqlite,
        returning: true,
        ilike: false,
        default_in_values: false,
        having_alias: true,
        offset_without_limit: Some("-1"),
    };

    /// PostgreSQL capabilities
    pub const POSTGRESQL: Self = Self {
        dialect: Dialect::Postgresql,
        ilike: true,
        default_in_values: true,
        having_alias: false,
        offset_without_limit: None,
        ..Self::SQLITE
    };

    /// MySQL capabilities
    pub const MYSQL: Self = Self {
        dialect: Dialect::Mysql,
        returning: false,
        default_in_values: true,
        offset_without_limit: Some("18446744073709551615"),
        ..Self::SQLITE
    };

    pub fn is_mysql(&self) -> bool {
        self.dialect == Dialect::Mysql
    }

    pub fn is_postgresql(&self) -> bool {
        self.dialect == Dialect::Postgresql
    }

    pub fn is_sqlite(&self) -> bool {
        self.dialect == Dialect::Sqlite
    }
}
