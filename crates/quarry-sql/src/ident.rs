use quarry_core::driver::{Capability, Dialect};

/// Quotes an identifier for the dialect: `"x"` on PostgreSQL and SQLite,
/// `` `x` `` on MySQL. Embedded quote characters are doubled and an empty
/// identifier quotes to the empty string.
pub fn quote(capability: &Capability, ident: &str) -> String {
    if ident.is_empty() {
        return String::new();
    }

    let q = match capability.dialect {
        Dialect::Mysql => '`',
        Dialect::Postgresql | Dialect::Sqlite => '"',
    };

    let mut out = String::with_capacity(ident.len() + 2);
    out.push(q);
    for c in ident.chars() {
        if c == q {
            out.push(q);
        }
        out.push(c);
    }
    out.push(q);
    out
}
