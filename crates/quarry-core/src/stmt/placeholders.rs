use super::{Bind, Sql, Value};

use indexmap::IndexMap;

/// Allocates bind parameter names for one statement.
///
/// Every name handed out is unique within the allocator; a requested name
/// that is already taken gets a `_{n}` suffix. All bindings are recorded in
/// allocation order.
#[derive(Debug, Default)]
pub struct Placeholders {
    bindings: IndexMap<String, Value>,
}

impl Placeholders {
    pub fn new() -> Placeholders {
        Placeholders::default()
    }

    /// Records `value` under a unique name derived from `name` and returns
    /// the bind fragment.
    pub fn bind(&mut self, name: impl Into<String>, value: impl Into<Value>) -> Sql {
        let mut name = name.into();
        if self.bindings.contains_key(&name) {
            let base = name.clone();
            let mut n = 1;
            loop {
                name = format!("{base}_{n}");
                if !self.bindings.contains_key(&name) {
                    break;
                }
                n += 1;
            }
        }

        let value = value.into();
        self.bindings.insert(name.clone(), value.clone());
        Sql::bind(Bind { name, value })
    }

    pub fn bindings(&self) -> &IndexMap<String, Value> {
        &self.bindings
    }
}
