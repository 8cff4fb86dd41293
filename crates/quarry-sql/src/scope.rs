use crate::quote;

use quarry_core::{
    driver::Capability,
    schema::{Model, Schema},
};

/// What a fragment is being compiled against: the dialect, the schema, the
/// model (when known) and the quoted alias of its table.
#[derive(Debug, Clone, Copy)]
pub struct Scope<'a> {
    pub capability: &'static Capability,
    pub schema: &'a Schema,
    pub model: Option<&'a Model>,
    pub table: &'a str,
}

impl<'a> Scope<'a> {
    pub fn new(
        capability: &'static Capability,
        schema: &'a Schema,
        model: Option<&'a Model>,
        table: &'a str,
    ) -> Scope<'a> {
        Scope {
            capability,
            schema,
            model,
            table,
        }
    }

    /// The same scope over another table alias and model.
    pub fn with(&self, model: Option<&'a Model>, table: &'a str) -> Scope<'a> {
        Scope {
            model,
            table,
            ..*self
        }
    }

    pub fn quote(&self, ident: &str) -> String {
        quote(self.capability, ident)
    }

    /// Qualified column of `field`, mapped to its column name when the model
    /// knows the field.
    pub fn column(&self, field: &str) -> String {
        let name = match self.model {
            Some(model) => model.column_name(field),
            None => field,
        };
        if self.table.is_empty() {
            self.quote(name)
        } else {
            format!("{}.{}", self.table, self.quote(name))
        }
    }
}
