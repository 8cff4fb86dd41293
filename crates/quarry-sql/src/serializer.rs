mod flavor;
use flavor::Flavor;

mod params;
pub use params::{Params, Placeholder};

use quarry_core::{
    driver::{Capability, Dialect},
    stmt::{Part, Sql},
};

/// Renders a [`Sql`] fragment to dialect SQL, turning named binds into
/// positional placeholders and collecting their values.
#[derive(Debug)]
pub struct Serializer {
    /// The database flavor handles the differences between placeholder
    /// syntaxes.
    flavor: Flavor,
}

impl Serializer {
    pub fn for_capability(capability: &Capability) -> Serializer {
        match capability.dialect {
            Dialect::Mysql => Serializer::mysql(),
            Dialect::Postgresql => Serializer::postgresql(),
            Dialect::Sqlite => Serializer::sqlite(),
        }
    }

    pub fn serialize(&self, stmt: &Sql, params: &mut impl Params) -> String {
        let mut ret = String::new();

        for part in stmt.parts() {
            match part {
                Part::Text(text) => ret.push_str(text),
                Part::Bind(bind) => {
                    let placeholder = params.push(&bind.value);
                    self.write_placeholder(&mut ret, placeholder);
                }
            }
        }

        ret
    }

    fn write_placeholder(&self, dst: &mut String, placeholder: Placeholder) {
        match self.flavor {
            Flavor::Mysql => dst.push('?'),
            Flavor::Postgresql => {
                dst.push('$');
                dst.push_str(&placeholder.0.to_string());
            }
            Flavor::Sqlite => {
                dst.push('?');
                dst.push_str(&placeholder.0.to_string());
            }
        }
    }
}
