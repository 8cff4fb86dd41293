pub mod assemble;
pub use assemble::{apply_modifiers, Modifiers};

pub mod condition;
pub use condition::{compile, relation_count, single_key};

pub mod having;
pub use having::compile_having;

mod ident;
pub use ident::quote;

pub mod join;
pub use join::{join_clause, plan_joins, JoinPlan, JoinType};

mod scope;
pub use scope::Scope;

pub mod serializer;
pub use serializer::{Params, Placeholder, Serializer};

pub mod statement;
pub use statement::{Delete, Insert, Select, Update};
