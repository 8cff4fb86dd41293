use crate::Result;

use indexmap::IndexMap;
use quarry_core::{
    driver::Capability,
    schema::{self, Schema},
};
use quarry_sql::quote;

use std::sync::{Arc, Mutex};

/// Per-model state built on first use: the descriptor and its quoted
/// table name.
#[derive(Debug)]
pub(crate) struct ModelRuntime {
    pub(crate) model: Arc<schema::Model>,
    pub(crate) table: String,
}

/// Lazily populated map of model runtimes, shared by every handle of a `Db`.
#[derive(Debug)]
pub(crate) struct ModelRegistry {
    schema: Arc<Schema>,
    capability: &'static Capability,
    runtimes: Mutex<IndexMap<String, Arc<ModelRuntime>>>,
}

impl ModelRegistry {
    pub(crate) fn new(schema: Arc<Schema>, capability: &'static Capability) -> ModelRegistry {
        ModelRegistry {
            schema,
            capability,
            runtimes: Mutex::new(IndexMap::new()),
        }
    }

    /// Returns the runtime of `name`, building it when first requested.
    pub(crate) fn get(&self, name: &str) -> Result<Arc<ModelRuntime>> {
        let mut runtimes = self
            .runtimes
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        if let Some(runtime) = runtimes.get(name) {
            return Ok(runtime.clone());
        }

        let model = self.schema.model_or_err(name)?.clone();
        let runtime = Arc::new(ModelRuntime {
            table: quote(self.capability, &model.table_name),
            model,
        });
        runtimes.insert(name.to_string(), runtime.clone());
        Ok(runtime)
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.runtimes
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }
}
