use super::{FieldKind, Schema};
use crate::{Error, Result};

impl Schema {
    /// Checks references between models once every model is loaded.
    pub(super) fn verify(&self) -> Result<()> {
        for model in self.models.values() {
            for field in model.fields.values() {
                match &field.kind {
                    FieldKind::Enum(name) if self.enum_(name).is_none() => {
                        return Err(Error::invalid_schema(format!(
                            "field `{}.{}` references unknown enum `{name}`",
                            model.name, field.name
                        )));
                    }
                    FieldKind::Object(target) => {
                        let Some(related) = self.model(target) else {
                            return Err(Error::invalid_schema(format!(
                                "field `{}.{}` references unknown model `{target}`",
                                model.name, field.name
                            )));
                        };

                        if let Some(relation) = &field.relation {
                            let missing = relation
                                .from_fields
                                .iter()
                                .find(|f| !model.fields.contains_key(*f))
                                .or_else(|| {
                                    relation
                                        .to_fields
                                        .iter()
                                        .find(|f| !related.fields.contains_key(*f))
                                });
                            if let Some(missing) = missing {
                                return Err(Error::invalid_schema(format!(
                                    "relation `{}.{}` references unknown field `{missing}`",
                                    model.name, field.name
                                )));
                            }
                        }
                    }
                    _ => {}
                }
            }

            for key in model.key_fields() {
                if !model.fields.contains_key(key) {
                    return Err(Error::invalid_schema(format!(
                        "primary key of `{}` references unknown field `{key}`",
                        model.name
                    )));
                }
            }
        }

        Ok(())
    }
}
