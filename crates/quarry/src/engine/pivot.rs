//! Rows of the join table behind an implicit many-to-many relation.

use super::Cx;
use crate::Result;

use quarry_core::{
    schema::{Model, Pivot},
    stmt::{Placeholders, Sql, Value},
};
use quarry_sql::{Delete, Insert, Select};

/// The pivot between `model` and `related`, with the side of `model`.
#[derive(Debug)]
pub(crate) struct Link<'a> {
    pivot: Pivot,
    model: &'a str,
}

impl<'a> Link<'a> {
    pub(crate) fn new(model: &'a Model, related: &Model) -> Link<'a> {
        Link {
            pivot: Pivot::new(&model.name, &related.name),
            model: &model.name,
        }
    }

    fn near(&self) -> &'static str {
        self.pivot.column_for(self.model)
    }

    fn far(&self) -> &'static str {
        self.pivot.other_column(self.model)
    }

    /// Keys of the related records linked to `id`.
    pub(crate) async fn related_ids(&self, cx: &mut Cx<'_>, id: &Value) -> Result<Vec<Value>> {
        let capability = cx.capability();
        let quote = |ident: &str| quarry_sql::quote(capability, ident);
        let mut placeholders = Placeholders::new();

        let mut select = Select::new(quote(&self.pivot.table));
        select.columns.push(Sql::raw(format!(
            "{} AS {}",
            quote(self.far()),
            quote("id")
        )));
        let mut condition = Sql::raw(format!("{} = ", quote(self.near())));
        condition.push_sql(placeholders.bind("id", id.clone()));
        select.conditions.push(condition);

        let rows = cx.query(select.into_sql(capability)).await?;
        Ok(rows
            .into_iter()
            .map(|row| row["id"].clone())
            .filter(|id| !id.is_null())
            .collect())
    }

    /// Links `id` to each of `related`, ignoring existing links.
    pub(crate) async fn connect(
        &self,
        cx: &mut Cx<'_>,
        id: &Value,
        related: &[Value],
    ) -> Result<()> {
        if related.is_empty() {
            return Ok(());
        }

        let capability = cx.capability();
        let quote = |ident: &str| quarry_sql::quote(capability, ident);
        let mut placeholders = Placeholders::new();

        let rows = related
            .iter()
            .enumerate()
            .map(|(i, other)| {
                vec![
                    placeholders.bind(format!("{}_{i}", self.near()), id.clone()),
                    placeholders.bind(format!("{}_{i}", self.far()), other.clone()),
                ]
            })
            .collect();

        let insert = Insert {
            table: quote(&self.pivot.table),
            columns: vec![quote(self.near()), quote(self.far())],
            rows,
            returning: vec![],
            on_conflict_ignore: true,
        };
        cx.execute(insert.into_sql(capability)).await?;
        Ok(())
    }

    /// Removes links of `id`: to the given related keys, or all of them
    /// except `keep` when `only` is `None`.
    pub(crate) async fn disconnect(
        &self,
        cx: &mut Cx<'_>,
        id: &Value,
        only: Option<&[Value]>,
        keep: &[Value],
    ) -> Result<u64> {
        let capability = cx.capability();
        let quote = |ident: &str| quarry_sql::quote(capability, ident);
        let mut placeholders = Placeholders::new();

        let mut condition = Sql::raw(format!("{} = ", quote(self.near())));
        condition.push_sql(placeholders.bind("id", id.clone()));
        let mut conditions = vec![condition];

        let (values, negate) = match only {
            Some(only) => (only, false),
            None => (keep, true),
        };
        if !values.is_empty() {
            let binds = values
                .iter()
                .enumerate()
                .map(|(i, value)| placeholders.bind(format!("other_{i}"), value.clone()));
            let mut condition = Sql::raw(format!(
                "{} {} ",
                quote(self.far()),
                if negate { "NOT IN" } else { "IN" }
            ));
            condition.push_sql(Sql::join(binds, ", ").parenthesized());
            conditions.push(condition);
        } else if !negate {
            return Ok(0);
        }

        let delete = Delete {
            table: quote(&self.pivot.table),
            conditions,
        };
        cx.execute(delete.into_sql()).await
    }
}

