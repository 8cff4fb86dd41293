use super::{read, Cx};
use crate::{db::ModelRuntime, Result};

use quarry_core::{
    query::{Filter, Query},
    stmt::{Placeholders, Record},
};
use quarry_sql::{compile, Delete};

/// Deletes the record matching `query.filter`. Returns the record as it was
/// before the delete, shaped by `query`, or `None` when nothing matched.
pub(crate) async fn delete(
    cx: &mut Cx<'_>,
    rt: &ModelRuntime,
    query: &Query,
) -> Result<Option<Record>> {
    cx.begin().await?;
    let result = delete_in_tx(cx, rt, query).await;
    cx.finish(result).await
}

async fn delete_in_tx(
    cx: &mut Cx<'_>,
    rt: &ModelRuntime,
    query: &Query,
) -> Result<Option<Record>> {
    let Some(record) = read::find_first(cx, rt, query).await? else {
        return Ok(None);
    };

    match delete_where(cx, rt, &query.filter).await? {
        0 => Ok(None),
        _ => Ok(Some(record)),
    }
}

/// Deletes every record matching `filter` in its own transaction.
pub(crate) async fn delete_many(cx: &mut Cx<'_>, rt: &ModelRuntime, filter: &Filter) -> Result<u64> {
    cx.begin().await?;
    let result = delete_where(cx, rt, filter).await;
    cx.finish(result).await
}

/// `DELETE FROM table WHERE filter`; returns the affected row count.
pub(crate) async fn delete_where(cx: &mut Cx<'_>, rt: &ModelRuntime, filter: &Filter) -> Result<u64> {
    let scope = cx.scope(rt);
    let mut placeholders = Placeholders::new();
    let stmt = Delete {
        table: rt.table.clone(),
        conditions: compile(filter, &scope, &mut placeholders)?,
    };
    cx.execute(stmt.into_sql()).await
}
