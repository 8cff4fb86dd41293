use crate::{
    db::{ModelRuntime, Shared},
    engine::{aggregate, args, create, delete, read, update, Cx},
    Result,
};

use indexmap::IndexMap;
use quarry_core::{
    driver::Connection,
    query::{Aggregates, Having},
    stmt::Record,
    Error,
};
use serde_json::{Map, Value as Json};
use tokio::sync::OwnedMutexGuard;

use std::sync::Arc;

/// Handle to one model of the schema.
///
/// Every verb takes its arguments as a JSON object in the shape of the
/// Prisma client API:
///
/// ```no_run
/// # async fn demo(db: quarry::Db) -> quarry::Result<()> {
/// use serde_json::json;
///
/// let mut users = db.model("User")?;
/// let user = users
///     .create(json!({
///         "data": {"email": "ann@example.com", "posts": {"create": [{"title": "Hello"}]}},
///         "include": {"posts": true}
///     }))
///     .await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct Model<'a> {
    shared: &'a Shared,

    /// Connection of the enclosing transaction; `None` takes the connection
    /// of the `Db` per call.
    conn: Option<&'a mut dyn Connection>,

    runtime: Arc<ModelRuntime>,
}

/// Result of [`Model::delete`].
#[derive(Debug, Clone, PartialEq)]
pub enum Deleted {
    /// The record as it was before the delete
    Record(Record),

    /// Nothing matched the `where` of the delete.
    NotFound { model_name: String, cause: String },
}

/// Result of [`Model::count`].
#[derive(Debug, Clone, PartialEq)]
pub enum Count {
    /// `COUNT(*)` of the matching rows
    Total(u64),

    /// Non-null values per selected field; `_all` counts rows.
    Fields(IndexMap<String, u64>),
}

impl Deleted {
    pub fn record(self) -> Option<Record> {
        match self {
            Deleted::Record(record) => Some(record),
            Deleted::NotFound { .. } => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Deleted::NotFound { .. })
    }
}

impl Count {
    /// The row count, or the `_all` count of a per-field count.
    pub fn total(&self) -> Option<u64> {
        match self {
            Count::Total(n) => Some(*n),
            Count::Fields(fields) => fields.get("_all").copied(),
        }
    }

    /// The count of one field.
    pub fn field(&self, name: &str) -> Option<u64> {
        match self {
            Count::Total(_) => None,
            Count::Fields(fields) => fields.get(name).copied(),
        }
    }
}

enum Handle<'c> {
    Borrowed(&'c mut dyn Connection),
    Owned(OwnedMutexGuard<Box<dyn Connection>>),
}

impl Handle<'_> {
    fn get(&mut self) -> &mut dyn Connection {
        match self {
            Handle::Borrowed(conn) => &mut **conn,
            Handle::Owned(guard) => &mut ***guard,
        }
    }
}

impl<'a> Model<'a> {
    pub(crate) fn new(
        shared: &'a Shared,
        conn: Option<&'a mut dyn Connection>,
        runtime: Arc<ModelRuntime>,
    ) -> Model<'a> {
        Model {
            shared,
            conn,
            runtime,
        }
    }

    /// The model name.
    pub fn name(&self) -> &str {
        &self.runtime.model.name
    }

    /// Creates a record with its nested relation writes and returns it.
    pub async fn create(&mut self, args: Json) -> Result<Record> {
        let cx_name = self.context("create");
        let map = args::object(&args, &cx_name)?;
        let data = args::required_object(map, "data", &cx_name)?;
        let query = self.query(map, args::CREATE, &cx_name)?;

        let (shared, rt) = (self.shared, self.runtime.clone());
        let mut handle = self.handle().await?;
        let mut cx = Cx::new(shared, handle.get());
        create::create(&mut cx, &rt, data, &query).await
    }

    /// Inserts many records in one statement and returns how many were
    /// inserted. With `skipDuplicates`, rows violating a unique constraint
    /// are skipped.
    pub async fn create_many(&mut self, args: Json) -> Result<u64> {
        let cx_name = self.context("createMany");
        let map = args::object(&args, &cx_name)?;
        args::query(self.schema(), self.descriptor(), map, args::CREATE_MANY, &cx_name)?;

        let rows = match map.get("data") {
            Some(Json::Array(rows)) if !rows.is_empty() => rows
                .iter()
                .map(|row| {
                    row.as_object().ok_or_else(|| {
                        Error::invalid_criteria(format!(
                            "{cx_name}: every entry of `data` must be an object"
                        ))
                    })
                })
                .collect::<Result<Vec<&Map<String, Json>>>>()?,
            Some(Json::Object(row)) => vec![row],
            _ => {
                return Err(Error::invalid_criteria(format!(
                    "{cx_name}: `data` must be a non-empty list of objects"
                )))
            }
        };
        let skip_duplicates = map
            .get("skipDuplicates")
            .and_then(Json::as_bool)
            .unwrap_or(false);

        let (shared, rt) = (self.shared, self.runtime.clone());
        let mut handle = self.handle().await?;
        let mut cx = Cx::new(shared, handle.get());
        create::create_many(&mut cx, &rt, &rows, skip_duplicates).await
    }

    /// The record identified by a unique `where`.
    pub async fn find_unique(&mut self, args: Json) -> Result<Option<Record>> {
        let cx_name = self.context("findUnique");
        let map = args::object(&args, &cx_name)?;
        args::required_object(map, "where", &cx_name)?;
        let query = self.query(map, args::FIND_UNIQUE, &cx_name)?;
        args::unique_where(self.descriptor(), &query)?;

        let (shared, rt) = (self.shared, self.runtime.clone());
        let mut handle = self.handle().await?;
        let mut cx = Cx::new(shared, handle.get());
        read::find_first(&mut cx, &rt, &query).await
    }

    pub async fn find_first(&mut self, args: Json) -> Result<Option<Record>> {
        let cx_name = self.context("findFirst");
        let map = args::object(&args, &cx_name)?;
        args::non_empty_where(map, &cx_name)?;
        let query = self.query(map, args::FIND_MANY, &cx_name)?;

        let (shared, rt) = (self.shared, self.runtime.clone());
        let mut handle = self.handle().await?;
        let mut cx = Cx::new(shared, handle.get());
        read::find_first(&mut cx, &rt, &query).await
    }

    pub async fn find_many(&mut self, args: Json) -> Result<Vec<Record>> {
        let cx_name = self.context("findMany");
        let map = args::object(&args, &cx_name)?;
        args::non_empty_where(map, &cx_name)?;
        let query = self.query(map, args::FIND_MANY, &cx_name)?;

        let (shared, rt) = (self.shared, self.runtime.clone());
        let mut handle = self.handle().await?;
        let mut cx = Cx::new(shared, handle.get());
        read::find_many(&mut cx, &rt, &query, &[]).await
    }

    /// Updates the first record matching `where` and returns it. Fails with
    /// `RecordNotFound` when nothing matches.
    pub async fn update(&mut self, args: Json) -> Result<Record> {
        let cx_name = self.context("update");
        let map = args::object(&args, &cx_name)?;
        args::required_object(map, "where", &cx_name)?;
        let data = args::required_object(map, "data", &cx_name)?;
        let query = self.query(map, args::UPDATE, &cx_name)?;

        let (shared, rt) = (self.shared, self.runtime.clone());
        let mut handle = self.handle().await?;
        let mut cx = Cx::new(shared, handle.get());
        update::update(&mut cx, &rt, &query.filter, data, &query).await
    }

    pub async fn update_many(&mut self, args: Json) -> Result<u64> {
        let cx_name = self.context("updateMany");
        let map = args::object(&args, &cx_name)?;
        let data = args::required_object(map, "data", &cx_name)?;
        let query = self.query(map, args::UPDATE_MANY, &cx_name)?;

        let (shared, rt) = (self.shared, self.runtime.clone());
        let mut handle = self.handle().await?;
        let mut cx = Cx::new(shared, handle.get());
        update::update_many(&mut cx, &rt, &query.filter, data).await
    }

    /// Deletes the record identified by a unique `where`.
    ///
    /// A `where` matching nothing is not an error: it returns
    /// [`Deleted::NotFound`].
    pub async fn delete(&mut self, args: Json) -> Result<Deleted> {
        let cx_name = self.context("delete");
        let map = args::object(&args, &cx_name)?;
        args::required_object(map, "where", &cx_name)?;
        let query = self.query(map, args::DELETE, &cx_name)?;
        args::unique_where(self.descriptor(), &query)?;

        let (shared, rt) = (self.shared, self.runtime.clone());
        let mut handle = self.handle().await?;
        let mut cx = Cx::new(shared, handle.get());
        Ok(match delete::delete(&mut cx, &rt, &query).await? {
            Some(record) => Deleted::Record(record),
            None => Deleted::NotFound {
                model_name: rt.model.name.clone(),
                cause: "Record to delete does not exist.".to_string(),
            },
        })
    }

    pub async fn delete_many(&mut self, args: Json) -> Result<u64> {
        let cx_name = self.context("deleteMany");
        let map = args::object(&args, &cx_name)?;
        let query = self.query(map, args::DELETE_MANY, &cx_name)?;

        let (shared, rt) = (self.shared, self.runtime.clone());
        let mut handle = self.handle().await?;
        let mut cx = Cx::new(shared, handle.get());
        delete::delete_many(&mut cx, &rt, &query.filter).await
    }

    /// Updates the record identified by a unique `where`, or creates it.
    pub async fn upsert(&mut self, args: Json) -> Result<Record> {
        let cx_name = self.context("upsert");
        let map = args::object(&args, &cx_name)?;
        args::required_object(map, "where", &cx_name)?;
        let create_data = args::required_object(map, "create", &cx_name)?;
        let update_data = args::required_object(map, "update", &cx_name)?;
        let query = self.query(map, args::UPSERT, &cx_name)?;
        args::unique_where(self.descriptor(), &query)?;

        let (shared, rt) = (self.shared, self.runtime.clone());
        let mut handle = self.handle().await?;
        let mut cx = Cx::new(shared, handle.get());
        update::upsert(&mut cx, &rt, &query.filter, create_data, update_data, &query).await
    }

    /// `{_avg: {views: true}, _count: true, where: ...}` over the matching
    /// records.
    pub async fn aggregate(&mut self, args: Json) -> Result<Record> {
        let cx_name = self.context("aggregate");
        let map = args::object(&args, &cx_name)?;
        let query = self.query(map, args::AGGREGATE, &cx_name)?;
        let aggregates = self.aggregates(map)?;

        let (shared, rt) = (self.shared, self.runtime.clone());
        let mut handle = self.handle().await?;
        let mut cx = Cx::new(shared, handle.get());
        aggregate::aggregate(&mut cx, &rt, &query, &aggregates).await
    }

    pub async fn group_by(&mut self, args: Json) -> Result<Vec<Record>> {
        let cx_name = self.context("groupBy");
        let map = args::object(&args, &cx_name)?;
        let query = self.query(map, args::GROUP_BY, &cx_name)?;
        let aggregates = self.aggregates(map)?;

        let by = match map.get("by") {
            Some(Json::String(field)) => vec![field.clone()],
            Some(Json::Array(fields)) => fields
                .iter()
                .map(|f| {
                    f.as_str().map(String::from).ok_or_else(|| {
                        Error::invalid_criteria(format!("{cx_name}: `by` must list field names"))
                    })
                })
                .collect::<Result<Vec<_>>>()?,
            _ => {
                return Err(Error::invalid_criteria(format!(
                    "{cx_name}: `by` is required"
                )))
            }
        };
        for name in &by {
            self.descriptor().field_or_err(name)?;
        }

        let having = match map.get("having") {
            Some(having) if !having.is_null() => Having::from_json(having)?,
            _ => Having::default(),
        };

        let (shared, rt) = (self.shared, self.runtime.clone());
        let mut handle = self.handle().await?;
        let mut cx = Cx::new(shared, handle.get());
        aggregate::group_by(&mut cx, &rt, &by, &query, &aggregates, &having).await
    }

    /// Counts the matching records. `select` counts non-null values per
    /// field instead.
    pub async fn count(&mut self, args: Json) -> Result<Count> {
        let cx_name = self.context("count");
        let mut map = args::object(&args, &cx_name)?.clone();
        let select = map.remove("select");
        let query = self.query(&map, args::COUNT, &cx_name)?;

        let fields = match select {
            None | Some(Json::Null) | Some(Json::Bool(true)) => None,
            Some(select) => Some(self.count_fields(&select, &cx_name)?),
        };

        let (shared, rt) = (self.shared, self.runtime.clone());
        let mut handle = self.handle().await?;
        let mut cx = Cx::new(shared, handle.get());
        aggregate::count(&mut cx, &rt, &query, fields.as_deref()).await
    }

    fn context(&self, verb: &str) -> String {
        format!("{}.{verb}", self.runtime.model.name)
    }

    fn schema(&self) -> &quarry_core::Schema {
        &self.shared.schema
    }

    fn descriptor(&self) -> &quarry_core::schema::Model {
        &self.runtime.model
    }

    fn query(
        &self,
        map: &Map<String, Json>,
        allowed: &[&str],
        context: &str,
    ) -> Result<quarry_core::query::Query> {
        args::query(self.schema(), self.descriptor(), map, allowed, context)
    }

    fn aggregates(&self, map: &Map<String, Json>) -> Result<Aggregates> {
        let aggregates = Aggregates::from_map(map)?;
        for (_, field) in aggregates.iter() {
            if !quarry_core::query::is_all(field) {
                self.descriptor().field_or_err(field)?;
            }
        }
        Ok(aggregates)
    }

    /// Field names of `select: {_count: {select: {...}}}` or
    /// `select: {field: true}`.
    fn count_fields(&self, select: &Json, context: &str) -> Result<Vec<String>> {
        let mut map = quarry_core::query::expect_object(select, "select")?;
        if let Some(Json::Object(inner)) = map.get("_count") {
            map = match inner.get("select") {
                Some(Json::Object(fields)) => fields,
                _ => inner,
            };
        }

        let mut fields = vec![];
        for (name, enabled) in map {
            if enabled.as_bool() != Some(true) {
                continue;
            }
            if !quarry_core::query::is_all(name) {
                let field = self.descriptor().field_or_err(name)?;
                if field.is_relation() {
                    return Err(Error::invalid_criteria(format!(
                        "{context}: cannot count relation `{name}`"
                    )));
                }
            }
            fields.push(name.clone());
        }
        Ok(fields)
    }

    /// The connection for one call: the transaction's, or the `Db`'s.
    async fn handle(&mut self) -> Result<Handle<'_>> {
        Ok(match &mut self.conn {
            Some(conn) => Handle::Borrowed(&mut **conn),
            None => Handle::Owned(self.shared.acquire().await?),
        })
    }
}
