//! Nested writes on relation fields.
//!
//! A relation payload maps actions to their arguments:
//!
//! ```json
//! {"author": {"connect": {"email": "a@x.io"}}}
//! {"posts": {"create": [{"title": "a"}, {"title": "b"}], "disconnect": {"id": 4}}}
//! ```
//!
//! How an action runs depends on where the link is stored: in a foreign key
//! of the record being written, in a foreign key of the related records, or
//! in the pivot table of an implicit many-to-many relation.

use super::{create, delete, pivot::Link, read, update, Cx};
use crate::{db::ModelRuntime, Result};

use async_recursion::async_recursion;
use quarry_core::{
    query::{check_keys, expect_object, Filter, Query},
    schema::{Field, Model, RelationKeys},
    stmt::{Record, Value},
    Error,
};
use quarry_sql::single_key;
use serde_json::{Map, Value as Json};

/// Actions accepted inside `create` data.
pub(crate) const CREATE_ACTIONS: &[&str] = &["connect", "connectOrCreate", "create"];

/// Actions accepted inside `update` data.
pub(crate) const UPDATE_ACTIONS: &[&str] = &[
    "connect",
    "connectOrCreate",
    "create",
    "update",
    "upsert",
    "delete",
    "disconnect",
    "set",
    "updateMany",
    "deleteMany",
];

/// Actions that link exactly one record on a to-one relation.
const LINKING: &[&str] = &["connect", "connectOrCreate", "create"];

enum Shape<'a> {
    /// The record being written holds the foreign key (`Post.author`).
    Owned(&'a RelationKeys),

    /// The related records hold a foreign key to this one (`User.posts`).
    Children(&'a RelationKeys),

    /// Implicit many-to-many relation stored in a pivot table.
    Pivot,
}

fn shape<'a>(model: &'a Model, field: &Field) -> Result<Shape<'a>> {
    let keys = model
        .relation_keys(&field.name)
        .ok_or_else(|| Error::missing_relation_metadata(&model.name, &field.name))?;

    Ok(if keys.is_empty() {
        Shape::Pivot
    } else if field.holds_foreign_key() {
        Shape::Owned(keys)
    } else {
        Shape::Children(keys)
    })
}

/// Returns `true` when writing `field` yields foreign key values for the
/// record itself, so it has to run before the record is written.
pub(crate) fn caller_owns(model: &Model, field: &Field) -> bool {
    matches!(shape(model, field), Ok(Shape::Owned(_)))
}

/// Runs the actions of `payload` on the relation `field` of `rt`.
///
/// `parent` is the record the relation hangs off; it is `None` only while
/// the record itself is being created, which is when foreign keys it owns
/// are resolved. The returned record holds the foreign key values to write
/// on the parent; it is empty for relations stored elsewhere. With
/// `require_return`, a relation that resolves to no record fails with
/// `RelationProcessingFailed`.
#[async_recursion]
pub(crate) async fn process_relation(
    cx: &mut Cx<'_>,
    rt: &ModelRuntime,
    field: &Field,
    payload: &Json,
    parent: Option<&Record>,
    require_return: bool,
    allowed: &[&str],
) -> Result<Record> {
    let model = &*rt.model;
    let relation = format!("{}.{}", model.name, field.name);

    let actions = expect_object(payload, &relation)?;
    check_keys(actions, allowed, &relation)?;

    if !field.is_list {
        let mut linked = 0;
        for (action, value) in actions {
            if LINKING.contains(&action.as_str()) {
                linked += items(value).len();
                if linked > 1 {
                    return Err(Error::multiple_connect_on_singular_relation(
                        &relation,
                        action.as_str(),
                    ));
                }
            }
        }
    }

    let related = cx.runtime(&cx.schema().related_model(model, field)?.name)?;
    let target = Target {
        rt,
        related: &related,
        field,
        relation: &relation,
    };

    match shape(model, field)? {
        Shape::Owned(keys) => target.owned(cx, keys, actions, parent, require_return).await,
        Shape::Children(keys) => {
            let parent = parent.ok_or_else(|| Error::relation_processing_failed(&relation))?;
            target.children(cx, keys, actions, parent).await?;
            Ok(Record::new())
        }
        Shape::Pivot => {
            let parent = parent.ok_or_else(|| Error::relation_processing_failed(&relation))?;
            target.pivot(cx, actions, parent).await?;
            Ok(Record::new())
        }
    }
}

struct Target<'a> {
    /// Model the relation field belongs to
    rt: &'a ModelRuntime,

    /// Model the relation points at
    related: &'a ModelRuntime,

    field: &'a Field,

    /// `Model.field`, for errors
    relation: &'a str,
}

impl Target<'_> {
    /// The record holds the foreign key. Returns the values to write into it.
    async fn owned(
        &self,
        cx: &mut Cx<'_>,
        keys: &RelationKeys,
        actions: &Map<String, Json>,
        parent: Option<&Record>,
        require_return: bool,
    ) -> Result<Record> {
        // The related record currently linked, by its referenced fields.
        let current: Option<Record> = parent.and_then(|parent| {
            let link: Record = keys
                .pairs()
                .map(|(from, to)| (to.to_string(), parent[from].clone()))
                .collect();
            let complete = link.iter().all(|(_, v)| !v.is_null());
            complete.then_some(link)
        });

        let mut linked: Option<Record> = None;
        let mut unlink = false;

        for (action, value) in actions {
            match action.as_str() {
                "connect" | "set" => {
                    for item in items(value) {
                        linked = Some(self.find(cx, item).await?);
                    }
                }
                "connectOrCreate" => {
                    for item in items(value) {
                        linked = Some(self.connect_or_create(cx, item).await?);
                    }
                }
                "create" => {
                    for item in items(value) {
                        linked = Some(self.create(cx, object(item, "create")?).await?);
                    }
                }
                "update" => {
                    let current = self.require(current.as_ref())?;
                    let data = match object(value, "update")? {
                        data if data.contains_key("data") => object(&data["data"], "update.data")?,
                        data => data,
                    };
                    update::update_row(cx, self.related, &Filter::from_record(current), data)
                        .await?;
                }
                "upsert" => {
                    let args = object(value, "upsert")?;
                    match &current {
                        Some(current) => {
                            let data = object(field_of(args, "update")?, "upsert.update")?;
                            update::update_row(cx, self.related, &Filter::from_record(current), data)
                                .await?;
                        }
                        None => {
                            let data = object(field_of(args, "create")?, "upsert.create")?;
                            linked = Some(self.create(cx, data).await?);
                        }
                    }
                }
                "delete" => {
                    if !is_enabled(value) {
                        continue;
                    }
                    let current = self.require(current.as_ref())?;
                    let parent = parent.ok_or_else(|| self.failed())?;

                    // Clear the foreign key before the row it points at goes.
                    self.check_nullable(keys)?;
                    let nulls = nulls(keys);
                    let key = update::key_of(&self.rt.model, parent);
                    update::assign(cx, self.rt, &Filter::from_record(&key), &nulls).await?;
                    delete::delete_where(cx, self.related, &Filter::from_record(current)).await?;
                    unlink = true;
                }
                "disconnect" => {
                    if is_enabled(value) {
                        unlink = true;
                    }
                }
                _ => {
                    return Err(Error::invalid_criteria(format!(
                        "`{action}` only applies to list relations, `{}` is not one",
                        self.relation
                    )))
                }
            }
        }

        let mut bindings = Record::new();
        match linked {
            Some(record) => {
                for (from, to) in keys.pairs() {
                    let value = record[to].clone();
                    if value.is_null() {
                        return Err(self.failed());
                    }
                    bindings.insert(from, value);
                }
            }
            None if unlink => {
                self.check_nullable(keys)?;
                bindings = nulls(keys);
            }
            None if require_return => return Err(self.failed()),
            None => {}
        }
        Ok(bindings)
    }

    /// The related records hold a foreign key to `parent`.
    async fn children(
        &self,
        cx: &mut Cx<'_>,
        keys: &RelationKeys,
        actions: &Map<String, Json>,
        parent: &Record,
    ) -> Result<()> {
        let link: Record = keys
            .pairs()
            .map(|(from, to)| (from.to_string(), parent[to].clone()))
            .collect();
        if link.iter().any(|(_, v)| v.is_null()) {
            return Err(self.failed());
        }
        let linked = || Filter::from_record(&link);
        let scoped = |filter: Filter| Filter::and([filter, Filter::from_record(&link)]);
        let list = self.field.is_list;

        for (action, value) in actions {
            match action.as_str() {
                "connect" => {
                    for item in items(value) {
                        let selector = self.selector(item)?;
                        if update::assign(cx, self.related, &selector, &link).await? == 0 {
                            return Err(self.unmatched());
                        }
                    }
                }
                "create" => {
                    for item in items(value) {
                        let data = with_link(object(item, "create")?, &link);
                        create::insert(cx, self.related, &data).await?;
                    }
                }
                "connectOrCreate" => {
                    for item in items(value) {
                        let args = object(item, "connectOrCreate")?;
                        let selector = self.selector(field_of(args, "where")?)?;
                        if read::fetch(cx, self.related, selector.clone()).await?.is_some() {
                            update::assign(cx, self.related, &selector, &link).await?;
                        } else {
                            let data = object(field_of(args, "create")?, "connectOrCreate.create")?;
                            create::insert(cx, self.related, &with_link(data, &link)).await?;
                        }
                    }
                }
                "update" => {
                    for item in items(value) {
                        let args = object(item, "update")?;
                        let (filter, data) = if list {
                            let selector = self.selector(field_of(args, "where")?)?;
                            (scoped(selector), object(field_of(args, "data")?, "update.data")?)
                        } else if args.contains_key("data") {
                            (linked(), object(&args["data"], "update.data")?)
                        } else {
                            (linked(), args)
                        };
                        update::update_row(cx, self.related, &filter, data).await?;
                    }
                }
                "upsert" => {
                    for item in items(value) {
                        let args = object(item, "upsert")?;
                        let filter = if list {
                            scoped(self.selector(field_of(args, "where")?)?)
                        } else {
                            linked()
                        };
                        if read::fetch(cx, self.related, filter.clone()).await?.is_some() {
                            let data = object(field_of(args, "update")?, "upsert.update")?;
                            update::update_row(cx, self.related, &filter, data).await?;
                        } else {
                            let data = object(field_of(args, "create")?, "upsert.create")?;
                            create::insert(cx, self.related, &with_link(data, &link)).await?;
                        }
                    }
                }
                "delete" => {
                    if list {
                        for item in items(value) {
                            let filter = scoped(self.selector(item)?);
                            if delete::delete_where(cx, self.related, &filter).await? == 0 {
                                return Err(self.not_found("delete"));
                            }
                        }
                    } else if is_enabled(value) {
                        delete::delete_where(cx, self.related, &linked()).await?;
                    }
                }
                "disconnect" => {
                    self.check_nullable(keys)?;
                    if list {
                        for item in items(value) {
                            let filter = scoped(self.selector(item)?);
                            update::assign(cx, self.related, &filter, &nulls(keys)).await?;
                        }
                    } else if is_enabled(value) {
                        update::assign(cx, self.related, &linked(), &nulls(keys)).await?;
                    }
                }
                "set" => {
                    self.list_only(action)?;
                    let selectors = items(value)
                        .into_iter()
                        .map(|item| self.selector(item))
                        .collect::<Result<Vec<_>>>()?;

                    // Children left out of the new set are removed.
                    let stale = if selectors.is_empty() {
                        linked()
                    } else {
                        scoped(Filter::not(Filter::any(selectors.clone())))
                    };
                    delete::delete_where(cx, self.related, &stale).await?;

                    for (item, selector) in items(value).into_iter().zip(selectors) {
                        if read::fetch(cx, self.related, selector.clone()).await?.is_some() {
                            update::assign(cx, self.related, &selector, &link).await?;
                        } else {
                            let data = with_link(object(item, "set")?, &link);
                            create::insert(cx, self.related, &data).await?;
                        }
                    }
                }
                "updateMany" => {
                    self.list_only(action)?;
                    for item in items(value) {
                        let args = object(item, "updateMany")?;
                        let filter = scoped(where_of(args)?);
                        let data = object(field_of(args, "data")?, "updateMany.data")?;
                        update::update_many(cx, self.related, &filter, data).await?;
                    }
                }
                "deleteMany" => {
                    self.list_only(action)?;
                    for item in items(value) {
                        let filter = scoped(Filter::from_json(item)?);
                        delete::delete_where(cx, self.related, &filter).await?;
                    }
                }
                _ => unreachable!("actions are checked against the allowed list"),
            }
        }

        Ok(())
    }

    /// Implicit many-to-many: the link is a pivot row.
    async fn pivot(&self, cx: &mut Cx<'_>, actions: &Map<String, Json>, parent: &Record) -> Result<()> {
        let key = single_key(&self.rt.model, &self.field.name)?;
        let related_key = single_key(&self.related.model, &self.field.name)?;
        let id = parent[key].clone();
        if id.is_null() {
            return Err(self.failed());
        }
        let link = Link::new(&self.rt.model, &self.related.model);

        for (action, value) in actions {
            match action.as_str() {
                "connect" => {
                    let mut ids = vec![];
                    for item in items(value) {
                        ids.push(self.find(cx, item).await?[related_key].clone());
                    }
                    link.connect(cx, &id, &ids).await?;
                }
                "create" => {
                    let mut ids = vec![];
                    for item in items(value) {
                        let key = create::insert(cx, self.related, object(item, "create")?).await?;
                        ids.push(key[related_key].clone());
                    }
                    link.connect(cx, &id, &ids).await?;
                }
                "connectOrCreate" => {
                    let mut ids = vec![];
                    for item in items(value) {
                        ids.push(self.connect_or_create(cx, item).await?[related_key].clone());
                    }
                    link.connect(cx, &id, &ids).await?;
                }
                "disconnect" => {
                    let mut ids = vec![];
                    for item in items(value) {
                        if let Some(record) = read::fetch(cx, self.related, self.selector(item)?).await? {
                            ids.push(record[related_key].clone());
                        }
                    }
                    link.disconnect(cx, &id, Some(&ids), &[]).await?;
                }
                "set" => {
                    let mut ids = vec![];
                    for item in items(value) {
                        ids.push(self.find(cx, item).await?[related_key].clone());
                    }
                    link.disconnect(cx, &id, None, &ids).await?;
                    link.connect(cx, &id, &ids).await?;
                }
                "update" => {
                    for item in items(value) {
                        let args = object(item, "update")?;
                        let linked = link.related_ids(cx, &id).await?;
                        let filter = Filter::and([
                            self.selector(field_of(args, "where")?)?,
                            Filter::is_in(related_key, linked),
                        ]);
                        let data = object(field_of(args, "data")?, "update.data")?;
                        update::update_row(cx, self.related, &filter, data).await?;
                    }
                }
                "upsert" => {
                    for item in items(value) {
                        let args = object(item, "upsert")?;
                        let linked = link.related_ids(cx, &id).await?;
                        let filter = Filter::and([
                            self.selector(field_of(args, "where")?)?,
                            Filter::is_in(related_key, linked),
                        ]);
                        if read::fetch(cx, self.related, filter.clone()).await?.is_some() {
                            let data = object(field_of(args, "update")?, "upsert.update")?;
                            update::update_row(cx, self.related, &filter, data).await?;
                        } else {
                            let data = object(field_of(args, "create")?, "upsert.create")?;
                            let key = create::insert(cx, self.related, data).await?;
                            link.connect(cx, &id, std::slice::from_ref(&key[related_key])).await?;
                        }
                    }
                }
                "delete" => {
                    for item in items(value) {
                        let linked = link.related_ids(cx, &id).await?;
                        let filter =
                            Filter::and([self.selector(item)?, Filter::is_in(related_key, linked)]);
                        let record = read::fetch(cx, self.related, filter)
                            .await?
                            .ok_or_else(|| self.not_found("delete"))?;
                        let other = record[related_key].clone();
                        link.disconnect(cx, &id, Some(std::slice::from_ref(&other)), &[])
                            .await?;
                        delete::delete_where(cx, self.related, &Filter::eq(related_key, other))
                            .await?;
                    }
                }
                "updateMany" => {
                    for item in items(value) {
                        let args = object(item, "updateMany")?;
                        let linked = link.related_ids(cx, &id).await?;
                        let filter = Filter::and([where_of(args)?, Filter::is_in(related_key, linked)]);
                        let data = object(field_of(args, "data")?, "updateMany.data")?;
                        update::update_many(cx, self.related, &filter, data).await?;
                    }
                }
                "deleteMany" => {
                    for item in items(value) {
                        let linked = link.related_ids(cx, &id).await?;
                        let query = Query {
                            filter: Filter::and([Filter::from_json(item)?, Filter::is_in(related_key, linked)]),
                            ..Query::default()
                        };
                        let ids: Vec<Value> = read::find_many(cx, self.related, &query, &[])
                            .await?
                            .into_iter()
                            .map(|record| record[related_key].clone())
                            .collect();
                        if ids.is_empty() {
                            continue;
                        }
                        link.disconnect(cx, &id, Some(&ids), &[]).await?;
                        delete::delete_where(cx, self.related, &Filter::is_in(related_key, ids))
                            .await?;
                    }
                }
                _ => unreachable!("actions are checked against the allowed list"),
            }
        }

        Ok(())
    }

    /// A unique selector on the related model.
    fn selector(&self, json: &Json) -> Result<Filter> {
        let filter = Filter::from_map(object(json, "where")?)?;
        if self.related.model.is_unique_selector(filter.field_names()) {
            Ok(filter)
        } else {
            Err(Error::no_unique_condition(&self.related.model.name))
        }
    }

    /// The related record matching the selector `json`.
    async fn find(&self, cx: &mut Cx<'_>, json: &Json) -> Result<Record> {
        let selector = self.selector(json)?;
        read::fetch(cx, self.related, selector)
            .await?
            .ok_or_else(|| self.unmatched())
    }

    /// `{where, create}`: the record matching `where`, or a new one.
    async fn connect_or_create(&self, cx: &mut Cx<'_>, json: &Json) -> Result<Record> {
        let args = object(json, "connectOrCreate")?;
        let selector = self.selector(field_of(args, "where")?)?;
        match read::fetch(cx, self.related, selector).await? {
            Some(record) => Ok(record),
            None => {
                let data = object(field_of(args, "create")?, "connectOrCreate.create")?;
                self.create(cx, data).await
            }
        }
    }

    /// Creates a related record and reads back its scalar fields.
    async fn create(&self, cx: &mut Cx<'_>, data: &Map<String, Json>) -> Result<Record> {
        let key = create::insert(cx, self.related, data).await?;
        read::fetch(cx, self.related, Filter::from_record(&key))
            .await?
            .ok_or_else(|| self.failed())
    }

    fn require<'r>(&self, current: Option<&'r Record>) -> Result<&'r Record> {
        current.ok_or_else(|| {
            Error::record_not_found(format!("no record is linked through `{}`", self.relation))
        })
    }

    fn check_nullable(&self, keys: &RelationKeys) -> Result<()> {
        let holder = if self.field.holds_foreign_key() {
            &self.rt.model
        } else {
            &self.related.model
        };
        match keys
            .from_fields
            .iter()
            .find(|name| holder.field(name).is_some_and(|f| f.is_required))
        {
            Some(name) => Err(Error::validation(format!(
                "`{}` cannot be disconnected: `{}.{name}` is required",
                self.relation, holder.name
            ))),
            None => Ok(()),
        }
    }

    fn list_only(&self, action: &str) -> Result<()> {
        if self.field.is_list {
            Ok(())
        } else {
            Err(Error::invalid_criteria(format!(
                "`{action}` only applies to list relations, `{}` is not one",
                self.relation
            )))
        }
    }

    fn not_found(&self, action: &str) -> Error {
        Error::record_not_found(format!(
            "no `{}` record to {action} through `{}`",
            self.related.model.name, self.relation
        ))
    }

    /// A `connect` selector matched no related record.
    fn unmatched(&self) -> Error {
        Error::from_args(format_args!(
            "no `{}` record to connect through `{}`",
            self.related.model.name, self.relation
        ))
        .context(self.failed())
    }

    fn failed(&self) -> Error {
        Error::relation_processing_failed(self.relation)
    }
}

/// The entries of an action: each element of an array, or the value itself.
fn items(value: &Json) -> Vec<&Json> {
    match value {
        Json::Array(items) => items.iter().collect(),
        value => vec![value],
    }
}

/// `true`, or a non-empty argument, enables `delete`/`disconnect` on a
/// to-one relation.
fn is_enabled(value: &Json) -> bool {
    !matches!(value, Json::Bool(false) | Json::Null)
}

fn object<'j>(json: &'j Json, what: &str) -> Result<&'j Map<String, Json>> {
    expect_object(json, what)
}

fn field_of<'j>(args: &'j Map<String, Json>, key: &str) -> Result<&'j Json> {
    args.get(key)
        .ok_or_else(|| Error::invalid_criteria(format!("`{key}` is required")))
}

/// The optional `where` of `updateMany`.
fn where_of(args: &Map<String, Json>) -> Result<Filter> {
    match args.get("where") {
        Some(filter) => Filter::from_json(filter),
        None => Ok(Filter::new()),
    }
}

fn with_link(data: &Map<String, Json>, link: &Record) -> Map<String, Json> {
    let mut data = data.clone();
    for (name, value) in link.iter() {
        data.insert(name.to_string(), value.to_json());
    }
    data
}

fn nulls(keys: &RelationKeys) -> Record {
    keys.from_fields
        .iter()
        .map(|name| (name.clone(), Value::Null))
        .collect()
}
