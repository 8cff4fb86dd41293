#![allow(dead_code)]

use quarry_core::{
    driver::Capability,
    query::Filter,
    stmt::{Placeholders, Sql},
    Result, Schema,
};
use quarry_sql::{compile, Scope};
use serde_json::json;

pub fn schema() -> Schema {
    Schema::from_json(json!({
        "models": [
            {
                "name": "User",
                "fields": [
                    {"name": "id", "kind": "scalar", "type": "Int", "isId": true, "isRequired": true,
                     "hasDefaultValue": true, "default": {"name": "autoincrement", "args": []}},
                    {"name": "email", "kind": "scalar", "type": "String", "isUnique": true, "isRequired": true},
                    {"name": "name", "kind": "scalar", "type": "String"},
                    {"name": "role", "kind": "enum", "type": "Role", "isRequired": true,
                     "hasDefaultValue": true, "default": "USER"},
                    {"name": "posts", "kind": "object", "type": "Post", "isList": true,
                     "relationName": "PostToUser"},
                    {"name": "profile", "kind": "object", "type": "Profile",
                     "relationName": "ProfileToUser"}
                ]
            },
            {
                "name": "Profile",
                "fields": [
                    {"name": "id", "kind": "scalar", "type": "Int", "isId": true, "isRequired": true},
                    {"name": "bio", "kind": "scalar", "type": "String"},
                    {"name": "userId", "kind": "scalar", "type": "Int", "isUnique": true, "isRequired": true},
                    {"name": "user", "kind": "object", "type": "User", "isRequired": true,
                     "relationName": "ProfileToUser", "relationFromFields": ["userId"],
                     "relationToFields": ["id"]}
                ]
            },
            {
                "name": "Post",
                "fields": [
                    {"name": "id", "kind": "scalar", "type": "Int", "isId": true, "isRequired": true},
                    {"name": "title", "kind": "scalar", "type": "String", "isRequired": true},
                    {"name": "views", "kind": "scalar", "type": "Int", "isRequired": true},
                    {"name": "createdAt", "kind": "scalar", "type": "DateTime", "isRequired": true,
                     "dbName": "created_at"},
                    {"name": "authorId", "kind": "scalar", "type": "Int"},
                    {"name": "author", "kind": "object", "type": "User",
                     "relationName": "PostToUser", "relationFromFields": ["authorId"],
                     "relationToFields": ["id"]},
                    {"name": "categories", "kind": "object", "type": "Category", "isList": true,
                     "relationName": "CategoryToPost"}
                ]
            },
            {
                "name": "Category",
                "fields": [
                    {"name": "id", "kind": "scalar", "type": "Int", "isId": true, "isRequired": true},
                    {"name": "name", "kind": "scalar", "type": "String", "isUnique": true, "isRequired": true},
                    {"name": "posts", "kind": "object", "type": "Post", "isList": true,
                     "relationName": "CategoryToPost"}
                ]
            }
        ],
        "enums": [
            {"name": "Role", "values": ["USER", "ADMIN"]}
        ]
    }))
    .unwrap()
}

/// Compiles `filter` against `model` and renders the conditions joined with
/// `AND`, in named-placeholder form.
pub fn where_sql(
    capability: &'static Capability,
    schema: &Schema,
    model: &str,
    filter: serde_json::Value,
) -> Result<(String, Placeholders)> {
    let model = schema.model(model).unwrap();
    let table = quarry_sql::quote(capability, &model.table_name);
    let scope = Scope::new(capability, schema, Some(model), &table);
    let filter = Filter::from_json(&filter)?;
    let mut placeholders = Placeholders::new();
    let conditions = compile(&filter, &scope, &mut placeholders)?;
    Ok((
        Sql::join(conditions, " AND ").to_string(),
        placeholders,
    ))
}
