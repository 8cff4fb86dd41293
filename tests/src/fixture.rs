//! The schema every integration test runs against, and the tables backing it
//! on each database.

use quarry::{
    driver::{Capability, Dialect},
    Schema,
};
use serde_json::json;

pub fn schema() -> Schema {
    Schema::from_json(json!({
        "enums": [
            {"name": "Role", "values": ["USER", "ADMIN"]}
        ],
        "models": [
            {
                "name": "User",
                "fields": [
                    {"name": "id", "kind": "scalar", "type": "Int", "isId": true, "isRequired": true,
                     "hasDefaultValue": true, "default": {"name": "autoincrement", "args": []}},
                    {"name": "email", "kind": "scalar", "type": "String", "isRequired": true, "isUnique": true},
                    {"name": "name", "kind": "scalar", "type": "String"},
                    {"name": "role", "kind": "enum", "type": "Role", "isRequired": true,
                     "hasDefaultValue": true, "default": "USER"},
                    {"name": "createdAt", "kind": "scalar", "type": "DateTime", "isRequired": true,
                     "hasDefaultValue": true, "default": {"name": "now", "args": []}},
                    {"name": "updatedAt", "kind": "scalar", "type": "DateTime", "isRequired": true,
                     "isUpdatedAt": true},
                    {"name": "posts", "kind": "object", "type": "Post", "isList": true,
                     "relationName": "PostToUser"},
                    {"name": "profile", "kind": "object", "type": "Profile",
                     "relationName": "ProfileToUser"}
                ]
            },
            {
                "name": "Profile",
                "fields": [
                    {"name": "id", "kind": "scalar", "type": "Int", "isId": true, "isRequired": true,
                     "hasDefaultValue": true, "default": {"name": "autoincrement", "args": []}},
                    {"name": "bio", "kind": "scalar", "type": "String", "isRequired": true},
                    {"name": "userId", "kind": "scalar", "type": "Int", "isRequired": true, "isUnique": true},
                    {"name": "user", "kind": "object", "type": "User", "isRequired": true,
                     "relationName": "ProfileToUser", "relationFromFields": ["userId"],
                     "relationToFields": ["id"]}
                ]
            },
            {
                "name": "Post",
                "fields": [
                    {"name": "id", "kind": "scalar", "type": "Int", "isId": true, "isRequired": true,
                     "hasDefaultValue": true, "default": {"name": "autoincrement", "args": []}},
                    {"name": "title", "kind": "scalar", "type": "String", "isRequired": true},
                    {"name": "content", "kind": "scalar", "type": "String"},
                    {"name": "published", "kind": "scalar", "type": "Boolean", "isRequired": true,
                     "hasDefaultValue": true, "default": false},
                    {"name": "views", "kind": "scalar", "type": "Int", "isRequired": true,
                     "hasDefaultValue": true, "default": 0},
                    {"name": "rating", "kind": "scalar", "type": "Float"},
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
                    {"name": "id", "kind": "scalar", "type": "Int", "isId": true, "isRequired": true,
                     "hasDefaultValue": true, "default": {"name": "autoincrement", "args": []}},
                    {"name": "name", "kind": "scalar", "type": "String", "isRequired": true, "isUnique": true},
                    {"name": "posts", "kind": "object", "type": "Post", "isList": true,
                     "relationName": "CategoryToPost"}
                ]
            },
            {
                "name": "Tag",
                "fields": [
                    {"name": "id", "kind": "scalar", "type": "String", "isId": true, "isRequired": true,
                     "hasDefaultValue": true, "default": {"name": "uuid", "args": []}},
                    {"name": "label", "kind": "scalar", "type": "String", "isRequired": true, "isUnique": true}
                ]
            },
            {
                "name": "Membership",
                "primaryKey": {"name": null, "fields": ["orgId", "userId"]},
                "fields": [
                    {"name": "orgId", "kind": "scalar", "type": "Int", "isRequired": true},
                    {"name": "userId", "kind": "scalar", "type": "Int", "isRequired": true},
                    {"name": "role", "kind": "scalar", "type": "String", "isRequired": true}
                ]
            },
            {
                "name": "Product",
                "fields": [
                    {"name": "id", "kind": "scalar", "type": "String", "isId": true, "isRequired": true,
                     "hasDefaultValue": true, "default": {"name": "cuid", "args": []}},
                    {"name": "name", "kind": "scalar", "type": "String", "isRequired": true},
                    {"name": "price", "kind": "scalar", "type": "Decimal", "isRequired": true,
                     "nativeType": ["Decimal", ["10", "2"]]},
                    {"name": "meta", "kind": "scalar", "type": "Json"}
                ]
            }
        ]
    }))
    .expect("fixture schema is valid")
}

#[derive(Clone, Copy)]
enum Ty {
    Serial,
    Int,
    Text,
    Bool,
    Float,
    DateTime,
    Json,
    Decimal,
}

struct Table {
    name: &'static str,
    columns: Vec<(&'static str, Ty, &'static str)>,
    constraints: Vec<String>,
}

/// `CREATE TABLE` statements for the fixture schema, one per table.
pub fn ddl(capability: &Capability) -> Vec<String> {
    let dialect = capability.dialect;
    let q = |name: &str| quote(dialect, name);
    let fk = |column: &str, table: &str, action: &str| {
        format!(
            "FOREIGN KEY ({}) REFERENCES {}({}) ON DELETE {action}",
            q(column),
            q(table),
            q("id")
        )
    };

    let tables = vec![
        Table {
            name: "User",
            columns: vec![
                ("id", Ty::Serial, ""),
                ("email", Ty::Text, "NOT NULL UNIQUE"),
                ("name", Ty::Text, "NULL"),
                ("role", Ty::Text, "NOT NULL DEFAULT 'USER'"),
                ("createdAt", Ty::DateTime, "NOT NULL"),
                ("updatedAt", Ty::DateTime, "NOT NULL"),
            ],
            constraints: vec![],
        },
        Table {
            name: "Profile",
            columns: vec![
                ("id", Ty::Serial, ""),
                ("bio", Ty::Text, "NOT NULL"),
                ("userId", Ty::Int, "NOT NULL UNIQUE"),
            ],
            constraints: vec![fk("userId", "User", "CASCADE")],
        },
        Table {
            name: "Post",
            columns: vec![
                ("id", Ty::Serial, ""),
                ("title", Ty::Text, "NOT NULL"),
                ("content", Ty::Text, "NULL"),
                ("published", Ty::Bool, "NOT NULL DEFAULT FALSE"),
                ("views", Ty::Int, "NOT NULL DEFAULT 0"),
                ("rating", Ty::Float, "NULL"),
                ("authorId", Ty::Int, "NULL"),
            ],
            constraints: vec![fk("authorId", "User", "SET NULL")],
        },
        Table {
            name: "Category",
            columns: vec![
                ("id", Ty::Serial, ""),
                ("name", Ty::Text, "NOT NULL UNIQUE"),
            ],
            constraints: vec![],
        },
        Table {
            name: "_CategoryToPost",
            columns: vec![("A", Ty::Int, "NOT NULL"), ("B", Ty::Int, "NOT NULL")],
            constraints: vec![
                format!("UNIQUE ({}, {})", q("A"), q("B")),
                fk("A", "Category", "CASCADE"),
                fk("B", "Post", "CASCADE"),
            ],
        },
        Table {
            name: "Tag",
            columns: vec![
                ("id", Ty::Text, "NOT NULL PRIMARY KEY"),
                ("label", Ty::Text, "NOT NULL UNIQUE"),
            ],
            constraints: vec![],
        },
        Table {
            name: "Membership",
            columns: vec![
                ("orgId", Ty::Int, "NOT NULL"),
                ("userId", Ty::Int, "NOT NULL"),
                ("role", Ty::Text, "NOT NULL"),
            ],
            constraints: vec![format!("PRIMARY KEY ({}, {})", q("orgId"), q("userId"))],
        },
        Table {
            name: "Product",
            columns: vec![
                ("id", Ty::Text, "NOT NULL PRIMARY KEY"),
                ("name", Ty::Text, "NOT NULL"),
                ("price", Ty::Decimal, "NOT NULL"),
                ("meta", Ty::Json, "NULL"),
            ],
            constraints: vec![],
        },
    ];

    tables
        .into_iter()
        .map(|table| {
            let mut lines: Vec<String> = table
                .columns
                .iter()
                .map(|(name, ty, extra)| {
                    format!("{} {} {extra}", q(name), column_type(dialect, *ty))
                        .trim_end()
                        .to_string()
                })
                .collect();
            lines.extend(table.constraints);
            format!("CREATE TABLE {} ({})", q(table.name), lines.join(", "))
        })
        .collect()
}

fn column_type(dialect: Dialect, ty: Ty) -> &'static str {
    match (dialect, ty) {
        (Dialect::Sqlite, Ty::Serial) => "INTEGER PRIMARY KEY AUTOINCREMENT",
        (Dialect::Mysql, Ty::Serial) => "INT NOT NULL AUTO_INCREMENT PRIMARY KEY",
        (Dialect::Postgresql, Ty::Serial) => "SERIAL PRIMARY KEY",

        (Dialect::Mysql, Ty::Int) => "INT",
        (_, Ty::Int) => "INTEGER",

        // MySQL cannot index unbounded text
        (Dialect::Mysql, Ty::Text) => "VARCHAR(191)",
        (_, Ty::Text) => "TEXT",

        (_, Ty::Bool) => "BOOLEAN",

        (Dialect::Sqlite, Ty::Float) => "REAL",
        (Dialect::Mysql, Ty::Float) => "DOUBLE",
        (Dialect::Postgresql, Ty::Float) => "DOUBLE PRECISION",

        (Dialect::Sqlite, Ty::DateTime) => "DATETIME",
        (Dialect::Mysql, Ty::DateTime) => "DATETIME(3)",
        (Dialect::Postgresql, Ty::DateTime) => "TIMESTAMP(3)",

        (Dialect::Sqlite, Ty::Json) => "TEXT",
        (Dialect::Mysql, Ty::Json) => "JSON",
        (Dialect::Postgresql, Ty::Json) => "JSONB",

        (Dialect::Postgresql, Ty::Decimal) => "NUMERIC(10, 2)",
        (_, Ty::Decimal) => "DECIMAL(10, 2)",
    }
}

fn quote(dialect: Dialect, name: &str) -> String {
    match dialect {
        Dialect::Mysql => format!("`{name}`"),
        _ => format!("\"{name}\""),
    }
}
