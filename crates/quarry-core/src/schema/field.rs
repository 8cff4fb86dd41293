use crate::stmt::Value;

#[derive(Debug, Clone)]
pub struct Field {
    /// The field name
    pub name: String,

    /// Column name in the table
    pub db_name: String,

    /// Scalar, enum or relation
    pub kind: FieldKind,

    pub is_list: bool,
    pub is_required: bool,
    pub is_unique: bool,
    pub is_id: bool,
    pub is_read_only: bool,
    pub has_default_value: bool,

    /// Value used when a create does not set the field
    pub default: Option<DefaultValue>,

    /// Set to the current time on every write
    pub is_updated_at: bool,

    /// Number of fractional digits allowed for `Decimal` fields, taken from
    /// the native type (`Decimal(10, 2)`).
    pub decimal_scale: Option<u32>,

    /// Relation metadata, only for object fields
    pub relation: Option<Relation>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FieldKind {
    Scalar(ScalarType),

    /// Member of the named enum
    Enum(String),

    /// Relation to the named model
    Object(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarType {
    Int,
    BigInt,
    Float,
    Decimal,
    String,
    Boolean,
    DateTime,
    Json,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DefaultValue {
    Literal(Value),
    Generator(Generator),
}

/// How a missing value is generated on create
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Generator {
    Uuid,
    Ulid,
    Cuid,
    Now,
    Autoincrement,

    /// Filled in by the database
    DbGenerated,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Relation {
    pub name: String,
    pub from_fields: Vec<String>,
    pub to_fields: Vec<String>,
}

impl Field {
    pub fn is_relation(&self) -> bool {
        matches!(self.kind, FieldKind::Object(_))
    }

    /// Returns `true` for the side of a relation that stores the foreign
    /// key (`Post.author` with `fields: [authorId]`).
    pub fn holds_foreign_key(&self) -> bool {
        self.relation
            .as_ref()
            .is_some_and(|relation| !relation.from_fields.is_empty())
    }

    pub fn is_enum(&self) -> bool {
        matches!(self.kind, FieldKind::Enum(_))
    }

    pub fn scalar_type(&self) -> Option<ScalarType> {
        match self.kind {
            FieldKind::Scalar(ty) => Some(ty),
            _ => None,
        }
    }

    /// Type name as written in the schema.
    pub fn type_name(&self) -> &str {
        match &self.kind {
            FieldKind::Scalar(ty) => ty.name(),
            FieldKind::Enum(name) | FieldKind::Object(name) => name,
        }
    }

    /// The value is produced by the database when the insert omits it.
    pub fn is_db_generated(&self) -> bool {
        matches!(
            self.default,
            Some(DefaultValue::Generator(
                Generator::Autoincrement | Generator::DbGenerated
            ))
        )
    }
}

impl ScalarType {
    pub fn from_name(name: &str) -> Option<ScalarType> {
        Some(match name {
            "Int" => ScalarType::Int,
            "BigInt" => ScalarType::BigInt,
            "Float" => ScalarType::Float,
            "Decimal" => ScalarType::Decimal,
            "String" => ScalarType::String,
            "Boolean" => ScalarType::Boolean,
            "DateTime" => ScalarType::DateTime,
            "Json" => ScalarType::Json,
            _ => return None,
        })
    }

    pub fn name(self) -> &'static str {
        match self {
            ScalarType::Int => "Int",
            ScalarType::BigInt => "BigInt",
            ScalarType::Float => "Float",
            ScalarType::Decimal => "Decimal",
            ScalarType::String => "String",
            ScalarType::Boolean => "Boolean",
            ScalarType::DateTime => "DateTime",
            ScalarType::Json => "Json",
        }
    }

    pub fn is_numeric(self) -> bool {
        matches!(
            self,
            ScalarType::Int | ScalarType::BigInt | ScalarType::Float | ScalarType::Decimal
        )
    }
}

impl Generator {
    /// Maps a schema default function name. Unknown functions are left to
    /// the database.
    pub fn from_name(name: &str) -> Generator {
        match name {
            "uuid" => Generator::Uuid,
            "ulid" => Generator::Ulid,
            "cuid" => Generator::Cuid,
            "now" => Generator::Now,
            "autoincrement" => Generator::Autoincrement,
            _ => Generator::DbGenerated,
        }
    }
}
