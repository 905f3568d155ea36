//! Read-only schema metadata input contract (spec.md §6, "sdata").
//!
//! Nothing in this module validates a live database; these types are filled
//! in by an external schema-introspection collaborator and handed to the
//! compiler by reference. The compiler never mutates them.
use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TableName(pub String);

impl fmt::Display for TableName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for TableName {
    fn from(s: &str) -> Self {
        TableName(s.to_string())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ColName(pub String);

impl fmt::Display for ColName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ColName {
    fn from(s: &str) -> Self {
        ColName(s.to_string())
    }
}

/// A column's SQL/BSON type, as resolved by schema introspection. Only the
/// distinctions the compiler itself needs to make are kept; full type
/// fidelity belongs to the introspection layer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColType {
    Int,
    Float,
    Bool,
    Text,
    Json,
    Timestamp,
    Uuid,
    Geometry,
}

#[derive(Clone, Debug)]
pub struct FKeyRef {
    pub table: TableName,
    pub schema: Option<String>,
    pub col: ColName,
}

#[derive(Clone, Debug)]
pub struct Column {
    pub name: ColName,
    pub ty: ColType,
    pub array: bool,
    pub primary_key: bool,
    pub unique_key: bool,
    pub fkey: Option<FKeyRef>,
}

#[derive(Clone, Debug)]
pub struct DBTable {
    pub schema: Option<String>,
    pub name: TableName,
    pub columns: Vec<Column>,
    pub primary_col: Option<ColName>,
    pub full_text: Vec<ColName>,
    /// Original (pre-camelCase/pre-alias) name and schema, when the GraphQL
    /// field name differs from the underlying table.
    pub orig_name: Option<TableName>,
    pub orig_schema: Option<String>,
}

impl DBTable {
    pub fn column(&self, name: &ColName) -> Option<&Column> {
        self.columns.iter().find(|c| &c.name == name)
    }
}
