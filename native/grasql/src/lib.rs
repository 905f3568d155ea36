//! GraSQL — compiles a normalized GraphQL intermediate representation
//! (`QCode`) into a dialect-specific artifact: parameterized SQL for
//! Postgres/MySQL/SQLite/MSSQL, or a parameterized JSON aggregation/mutation
//! document for MongoDB, plus an ordered parameter list.
//!
//! A pure function from `(QCode, dialect, static-variable map)` to
//! `(artifact, params)` — no GraphQL parsing, no schema validation, no
//! connection handling, no caching. Those live upstream of this crate.
mod compile;
mod config;
mod cursor;
mod dialect;
mod emit;
mod error;
#[cfg(any(test, feature = "test-utils"))]
pub mod fixtures;
mod mutation;
mod registry;
mod schema;
mod types;
mod walker;

pub use compile::{compile, compile_with_config, CompileOutput};
pub use config::{DialectConfig, DialectVersion, NameCase};
pub use cursor::{CursorMeta, Direction};
pub use dialect::Dialect;
pub use emit::{Param, ParamStyle, ParamValue, Placeholder};
pub use error::{CompileError, Result};
pub use registry::{resolve, resolve_with_config, DialectName};
pub use schema::{ColName, ColType, Column, DBTable, FKeyRef, TableName};
pub use types::{
    ColRef, Exp, ExpLeft, ExpRight, Field, GeoArg, GeoUnit, InputNode, InputValue, Join,
    LiteralValue, Mutate, MutateColumn, MutateId, MutateKind, NullsOrder, Op, OperationType,
    OrderDirection, OrderExpr, Paging, PathSegment, PolymorphicInfo, QCode, RecursiveDirection,
    RecursiveInfo, RelKind, Relationship, Select, SelectId, SkipDecision, SkipType,
};
