//! Configuration module for grasql.
//!
//! Keeps the teacher's "a plain struct plus a default operator table" idiom,
//! but scoped per-dialect-instance rather than a process-global Elixir-
//! supplied singleton: spec.md §5 requires no shared mutable state, so each
//! `registry::resolve` call constructs its own immutable `DialectConfig`.
use crate::types::Op;

/// How a dialect folds identifier case. Postgres/SQLite fold unquoted
/// identifiers to lowercase; MySQL and MSSQL's defaults are effectively
/// case-preserving once quoted, but table-name case sensitivity still
/// depends on the host OS/collation, so dialects carry this explicitly
/// rather than assume.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NameCase {
    Preserve,
    Lower,
    Upper,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DialectVersion {
    pub major: u32,
    pub minor: u32,
}

/// Per-dialect, construction-time-only configuration. Mirrors the teacher's
/// `Config` struct, minus the fields that existed only to drive the GraphQL-
/// text-parsing/caching layer this crate no longer has (`string_interner_capacity`,
/// `query_cache_max_size`, `query_cache_ttl_seconds`, `max_query_depth`).
#[derive(Clone, Debug)]
pub struct DialectConfig {
    pub name_case: NameCase,
    pub version: DialectVersion,
    /// True when the host schema exposes camelCase GraphQL field names over
    /// snake_case columns; affects only cursor helper-field naming.
    pub camel_case_fields: bool,
    pub supports_lateral_joins: bool,
    pub supports_returning: bool,
    pub supports_writable_cte: bool,
    pub supports_native_upsert: bool,
    pub supports_recursive_cte: bool,
    /// True for dialects that execute mutations as a sequence of statements
    /// with an explicit ID-capture step (spec.md §4.2 `RenderLinear*`)
    /// rather than a single statement with a `RETURNING`/OUTPUT clause.
    pub linear_execution: bool,
}

/// Backend-agnostic fallback token for operators every SQL dialect agrees
/// on. Dialects consult this first and override only where they must
/// (regex emulation, JSON operators, geospatial, full-text) — generalizing
/// the teacher's flat `translate_operator` table to the full closed `Op` set
/// of spec.md §6.
pub fn default_sql_token(op: Op) -> Option<&'static str> {
    match op {
        Op::And => Some("AND"),
        Op::Or => Some("OR"),
        Op::Not => Some("NOT"),
        Op::Equals => Some("="),
        Op::NotEquals => Some("<>"),
        Op::Greater => Some(">"),
        Op::GreaterOrEquals => Some(">="),
        Op::Lesser => Some("<"),
        Op::LesserOrEquals => Some("<="),
        Op::Like => Some("LIKE"),
        Op::NotLike => Some("NOT LIKE"),
        Op::In => Some("IN"),
        Op::NotIn => Some("NOT IN"),
        Op::IsNull => Some("IS NULL"),
        Op::IsNotNull => Some("IS NOT NULL"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_table_covers_common_comparisons() {
        assert_eq!(default_sql_token(Op::Equals), Some("="));
        assert_eq!(default_sql_token(Op::NotIn), Some("NOT IN"));
        assert_eq!(default_sql_token(Op::Contains), None);
    }
}
