//! Per-compile output buffer, parameter list, and session state (spec.md §4.1).
//!
//! An `EmitContext` is constructed fresh for every `compile()` call and
//! discarded with it — nothing here is reused or shared across calls
//! (spec.md §5: the compiler is reentrant because each call owns its context).
use std::collections::HashSet;
use std::fmt::Write as _;

use crate::config::DialectConfig;
use crate::schema::{ColName, TableName};
use crate::types::LiteralValue;

/// A parameter descriptor, ordered by first registration. Duplicate names
/// are legal and produce a second descriptor — each occurrence is a
/// distinct positional binding even when the bound value is identical
/// (spec.md §4.1).
#[derive(Clone, Debug, PartialEq)]
pub struct Param {
    pub name: Option<String>,
    pub value: ParamValue,
    pub is_array: bool,
    pub wrap_in_array: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub enum ParamValue {
    Static(LiteralValue),
    /// A runtime variable the executor must bind at call time; carries only
    /// the name, since its value isn't known until execution.
    Runtime(String),
}

/// A backend-specific placeholder token (`$1`, `?`, `@p1`, …) returned by
/// `EmitContext::push_param` so callers can inline it directly.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Placeholder(pub String);

impl std::fmt::Display for Placeholder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Parameter-placeholder style, varies per dialect (spec.md §4.1/§4.2 metadata).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ParamStyle {
    /// Postgres-style `$1`, `$2`, …
    Positional(char),
    /// MySQL/SQLite-style `?` (no numbering).
    Question,
    /// MSSQL-style `@p1`, `@p2`, …
    Named(&'static str),
}

pub struct EmitContext<'a> {
    buf: String,
    params: Vec<Param>,
    sec_prefix: String,
    mutated_tables: HashSet<TableName>,
    param_style: ParamStyle,
    config: &'a DialectConfig,
}

impl<'a> EmitContext<'a> {
    /// `sec_prefix_seed` is caller-supplied (e.g. a per-request nonce minted
    /// by the execution runtime) so the compiler itself never reaches for a
    /// clock or RNG — it stays a pure function of its inputs.
    pub fn new(config: &'a DialectConfig, param_style: ParamStyle, sec_prefix_seed: &str) -> Self {
        EmitContext {
            buf: String::with_capacity(1024),
            params: Vec::new(),
            sec_prefix: format!("gj-{sec_prefix_seed}"),
            mutated_tables: HashSet::new(),
            param_style,
            config,
        }
    }

    pub fn config(&self) -> &DialectConfig {
        self.config
    }

    pub fn push_str(&mut self, s: &str) {
        self.buf.push_str(s);
    }

    pub fn write_fmt(&mut self, args: std::fmt::Arguments<'_>) {
        let _ = self.buf.write_fmt(args);
    }

    /// Quotes an identifier per the dialect's `NameCase`/quote-character
    /// convention. Takes the quote character explicitly rather than owning
    /// one globally, since the same `EmitContext` type backs every relational
    /// dialect and only the dialect knows its quote character.
    pub fn quote_ident(&mut self, ident: &str, quote: char) {
        let folded = match self.config.name_case {
            crate::config::NameCase::Preserve => ident.to_string(),
            crate::config::NameCase::Lower => ident.to_lowercase(),
            crate::config::NameCase::Upper => ident.to_uppercase(),
        };
        self.buf.push(quote);
        for ch in folded.chars() {
            if ch == quote {
                self.buf.push(quote);
            }
            self.buf.push(ch);
        }
        self.buf.push(quote);
    }

    pub fn qualified(&mut self, table: &TableName, col: &ColName, quote: char) {
        self.quote_ident(&table.0, quote);
        self.buf.push('.');
        self.quote_ident(&col.0, quote);
    }

    /// Registers a parameter and returns the placeholder to inline at the
    /// call site. Ordering is first-registration order; no failure path
    /// exists here (spec.md §4.1 — emit never errors).
    pub fn push_param(
        &mut self,
        name: Option<String>,
        value: ParamValue,
        is_array: bool,
        wrap_in_array: bool,
    ) -> Placeholder {
        self.params.push(Param {
            name,
            value,
            is_array,
            wrap_in_array,
        });
        let placeholder = match self.param_style {
            ParamStyle::Positional(sigil) => format!("{sigil}{}", self.params.len()),
            ParamStyle::Question => "?".to_string(),
            ParamStyle::Named(prefix) => format!("@{prefix}{}", self.params.len()),
        };
        Placeholder(placeholder)
    }

    pub fn sec_prefix(&self) -> &str {
        &self.sec_prefix
    }

    pub fn mark_mutated(&mut self, table: TableName) {
        self.mutated_tables.insert(table);
    }

    pub fn is_mutated(&self, table: &TableName) -> bool {
        self.mutated_tables.contains(table)
    }

    /// Consumes the context, yielding the finished artifact body and its
    /// ordered parameter list. Called exactly once, at the end of `compile()`.
    pub fn finish(self) -> (String, Vec<Param>) {
        (self.buf, self.params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DialectVersion, NameCase};

    fn test_config(name_case: NameCase) -> DialectConfig {
        DialectConfig {
            name_case,
            version: DialectVersion { major: 1, minor: 0 },
            camel_case_fields: false,
            supports_lateral_joins: true,
            supports_returning: true,
            supports_writable_cte: true,
            supports_native_upsert: true,
            supports_recursive_cte: true,
            linear_execution: false,
        }
    }

    #[test]
    fn quote_ident_lowercases_when_configured() {
        let cfg = test_config(NameCase::Lower);
        let mut ctx = EmitContext::new(&cfg, ParamStyle::Positional('$'), "abc123");
        ctx.quote_ident("Users", '"');
        assert_eq!(ctx.buf, "\"users\"");
    }

    #[test]
    fn quote_ident_escapes_embedded_quote_char() {
        let cfg = test_config(NameCase::Preserve);
        let mut ctx = EmitContext::new(&cfg, ParamStyle::Positional('$'), "abc123");
        ctx.quote_ident("weird\"name", '"');
        assert_eq!(ctx.buf, "\"weird\"\"name\"");
    }

    #[test]
    fn positional_params_increment_and_preserve_duplicates() {
        let cfg = test_config(NameCase::Preserve);
        let mut ctx = EmitContext::new(&cfg, ParamStyle::Positional('$'), "abc123");
        let p1 = ctx.push_param(
            Some("id".into()),
            ParamValue::Static(LiteralValue::Int(1)),
            false,
            false,
        );
        let p2 = ctx.push_param(
            Some("id".into()),
            ParamValue::Static(LiteralValue::Int(1)),
            false,
            false,
        );
        assert_eq!(p1.0, "$1");
        assert_eq!(p2.0, "$2");
        let (_, params) = ctx.finish();
        assert_eq!(params.len(), 2);
    }

    #[test]
    fn sec_prefix_carries_gj_prefix() {
        let cfg = test_config(NameCase::Preserve);
        let ctx = EmitContext::new(&cfg, ParamStyle::Question, "deadbeef");
        assert!(ctx.sec_prefix().starts_with("gj-"));
    }
}
