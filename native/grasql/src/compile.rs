//! Top-level entry point (spec.md §2 control flow): a pure function from
//! (`QCode`, dialect, param style, security-prefix seed) to (artifact
//! string, ordered parameter descriptors, optional cursor metadata).
use crate::emit::{EmitContext, Param, ParamStyle};
use crate::error::Result;
use crate::registry::{resolve, resolve_with_config, DialectName};
use crate::types::{OperationType, QCode};

/// Everything a caller needs to hand the artifact to an executor: the
/// rendered text (SQL or the MongoDB JSON DSL, serialized), its ordered
/// parameters, and — for every select in the tree paging by cursor — the
/// metadata describing how to build the next page's token from a result row.
#[derive(Clone, Debug)]
pub struct CompileOutput {
    pub artifact: String,
    pub params: Vec<Param>,
    pub cursors: Vec<crate::cursor::CursorMeta>,
}

/// Compiles `qcode` for `dialect`, using that dialect's default
/// `DialectConfig`. See `compile_with_config` for the general entry point.
pub fn compile(qcode: &QCode, dialect: DialectName, sec_prefix_seed: &str) -> Result<CompileOutput> {
    compile_with(resolve(dialect), qcode, sec_prefix_seed)
}

/// As `compile`, overriding the dialect's `DialectConfig` (e.g. to target a
/// specific engine version or naming convention).
pub fn compile_with_config(
    qcode: &QCode,
    dialect: DialectName,
    config: crate::config::DialectConfig,
    sec_prefix_seed: &str,
) -> Result<CompileOutput> {
    compile_with(resolve_with_config(dialect, config), qcode, sec_prefix_seed)
}

fn compile_with(
    dialect: Box<dyn crate::dialect::Dialect>,
    qcode: &QCode,
    sec_prefix_seed: &str,
) -> Result<CompileOutput> {
    let span = tracing::info_span!("compile", dialect = ?dialect.name(), op = ?qcode.ty);
    let _enter = span.enter();

    #[cfg(debug_assertions)]
    qcode.check_invariants();

    let config = dialect.config().clone();
    let mut ctx = EmitContext::new(&config, dialect.param_style(), sec_prefix_seed);

    match qcode.ty {
        OperationType::Query => {
            if let Some(result) = dialect.compile_full_query(&mut ctx, qcode) {
                result?;
            } else {
                crate::walker::walk_query(&mut ctx, qcode, dialect.as_ref())?;
            }
        }
        OperationType::Mutation => {
            if let Some(result) = dialect.compile_full_mutation(&mut ctx, qcode) {
                result?;
            } else {
                crate::walker::walk_mutation(&mut ctx, qcode, dialect.as_ref())?;
            }
        }
        OperationType::Subscription => {
            return Err(crate::error::CompileError::Invalid(
                "subscriptions have no compiled artifact; the executor drives them directly from QCode".to_string(),
            ));
        }
    }

    let cursors = qcode
        .selects
        .iter()
        .filter(|s| s.paging.cursor)
        .map(|s| crate::cursor::CursorMeta::from_order_by(s.id, ctx.sec_prefix(), &s.order_by))
        .collect();

    let (artifact, params) = ctx.finish();
    tracing::debug!(param_count = params.len(), cursor_count = cursors.len(), "compile finished");
    Ok(CompileOutput { artifact, params, cursors })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{ColName, TableName};
    use crate::types::{Relationship, Select, SkipType};

    fn trivial_qcode() -> QCode {
        let sel = Select {
            id: 0,
            parent_id: None,
            table: TableName::from("users"),
            field_name: "users".to_string(),
            fields: vec![crate::types::Field {
                col: ColName::from("id"),
                field_name: "id".to_string(),
                skip: SkipType::None,
                skip_var: None,
            }],
            children: vec![],
            where_: None,
            order_by: vec![],
            paging: crate::types::Paging::default(),
            rel: Relationship::default(),
            joins: vec![],
            singular: false,
            typename: false,
            skip_render: SkipType::None,
        };
        QCode {
            ty: OperationType::Query,
            name: None,
            typename: None,
            action_var: None,
            roots: vec![0],
            selects: vec![sel],
            mutates: vec![],
        }
    }

    #[test]
    fn compiles_trivial_select_on_every_relational_dialect() {
        for name in [DialectName::Postgres, DialectName::MySql, DialectName::Sqlite] {
            let out = compile(&trivial_qcode(), name, "seed").unwrap();
            assert!(out.artifact.contains("users"));
            assert!(out.cursors.is_empty());
        }
    }

    #[test]
    fn subscription_operation_is_rejected() {
        let mut qcode = trivial_qcode();
        qcode.ty = OperationType::Subscription;
        assert!(compile(&qcode, DialectName::Postgres, "seed").is_err());
    }
}
