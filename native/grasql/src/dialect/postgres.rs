//! Postgres: the reference relational dialect. Lateral joins, `jsonb`
//! construction, `@>`/`?`/`?|`/`?&` JSON containment, PostGIS geospatial
//! functions, and `ON CONFLICT ... DO UPDATE` upsert.
use crate::config::{default_sql_token, DialectConfig};
use crate::dialect::Dialect;
use crate::emit::{EmitContext, ParamStyle};
use crate::error::{CompileError, Result};
use crate::registry::DialectName;
use crate::dialect::render_mutate_value;
use crate::types::{ExpLeft, ExpRight, GeoArg, Join, LiteralValue, Mutate, MutateId, MutateKind, Op, QCode, SelectId};

pub struct PostgresDialect {
    config: DialectConfig,
}

impl PostgresDialect {
    pub fn new(config: DialectConfig) -> Self {
        PostgresDialect { config }
    }
}

impl Dialect for PostgresDialect {
    fn name(&self) -> DialectName {
        DialectName::Postgres
    }
    fn config(&self) -> &DialectConfig {
        &self.config
    }
    fn quote_char(&self) -> char {
        '"'
    }
    fn param_style(&self) -> ParamStyle {
        ParamStyle::Positional('$')
    }

    fn json_object_fn(&self) -> &'static str {
        "jsonb_build_object"
    }
    fn json_array_agg_fn(&self) -> &'static str {
        "jsonb_agg"
    }
    fn empty_json_array_literal(&self) -> &'static str {
        "'[]'::jsonb"
    }

    fn render_op(
        &self,
        ctx: &mut EmitContext<'_>,
        op: Op,
        left: &ExpLeft,
        right: Option<&ExpRight>,
        joins: &[Join],
    ) -> Result<()> {
        if op == Op::SelectExists {
            return render_exists(self, ctx, left, joins);
        }
        if let Some(tok) = default_sql_token(op) {
            self.render_exp_left(ctx, left, "->");
            ctx.push_str(" ");
            ctx.push_str(tok);
            if let Some(r) = right {
                ctx.push_str(" ");
                self.render_exp_right(ctx, r);
            }
            return Ok(());
        }
        let tok = match op {
            Op::ILike => "ILIKE",
            Op::NotILike => "NOT ILIKE",
            Op::Regex => "~",
            Op::IRegex => "~*",
            Op::NotRegex => "!~",
            Op::NotIRegex => "!~*",
            Op::Contains => "@>",
            Op::ContainedIn => "<@",
            Op::HasKey => "?",
            Op::HasKeyAny => "?|",
            Op::HasKeyAll => "?&",
            Op::HasInCommon => "&&",
            Op::TsQuery => "@@",
            Op::EqualsTrue => {
                self.render_exp_left(ctx, left, "->");
                ctx.push_str(" IS TRUE");
                return Ok(());
            }
            Op::NotEqualsTrue => {
                self.render_exp_left(ctx, left, "->");
                ctx.push_str(" IS NOT TRUE");
                return Ok(());
            }
            _ => {
                return Err(CompileError::Unsupported {
                    dialect: self.name(),
                    op,
                })
            }
        };
        self.render_exp_left(ctx, left, "->");
        ctx.push_str(" ");
        ctx.push_str(tok);
        if let Some(r) = right {
            ctx.push_str(" ");
            self.render_exp_right(ctx, r);
        }
        Ok(())
    }

    fn render_geo_op(&self, ctx: &mut EmitContext<'_>, op: Op, left: &ExpLeft, geo: &GeoArg) -> Result<()> {
        let func = match op {
            Op::GeoWithin | Op::GeoDistance | Op::GeoNear => "ST_DWithin",
            Op::GeoContains => "ST_Contains",
            Op::GeoIntersects => "ST_Intersects",
            Op::GeoCoveredBy => "ST_CoveredBy",
            Op::GeoCovers => "ST_Covers",
            Op::GeoTouches => "ST_Touches",
            Op::GeoOverlaps => "ST_Overlaps",
            _ => {
                return Err(CompileError::Unsupported {
                    dialect: self.name(),
                    op,
                })
            }
        };
        ctx.push_str(func);
        ctx.push_str("(");
        self.render_exp_left(ctx, left, "->");
        ctx.push_str("::geometry, ST_GeomFromGeoJSON(");
        let ph = self.render_literal(
            ctx,
            &LiteralValue::Json(geo.geometry.clone()),
        );
        ctx.push_str(&ph.0);
        ctx.push_str(")");
        if let Some(distance) = geo.distance {
            let metres = geo.unit.to_metres(distance);
            ctx.push_str(", ");
            let ph = self.render_literal(ctx, &LiteralValue::Float(metres));
            ctx.push_str(&ph.0);
        }
        ctx.push_str(")");
        Ok(())
    }

    /// Postgres has a native nth-delimited-token function: no manual
    /// index arithmetic needed, unlike MySQL/SQLite.
    fn nth_cursor_token(&self, expr: &str, n: usize) -> String {
        format!("split_part({expr}, ':', {})", n + 1)
    }

    fn render_lateral_join(&self, ctx: &mut EmitContext<'_>, qcode: &QCode, child: SelectId) -> Result<()> {
        crate::walker::render_select(ctx, qcode, self, child)
    }

    fn render_inline_child(&self, ctx: &mut EmitContext<'_>, qcode: &QCode, child: SelectId) -> Result<()> {
        crate::walker::render_select(ctx, qcode, self, child)
    }

    /// `lastval()` reads the session's most recently assigned sequence
    /// value, safe here since the dependency's `INSERT` always renders
    /// immediately before the dependent statement that reads it.
    fn captured_id_expr(&self, _dep_id: MutateId) -> String {
        "lastval()".to_string()
    }

    fn render_mutation(&self, ctx: &mut EmitContext<'_>, qcode: &QCode, mu: &Mutate) -> Result<()> {
        match mu.kind {
            MutateKind::Insert | MutateKind::Upsert => render_insert(self, ctx, qcode, mu)?,
            MutateKind::Update => render_update(self, ctx, qcode, mu)?,
            MutateKind::Delete => render_delete(self, ctx, mu),
            MutateKind::Connect | MutateKind::Disconnect => render_update(self, ctx, qcode, mu)?,
        }
        Ok(())
    }
}

/// `EXISTS (SELECT 1 FROM <left.table> WHERE <correlation>)`, correlated via
/// the first join hop (the FK column identified upstream).
fn render_exists(dialect: &PostgresDialect, ctx: &mut EmitContext<'_>, left: &ExpLeft, joins: &[Join]) -> Result<()> {
    ctx.push_str("EXISTS (SELECT 1 FROM ");
    let quote = dialect.quote_char();
    if let Some(join) = joins.first() {
        ctx.quote_ident(&join.table.0, quote);
        ctx.push_str(" WHERE ");
        ctx.qualified(&join.left.table, &join.left.col, quote);
        ctx.push_str(" = ");
        ctx.qualified(&join.right.table, &join.right.col, quote);
    } else {
        ctx.quote_ident(&left.table.0, quote);
        ctx.push_str(" WHERE TRUE");
    }
    ctx.push_str(")");
    Ok(())
}

fn render_insert(dialect: &PostgresDialect, ctx: &mut EmitContext<'_>, qcode: &QCode, mu: &Mutate) -> Result<()> {
    let quote = dialect.quote_char();
    ctx.push_str("INSERT INTO ");
    ctx.quote_ident(&mu.ti.name.0, quote);
    ctx.push_str(" (");
    for (i, col) in mu.cols.iter().enumerate() {
        if i > 0 {
            ctx.push_str(", ");
        }
        ctx.quote_ident(&col.col.0, quote);
    }
    ctx.push_str(") VALUES (");
    for (i, col) in mu.cols.iter().enumerate() {
        if i > 0 {
            ctx.push_str(", ");
        }
        render_mutate_value(dialect, ctx, qcode, mu, col);
    }
    ctx.push_str(")");
    if mu.kind == MutateKind::Upsert && dialect.config.supports_native_upsert {
        ctx.push_str(" ON CONFLICT DO UPDATE SET ");
        for (i, col) in mu.cols.iter().enumerate() {
            if i > 0 {
                ctx.push_str(", ");
            }
            ctx.quote_ident(&col.col.0, quote);
            ctx.push_str(" = EXCLUDED.");
            ctx.quote_ident(&col.col.0, quote);
        }
    }
    if dialect.config.supports_returning {
        ctx.push_str(" RETURNING *");
    }
    Ok(())
}

fn render_update(dialect: &PostgresDialect, ctx: &mut EmitContext<'_>, qcode: &QCode, mu: &Mutate) -> Result<()> {
    let quote = dialect.quote_char();
    ctx.push_str("UPDATE ");
    ctx.quote_ident(&mu.ti.name.0, quote);
    ctx.push_str(" SET ");
    for (i, col) in mu.cols.iter().enumerate() {
        if i > 0 {
            ctx.push_str(", ");
        }
        ctx.quote_ident(&col.col.0, quote);
        ctx.push_str(" = ");
        render_mutate_value(dialect, ctx, qcode, mu, col);
    }
    if let Some(where_) = &mu.where_ {
        ctx.push_str(" WHERE ");
        crate::dialect::render_exp(dialect, ctx, where_)?;
    }
    if dialect.config.supports_returning {
        ctx.push_str(" RETURNING *");
    }
    Ok(())
}

fn render_delete(dialect: &PostgresDialect, ctx: &mut EmitContext<'_>, mu: &Mutate) {
    let quote = dialect.quote_char();
    ctx.push_str("DELETE FROM ");
    ctx.quote_ident(&mu.ti.name.0, quote);
    if dialect.config.supports_returning {
        ctx.push_str(" RETURNING *");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DialectVersion, NameCase};
    use crate::emit::ParamStyle;

    fn dialect() -> PostgresDialect {
        PostgresDialect::new(DialectConfig {
            name_case: NameCase::Lower,
            version: DialectVersion { major: 15, minor: 0 },
            camel_case_fields: false,
            supports_lateral_joins: true,
            supports_returning: true,
            supports_writable_cte: true,
            supports_native_upsert: true,
            supports_recursive_cte: true,
            linear_execution: false,
        })
    }

    #[test]
    fn render_op_rejects_unmapped_operator() {
        let d = dialect();
        let cfg = d.config().clone();
        let mut ctx = EmitContext::new(&cfg, ParamStyle::Positional('$'), "seed");
        let left = ExpLeft {
            table: "users".into(),
            col: "id".into(),
            json_path: vec![],
            parent_select: None,
        };
        let err = d.render_op(&mut ctx, Op::GeoNear, &left, None, &[]);
        assert!(err.is_err());
    }

    #[test]
    fn render_op_maps_contains_to_at_arrow() {
        let d = dialect();
        let cfg = d.config().clone();
        let mut ctx = EmitContext::new(&cfg, ParamStyle::Positional('$'), "seed");
        let left = ExpLeft {
            table: "docs".into(),
            col: "data".into(),
            json_path: vec![],
            parent_select: None,
        };
        let right = ExpRight::Literal(LiteralValue::Str("x".into()));
        d.render_op(&mut ctx, Op::Contains, &left, Some(&right), &[]).unwrap();
        let (sql, _) = ctx.finish();
        assert!(sql.contains("@>"));
    }
}
