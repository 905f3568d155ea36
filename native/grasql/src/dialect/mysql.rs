//! MySQL (8.0+): backtick identifiers, `?` placeholders, `JSON_OBJECT`/
//! `JSON_ARRAYAGG` construction, `JSON_CONTAINS`/`JSON_EXTRACT`, `REGEXP`,
//! and `ON DUPLICATE KEY UPDATE` upsert. No `RETURNING`, so mutation
//! responses are re-fetched by a separate statement instead.
use crate::config::{default_sql_token, DialectConfig};
use crate::dialect::Dialect;
use crate::emit::{EmitContext, ParamStyle};
use crate::error::{CompileError, Result};
use crate::registry::DialectName;
use crate::dialect::render_mutate_value;
use crate::types::{ExpLeft, ExpRight, GeoArg, Join, LiteralValue, Mutate, MutateId, MutateKind, Op, QCode, SelectId};

pub struct MySqlDialect {
    config: DialectConfig,
}

impl MySqlDialect {
    pub fn new(config: DialectConfig) -> Self {
        MySqlDialect { config }
    }
}

impl Dialect for MySqlDialect {
    fn name(&self) -> DialectName {
        DialectName::MySql
    }
    fn config(&self) -> &DialectConfig {
        &self.config
    }
    fn quote_char(&self) -> char {
        '`'
    }
    fn param_style(&self) -> ParamStyle {
        ParamStyle::Question
    }
    fn bool_literal(&self, value: bool) -> &'static str {
        if value {
            "1"
        } else {
            "0"
        }
    }

    fn json_object_fn(&self) -> &'static str {
        "JSON_OBJECT"
    }
    fn json_array_agg_fn(&self) -> &'static str {
        "JSON_ARRAYAGG"
    }
    fn empty_json_array_literal(&self) -> &'static str {
        "JSON_ARRAY()"
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
        if left.json_path.is_empty() {
            if let Some(tok) = default_sql_token(op) {
                ctx.qualified(&left.table, &left.col, self.quote_char());
                ctx.push_str(" ");
                ctx.push_str(tok);
                if let Some(r) = right {
                    ctx.push_str(" ");
                    self.render_exp_right(ctx, r);
                }
                return Ok(());
            }
        }
        match op {
            Op::ILike => {
                ctx.push_str("LOWER(");
                self.render_exp_left(ctx, left, "->>");
                ctx.push_str(") LIKE LOWER(");
                if let Some(r) = right {
                    self.render_exp_right(ctx, r);
                }
                ctx.push_str(")");
            }
            Op::Regex | Op::NotRegex => {
                self.render_exp_left(ctx, left, "->>");
                ctx.push_str(if op == Op::Regex { " REGEXP " } else { " NOT REGEXP " });
                if let Some(r) = right {
                    self.render_exp_right(ctx, r);
                }
            }
            Op::Contains => {
                ctx.push_str("JSON_CONTAINS(");
                self.render_exp_left(ctx, left, "->");
                ctx.push_str(", ");
                if let Some(r) = right {
                    self.render_exp_right(ctx, r);
                }
                ctx.push_str(")");
            }
            Op::HasKey => {
                ctx.push_str("JSON_CONTAINS_PATH(");
                self.render_exp_left(ctx, left, "->");
                ctx.push_str(", 'one', ");
                if let Some(r) = right {
                    self.render_exp_right(ctx, r);
                }
                ctx.push_str(")");
            }
            Op::TsQuery => {
                ctx.push_str("MATCH(");
                self.render_exp_left(ctx, left, "->>");
                ctx.push_str(") AGAINST(");
                if let Some(r) = right {
                    self.render_exp_right(ctx, r);
                }
                ctx.push_str(" IN NATURAL LANGUAGE MODE)");
            }
            Op::EqualsTrue => {
                self.render_exp_left(ctx, left, "->>");
                ctx.push_str(" = TRUE");
            }
            Op::NotEqualsTrue => {
                self.render_exp_left(ctx, left, "->>");
                ctx.push_str(" != TRUE");
            }
            _ => {
                if let Some(tok) = default_sql_token(op) {
                    self.render_exp_left(ctx, left, "->>");
                    ctx.push_str(" ");
                    ctx.push_str(tok);
                    if let Some(r) = right {
                        ctx.push_str(" ");
                        self.render_exp_right(ctx, r);
                    }
                } else {
                    return Err(CompileError::Unsupported {
                        dialect: self.name(),
                        op,
                    });
                }
            }
        }
        Ok(())
    }

    fn render_geo_op(&self, ctx: &mut EmitContext<'_>, op: Op, left: &ExpLeft, geo: &GeoArg) -> Result<()> {
        let func = match op {
            Op::GeoWithin | Op::GeoDistance | Op::GeoNear => "ST_Distance_Sphere",
            Op::GeoContains => "ST_Contains",
            Op::GeoIntersects => "ST_Intersects",
            Op::GeoTouches => "ST_Touches",
            Op::GeoOverlaps => "ST_Overlaps",
            _ => {
                return Err(CompileError::Unsupported {
                    dialect: self.name(),
                    op,
                })
            }
        };
        if matches!(op, Op::GeoWithin | Op::GeoDistance | Op::GeoNear) {
            ctx.push_str(func);
            ctx.push_str("(");
            ctx.qualified(&left.table, &left.col, self.quote_char());
            ctx.push_str(", ST_GeomFromGeoJSON(");
            let ph = self.render_literal(ctx, &LiteralValue::Json(geo.geometry.clone()));
            ctx.push_str(&ph.0);
            ctx.push_str("))");
            if let Some(distance) = geo.distance {
                let metres = geo.unit.to_metres(distance);
                ctx.push_str(" <= ");
                let ph = self.render_literal(ctx, &LiteralValue::Float(metres));
                ctx.push_str(&ph.0);
            }
        } else {
            ctx.push_str(func);
            ctx.push_str("(");
            ctx.qualified(&left.table, &left.col, self.quote_char());
            ctx.push_str(", ST_GeomFromGeoJSON(");
            let ph = self.render_literal(ctx, &LiteralValue::Json(geo.geometry.clone()));
            ctx.push_str(&ph.0);
            ctx.push_str("))");
        }
        Ok(())
    }

    /// No `split_part` in MySQL; the classic idiom nests `SUBSTRING_INDEX`
    /// to pull the `n`th ':'-delimited token (count from the left, then trim
    /// everything left of the last remaining separator).
    fn nth_cursor_token(&self, expr: &str, n: usize) -> String {
        format!(
            "SUBSTRING_INDEX(SUBSTRING_INDEX({expr}, ':', {}), ':', -1)",
            n + 1
        )
    }

    fn render_lateral_join(&self, ctx: &mut EmitContext<'_>, qcode: &QCode, child: SelectId) -> Result<()> {
        crate::walker::render_select(ctx, qcode, self, child)
    }

    fn render_inline_child(&self, ctx: &mut EmitContext<'_>, qcode: &QCode, child: SelectId) -> Result<()> {
        crate::walker::render_select(ctx, qcode, self, child)
    }

    /// `LAST_INSERT_ID()` is connection-scoped and reset by the next insert,
    /// so this is only correct because the dependent statement runs
    /// immediately after the dependency's.
    fn captured_id_expr(&self, _dep_id: MutateId) -> String {
        "LAST_INSERT_ID()".to_string()
    }

    fn render_mutation(&self, ctx: &mut EmitContext<'_>, qcode: &QCode, mu: &Mutate) -> Result<()> {
        let quote = self.quote_char();
        match mu.kind {
            MutateKind::Insert | MutateKind::Upsert => {
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
                    render_mutate_value(self, ctx, qcode, mu, col);
                }
                ctx.push_str(")");
                if mu.kind == MutateKind::Upsert {
                    ctx.push_str(" ON DUPLICATE KEY UPDATE ");
                    for (i, col) in mu.cols.iter().enumerate() {
                        if i > 0 {
                            ctx.push_str(", ");
                        }
                        ctx.quote_ident(&col.col.0, quote);
                        ctx.push_str(" = VALUES(");
                        ctx.quote_ident(&col.col.0, quote);
                        ctx.push_str(")");
                    }
                }
            }
            MutateKind::Update | MutateKind::Connect | MutateKind::Disconnect => {
                ctx.push_str("UPDATE ");
                ctx.quote_ident(&mu.ti.name.0, quote);
                ctx.push_str(" SET ");
                for (i, col) in mu.cols.iter().enumerate() {
                    if i > 0 {
                        ctx.push_str(", ");
                    }
                    ctx.quote_ident(&col.col.0, quote);
                    ctx.push_str(" = ");
                    render_mutate_value(self, ctx, qcode, mu, col);
                }
                if let Some(where_) = &mu.where_ {
                    ctx.push_str(" WHERE ");
                    crate::dialect::render_exp(self, ctx, where_)?;
                }
            }
            MutateKind::Delete => {
                ctx.push_str("DELETE FROM ");
                ctx.quote_ident(&mu.ti.name.0, quote);
            }
        }
        Ok(())
    }
}

fn render_exists(dialect: &MySqlDialect, ctx: &mut EmitContext<'_>, left: &ExpLeft, joins: &[Join]) -> Result<()> {
    let quote = dialect.quote_char();
    ctx.push_str("EXISTS (SELECT 1 FROM ");
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DialectVersion, NameCase};

    fn dialect() -> MySqlDialect {
        MySqlDialect::new(DialectConfig {
            name_case: NameCase::Preserve,
            version: DialectVersion { major: 8, minor: 0 },
            camel_case_fields: false,
            supports_lateral_joins: true,
            supports_returning: false,
            supports_writable_cte: true,
            supports_native_upsert: true,
            supports_recursive_cte: true,
            linear_execution: false,
        })
    }

    #[test]
    fn question_mark_placeholders_never_number() {
        let d = dialect();
        let cfg = d.config().clone();
        let mut ctx = EmitContext::new(&cfg, ParamStyle::Question, "seed");
        let p1 = ctx.push_param(None, crate::emit::ParamValue::Static(LiteralValue::Int(1)), false, false);
        let p2 = ctx.push_param(None, crate::emit::ParamValue::Static(LiteralValue::Int(2)), false, false);
        assert_eq!(p1.0, "?");
        assert_eq!(p2.0, "?");
    }

    #[test]
    fn contains_maps_to_json_contains() {
        let d = dialect();
        let cfg = d.config().clone();
        let mut ctx = EmitContext::new(&cfg, ParamStyle::Question, "seed");
        let left = ExpLeft {
            table: "docs".into(),
            col: "data".into(),
            json_path: vec![],
            parent_select: None,
        };
        let right = ExpRight::Literal(LiteralValue::Str("x".into()));
        d.render_op(&mut ctx, Op::Contains, &left, Some(&right), &[]).unwrap();
        let (sql, _) = ctx.finish();
        assert!(sql.contains("JSON_CONTAINS"));
    }
}
