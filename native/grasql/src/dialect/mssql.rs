//! SQL Server: a full-custom dialect, because T-SQL's shape doesn't fit the
//! generic walker's assumptions closely enough to share it. `OFFSET …
//! FETCH NEXT … ROWS ONLY` requires an `ORDER BY`; there is no `LATERAL`,
//! so children join via `CROSS APPLY`; responses are built with
//! `FOR JSON PATH, INCLUDE_NULL_VALUES` rather than aggregate functions;
//! mutations run as a sequence of statements (`linear_execution`), each
//! followed by a `SCOPE_IDENTITY()` capture into a table variable, since
//! there is no single-statement `RETURNING` equivalent this crate relies on
//! elsewhere.
use crate::config::DialectConfig;
use crate::dialect::{render_exp, render_mutate_value, Dialect};
use crate::emit::{EmitContext, ParamStyle};
use crate::error::{CompileError, Result};
use crate::registry::DialectName;
use crate::types::{
    ExpLeft, ExpRight, GeoArg, Join, LiteralValue, Mutate, MutateId, MutateKind, Op, QCode, RelKind,
    Select, SelectId,
};

pub struct MsSqlDialect {
    config: DialectConfig,
}

impl MsSqlDialect {
    pub fn new(config: DialectConfig) -> Self {
        MsSqlDialect { config }
    }
}

impl Dialect for MsSqlDialect {
    fn name(&self) -> DialectName {
        DialectName::MsSql
    }
    fn config(&self) -> &DialectConfig {
        &self.config
    }
    fn quote_char(&self) -> char {
        // `QUOTED_IDENTIFIER ON` (the server default) treats double quotes
        // as identifier delimiters, same calling convention as every other
        // dialect here rather than the bracket (`[ident]`) alternative.
        '"'
    }
    fn param_style(&self) -> ParamStyle {
        ParamStyle::Named("p")
    }
    fn bool_literal(&self, value: bool) -> &'static str {
        if value {
            "1"
        } else {
            "0"
        }
    }

    // These three exist only to satisfy the trait; MSSQL never reaches the
    // generic walker (`compile_full_query`/`compile_full_mutation` below
    // always handle it), so their calling convention is untested by this
    // dialect in practice.
    fn json_object_fn(&self) -> &'static str {
        "JSON_OBJECT"
    }
    fn json_array_agg_fn(&self) -> &'static str {
        "JSON_ARRAY"
    }
    fn empty_json_array_literal(&self) -> &'static str {
        "'[]'"
    }

    fn render_limit(
        &self,
        ctx: &mut EmitContext<'_>,
        paging: &crate::types::Paging,
        order_by: &[crate::types::OrderExpr],
        fallback_order_col: &str,
    ) {
        // OFFSET ... FETCH requires an ORDER BY even when only a LIMIT
        // (FETCH with no OFFSET) is requested, unlike every other dialect.
        if (paging.limit.is_some() || paging.offset.is_some()) && order_by.is_empty() {
            ctx.push_str(&format!(" ORDER BY {fallback_order_col}"));
        }
        if paging.limit.is_some() || paging.offset.is_some() {
            ctx.push_str(&format!(" OFFSET {} ROWS", paging.offset.unwrap_or(0)));
        }
        if let Some(limit) = paging.limit {
            ctx.push_str(&format!(" FETCH NEXT {limit} ROWS ONLY"));
        }
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
        let tok = match op {
            Op::Equals => "=",
            Op::NotEquals => "<>",
            Op::Greater => ">",
            Op::GreaterOrEquals => ">=",
            Op::Lesser => "<",
            Op::LesserOrEquals => "<=",
            Op::Like => "LIKE",
            Op::NotLike => "NOT LIKE",
            Op::In => "IN",
            Op::NotIn => "NOT IN",
            Op::IsNull => "IS NULL",
            Op::IsNotNull => "IS NOT NULL",
            Op::HasKey => {
                ctx.push_str("JSON_VALUE(");
                self.render_exp_left(ctx, left, ".");
                ctx.push_str(") IS NOT NULL");
                return Ok(());
            }
            Op::TsQuery => {
                // `CONTAINS` requires a full-text index on the column and
                // takes the search phrase as its own argument, not a
                // comparison operand — shaped like a function call rather
                // than the `col OP value` pattern every other token here
                // follows.
                ctx.push_str("CONTAINS(");
                self.render_exp_left(ctx, left, ".");
                ctx.push_str(", ");
                if let Some(r) = right {
                    self.render_exp_right(ctx, r);
                }
                ctx.push_str(")");
                return Ok(());
            }
            Op::EqualsTrue => {
                self.render_exp_left(ctx, left, ".");
                ctx.push_str(" = 1");
                return Ok(());
            }
            Op::NotEqualsTrue => {
                self.render_exp_left(ctx, left, ".");
                ctx.push_str(" != 1");
                return Ok(());
            }
            _ => {
                return Err(CompileError::Unsupported {
                    dialect: self.name(),
                    op,
                })
            }
        };
        self.render_exp_left(ctx, left, ".");
        ctx.push_str(" ");
        ctx.push_str(tok);
        if let Some(r) = right {
            ctx.push_str(" ");
            self.render_exp_right(ctx, r);
        }
        Ok(())
    }

    /// T-SQL spells these cast targets differently than the trait default
    /// (`FLOAT`/`BIT`/`DATETIME2`, not `DOUBLE PRECISION`/`BOOLEAN`/`TIMESTAMP`).
    fn cast_cursor_token(&self, expr: &str, ty: Option<crate::schema::ColType>) -> String {
        use crate::schema::ColType;
        match ty {
            None | Some(ColType::Text) | Some(ColType::Uuid) | Some(ColType::Json) => {
                expr.to_string()
            }
            Some(ColType::Int) => format!("CAST({expr} AS BIGINT)"),
            Some(ColType::Float) => format!("CAST({expr} AS FLOAT)"),
            Some(ColType::Bool) => format!("CAST({expr} AS BIT)"),
            Some(ColType::Timestamp) => format!("CAST({expr} AS DATETIME2)"),
            Some(ColType::Geometry) => expr.to_string(),
        }
    }

    fn render_geo_op(&self, ctx: &mut EmitContext<'_>, op: Op, left: &ExpLeft, geo: &GeoArg) -> Result<()> {
        if !matches!(op, Op::GeoWithin | Op::GeoDistance | Op::GeoNear) {
            return Err(CompileError::Unsupported {
                dialect: self.name(),
                op,
            });
        }
        ctx.qualified(&left.table, &left.col, self.quote_char());
        ctx.push_str(".STDistance(geography::STGeomFromText(");
        let ph = self.render_literal(ctx, &LiteralValue::Json(geo.geometry.clone()));
        ctx.push_str(&ph.0);
        ctx.push_str(", 4326))");
        if let Some(distance) = geo.distance {
            let metres = geo.unit.to_metres(distance);
            ctx.push_str(" <= ");
            let ph = self.render_literal(ctx, &LiteralValue::Float(metres));
            ctx.push_str(&ph.0);
        }
        Ok(())
    }

    /// T-SQL equivalent of the SQLite idiom: unroll `n` `SUBSTRING(expr,
    /// CHARINDEX(':', expr) + 1, LEN(expr))` hops, then slice to the next
    /// separator (or end of string for the last token).
    fn nth_cursor_token(&self, expr: &str, n: usize) -> String {
        let mut rest = expr.to_string();
        for _ in 0..n {
            rest = format!("SUBSTRING({rest}, CHARINDEX(':', {rest}) + 1, LEN({rest}))");
        }
        format!(
            "SUBSTRING({rest}, 1, CASE WHEN CHARINDEX(':', {rest}) = 0 THEN LEN({rest}) ELSE CHARINDEX(':', {rest}) - 1 END)"
        )
    }

    /// `FOR JSON PATH` builds its object from column aliases, not
    /// key/value pairs, so the trait default (written for the generic
    /// walker's `jsonb_build_object`-style row objects) doesn't fit here.
    fn render_cursor_helper_fields(&self, ctx: &mut EmitContext<'_>, sel: &crate::types::Select) {
        let quote = self.quote_char();
        for o in &sel.order_by {
            ctx.push_str(", ");
            ctx.qualified(&sel.table, &o.col, quote);
            ctx.push_str(" AS ");
            ctx.quote_ident(&crate::cursor::outbound_key(o), quote);
        }
    }

    fn render_lateral_join(&self, ctx: &mut EmitContext<'_>, qcode: &QCode, child: SelectId) -> Result<()> {
        self.render_inline_child(ctx, qcode, child)
    }

    fn render_inline_child(&self, ctx: &mut EmitContext<'_>, qcode: &QCode, child: SelectId) -> Result<()> {
        render_json_path_select(self, ctx, qcode, child)
    }

    /// `@mutate_{id}` is a table variable `DECLARE`d by
    /// `compile_full_mutation` and populated with `SCOPE_IDENTITY()` right
    /// after the dependency's own statement runs, since `SCOPE_IDENTITY()`
    /// itself resets at the next statement and can't be read later.
    fn captured_id_expr(&self, dep_id: MutateId) -> String {
        format!("(SELECT id FROM @mutate_{dep_id})")
    }

    fn render_mutation(&self, ctx: &mut EmitContext<'_>, qcode: &QCode, mu: &Mutate) -> Result<()> {
        render_linear_statement(self, ctx, qcode, mu)
    }

    fn compile_full_query(&self, ctx: &mut EmitContext<'_>, qcode: &QCode) -> Option<Result<()>> {
        Some((|| {
            let cursor_sels: Vec<_> = qcode.selects.iter().filter(|s| s.paging.cursor).collect();
            if !cursor_sels.is_empty() {
                ctx.push_str("WITH ");
                for (i, sel) in cursor_sels.iter().enumerate() {
                    if i > 0 {
                        ctx.push_str(", ");
                    }
                    self.render_cursor_cte(ctx, sel.id, &sel.order_by);
                }
                ctx.push_str(" ");
            }
            ctx.push_str("SELECT ");
            for (i, &root) in qcode.roots.iter().enumerate() {
                if i > 0 {
                    ctx.push_str(", ");
                }
                let sel = qcode.select(root);
                render_json_path_select(self, ctx, qcode, root)?;
                ctx.push_str(" AS ");
                ctx.quote_ident(&sel.field_name, self.quote_char());
            }
            ctx.push_str(" FOR JSON PATH, INCLUDE_NULL_VALUES, WITHOUT_ARRAY_WRAPPER");
            Ok(())
        })())
    }

    fn compile_full_mutation(&self, ctx: &mut EmitContext<'_>, qcode: &QCode) -> Option<Result<()>> {
        Some((|| {
            let order = crate::mutation::topological_order(&qcode.mutates);
            // Declared upfront so a dependent statement can reference a
            // not-yet-populated sibling's table variable regardless of
            // emission order (captured_id_expr only resolves a value once
            // the dependency's own capture statement has run).
            for &id in &order {
                let mu = qcode.mutate(id);
                if matches!(mu.kind, MutateKind::Insert | MutateKind::Upsert) {
                    ctx.push_str(&format!("DECLARE @mutate_{} TABLE (id BIGINT); ", mu.id));
                }
            }
            for (i, &id) in order.iter().enumerate() {
                if i > 0 {
                    ctx.push_str("; ");
                }
                let mu = qcode.mutate(id);
                ctx.mark_mutated(mu.ti.name.clone());
                render_linear_statement(self, ctx, qcode, mu)?;
                if matches!(mu.kind, MutateKind::Insert | MutateKind::Upsert) {
                    ctx.push_str(&format!(
                        "; INSERT INTO @mutate_{} SELECT SCOPE_IDENTITY()",
                        mu.id
                    ));
                }
            }
            if !qcode.roots.is_empty() {
                ctx.push_str("; ");
                if let Some(Err(e)) = self.compile_full_query(ctx, qcode) {
                    return Err(e);
                }
            }
            Ok(())
        })())
    }
}

/// Correlated `EXISTS` subquery, identical shape to the relational
/// dialects' version modulo quoting convention.
fn render_exists(dialect: &MsSqlDialect, ctx: &mut EmitContext<'_>, left: &ExpLeft, joins: &[Join]) -> Result<()> {
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
        ctx.push_str(" WHERE 1 = 1");
    }
    ctx.push_str(")");
    Ok(())
}

/// Renders one select as a `(SELECT ... FOR JSON PATH)` scalar subquery,
/// MSSQL's equivalent of the generic walker's `render_select` aggregate.
fn render_json_path_select(
    dialect: &MsSqlDialect,
    ctx: &mut EmitContext<'_>,
    qcode: &QCode,
    sel_id: SelectId,
) -> Result<()> {
    let sel = qcode.select(sel_id);
    let quote = dialect.quote_char();

    if sel.rel.kind == RelKind::Embedded {
        ctx.qualified(&sel.rel.left.table, &sel.rel.left.col, quote);
        return Ok(());
    }

    ctx.push_str("(SELECT ");
    render_columns(dialect, ctx, sel);
    for &child in &sel.children {
        ctx.push_str(", ");
        render_json_path_select(dialect, ctx, qcode, child)?;
        let child_sel = qcode.select(child);
        ctx.push_str(" AS ");
        ctx.quote_ident(&child_sel.field_name, quote);
    }
    ctx.push_str(" FROM ");
    ctx.quote_ident(&sel.table.0, quote);
    ctx.push_str(" WHERE ");
    render_correlation(dialect, ctx, sel);
    if let Some(where_) = &sel.where_ {
        ctx.push_str(" AND ");
        render_exp(dialect, ctx, where_)?;
    }
    if sel.paging.cursor && sel.paging.cursor_value.is_some() {
        ctx.push_str(" AND ");
        dialect.render_cursor_seek_predicate(ctx, sel);
    }
    dialect.render_order_by(ctx, &sel.order_by);
    dialect.render_limit(ctx, &sel.paging, &sel.order_by, "id");
    if sel.singular {
        ctx.push_str(" FOR JSON PATH, INCLUDE_NULL_VALUES, WITHOUT_ARRAY_WRAPPER)");
    } else {
        ctx.push_str(" FOR JSON PATH, INCLUDE_NULL_VALUES)");
    }
    Ok(())
}

fn render_columns(dialect: &MsSqlDialect, ctx: &mut EmitContext<'_>, sel: &Select) {
    let quote = dialect.quote_char();
    for (i, field) in sel.fields.iter().enumerate() {
        if i > 0 {
            ctx.push_str(", ");
        }
        ctx.qualified(&sel.table, &field.col, quote);
        ctx.push_str(" AS ");
        ctx.quote_ident(&field.field_name, quote);
    }
    if sel.paging.cursor {
        dialect.render_cursor_helper_fields(ctx, sel);
    }
}

fn render_correlation(dialect: &MsSqlDialect, ctx: &mut EmitContext<'_>, sel: &Select) {
    let quote = dialect.quote_char();
    match sel.rel.kind {
        RelKind::None => ctx.push_str("1 = 1"),
        RelKind::ManyToMany => {
            ctx.qualified(&sel.rel.left.table, &sel.rel.left.col, quote);
            ctx.push_str(" = ");
            if let Some(join) = sel.joins.first() {
                ctx.qualified(&join.left.table, &join.left.col, quote);
            } else {
                ctx.qualified(&sel.rel.right.table, &sel.rel.right.col, quote);
            }
        }
        RelKind::Polymorphic => {
            ctx.qualified(&sel.rel.left.table, &sel.rel.left.col, quote);
            ctx.push_str(" = ");
            ctx.qualified(&sel.rel.right.table, &sel.rel.right.col, quote);
            if let Some(poly) = &sel.rel.poly {
                if let Some((variant, _)) = poly.variants.iter().find(|(_, t)| *t == sel.table) {
                    ctx.push_str(" AND ");
                    ctx.qualified(&sel.table, &poly.discriminator_col, quote);
                    ctx.push_str(" = '");
                    ctx.push_str(&variant.replace('\'', "''"));
                    ctx.push_str("'");
                }
            }
        }
        _ => {
            ctx.qualified(&sel.rel.left.table, &sel.rel.left.col, quote);
            ctx.push_str(" = ");
            ctx.qualified(&sel.rel.right.table, &sel.rel.right.col, quote);
        }
    }
}

/// Renders one mutation node's linear statement, used both standalone
/// (`Dialect::render_mutation`) and inside `compile_full_mutation`'s
/// sequence, so the two never drift on syntax.
fn render_linear_statement(dialect: &MsSqlDialect, ctx: &mut EmitContext<'_>, qcode: &QCode, mu: &Mutate) -> Result<()> {
    let quote = dialect.quote_char();
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
                render_mutate_value(dialect, ctx, qcode, mu, col);
            }
            ctx.push_str(")");
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
                render_mutate_value(dialect, ctx, qcode, mu, col);
            }
            if let Some(where_) = &mu.where_ {
                ctx.push_str(" WHERE ");
                render_exp(dialect, ctx, where_)?;
            }
        }
        MutateKind::Delete => {
            ctx.push_str("DELETE FROM ");
            ctx.quote_ident(&mu.ti.name.0, quote);
            if let Some(where_) = &mu.where_ {
                ctx.push_str(" WHERE ");
                render_exp(dialect, ctx, where_)?;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DialectVersion, NameCase};

    fn dialect() -> MsSqlDialect {
        MsSqlDialect::new(DialectConfig {
            name_case: NameCase::Preserve,
            version: DialectVersion { major: 2019, minor: 0 },
            camel_case_fields: false,
            supports_lateral_joins: false,
            supports_returning: false,
            supports_writable_cte: true,
            supports_native_upsert: false,
            supports_recursive_cte: true,
            linear_execution: true,
        })
    }

    #[test]
    fn render_limit_always_orders_even_without_offset() {
        let d = dialect();
        let cfg = d.config().clone();
        let mut ctx = EmitContext::new(&cfg, ParamStyle::Named("p"), "seed");
        let paging = crate::types::Paging {
            limit: Some(10),
            offset: None,
            cursor: false,
            cursor_value: None,
        };
        d.render_limit(&mut ctx, &paging, &[], "id");
        let (sql, _) = ctx.finish();
        assert!(sql.contains("ORDER BY id"));
        assert!(sql.contains("FETCH NEXT 10 ROWS ONLY"));
    }

    #[test]
    fn named_placeholders_number_sequentially() {
        let d = dialect();
        let cfg = d.config().clone();
        let mut ctx = EmitContext::new(&cfg, ParamStyle::Named("p"), "seed");
        let p1 = ctx.push_param(None, crate::emit::ParamValue::Static(LiteralValue::Int(1)), false, false);
        assert_eq!(p1.0, "@p1");
    }
}
