//! The dialect capability set and the `FullCompiler` escape hatch for
//! backends whose shape doesn't fit the generic walker.
pub mod mongo;
pub mod mssql;
pub mod mysql;
pub mod postgres;
pub mod sqlite;

use crate::config::DialectConfig;
use crate::emit::{EmitContext, ParamStyle, Placeholder};
use crate::error::Result;
use crate::registry::DialectName;
use crate::schema::ColType;
use crate::types::{
    Exp, ExpLeft, ExpRight, GeoArg, Join, LiteralValue, Mutate, MutateColumn, MutateId, Op,
    OrderExpr, Paging, QCode, Select, SelectId,
};

/// Hooks grouped by family. Every method has a body — either a
/// backend-agnostic default good enough for most relational dialects, or no
/// default at all, meaning a concrete dialect must override it because there
/// is no safe generic answer (response shaping, relationship traversal, and
/// mutation rendering, which are irreducibly backend-specific).
pub trait Dialect {
    // ---- metadata / flags --------------------------------------------
    fn name(&self) -> DialectName;
    fn config(&self) -> &DialectConfig;
    fn quote_char(&self) -> char;
    fn param_style(&self) -> ParamStyle;
    fn bool_literal(&self, value: bool) -> &'static str {
        if value {
            "true"
        } else {
            "false"
        }
    }

    // ---- pagination -----------------------------------------------------
    /// Emits `LIMIT`/`OFFSET`/`FETCH`. If `order_by` is empty but an offset
    /// is requested, the dialect must fall back to a deterministic ordering
    /// — `fallback_order_col` names the column to use.
    fn render_limit(
        &self,
        ctx: &mut EmitContext<'_>,
        paging: &Paging,
        order_by: &[OrderExpr],
        fallback_order_col: &str,
    ) {
        if paging.offset.is_some() && order_by.is_empty() {
            ctx.push_str(&format!(" ORDER BY {fallback_order_col}"));
        }
        if let Some(limit) = paging.limit {
            ctx.push_str(&format!(" LIMIT {limit}"));
        }
        if let Some(offset) = paging.offset {
            ctx.push_str(&format!(" OFFSET {offset}"));
        }
    }

    // ---- pagination: cursor ------------------------------------------------
    /// Extracts the `n`th (zero-based) colon-separated token from the raw
    /// cursor value-string expression `expr`, as dialect-native SQL text.
    /// No default: Postgres has `split_part`, MySQL/SQLite need a different
    /// idiom (`SUBSTRING_INDEX` chaining / nested `substr`/`instr`).
    fn nth_cursor_token(&self, expr: &str, n: usize) -> String;

    /// Casts a text token (as produced by `nth_cursor_token`) to `ty`'s
    /// native type, as a SQL expression wrapping `expr`. `None` leaves it a
    /// text comparison — the seek column's declared type wasn't available
    /// upstream (see `OrderExpr::col_type`, DESIGN.md).
    fn cast_cursor_token(&self, expr: &str, ty: Option<ColType>) -> String {
        match ty {
            None | Some(ColType::Text) | Some(ColType::Uuid) | Some(ColType::Json) => {
                expr.to_string()
            }
            Some(ColType::Int) => format!("CAST({expr} AS BIGINT)"),
            Some(ColType::Float) => format!("CAST({expr} AS DOUBLE PRECISION)"),
            Some(ColType::Bool) => format!("CAST({expr} AS BOOLEAN)"),
            Some(ColType::Timestamp) => format!("CAST({expr} AS TIMESTAMP)"),
            Some(ColType::Geometry) => expr.to_string(),
        }
    }

    /// Emits a `WITH <cte> AS (SELECT <typed seek columns>)` binding the
    /// cursor parameter's colon-separated tokens to named, typed columns,
    /// per spec.md §4.2 Pagination `RenderCursorCTE`. No-op (and never
    /// called) for a select that isn't cursor-paging.
    fn render_cursor_cte(&self, ctx: &mut EmitContext<'_>, sel_id: SelectId, order_by: &[OrderExpr]) {
        use crate::emit::ParamValue;
        // Scoped by sel_id rather than a single shared "__cursor" name: a
        // tree with more than one cursor-paging select needs each CTE bound
        // to its own inbound token, not all sharing one runtime variable.
        let var_name = format!("__cursor_{sel_id}");
        let raw = ctx.push_param(
            Some(var_name.clone()),
            ParamValue::Runtime(var_name),
            false,
            false,
        );
        ctx.push_str(&crate::cursor::cte_name(sel_id));
        ctx.push_str(" AS (SELECT ");
        for (i, o) in order_by.iter().enumerate() {
            if i > 0 {
                ctx.push_str(", ");
            }
            let token = self.nth_cursor_token(&raw.0, i);
            let cast = self.cast_cursor_token(&token, o.col_type);
            ctx.push_str(&cast);
            ctx.push_str(" AS ");
            ctx.push_str(&crate::cursor::seek_col_name(i));
        }
        ctx.push_str(")");
    }

    /// Renders the keyset-pagination seek predicate
    /// `(col1, col2, ...) > (seek.c0, seek.c1, ...)` generalized to mixed
    /// `ASC`/`DESC` directions via a cascading-equality disjunction, reading
    /// seek values from the CTE `render_cursor_cte` bound.
    fn render_cursor_seek_predicate(&self, ctx: &mut EmitContext<'_>, sel: &Select) {
        if sel.order_by.is_empty() {
            return;
        }
        let cte = crate::cursor::cte_name(sel.id);
        let quote = self.quote_char();
        ctx.push_str("(");
        for i in 0..sel.order_by.len() {
            if i > 0 {
                ctx.push_str(" OR ");
            }
            ctx.push_str("(");
            for j in 0..i {
                let o = &sel.order_by[j];
                ctx.quote_ident(&o.col.0, quote);
                ctx.push_str(" = ");
                ctx.push_str(&cte);
                ctx.push_str(".");
                ctx.push_str(&crate::cursor::seek_col_name(j));
                ctx.push_str(" AND ");
            }
            let o = &sel.order_by[i];
            ctx.quote_ident(&o.col.0, quote);
            let op = match o.dir {
                crate::types::OrderDirection::Asc => ">",
                crate::types::OrderDirection::Desc => "<",
            };
            ctx.push_str(" ");
            ctx.push_str(op);
            ctx.push_str(" ");
            ctx.push_str(&cte);
            ctx.push_str(".");
            ctx.push_str(&crate::cursor::seek_col_name(i));
            ctx.push_str(")");
        }
        ctx.push_str(")");
    }

    /// Writes the outbound `__cursor_<col>` helper projections a cursor-
    /// paging select adds to its row object (spec.md §8 Scenario A), one per
    /// ordering column, reusing the same column reference the projection
    /// already has available.
    fn render_cursor_helper_fields(&self, ctx: &mut EmitContext<'_>, sel: &Select) {
        for o in &sel.order_by {
            ctx.push_str(", ");
            self.render_json_key(ctx, &crate::cursor::outbound_key(o));
            ctx.qualified(&sel.table, &o.col, self.quote_char());
        }
    }

    // ---- ordering ---------------------------------------------------------
    fn render_order_by(&self, ctx: &mut EmitContext<'_>, order_by: &[OrderExpr]) {
        if order_by.is_empty() {
            return;
        }
        ctx.push_str(" ORDER BY ");
        for (i, o) in order_by.iter().enumerate() {
            if i > 0 {
                ctx.push_str(", ");
            }
            ctx.quote_ident(&o.col.0, self.quote_char());
            match o.dir {
                crate::types::OrderDirection::Asc => ctx.push_str(" ASC"),
                crate::types::OrderDirection::Desc => ctx.push_str(" DESC"),
            }
            match o.nulls {
                crate::types::NullsOrder::First => ctx.push_str(" NULLS FIRST"),
                crate::types::NullsOrder::Last => ctx.push_str(" NULLS LAST"),
                crate::types::NullsOrder::Default => {}
            }
        }
    }

    // ---- expressions --------------------------------------------------
    /// Maps a non-geo operator to backend tokens, rendering both operands.
    /// `right` is `None` for unary ops (`IsNull`/`IsNotNull`) and for
    /// `SelectExists`, whose correlated-subquery shape is instead built from
    /// `joins`. The one recoverable error path in the whole compiler.
    fn render_op(
        &self,
        ctx: &mut EmitContext<'_>,
        op: Op,
        left: &ExpLeft,
        right: Option<&ExpRight>,
        joins: &[Join],
    ) -> Result<()>;

    /// Writes `left`'s qualified column, descending through any JSON path
    /// segments using the dialect's own JSON-path operator. Shared so every
    /// relational dialect renders the left side of a comparison identically
    /// up to its JSON-path token.
    fn render_exp_left(&self, ctx: &mut EmitContext<'_>, left: &ExpLeft, json_path_op: &str) {
        ctx.qualified(&left.table, &left.col, self.quote_char());
        for seg in &left.json_path {
            ctx.push_str(json_path_op);
            ctx.push_str(&format!("'{}'", seg.replace('\'', "''")));
        }
    }

    /// Writes `right` as a placeholder (literal/list) or a qualified column
    /// reference, the common case shared across dialects' `render_op`.
    fn render_exp_right(&self, ctx: &mut EmitContext<'_>, right: &ExpRight) {
        use crate::emit::ParamValue;
        match right {
            ExpRight::Literal(v) => {
                let ph = self.render_literal(ctx, v);
                ctx.push_str(&ph.0);
            }
            ExpRight::List(vals) => {
                ctx.push_str("(");
                for (i, v) in vals.iter().enumerate() {
                    if i > 0 {
                        ctx.push_str(", ");
                    }
                    let ph = self.render_literal(ctx, v);
                    ctx.push_str(&ph.0);
                }
                ctx.push_str(")");
            }
            ExpRight::Column(col) => {
                ctx.qualified(&col.table, &col.col, self.quote_char());
            }
            ExpRight::Variable(name) => {
                let ph = ctx.push_param(
                    Some(name.clone()),
                    ParamValue::Runtime(name.clone()),
                    false,
                    false,
                );
                ctx.push_str(&ph.0);
            }
        }
    }

    fn render_geo_op(&self, ctx: &mut EmitContext<'_>, op: Op, left: &ExpLeft, geo: &GeoArg) -> Result<()>;

    /// Renders a single literal value, registering a parameter when the
    /// value is not safe/sensible to inline (this crate always parameterizes
    /// rather than string-interpolating, to avoid injection).
    fn render_literal(&self, ctx: &mut EmitContext<'_>, value: &LiteralValue) -> Placeholder {
        use crate::emit::ParamValue;
        ctx.push_param(None, ParamValue::Static(value.clone()), false, false)
    }

    // ---- relationships --------------------------------------------------
    fn render_lateral_join(&self, ctx: &mut EmitContext<'_>, qcode: &QCode, child: SelectId) -> Result<()>;
    fn render_inline_child(&self, ctx: &mut EmitContext<'_>, qcode: &QCode, child: SelectId) -> Result<()>;

    // ---- JSON construction ------------------------------------------------
    /// Function name backing `jsonb_build_object`/`JSON_OBJECT`/`json_object`
    /// style per-row construction. All three relational dialects share the
    /// same `(key, value, key, value, ...)` calling convention, so only the
    /// function name varies.
    fn json_object_fn(&self) -> &'static str;
    /// Function name backing array-of-objects aggregation
    /// (`jsonb_agg`/`JSON_ARRAYAGG`/`json_group_array`).
    fn json_array_agg_fn(&self) -> &'static str;
    /// Literal to fall back to when an array aggregate has no rows, since
    /// `jsonb_agg`/`JSON_ARRAYAGG`/`json_group_array` of zero rows is `NULL`,
    /// not an empty array, across all three dialects.
    fn empty_json_array_literal(&self) -> &'static str;

    fn render_json_object_open(&self, ctx: &mut EmitContext<'_>) {
        ctx.push_str(self.json_object_fn());
        ctx.push_str("(");
    }
    fn render_json_object_close(&self, ctx: &mut EmitContext<'_>) {
        ctx.push_str(")");
    }
    /// Writes a JSON key literal followed by its trailing comma, ready for
    /// the caller to emit the value expression next.
    fn render_json_key(&self, ctx: &mut EmitContext<'_>, key: &str) {
        ctx.push_str("'");
        ctx.push_str(&key.replace('\'', "''"));
        ctx.push_str("', ");
    }

    // ---- response shaping -------------------------------------------------
    /// Opens the outermost envelope wrapping every root select's output into
    /// one JSON object keyed by GraphQL field name. Shared across the three
    /// generic-walker dialects since they all build this the same way; the
    /// two full-custom dialects never call it.
    fn render_json_root_open(&self, ctx: &mut EmitContext<'_>) {
        ctx.push_str("SELECT ");
        self.render_json_object_open(ctx);
    }
    fn render_json_root_terminator(&self, ctx: &mut EmitContext<'_>) {
        self.render_json_object_close(ctx);
    }

    // ---- full-custom escape hatch ---------------------------------------
    /// For dialects whose shape doesn't fit the generic walker (MSSQL,
    /// MongoDB): compiles the complete query artifact directly into `ctx`,
    /// bypassing `walker::walk_query` entirely. `None` means "drive this
    /// dialect through the generic walker instead" — the default for every
    /// relational dialect above.
    fn compile_full_query(&self, _ctx: &mut EmitContext<'_>, _qcode: &QCode) -> Option<Result<()>> {
        None
    }
    /// As `compile_full_query`, for mutation operations.
    fn compile_full_mutation(&self, _ctx: &mut EmitContext<'_>, _qcode: &QCode) -> Option<Result<()>> {
        None
    }

    // ---- mutations ----------------------------------------------------
    /// Renders one mutation node's statement (insert/update/delete/upsert/
    /// connect/disconnect dispatch lives inside the implementation, keyed on
    /// `mu.kind`) in emission order. No generic default: `RETURNING` vs
    /// `LAST_INSERT_ID()` vs linear ID-capture differ too much to share.
    fn render_mutation(&self, ctx: &mut EmitContext<'_>, qcode: &QCode, mu: &Mutate) -> Result<()>;

    /// SQL expression reading back the generated id of dependency mutation
    /// `dep_id`, immediately after it has run. Used when `render_mutate_value`
    /// finds a column whose value is threaded by FK location rather than
    /// supplied by the caller (spec.md §4.4/§4.5). No generic default: the
    /// capture mechanism (`lastval()` vs `LAST_INSERT_ID()` vs a `DECLARE`d
    /// table variable) is irreducibly dialect-specific.
    fn captured_id_expr(&self, dep_id: MutateId) -> String {
        let _ = dep_id;
        unreachable!(
            "captured_id_expr has no generic default; a dialect with FK-dependent mutations must override it"
        )
    }

    // ---- directive compilation -------------------------------------------
    /// Renders the chosen `SkipDecision` for one field. Shared logic
    /// (`types::compile_skip`) decides *what* to do; this renders *how*.
    fn render_field_skip(
        &self,
        ctx: &mut EmitContext<'_>,
        decision: &crate::types::SkipDecision,
        render_col: &mut dyn FnMut(&mut EmitContext<'_>),
    ) {
        use crate::types::SkipDecision::*;
        match decision {
            Render => render_col(ctx),
            Drop => {}
            StaticNull => ctx.push_str("NULL"),
            ConditionalOnVar(var) => {
                let ph = ctx.push_param(
                    Some(var.clone()),
                    crate::emit::ParamValue::Runtime(var.clone()),
                    false,
                    false,
                );
                ctx.push_str(&format!("CASE WHEN {ph} THEN "));
                render_col(ctx);
                ctx.push_str(" ELSE NULL END");
            }
        }
    }
}

/// Renders one mutation column's value: the real row data the caller sent
/// (`mu.data`, looked up by `field_name`), an FK threaded from a `depends_on`
/// mutation's captured id, or `col.preset` when neither applies. Shared by
/// every relational dialect's insert/update rendering so none of them
/// silently drops the caller's data back to `preset`/`NULL`.
pub fn render_mutate_value(
    dialect: &dyn Dialect,
    ctx: &mut EmitContext<'_>,
    qcode: &QCode,
    mu: &Mutate,
    col: &MutateColumn,
) {
    use crate::emit::ParamValue;
    match crate::mutation::resolve_column_value(qcode, mu, col) {
        crate::mutation::ResolvedValue::Literal(v) => {
            let ph = dialect.render_literal(ctx, &v);
            ctx.push_str(&ph.0);
        }
        crate::mutation::ResolvedValue::Variable(name) => {
            let ph = ctx.push_param(Some(name.clone()), ParamValue::Runtime(name), false, false);
            ctx.push_str(&ph.0);
        }
        crate::mutation::ResolvedValue::DependsOn(dep_id) => {
            ctx.push_str(&dialect.captured_id_expr(dep_id));
        }
    }
}

/// Recursively renders a boolean/comparison expression tree using a
/// dialect's `render_op`/`render_geo_op`, shared by every relational dialect
/// so none of them reimplements AND/OR/NOT precedence.
pub fn render_exp(dialect: &dyn Dialect, ctx: &mut EmitContext<'_>, exp: &Exp) -> Result<()> {
    if exp.op == Op::Not {
        ctx.push_str("NOT (");
        for (i, child) in exp.children.iter().enumerate() {
            if i > 0 {
                ctx.push_str(" AND ");
            }
            render_exp(dialect, ctx, child)?;
        }
        ctx.push_str(")");
        return Ok(());
    }
    if exp.op == Op::And || exp.op == Op::Or {
        let joiner = if exp.op == Op::And { " AND " } else { " OR " };
        ctx.push_str("(");
        for (i, child) in exp.children.iter().enumerate() {
            if i > 0 {
                ctx.push_str(joiner);
            }
            render_exp(dialect, ctx, child)?;
        }
        ctx.push_str(")");
        return Ok(());
    }
    if exp.op == Op::Nop {
        return Ok(());
    }
    let left = exp
        .left
        .as_ref()
        .expect("non-logical, non-Nop Exp must carry Left (invariant checked upstream)");
    if exp.op.is_geo() {
        let geo = exp
            .geo
            .as_ref()
            .expect("geo op must carry a Geo argument");
        return dialect.render_geo_op(ctx, exp.op, left, geo);
    }
    dialect.render_op(ctx, exp.op, left, exp.right.as_ref(), &exp.joins)
}
