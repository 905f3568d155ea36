//! The generic walker driving the three relational dialects (Postgres,
//! MySQL, SQLite) that differ only in `Dialect` hook implementations.
//! Contains no backend-specific string literal — every emitted token comes
//! from a `Dialect` method call, so a new relational dialect is "implement
//! `Dialect`, reuse this file" rather than "write a new walker".
use crate::dialect::{render_exp, Dialect};
use crate::emit::EmitContext;
use crate::error::Result;
use crate::mutation::topological_order;
use crate::types::{QCode, RecursiveDirection, RecursiveInfo, RelKind, Select, SelectId};

/// Column assumed to exist on every table for the fallback-ordering case
/// (an offset requested with no explicit `ORDER BY`). `Select` carries no
/// schema reference to look up a real primary key column, so this is a
/// deliberate simplifying convention rather than a schema lookup; see
/// DESIGN.md.
const FALLBACK_ORDER_COL: &str = "id";

/// Collects every select in the tree paging by cursor, in ascending
/// `SelectId` order (stable regardless of tree shape) so the emitted `WITH`
/// clause is deterministic across runs of the same `QCode`.
fn cursor_selects(qcode: &QCode) -> Vec<SelectId> {
    qcode
        .selects
        .iter()
        .filter(|s| s.paging.cursor)
        .map(|s| s.id)
        .collect()
}

/// Renders the `WITH <cte>, <cte>, ...` prefix binding every cursor-paging
/// select's seek columns, per spec.md §4.3 step 2 ("Cursor CTE (if cursor
/// paging)"). A no-op, zero-byte prefix when nothing in the tree pages by
/// cursor.
fn render_cursor_prefix(ctx: &mut EmitContext<'_>, qcode: &QCode, dialect: &dyn Dialect) {
    let selects = cursor_selects(qcode);
    if selects.is_empty() {
        return;
    }
    ctx.push_str("WITH ");
    for (i, &id) in selects.iter().enumerate() {
        if i > 0 {
            ctx.push_str(", ");
        }
        let sel = qcode.select(id);
        dialect.render_cursor_cte(ctx, id, &sel.order_by);
    }
    ctx.push_str(" ");
}

/// Renders the full response envelope for a query operation: one JSON
/// object keyed by each root select's field name, in `QCode::roots` order.
pub fn walk_query(ctx: &mut EmitContext<'_>, qcode: &QCode, dialect: &dyn Dialect) -> Result<()> {
    render_cursor_prefix(ctx, qcode, dialect);
    dialect.render_json_root_open(ctx);
    for (i, &root) in qcode.roots.iter().enumerate() {
        if i > 0 {
            ctx.push_str(", ");
        }
        let sel = qcode.select(root);
        dialect.render_json_key(ctx, &sel.field_name);
        render_select(ctx, qcode, dialect, root)?;
    }
    dialect.render_json_root_terminator(ctx);
    Ok(())
}

/// Renders every mutation node in dependency order, then — if the operation
/// carries root selects describing the re-fetch shape — appends the same
/// JSON envelope a query would produce, separated by `; `.
pub fn walk_mutation(ctx: &mut EmitContext<'_>, qcode: &QCode, dialect: &dyn Dialect) -> Result<()> {
    let order = topological_order(&qcode.mutates);
    for (i, &id) in order.iter().enumerate() {
        if i > 0 {
            ctx.push_str("; ");
        }
        let mu = qcode.mutate(id);
        ctx.mark_mutated(mu.ti.name.clone());
        dialect.render_mutation(ctx, qcode, mu)?;
    }
    if !qcode.roots.is_empty() {
        ctx.push_str("; ");
        walk_query(ctx, qcode, dialect)?;
    }
    Ok(())
}

/// Renders one select as a self-contained, parenthesized scalar expression
/// yielding a JSON value — an object for `singular` selects, an array
/// (aggregated, empty-safe) otherwise. Callable recursively by a dialect's
/// `render_lateral_join`/`render_inline_child` for nested children.
pub fn render_select(
    ctx: &mut EmitContext<'_>,
    qcode: &QCode,
    dialect: &dyn Dialect,
    sel_id: SelectId,
) -> Result<()> {
    let sel = qcode.select(sel_id);

    // Embedded relationships live in a JSON column on the parent row itself
    // — there is no child table to select from, just the column to project.
    if sel.rel.kind == RelKind::Embedded {
        ctx.qualified(&sel.rel.left.table, &sel.rel.left.col, dialect.quote_char());
        return Ok(());
    }

    // A Recursive relationship on a dialect that supports WITH RECURSIVE
    // walks the whole ancestor/descendant chain via a CTE; otherwise it
    // degrades to the single-hop correlation below (spec.md §4.2: "depending
    // on backend capability").
    let recursive = if sel.rel.kind == RelKind::Recursive && dialect.config().supports_recursive_cte {
        Some(
            sel.rel
                .recursive
                .as_ref()
                .expect("Recursive relationship must carry RecursiveInfo"),
        )
    } else {
        None
    };

    ctx.push_str("(");
    if let Some(rec) = recursive {
        render_recursive_cte(ctx, dialect, sel, rec);
    }
    ctx.push_str("SELECT ");
    if sel.singular {
        render_row_object(ctx, qcode, dialect, sel)?;
    } else {
        ctx.push_str("COALESCE(");
        ctx.push_str(dialect.json_array_agg_fn());
        ctx.push_str("(");
        render_row_object(ctx, qcode, dialect, sel)?;
        ctx.push_str(&format!("), {})", dialect.empty_json_array_literal()));
    }
    ctx.push_str(" FROM ");
    if recursive.is_some() {
        // Aliased back to the select's own table name so every other
        // column reference in this subtree (row object, WHERE, ORDER BY)
        // keeps qualifying columns exactly as it would for a plain table.
        ctx.push_str(&recursive_cte_name(sel.id));
        ctx.push_str(" AS ");
        ctx.quote_ident(&sel.table.0, dialect.quote_char());
    } else {
        render_from(ctx, dialect, sel);
    }
    ctx.push_str(" WHERE ");
    if recursive.is_some() {
        // The anchor member of the CTE already correlates to the parent row.
        ctx.push_str("TRUE");
    } else {
        render_correlation(ctx, dialect, sel)?;
    }
    if let Some(where_) = &sel.where_ {
        ctx.push_str(" AND ");
        render_exp(dialect, ctx, where_)?;
    }
    if sel.paging.cursor && sel.paging.cursor_value.is_some() {
        ctx.push_str(" AND ");
        dialect.render_cursor_seek_predicate(ctx, sel);
    }
    dialect.render_order_by(ctx, &sel.order_by);
    dialect.render_limit(ctx, &sel.paging, &sel.order_by, FALLBACK_ORDER_COL);
    ctx.push_str(")");
    Ok(())
}

fn render_row_object(
    ctx: &mut EmitContext<'_>,
    qcode: &QCode,
    dialect: &dyn Dialect,
    sel: &Select,
) -> Result<()> {
    dialect.render_json_object_open(ctx);
    let mut first = true;
    for field in &sel.fields {
        if !first {
            ctx.push_str(", ");
        }
        first = false;
        dialect.render_json_key(ctx, &field.field_name);
        let decision = crate::types::compile_skip(field.skip, &field.skip_var);
        let table = sel.table.clone();
        let col = field.col.clone();
        let quote = dialect.quote_char();
        dialect.render_field_skip(ctx, &decision, &mut |ctx| {
            ctx.qualified(&table, &col, quote);
        });
    }
    for &child in &sel.children {
        if !first {
            ctx.push_str(", ");
        }
        first = false;
        let child_sel = qcode.select(child);
        dialect.render_json_key(ctx, &child_sel.field_name);
        if dialect.config().supports_lateral_joins {
            dialect.render_lateral_join(ctx, qcode, child)?;
        } else {
            dialect.render_inline_child(ctx, qcode, child)?;
        }
    }
    if sel.paging.cursor {
        dialect.render_cursor_helper_fields(ctx, sel);
    }
    dialect.render_json_object_close(ctx);
    Ok(())
}

/// Name of the recursive CTE backing select `id`. Scoped per-select so a
/// tree with more than one recursive relationship never collides.
fn recursive_cte_name(id: SelectId) -> String {
    format!("__rec_{id}")
}

/// Emits `WITH RECURSIVE __rec_<id> AS (anchor UNION ALL step) ` ahead of the
/// `SELECT` that reads from it: the anchor member correlates to the parent
/// row exactly like a non-recursive hop would, the recursive member walks one
/// more step in `rec.direction`, and a `__depth` counter column enforces
/// `max_depth` when set (spec.md §4.2, §8 property 5).
fn render_recursive_cte(ctx: &mut EmitContext<'_>, dialect: &dyn Dialect, sel: &Select, rec: &RecursiveInfo) {
    let quote = dialect.quote_char();
    let cte = recursive_cte_name(sel.id);
    // `connect_from`/`connect_to` name the same two columns regardless of
    // direction; which one walks from parent->child vs child->parent flips.
    let (parent_col, child_col) = match rec.direction {
        RecursiveDirection::Children => (&rec.connect_from, &rec.connect_to),
        RecursiveDirection::Parents => (&rec.connect_to, &rec.connect_from),
    };
    ctx.push_str("WITH RECURSIVE ");
    ctx.push_str(&cte);
    ctx.push_str(" AS (SELECT *, 0 AS __depth FROM ");
    ctx.quote_ident(&sel.table.0, quote);
    ctx.push_str(" WHERE ");
    ctx.qualified(&sel.rel.left.table, &sel.rel.left.col, quote);
    ctx.push_str(" = ");
    ctx.qualified(&sel.rel.right.table, &sel.rel.right.col, quote);
    ctx.push_str(" UNION ALL SELECT child.*, step.__depth + 1 FROM ");
    ctx.quote_ident(&sel.table.0, quote);
    ctx.push_str(" AS child JOIN ");
    ctx.push_str(&cte);
    ctx.push_str(" AS step ON child.");
    ctx.quote_ident(&child_col.0, quote);
    ctx.push_str(" = step.");
    ctx.quote_ident(&parent_col.0, quote);
    if let Some(max_depth) = rec.max_depth {
        ctx.push_str(&format!(" WHERE step.__depth + 1 <= {max_depth}"));
    }
    ctx.push_str(") ");
}

fn render_from(ctx: &mut EmitContext<'_>, dialect: &dyn Dialect, sel: &Select) {
    ctx.quote_ident(&sel.table.0, dialect.quote_char());
    for join in &sel.joins {
        ctx.push_str(", ");
        ctx.quote_ident(&join.table.0, dialect.quote_char());
    }
}

/// Renders the predicate correlating this select's table back to its
/// parent row, dispatched on relationship kind. `Polymorphic` additionally
/// filters by discriminator. `render_select` only reaches this for
/// `Recursive` when the dialect lacks `supports_recursive_cte`, where a
/// single non-recursive hop is the best available fallback.
fn render_correlation(ctx: &mut EmitContext<'_>, dialect: &dyn Dialect, sel: &Select) -> Result<()> {
    match sel.rel.kind {
        RelKind::None => {
            ctx.push_str("TRUE");
        }
        RelKind::OneToOne | RelKind::OneToMany | RelKind::Recursive => {
            ctx.qualified(&sel.rel.left.table, &sel.rel.left.col, dialect.quote_char());
            ctx.push_str(" = ");
            ctx.qualified(&sel.rel.right.table, &sel.rel.right.col, dialect.quote_char());
        }
        RelKind::ManyToMany => {
            ctx.qualified(&sel.rel.left.table, &sel.rel.left.col, dialect.quote_char());
            ctx.push_str(" = ");
            if let Some(join) = sel.joins.first() {
                ctx.qualified(&join.left.table, &join.left.col, dialect.quote_char());
                ctx.push_str(" AND ");
                ctx.qualified(&join.right.table, &join.right.col, dialect.quote_char());
                ctx.push_str(" = ");
                ctx.qualified(&sel.rel.right.table, &sel.rel.right.col, dialect.quote_char());
            } else {
                ctx.qualified(&sel.rel.right.table, &sel.rel.right.col, dialect.quote_char());
            }
        }
        RelKind::Polymorphic => {
            ctx.qualified(&sel.rel.left.table, &sel.rel.left.col, dialect.quote_char());
            ctx.push_str(" = ");
            ctx.qualified(&sel.rel.right.table, &sel.rel.right.col, dialect.quote_char());
            if let Some(poly) = &sel.rel.poly {
                if let Some((variant, _)) = poly.variants.iter().find(|(_, t)| *t == sel.table) {
                    ctx.push_str(" AND ");
                    ctx.qualified(&sel.table, &poly.discriminator_col, dialect.quote_char());
                    ctx.push_str(" = ");
                    let ph = dialect.render_literal(ctx, &crate::types::LiteralValue::Str(variant.clone()));
                    ctx.push_str(&ph.0);
                }
            }
        }
        RelKind::Embedded => unreachable!("Embedded handled before render_select reaches here"),
    }
    Ok(())
}
