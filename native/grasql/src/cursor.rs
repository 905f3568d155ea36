//! Cursor-token shape shared by every dialect (spec.md §4.2 Pagination, §6
//! cursor token format).
//!
//! Format: `<sec-prefix>:<sel-id>:<val1>:<val2>:…`, where `sec-prefix`
//! begins with the three bytes `gj-` followed by an opaque hex token. A
//! colon separates the opaque token from `sel-id` — spec.md §6 describes
//! the prefix and sel-id as directly concatenated, but since the opaque
//! token is itself hex (its own digits indistinguishable from `sel-id`'s),
//! an unambiguous boundary needs a delimiter; see DESIGN.md. Signing/
//! encryption of the token is an external collaborator's job (spec.md §6);
//! this module owns only the shape and the stripping rule.
use crate::error::{CompileError, Result};
use crate::types::{OrderDirection, OrderExpr, SelectId};

/// Name of the CTE a dialect's `render_cursor_cte` binds the parsed seek
/// columns to, and the name under which each seek column is exposed inside
/// it (`c0`, `c1`, ...). Shared so `render_cursor_cte` implementations and
/// the keyset `WHERE` predicate built from them never drift on naming.
pub fn cte_name(sel_id: SelectId) -> String {
    format!("__cursor_seek_{sel_id}")
}

pub fn seek_col_name(i: usize) -> String {
    format!("c{i}")
}

/// Outbound projection key for an ordering column, per spec.md §4.4/scenario A
/// (`__cursor_price`, `__cursor_id`).
pub fn outbound_key(order: &OrderExpr) -> String {
    format!("__cursor_{}", order.col.0)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

impl From<OrderDirection> for Direction {
    fn from(d: OrderDirection) -> Self {
        match d {
            OrderDirection::Asc => Direction::Asc,
            OrderDirection::Desc => Direction::Desc,
        }
    }
}

/// Describes how the executor extracts the outbound cursor from result rows
/// (spec.md §6 output contract).
#[derive(Clone, Debug)]
pub struct CursorMeta {
    pub sel_id: SelectId,
    pub sec_prefix: String,
    pub columns: Vec<(String, Direction)>,
}

impl CursorMeta {
    /// Builds the outbound cursor metadata a cursor-paging select's
    /// `order_by` implies (spec.md §6 output contract, §8 Scenario A).
    pub fn from_order_by(sel_id: SelectId, sec_prefix: &str, order_by: &[OrderExpr]) -> Self {
        CursorMeta {
            sel_id,
            sec_prefix: sec_prefix.to_string(),
            columns: order_by
                .iter()
                .map(|o| (o.col.0.clone(), Direction::from(o.dir)))
                .collect(),
        }
    }
}

/// Strips the `gj-<opaque>` prefix and the `<sel_id>` segment from an
/// inbound cursor token, returning the select it belongs to and the
/// remaining colon-separated value string for the dialect's cursor CTE to
/// parse into typed seek columns.
///
/// The opaque token is a hex timestamp of no fixed length, so its boundary
/// with the decimal `sel_id` can't be found by scanning for "the first
/// digit" (the opaque token's own hex digits would match too) — a colon
/// delimits opaque from sel_id, and a second colon (if present) starts the
/// value list: `gj-<opaque>:<sel_id>:<val1>:<val2>:...`.
///
/// Per spec.md §9 Open Question 1, colons embedded in string values are not
/// escaped here — this function only strips the two fixed-shape prefix
/// segments and hands the rest through verbatim; see DESIGN.md.
pub fn strip_prefix(token: &str) -> Result<(SelectId, &str)> {
    let rest = token
        .strip_prefix("gj-")
        .ok_or_else(|| CompileError::Invalid(format!("cursor token missing gj- prefix: {token}")))?;

    let opaque_end = rest
        .find(':')
        .ok_or_else(|| CompileError::Invalid(format!("cursor token has no sel_id: {token}")))?;
    let after_opaque = &rest[opaque_end + 1..];
    let sep = after_opaque.find(':').unwrap_or(after_opaque.len());
    let sel_id: SelectId = after_opaque[..sep]
        .parse()
        .map_err(|_| CompileError::Invalid(format!("cursor token sel_id not numeric: {token}")))?;
    let values = if sep < after_opaque.len() {
        &after_opaque[sep + 1..]
    } else {
        ""
    };
    Ok((sel_id, values))
}

/// Splits the colon-separated value portion of a cursor into its raw
/// per-column strings. Mirrors `strip_prefix`'s no-escaping behavior.
pub fn split_values(values: &str) -> Vec<&str> {
    if values.is_empty() {
        Vec::new()
    } else {
        values.split(':').collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strip_prefix_recovers_sel_id_and_values() {
        let token = "gj-1a2b3c4d5:7:100:2024-01-01";
        let (sel_id, values) = strip_prefix(token).unwrap();
        assert_eq!(sel_id, 7);
        assert_eq!(split_values(values), vec!["100", "2024-01-01"]);
    }

    #[test]
    fn strip_prefix_handles_no_values() {
        let token = "gj-abc123:3";
        let (sel_id, values) = strip_prefix(token).unwrap();
        assert_eq!(sel_id, 3);
        assert!(split_values(values).is_empty());
    }

    #[test]
    fn strip_prefix_rejects_missing_prefix() {
        assert!(strip_prefix("nope:1:2").is_err());
    }

    #[test]
    fn strip_prefix_rejects_missing_sel_id() {
        assert!(strip_prefix("gj-").is_err());
    }
}
