//! Core data model: the `QCode` intermediate representation.
//!
//! `QCode` is produced upstream (GraphQL parsing, schema resolution, security-rule
//! application) and handed to this crate read-only. Every dialect walks the same
//! tree; nothing in this module knows about SQL or MongoDB.
use std::collections::BTreeSet;

use crate::schema::{ColName, ColType, TableName};

/// Opaque index into `QCode::selects`. Spec.md's `-1`-means-root sentinel is
/// represented as `Option<SelectId>` on `parent_id` instead (see DESIGN.md).
pub type SelectId = u32;

/// Opaque index into `QCode::mutates`.
pub type MutateId = u32;

/// GraphQL-level operation kind.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OperationType {
    Query,
    Mutation,
    Subscription,
}

/// The compiled tree handed to `grasql::compile`.
#[derive(Clone, Debug)]
pub struct QCode {
    pub ty: OperationType,
    /// GraphQL operation name, if the caller provided one.
    pub name: Option<String>,
    pub typename: Option<String>,
    /// Name of the single aggregate input variable, when the mutation's input
    /// is one object rather than per-field variables.
    pub action_var: Option<String>,
    /// Root selects in GraphQL field order; response shape preserves this order.
    pub roots: Vec<SelectId>,
    /// Flat, indexable by `SelectId`.
    pub selects: Vec<Select>,
    /// Flat, indexable by `MutateId`.
    pub mutates: Vec<Mutate>,
}

impl QCode {
    pub fn select(&self, id: SelectId) -> &Select {
        &self.selects[id as usize]
    }

    pub fn mutate(&self, id: MutateId) -> &Mutate {
        &self.mutates[id as usize]
    }

    /// Debug-only validation of the §3 invariants. Violations are upstream IR
    /// bugs, not recoverable compiler errors — `compile()` runs this under
    /// `debug_assertions` only.
    pub fn check_invariants(&self) {
        for sel in &self.selects {
            for &child in &sel.children {
                debug_assert_eq!(
                    self.select(child).parent_id,
                    Some(sel.id),
                    "Select {} lists child {} whose parent_id does not point back",
                    sel.id,
                    child
                );
            }
            if sel.paging.cursor {
                debug_assert!(
                    !sel.order_by.is_empty(),
                    "Select {} pages by cursor but has no ORDER BY",
                    sel.id
                );
            }
            if let Some(exp) = &sel.where_ {
                exp.check_invariants();
            }
        }
        for mu in &self.mutates {
            if mu.parent_id.is_some() {
                debug_assert_ne!(
                    mu.rel.kind,
                    RelKind::None,
                    "Mutate {} has a parent but RelKind::None",
                    mu.id
                );
            }
        }
    }
}

/// A single nesting level of the query tree (a GraphQL field yielding an
/// object or list).
#[derive(Clone, Debug)]
pub struct Select {
    pub id: SelectId,
    pub parent_id: Option<SelectId>,
    pub table: TableName,
    /// The GraphQL field name (alias) this select renders under.
    pub field_name: String,
    pub fields: Vec<Field>,
    pub children: Vec<SelectId>,
    pub where_: Option<Exp>,
    pub order_by: Vec<OrderExpr>,
    pub paging: Paging,
    pub rel: Relationship,
    /// Present only for many-to-many selects; the join-table hop.
    pub joins: Vec<Join>,
    /// True when the GraphQL field is singular (object, not a list) — e.g.
    /// lookup by primary key.
    pub singular: bool,
    /// True when this select is a `__typename` meta-field.
    pub typename: bool,
    pub skip_render: SkipType,
}

/// A scalar or function field projected by a select.
#[derive(Clone, Debug)]
pub struct Field {
    pub col: ColName,
    pub field_name: String,
    pub skip: SkipType,
    /// Set when `@skip`/`@include` carries a variable condition rather than a
    /// compile-time-constant one; names the boolean static/runtime variable.
    pub skip_var: Option<String>,
}

/// Per-field/per-select directive outcome. See GLOSSARY in spec.md.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SkipType {
    /// Render normally.
    None,
    /// Omit the field entirely (`@add`/`@remove` collapsing to nothing).
    Drop,
    /// Render a literal `null` — directive resolved to constant-true.
    Nulled,
    /// Render a literal `null` — role-based access control blocked this field.
    Blocked,
    /// Render a literal `null` — caller must supply a value the compiler can't see.
    UserNeeded,
    /// Handled by an external collaborator (federation/remote join); this
    /// crate never renders it.
    Remote,
}

/// Compiles a directive outcome plus optional variable condition into the
/// dialect-agnostic decision every dialect's field hook must act on
/// identically (spec.md §4.2 Directive compilation).
#[derive(Clone, Debug, PartialEq)]
pub enum SkipDecision {
    /// Render the column normally.
    Render,
    /// Omit the field from the projection entirely.
    Drop,
    /// Render a literal `null`, no parameter involved.
    StaticNull,
    /// Render `CASE WHEN <var> THEN <col> ELSE NULL END` (or the document
    /// equivalent); the variable name becomes a registered parameter.
    ConditionalOnVar(String),
}

pub fn compile_skip(skip: SkipType, skip_var: &Option<String>) -> SkipDecision {
    match (skip, skip_var) {
        (SkipType::Drop, _) => SkipDecision::Drop,
        (SkipType::None, Some(var)) => SkipDecision::ConditionalOnVar(var.clone()),
        (SkipType::None, None) => SkipDecision::Render,
        (SkipType::Nulled, _) | (SkipType::Blocked, _) | (SkipType::UserNeeded, _) => {
            SkipDecision::StaticNull
        }
        (SkipType::Remote, _) => SkipDecision::Drop,
    }
}

#[derive(Clone, Debug, Default)]
pub struct Paging {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
    pub cursor: bool,
    /// Decoded opaque cursor token from the request, if resuming.
    pub cursor_value: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OrderDirection {
    Asc,
    Desc,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NullsOrder {
    First,
    Last,
    /// Dialect default — no explicit `NULLS FIRST|LAST` emitted.
    Default,
}

#[derive(Clone, Debug)]
pub struct OrderExpr {
    pub col: ColName,
    pub dir: OrderDirection,
    pub nulls: NullsOrder,
    /// When ordering by array position (`order_by: {_eq: [id], vals: [3,1,2]}`),
    /// the literal value list defining the position map.
    pub var_list: Option<Vec<LiteralValue>>,
    /// Declared type of this ordering column, used by `Dialect::render_cursor_cte`
    /// to cast the cursor's colon-separated text tokens back to typed seek
    /// values. `Select` carries no live schema handle (see DESIGN.md), so the
    /// type travels on the `OrderExpr` itself, filled in by the schema layer
    /// that produced this `QCode`. `None` falls back to a text comparison.
    pub col_type: Option<ColType>,
}

/// 1:1, 1:N, M:N, recursive, polymorphic, or embedded-JSON relationship,
/// resolved by the schema layer upstream.
#[derive(Clone, Debug, Default)]
pub struct Relationship {
    pub kind: RelKind,
    pub left: ColRef,
    pub right: ColRef,
    /// For `Polymorphic`: the discriminator column and the candidate tables.
    pub poly: Option<PolymorphicInfo>,
    /// For `Recursive`: which direction to walk and the connect columns.
    pub recursive: Option<RecursiveInfo>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum RelKind {
    #[default]
    None,
    OneToOne,
    OneToMany,
    ManyToMany,
    Recursive,
    Polymorphic,
    Embedded,
}

/// One side of a relationship. For `OneToOne`, `Left` is the FK side; for
/// `OneToMany`, `Left` is the PK side — this asymmetry must be preserved by
/// every dialect (spec.md §3).
#[derive(Clone, Debug, Default)]
pub struct ColRef {
    pub table: TableName,
    pub col: ColName,
    pub array: bool,
    pub primary_key: bool,
    pub foreign_key: bool,
}

#[derive(Clone, Debug)]
pub struct PolymorphicInfo {
    pub discriminator_col: ColName,
    /// (type value stored in `discriminator_col`, candidate table).
    pub variants: Vec<(String, TableName)>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RecursiveDirection {
    Parents,
    Children,
}

#[derive(Clone, Debug)]
pub struct RecursiveInfo {
    pub direction: RecursiveDirection,
    pub connect_from: ColName,
    pub connect_to: ColName,
    pub max_depth: Option<u32>,
}

/// One hop of an M:N join-table traversal.
#[derive(Clone, Debug)]
pub struct Join {
    pub table: TableName,
    pub left: ColRef,
    pub right: ColRef,
}

/// The closed operator set of spec.md §6. Every dialect must map every
/// variant or return `CompileError::Unsupported`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Op {
    Equals,
    NotEquals,
    Greater,
    GreaterOrEquals,
    Lesser,
    LesserOrEquals,
    In,
    NotIn,
    Like,
    ILike,
    NotLike,
    NotILike,
    Regex,
    IRegex,
    NotRegex,
    NotIRegex,
    And,
    Or,
    Not,
    IsNull,
    IsNotNull,
    Contains,
    ContainedIn,
    HasKey,
    HasKeyAny,
    HasKeyAll,
    HasInCommon,
    TsQuery,
    GeoDistance,
    GeoNear,
    GeoWithin,
    GeoContains,
    GeoIntersects,
    GeoCoveredBy,
    GeoCovers,
    GeoTouches,
    GeoOverlaps,
    SelectExists,
    EqualsTrue,
    NotEqualsTrue,
    Nop,
}

impl Op {
    /// Ops whose semantics require a geometry + unit (routed through
    /// `Dialect::render_geo_op` instead of `Dialect::render_op`).
    pub fn is_geo(self) -> bool {
        matches!(
            self,
            Op::GeoDistance
                | Op::GeoNear
                | Op::GeoWithin
                | Op::GeoContains
                | Op::GeoIntersects
                | Op::GeoCoveredBy
                | Op::GeoCovers
                | Op::GeoTouches
                | Op::GeoOverlaps
        )
    }

    pub fn is_logical(self) -> bool {
        matches!(self, Op::And | Op::Or | Op::Not)
    }
}

/// Left operand of a comparison: a column, optionally reached through a JSON
/// path, optionally scoped to an ancestor select (for `SelectExists` rewrites).
#[derive(Clone, Debug)]
pub struct ExpLeft {
    pub table: TableName,
    pub col: ColName,
    pub json_path: Vec<String>,
    pub parent_select: Option<SelectId>,
}

/// Right operand: a literal, a list of literals, or a reference to another column.
#[derive(Clone, Debug)]
pub enum ExpRight {
    Literal(LiteralValue),
    List(Vec<LiteralValue>),
    Column(ExpLeft),
    /// Unresolved GraphQL variable; resolved against static vars at compile
    /// time or registered as a runtime parameter.
    Variable(String),
}

#[derive(Clone, Debug, PartialEq)]
pub enum LiteralValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Json(serde_json::Value),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GeoUnit {
    Metres,
    Kilometres,
    Miles,
    Feet,
}

impl GeoUnit {
    /// Normalize any distance input to metres, per spec.md §4.2.
    pub fn to_metres(self, value: f64) -> f64 {
        match self {
            GeoUnit::Metres => value,
            GeoUnit::Kilometres => value * 1000.0,
            GeoUnit::Miles => value * 1609.344,
            GeoUnit::Feet => value * 0.3048,
        }
    }
}

#[derive(Clone, Debug)]
pub struct GeoArg {
    pub geometry: serde_json::Value,
    pub unit: GeoUnit,
    pub distance: Option<f64>,
}

/// Recursive boolean/comparison expression tree. Finite and acyclic by
/// construction upstream (spec.md §3 invariant).
#[derive(Clone, Debug)]
pub struct Exp {
    pub op: Op,
    pub left: Option<ExpLeft>,
    pub right: Option<ExpRight>,
    pub children: Vec<Exp>,
    /// Present only for `Op::SelectExists`: the join chain identifying the
    /// FK column used to rewrite the filter into a correlated/lateral form.
    pub joins: Vec<Join>,
    pub geo: Option<GeoArg>,
}

impl Exp {
    pub fn check_invariants(&self) {
        if !self.op.is_logical() && self.op != Op::Nop {
            debug_assert!(
                self.left.as_ref().map(|l| !l.col.0.is_empty()).unwrap_or(false),
                "comparison op {:?} has no Left.Col",
                self.op
            );
        }
        if self.op.is_logical() {
            debug_assert!(
                !self.children.is_empty(),
                "logical op {:?} has no children",
                self.op
            );
        }
        if self.op == Op::SelectExists {
            debug_assert!(
                !self.joins.is_empty(),
                "SelectExists has no Joins to identify the FK column"
            );
        }
        for child in &self.children {
            child.check_invariants();
        }
    }
}

/// A single table-level mutation action (insert/update/delete/upsert/connect/disconnect).
#[derive(Clone, Debug)]
pub struct Mutate {
    pub id: MutateId,
    pub parent_id: Option<MutateId>,
    pub ti: crate::schema::DBTable,
    pub rel: Relationship,
    pub cols: Vec<MutateColumn>,
    pub data: InputNode,
    pub where_: Option<Exp>,
    /// Mutation IDs this one needs already-emitted values from, derived by
    /// FK location (spec.md §4.5), not by `parent_id`.
    pub depends_on: BTreeSet<MutateId>,
    /// JSON path into the original input document this mutation's data came from.
    pub path: Vec<PathSegment>,
    /// The root select whose response shape this mutation should re-fetch.
    pub sel_id: Option<SelectId>,
    pub is_json: bool,
    pub array: bool,
    pub kind: MutateKind,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MutateKind {
    Insert,
    Update,
    Delete,
    Upsert,
    Connect,
    Disconnect,
}

#[derive(Clone, Debug)]
pub enum PathSegment {
    Key(String),
    Index(usize),
}

#[derive(Clone, Debug)]
pub struct MutateColumn {
    pub col: ColName,
    /// A server-computed/default value that overrides whatever the caller supplied.
    pub preset: Option<LiteralValue>,
    pub field_name: String,
}

/// The parsed mutation input tree (one JSON object/array/array-of-objects per
/// spec.md's `Data`/`IsJSON`/`Array` trio).
#[derive(Clone, Debug)]
pub enum InputNode {
    Object(Vec<(String, InputValue)>),
    Array(Vec<InputNode>),
}

#[derive(Clone, Debug)]
pub enum InputValue {
    Literal(LiteralValue),
    Variable(String),
    Nested(InputNode),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn skip_decision_table_matches_spec() {
        assert_eq!(compile_skip(SkipType::Drop, &None), SkipDecision::Drop);
        assert_eq!(
            compile_skip(SkipType::Nulled, &None),
            SkipDecision::StaticNull
        );
        assert_eq!(
            compile_skip(SkipType::Blocked, &None),
            SkipDecision::StaticNull
        );
        assert_eq!(
            compile_skip(SkipType::None, &Some("showEmail".into())),
            SkipDecision::ConditionalOnVar("showEmail".into())
        );
        assert_eq!(compile_skip(SkipType::None, &None), SkipDecision::Render);
    }

    #[test]
    fn geo_unit_normalizes_to_metres() {
        assert!((GeoUnit::Kilometres.to_metres(1.0) - 1000.0).abs() < 1e-9);
        assert!((GeoUnit::Miles.to_metres(1.0) - 1609.344).abs() < 1e-9);
        assert!((GeoUnit::Feet.to_metres(1.0) - 0.3048).abs() < 1e-9);
        assert!((GeoUnit::Metres.to_metres(5.0) - 5.0).abs() < 1e-9);
    }
}
