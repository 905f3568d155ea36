//! MongoDB: a full-custom dialect producing the JSON aggregation/mutation
//! DSL this crate hands to the execution runtime, never SQL text. Built
//! entirely as `serde_json::Value` trees (this crate already depends on
//! `serde_json` for literal values, so the document DSL reuses it too
//! rather than hand-formatting JSON strings) and serialized into the
//! `EmitContext` buffer at the end. Never touches the generic walker.
use serde_json::{json, Value};

use crate::config::DialectConfig;
use crate::emit::{EmitContext, ParamStyle};
use crate::error::{CompileError, Result};
use crate::registry::DialectName;
use crate::types::{
    Exp, ExpLeft, ExpRight, GeoArg, Join, LiteralValue, Mutate, MutateId, MutateKind, Op, QCode,
    RelKind, Select, SelectId,
};

use super::Dialect;

pub struct MongoDialect {
    config: DialectConfig,
}

impl MongoDialect {
    pub fn new(config: DialectConfig) -> Self {
        MongoDialect { config }
    }
}

impl Dialect for MongoDialect {
    fn name(&self) -> DialectName {
        DialectName::MongoDb
    }
    fn config(&self) -> &DialectConfig {
        &self.config
    }
    fn quote_char(&self) -> char {
        '"'
    }
    fn param_style(&self) -> ParamStyle {
        // Never used: Mongo literals are embedded as typed JSON values
        // directly in the pipeline document, not as textual placeholders.
        ParamStyle::Question
    }

    fn json_object_fn(&self) -> &'static str {
        unreachable!("MongoDialect never calls the generic walker's JSON helpers")
    }
    fn json_array_agg_fn(&self) -> &'static str {
        unreachable!("MongoDialect never calls the generic walker's JSON helpers")
    }
    fn empty_json_array_literal(&self) -> &'static str {
        unreachable!("MongoDialect never calls the generic walker's JSON helpers")
    }

    fn render_op(
        &self,
        _ctx: &mut EmitContext<'_>,
        op: Op,
        _left: &ExpLeft,
        _right: Option<&ExpRight>,
        _joins: &[Join],
    ) -> Result<()> {
        Err(CompileError::Unsupported {
            dialect: self.name(),
            op,
        })
    }

    fn render_geo_op(&self, _ctx: &mut EmitContext<'_>, op: Op, _left: &ExpLeft, _geo: &GeoArg) -> Result<()> {
        Err(CompileError::Unsupported {
            dialect: self.name(),
            op,
        })
    }

    fn render_lateral_join(&self, _ctx: &mut EmitContext<'_>, _qcode: &QCode, _child: SelectId) -> Result<()> {
        unreachable!("MongoDialect::compile_full_query always handles relationships, never the generic walker")
    }
    fn render_inline_child(&self, _ctx: &mut EmitContext<'_>, _qcode: &QCode, _child: SelectId) -> Result<()> {
        unreachable!("MongoDialect::compile_full_query always handles relationships, never the generic walker")
    }

    fn nth_cursor_token(&self, _expr: &str, _n: usize) -> String {
        unreachable!("MongoDialect never renders the generic walker's cursor CTE — cursor tokens are unpacked at execution time via __cursor_<col> helper projections")
    }

    fn render_mutation(&self, _ctx: &mut EmitContext<'_>, _qcode: &QCode, mu: &Mutate) -> Result<()> {
        Err(CompileError::Invalid(format!(
            "mutate {} must be rendered via compile_full_mutation, not Dialect::render_mutation",
            mu.id
        )))
    }

    fn compile_full_query(&self, ctx: &mut EmitContext<'_>, qcode: &QCode) -> Option<Result<()>> {
        Some((|| {
            let doc = match qcode.roots.as_slice() {
                [] => Value::Null,
                [single] => build_root_query(qcode, *single)?,
                many => {
                    // `Roots` order is the caller-observable ordering guarantee
                    // (spec.md §4 "Ordering guarantees"); a Vec preserves it
                    // without depending on serde_json's preserve_order feature.
                    let queries = many
                        .iter()
                        .map(|&root| build_root_query(qcode, root))
                        .collect::<Result<Vec<_>>>()?;
                    json!({ "operation": "multi_aggregate", "queries": queries })
                }
            };
            ctx.push_str(&doc.to_string());
            Ok(())
        })())
    }

    fn compile_full_mutation(&self, ctx: &mut EmitContext<'_>, qcode: &QCode) -> Option<Result<()>> {
        Some((|| {
            let order = crate::mutation::topological_order(&qcode.mutates);
            let mut docs = Vec::with_capacity(order.len());
            for id in order {
                let mu = qcode.mutate(id);
                ctx.mark_mutated(mu.ti.name.clone());
                docs.push(build_mutation_doc(qcode, mu)?);
            }
            let doc = if docs.len() == 1 {
                docs.into_iter().next().unwrap()
            } else {
                json!({ "operation": "multi_mutation", "operations": docs })
            };
            ctx.push_str(&doc.to_string());
            Ok(())
        })())
    }
}

/// Builds one root's query document, or the `{"operation":"null",...}`
/// shape when a directive skipped the whole branch (spec.md §4.4).
fn build_root_query(qcode: &QCode, sel_id: SelectId) -> Result<Value> {
    let sel = qcode.select(sel_id);
    if sel.skip_render != crate::types::SkipType::None {
        return Ok(json!({ "operation": "null", "field_name": sel.field_name }));
    }
    let pipeline = build_pipeline(qcode, sel_id)?;
    Ok(json!({
        "operation": "aggregate",
        "collection": sel.table.0,
        "singular": sel.singular,
        "field_name": sel.field_name,
        "pipeline": pipeline,
    }))
}

fn build_pipeline(qcode: &QCode, sel_id: SelectId) -> Result<Vec<Value>> {
    let sel = qcode.select(sel_id);
    let mut stages = Vec::new();

    // A geo-near predicate must land in the pipeline's first stage; since
    // `where_`, when present, is always pushed as the one and only `$match`
    // stage before any `$lookup`, this holds by construction rather than by
    // a later reorder (a reorder would change query semantics a caller
    // didn't ask for).
    if let Some(where_) = &sel.where_ {
        stages.push(json!({ "$match": build_match(where_)? }));
        debug_assert_eq!(stages.len(), 1, "geo-near predicate must compile to pipeline stage 0");
    }

    for &child in &sel.children {
        stages.extend(build_lookup_stages(qcode, sel_id, child)?);
    }

    if !sel.order_by.is_empty() {
        let mut sort = serde_json::Map::new();
        for o in &sel.order_by {
            let dir = match o.dir {
                crate::types::OrderDirection::Asc => 1,
                crate::types::OrderDirection::Desc => -1,
            };
            sort.insert(o.col.0.clone(), json!(dir));
        }
        stages.push(json!({ "$sort": Value::Object(sort) }));
    }
    if let Some(offset) = sel.paging.offset {
        stages.push(json!({ "$skip": offset }));
    }
    if let Some(limit) = sel.paging.limit {
        stages.push(json!({ "$limit": limit }));
    }

    let projection = build_projection(qcode, sel);
    stages.push(json!({ "$project": projection }));

    Ok(stages)
}

fn build_projection(qcode: &QCode, sel: &Select) -> Value {
    let mut fields = serde_json::Map::new();
    for field in &sel.fields {
        let decision = crate::types::compile_skip(field.skip, &field.skip_var);
        use crate::types::SkipDecision::*;
        let expr = match decision {
            Render => json!(format!("${}", field.col.0)),
            Drop => continue,
            StaticNull => Value::Null,
            ConditionalOnVar(var) => json!({
                "$cond": [format!("${}", var), format!("${}", field.col.0), Value::Null]
            }),
        };
        fields.insert(field.field_name.clone(), expr);
    }
    for &child in &sel.children {
        // Child shape was already written into its lookup alias field (the
        // child's own field_name) by `build_lookup_stages`'s `as`; keying the
        // projection by the numeric SelectId instead would reference a field
        // that doesn't exist in the document.
        let child_sel = qcode.select(child);
        fields.insert(child_sel.field_name.clone(), json!(1));
    }
    if sel.paging.cursor {
        for o in &sel.order_by {
            fields.insert(crate::cursor::outbound_key(o), json!(format!("${}", o.col.0)));
        }
    }
    Value::Object(fields)
}

/// Relationship → lookup-stage dispatch: embedded (no stage, value already
/// lives on the parent document), polymorphic (lookup filtered to the
/// discriminator's variant table), recursive (`$graphLookup`), many-to-many
/// (join-collection hop), and one-to-one/one-to-many (`$lookup`).
fn build_lookup_stages(qcode: &QCode, _parent: SelectId, child: SelectId) -> Result<Vec<Value>> {
    let sel = qcode.select(child);
    match sel.rel.kind {
        RelKind::Embedded => Ok(vec![]),
        RelKind::Recursive => {
            let rec = sel
                .rel
                .recursive
                .as_ref()
                .expect("Recursive relationship must carry RecursiveInfo");
            Ok(vec![json!({
                "$graphLookup": {
                    "from": sel.table.0,
                    "startWith": format!("${}", rec.connect_from.0),
                    "connectFromField": rec.connect_from.0,
                    "connectToField": rec.connect_to.0,
                    "as": sel.field_name,
                    "maxDepth": rec.max_depth,
                }
            })])
        }
        RelKind::ManyToMany => {
            let join = sel.joins.first();
            let mut stages = Vec::new();
            if let Some(join) = join {
                stages.push(json!({
                    "$lookup": {
                        "from": join.table.0,
                        "localField": sel.rel.left.col.0,
                        "foreignField": join.left.col.0,
                        "as": "__join",
                    }
                }));
                stages.push(json!({ "$unwind": "$__join" }));
                stages.push(json!({
                    "$lookup": {
                        "from": sel.table.0,
                        "localField": format!("__join.{}", join.right.col.0),
                        "foreignField": sel.rel.right.col.0,
                        "as": sel.field_name,
                    }
                }));
            }
            Ok(stages)
        }
        RelKind::Polymorphic => {
            let poly = sel
                .rel
                .poly
                .as_ref()
                .expect("Polymorphic relationship must carry PolymorphicInfo");
            let variant = poly
                .variants
                .iter()
                .find(|(_, t)| *t == sel.table)
                .map(|(v, _)| v.clone())
                .unwrap_or_default();
            Ok(vec![
                json!({
                    "$lookup": {
                        "from": sel.table.0,
                        "localField": sel.rel.left.col.0,
                        "foreignField": sel.rel.right.col.0,
                        "as": sel.field_name,
                    }
                }),
                json!({ "$match": { format!("{}.{}", sel.field_name, poly.discriminator_col.0): variant } }),
            ])
        }
        _ => Ok(vec![json!({
            "$lookup": {
                "from": sel.table.0,
                "localField": sel.rel.left.col.0,
                "foreignField": sel.rel.right.col.0,
                "as": sel.field_name,
            }
        })]),
    }
}

/// Translates a boolean/comparison expression tree into a MongoDB query
/// document. `SelectExists` has no direct Mongo equivalent — it is a
/// recoverable `Unsupported` rather than an approximation.
fn build_match(exp: &Exp) -> Result<Value> {
    match exp.op {
        Op::And => Ok(json!({ "$and": collect(exp)? })),
        Op::Or => Ok(json!({ "$or": collect(exp)? })),
        Op::Not => Ok(json!({ "$nor": collect(exp)? })),
        Op::Nop => Ok(json!({})),
        Op::SelectExists => Err(CompileError::Unsupported {
            dialect: DialectName::MongoDb,
            op: exp.op,
        }),
        _ if exp.op.is_geo() => build_geo_match(exp),
        _ => {
            let left = exp.left.as_ref().expect("comparison Exp must carry Left");
            let path = json_path(left);
            let value = build_operator(exp.op, exp.right.as_ref())?;
            Ok(json!({ path: value }))
        }
    }
}

fn collect(exp: &Exp) -> Result<Vec<Value>> {
    exp.children.iter().map(build_match).collect()
}

fn json_path(left: &ExpLeft) -> String {
    if left.json_path.is_empty() {
        left.col.0.clone()
    } else {
        format!("{}.{}", left.col.0, left.json_path.join("."))
    }
}

fn build_operator(op: Op, right: Option<&ExpRight>) -> Result<Value> {
    let rv = right.map(right_to_value);
    let value = match op {
        Op::Equals => rv.unwrap_or(Value::Null),
        Op::NotEquals => json!({ "$ne": rv.unwrap_or(Value::Null) }),
        Op::Greater => json!({ "$gt": rv.unwrap_or(Value::Null) }),
        Op::GreaterOrEquals => json!({ "$gte": rv.unwrap_or(Value::Null) }),
        Op::Lesser => json!({ "$lt": rv.unwrap_or(Value::Null) }),
        Op::LesserOrEquals => json!({ "$lte": rv.unwrap_or(Value::Null) }),
        Op::In => json!({ "$in": rv.unwrap_or(Value::Null) }),
        Op::NotIn => json!({ "$nin": rv.unwrap_or(Value::Null) }),
        Op::Like => json!({ "$regex": rv.unwrap_or(Value::Null) }),
        Op::ILike => json!({ "$regex": rv.unwrap_or(Value::Null), "$options": "i" }),
        Op::NotLike => json!({ "$not": { "$regex": rv.unwrap_or(Value::Null) } }),
        Op::NotILike => json!({ "$not": { "$regex": rv.unwrap_or(Value::Null), "$options": "i" } }),
        Op::Regex => json!({ "$regex": rv.unwrap_or(Value::Null) }),
        Op::IRegex => json!({ "$regex": rv.unwrap_or(Value::Null), "$options": "i" }),
        Op::NotRegex => json!({ "$not": { "$regex": rv.unwrap_or(Value::Null) } }),
        Op::NotIRegex => json!({ "$not": { "$regex": rv.unwrap_or(Value::Null), "$options": "i" } }),
        Op::IsNull => json!(Value::Null),
        Op::IsNotNull => json!({ "$ne": Value::Null }),
        Op::Contains => json!({ "$all": rv.unwrap_or(Value::Null) }),
        Op::ContainedIn => json!({ "$in": rv.unwrap_or(Value::Null) }),
        Op::HasKey => json!({ "$exists": true }),
        Op::HasKeyAny => json!({ "$in": rv.unwrap_or(Value::Null) }),
        Op::HasKeyAll => json!({ "$all": rv.unwrap_or(Value::Null) }),
        Op::HasInCommon => json!({ "$elemMatch": { "$in": rv.unwrap_or(Value::Null) } }),
        Op::TsQuery => json!({ "$text": { "$search": rv.unwrap_or(Value::Null) } }),
        Op::EqualsTrue => json!(true),
        Op::NotEqualsTrue => json!({ "$ne": true }),
        _ => {
            return Err(CompileError::Unsupported {
                dialect: DialectName::MongoDb,
                op,
            })
        }
    };
    Ok(value)
}

fn build_geo_match(exp: &Exp) -> Result<Value> {
    let geo = exp.geo.as_ref().expect("geo op must carry a Geo argument");
    let metres = geo.distance.map(|d| geo.unit.to_metres(d));
    let geometry = geo.geometry.clone();
    let value = match exp.op {
        Op::GeoWithin | Op::GeoCoveredBy => json!({ "$geoWithin": { "$geometry": geometry } }),
        Op::GeoIntersects => json!({ "$geoIntersects": { "$geometry": geometry } }),
        Op::GeoDistance | Op::GeoNear => json!({
            "$near": { "$geometry": geometry, "$maxDistance": metres }
        }),
        _ => {
            return Err(CompileError::Unsupported {
                dialect: DialectName::MongoDb,
                op: exp.op,
            })
        }
    };
    let left = exp.left.as_ref().expect("geo Exp must carry Left");
    Ok(json!({ json_path(left): value }))
}

fn right_to_value(right: &ExpRight) -> Value {
    match right {
        ExpRight::Literal(v) => literal_to_value(v),
        ExpRight::List(vs) => Value::Array(vs.iter().map(literal_to_value).collect()),
        ExpRight::Column(col) => json!(format!("${}", col.col.0)),
        ExpRight::Variable(name) => json!(format!("${}", name)),
    }
}

fn literal_to_value(v: &LiteralValue) -> Value {
    match v {
        LiteralValue::Null => Value::Null,
        LiteralValue::Bool(b) => json!(b),
        LiteralValue::Int(i) => json!(i),
        LiteralValue::Float(f) => json!(f),
        LiteralValue::Str(s) => json!(s),
        LiteralValue::Json(j) => j.clone(),
    }
}

/// What `build_mutation_doc` did with one column while building `fields`:
/// either wrote a value straight into the document, or deferred it because
/// the value isn't known until a dependency mutation runs.
enum ColumnPlacement {
    Field(String, Value),
    FkValue(String, MutateId),
    ConnectColumn(String),
}

fn resolve_mongo_column(qcode: &QCode, mu: &Mutate, col: &crate::types::MutateColumn) -> ColumnPlacement {
    match crate::mutation::resolve_column_value(qcode, mu, col) {
        crate::mutation::ResolvedValue::Literal(v) => ColumnPlacement::Field(col.col.0.clone(), literal_to_value(&v)),
        crate::mutation::ResolvedValue::Variable(name) => {
            ColumnPlacement::Field(col.col.0.clone(), json!(format!("${}", name)))
        }
        crate::mutation::ResolvedValue::DependsOn(dep_id) => {
            // The real value isn't known until the dependency's insert
            // executes; array-valued FKs (M:N-style connects) get a
            // `connect_column` directive naming the field to append the
            // generated id to instead, since there is no scalar to splice in.
            if mu.rel.left.array || mu.rel.right.array {
                ColumnPlacement::ConnectColumn(col.col.0.clone())
            } else {
                ColumnPlacement::FkValue(col.col.0.clone(), dep_id)
            }
        }
    }
}

fn build_mutation_doc(qcode: &QCode, mu: &Mutate) -> Result<Value> {
    let mut fields = serde_json::Map::new();
    let mut fk_values = serde_json::Map::new();
    let mut connect_column: Option<String> = None;
    for col in &mu.cols {
        match resolve_mongo_column(qcode, mu, col) {
            ColumnPlacement::Field(key, value) => {
                fields.insert(key, value);
            }
            ColumnPlacement::FkValue(key, dep_id) => {
                // Executor substitutes the dependency's generated `_id` here
                // once that prior operation has actually run (spec.md §4.4
                // "fk_values map merged into the root document").
                fk_values.insert(key, json!({ "depends_on": dep_id }));
            }
            ColumnPlacement::ConnectColumn(key) => {
                connect_column = Some(key);
            }
        }
    }
    let op = match mu.kind {
        MutateKind::Insert => {
            if mu.array {
                "insertMany"
            } else {
                "insertOne"
            }
        }
        MutateKind::Update => {
            if mu.array {
                "updateMany"
            } else {
                "updateOne"
            }
        }
        MutateKind::Delete => "deleteOne",
        MutateKind::Upsert => "upsert",
        MutateKind::Connect => "nested_insert",
        MutateKind::Disconnect => "nested_update",
    };
    let mut doc = serde_json::Map::new();
    doc.insert("operation".into(), json!(op));
    doc.insert("collection".into(), json!(mu.ti.name.0));
    doc.insert("document".into(), Value::Object(fields));
    if !fk_values.is_empty() {
        doc.insert("fk_values".into(), Value::Object(fk_values));
    }
    if let Some(col) = connect_column {
        doc.insert("connect_column".into(), json!(col));
    }
    if let Some(where_) = &mu.where_ {
        doc.insert("filter".into(), build_match(where_)?);
    }
    // Mirrors the query shape so the executor can re-fetch the mutated row
    // in the caller's requested response shape (spec.md §4.4 "Mutation").
    if let Some(sel_id) = mu.sel_id {
        doc.insert("return_pipeline".into(), Value::Array(build_pipeline(qcode, sel_id)?));
    }
    Ok(Value::Object(doc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DialectVersion, NameCase};

    fn config() -> DialectConfig {
        DialectConfig {
            name_case: NameCase::Preserve,
            version: DialectVersion { major: 6, minor: 0 },
            camel_case_fields: true,
            supports_lateral_joins: false,
            supports_returning: false,
            supports_writable_cte: false,
            supports_native_upsert: false,
            supports_recursive_cte: false,
            linear_execution: false,
        }
    }

    #[test]
    fn build_operator_maps_equals_to_bare_value() {
        let right = ExpRight::Literal(LiteralValue::Int(5));
        let v = build_operator(Op::Equals, Some(&right)).unwrap();
        assert_eq!(v, json!(5));
    }

    #[test]
    fn build_operator_rejects_select_exists_via_match() {
        let exp = Exp {
            op: Op::SelectExists,
            left: Some(ExpLeft {
                table: "posts".into(),
                col: "author_id".into(),
                json_path: vec![],
                parent_select: None,
            }),
            right: None,
            children: vec![],
            joins: vec![Join {
                table: "users".into(),
                left: Default::default(),
                right: Default::default(),
            }],
            geo: None,
        };
        assert!(build_match(&exp).is_err());
    }

    #[test]
    fn render_op_is_always_unsupported_on_mongo_dialect_trait() {
        let d = MongoDialect::new(config());
        let cfg = d.config().clone();
        let mut ctx = EmitContext::new(&cfg, ParamStyle::Question, "seed");
        let left = ExpLeft {
            table: "users".into(),
            col: "id".into(),
            json_path: vec![],
            parent_select: None,
        };
        assert!(d.render_op(&mut ctx, Op::Equals, &left, None, &[]).is_err());
    }
}
