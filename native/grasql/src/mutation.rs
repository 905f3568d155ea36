//! Mutation dependency resolution (spec.md §4.5).
//!
//! Every mutation node starts `Pending`. A node becomes `Ready` once every
//! node in its `depends_on` set (derived upstream by FK-location, not by
//! `parent_id`) is `Emitted`. Ties break by ascending `MutateId`. If no
//! `Pending` node can progress — `depends_on` forms a cycle — the remaining
//! nodes emit in input order; spec.md §9 Open Question 2 calls this "a
//! correctness compromise", so the fallback logs instead of failing silently.
use tracing::warn;

use crate::types::{InputNode, InputValue, LiteralValue, Mutate, MutateColumn, MutateId, QCode, RelKind};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum State {
    Pending,
    Ready,
    Emitted,
}

/// Returns mutation IDs in an order that satisfies every `depends_on`
/// constraint it can, falling back to input order for the remainder if a
/// cycle prevents further progress.
pub fn topological_order(mutates: &[Mutate]) -> Vec<MutateId> {
    let mut state = vec![State::Pending; mutates.len()];
    let mut order = Vec::with_capacity(mutates.len());
    let emitted = |id: MutateId, state: &[State]| state[id as usize] == State::Emitted;

    loop {
        let mut progressed = false;
        // Stable order by MutateId: iterate ascending, not by discovery order.
        for mu in mutates {
            let idx = mu.id as usize;
            if state[idx] != State::Pending {
                continue;
            }
            let ready = mu.depends_on.iter().all(|dep| emitted(*dep, &state));
            if ready {
                state[idx] = State::Ready;
                state[idx] = State::Emitted;
                order.push(mu.id);
                progressed = true;
            }
        }
        if order.len() == mutates.len() {
            break;
        }
        if !progressed {
            let stuck: Vec<MutateId> = mutates
                .iter()
                .filter(|m| state[m.id as usize] == State::Pending)
                .map(|m| m.id)
                .collect();
            warn!(
                ?stuck,
                "mutation dependency cycle detected; falling back to input order for remaining nodes"
            );
            for mu in mutates {
                if state[mu.id as usize] == State::Pending {
                    order.push(mu.id);
                }
            }
            break;
        }
    }
    order
}

/// What a mutation column's emitted value actually is: a caller literal, a
/// runtime variable reference, or a value only known once a `depends_on`
/// mutation has run (spec.md §4.4/§4.5 FK-location threading).
#[derive(Clone, Debug)]
pub enum ResolvedValue {
    Literal(LiteralValue),
    Variable(String),
    /// This column holds the FK side of `mu.rel`; the value is the generated
    /// id of the dependency mutation, not anything the caller supplied.
    DependsOn(MutateId),
}

/// Resolves what `col` should render as: an FK threaded from an already-
/// ordered dependency first, then the caller's row data (`mu.data`, looked up
/// by `field_name`), falling back to `preset` only when neither is present.
pub fn resolve_column_value(qcode: &QCode, mu: &Mutate, col: &MutateColumn) -> ResolvedValue {
    if let Some(dep_id) = fk_dependency_for(qcode, mu, col) {
        return ResolvedValue::DependsOn(dep_id);
    }
    if let Some(value) = lookup_input(&mu.data, &col.field_name) {
        return value;
    }
    ResolvedValue::Literal(col.preset.clone().unwrap_or(LiteralValue::Null))
}

fn fk_dependency_for(qcode: &QCode, mu: &Mutate, col: &MutateColumn) -> Option<MutateId> {
    let rel = &mu.rel;
    if rel.kind == RelKind::None {
        return None;
    }
    let (fk, other_table) = if rel.left.foreign_key && rel.left.table == mu.ti.name {
        (&rel.left, &rel.right.table)
    } else if rel.right.foreign_key && rel.right.table == mu.ti.name {
        (&rel.right, &rel.left.table)
    } else {
        return None;
    };
    if fk.col != col.col {
        return None;
    }
    mu.depends_on
        .iter()
        .copied()
        .find(|&dep| qcode.mutate(dep).ti.name == *other_table)
}

fn lookup_input(data: &InputNode, field_name: &str) -> Option<ResolvedValue> {
    match data {
        InputNode::Object(fields) => fields.iter().find(|(k, _)| k == field_name).and_then(|(_, v)| match v {
            InputValue::Literal(lit) => Some(ResolvedValue::Literal(lit.clone())),
            InputValue::Variable(name) => Some(ResolvedValue::Variable(name.clone())),
            InputValue::Nested(_) => None,
        }),
        // Bulk mutations carry one `InputNode` per row upstream; a single
        // `Mutate` node here still renders one statement, so the first row
        // stands in for column-shape lookups (spec.md §4.4 Array mutations).
        InputNode::Array(items) => items.first().and_then(|item| lookup_input(item, field_name)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::DBTable;
    use crate::types::{ColRef, InputNode, MutateKind, OperationType, Relationship};
    use std::collections::BTreeSet;

    fn mutate(id: MutateId, depends_on: &[MutateId]) -> Mutate {
        Mutate {
            id,
            parent_id: None,
            ti: DBTable {
                schema: None,
                name: format!("t{id}").as_str().into(),
                columns: vec![],
                primary_col: None,
                full_text: vec![],
                orig_name: None,
                orig_schema: None,
            },
            rel: Relationship::default(),
            cols: vec![],
            data: InputNode::Object(vec![]),
            where_: None,
            depends_on: depends_on.iter().copied().collect::<BTreeSet<_>>(),
            path: vec![],
            sel_id: None,
            is_json: false,
            array: false,
            kind: MutateKind::Insert,
        }
    }

    #[test]
    fn dependencies_emit_before_dependents() {
        // child (1) depends on parent (0): FK lives on child.
        let mutates = vec![mutate(0, &[]), mutate(1, &[0])];
        assert_eq!(topological_order(&mutates), vec![0, 1]);
    }

    #[test]
    fn reverse_fk_location_still_orders_by_depends_on() {
        // parent (0) depends on child (1): FK lives on parent, so the child
        // (holding the value the parent needs) must emit first even though
        // it is nested under the parent in the GraphQL input.
        let mutates = vec![mutate(0, &[1]), mutate(1, &[])];
        assert_eq!(topological_order(&mutates), vec![1, 0]);
    }

    #[test]
    fn cycle_falls_back_to_input_order() {
        let mutates = vec![mutate(0, &[1]), mutate(1, &[0])];
        assert_eq!(topological_order(&mutates), vec![0, 1]);
    }

    #[test]
    fn ties_break_by_ascending_mutate_id() {
        let mutates = vec![mutate(0, &[]), mutate(1, &[]), mutate(2, &[])];
        assert_eq!(topological_order(&mutates), vec![0, 1, 2]);
    }

    fn qcode(mutates: Vec<Mutate>) -> QCode {
        QCode {
            ty: crate::types::OperationType::Mutation,
            name: None,
            typename: None,
            action_var: None,
            roots: vec![],
            selects: vec![],
            mutates,
        }
    }

    fn col(field_name: &str) -> MutateColumn {
        MutateColumn {
            col: field_name.into(),
            preset: None,
            field_name: field_name.to_string(),
        }
    }

    #[test]
    fn resolve_prefers_callers_row_data_over_preset() {
        let mut mu = mutate(0, &[]);
        mu.data = InputNode::Object(vec![(
            "name".to_string(),
            InputValue::Literal(LiteralValue::Str("Ada".to_string())),
        )]);
        let column = MutateColumn {
            col: "name".into(),
            preset: Some(LiteralValue::Str("default".to_string())),
            field_name: "name".to_string(),
        };
        let qc = qcode(vec![mu.clone()]);
        match resolve_column_value(&qc, &mu, &column) {
            ResolvedValue::Literal(LiteralValue::Str(s)) => assert_eq!(s, "Ada"),
            other => panic!("expected caller literal, got {other:?}"),
        }
    }

    #[test]
    fn resolve_falls_back_to_preset_when_data_is_absent() {
        let mu = mutate(0, &[]);
        let column = MutateColumn {
            col: "status".into(),
            preset: Some(LiteralValue::Str("pending".to_string())),
            field_name: "status".to_string(),
        };
        let qc = qcode(vec![mu.clone()]);
        match resolve_column_value(&qc, &mu, &column) {
            ResolvedValue::Literal(LiteralValue::Str(s)) => assert_eq!(s, "pending"),
            other => panic!("expected preset fallback, got {other:?}"),
        }
    }

    #[test]
    fn resolve_threads_fk_from_a_depends_on_mutation() {
        let parent = mutate(0, &[]);
        let mut child = mutate(1, &[0]);
        child.rel = Relationship {
            kind: RelKind::OneToMany,
            left: ColRef {
                table: "t0".into(),
                col: "id".into(),
                array: false,
                primary_key: true,
                foreign_key: false,
            },
            right: ColRef {
                table: "t1".into(),
                col: "parent_id".into(),
                array: false,
                primary_key: false,
                foreign_key: true,
            },
            poly: None,
            recursive: None,
        };
        let qc = qcode(vec![parent, child.clone()]);
        let column = col("parent_id");
        match resolve_column_value(&qc, &child, &column) {
            ResolvedValue::DependsOn(0) => {}
            other => panic!("expected DependsOn(0), got {other:?}"),
        }
    }
}
