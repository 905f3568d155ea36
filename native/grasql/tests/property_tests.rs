//! spec.md §9 testable properties: parameter-ordering determinism, root
//! ordering, and cursor-token round-tripping.
use proptest::prelude::*;

use grasql::{compile, cursor, fixtures, DialectName};

proptest! {
    /// Compiling the same `QCode` twice, for the same dialect and seed,
    /// must produce byte-identical artifacts and parameter lists — the
    /// compiler is a pure function of its inputs (spec.md §5).
    #[test]
    fn compile_is_deterministic_across_runs(seed in "[a-z0-9]{1,16}") {
        let qcode = fixtures::filtered_select();
        let first = compile(&qcode, DialectName::Postgres, &seed).unwrap();
        let second = compile(&qcode, DialectName::Postgres, &seed).unwrap();
        prop_assert_eq!(first.artifact, second.artifact);
        prop_assert_eq!(
            first.params.iter().map(|p| format!("{:?}", p)).collect::<Vec<_>>(),
            second.params.iter().map(|p| format!("{:?}", p)).collect::<Vec<_>>()
        );
    }

    /// A cursor token's sel_id and colon-separated values round-trip through
    /// `strip_prefix`/`split_values` regardless of which opaque seed or
    /// numeric values were encoded into it.
    #[test]
    fn cursor_token_round_trips(
        opaque in "[a-f0-9]{6,24}",
        sel_id in 0u32..10_000,
        values in prop::collection::vec("[A-Za-z0-9_.:-]{0,12}".prop_filter("no embedded colon", |s| !s.contains(':')), 0..5),
    ) {
        let token = if values.is_empty() {
            format!("gj-{opaque}:{sel_id}")
        } else {
            format!("gj-{opaque}:{sel_id}:{}", values.join(":"))
        };
        let (parsed_id, rest) = cursor::strip_prefix(&token).unwrap();
        prop_assert_eq!(parsed_id, sel_id);
        prop_assert_eq!(cursor::split_values(rest), values);
    }
}

#[test]
fn multi_root_output_preserves_roots_order_regardless_of_select_id() {
    let mut qcode = fixtures::simple_select();
    let mut second = qcode.selects[0].clone();
    second.id = 1;
    second.table = grasql::TableName::from("orders");
    second.field_name = "orders".to_string();
    qcode.selects.push(second);
    qcode.roots = vec![1, 0];

    let out = compile(&qcode, DialectName::Postgres, "seed").unwrap();
    let orders_pos = out.artifact.find("'orders'").expect("orders key present");
    let users_pos = out.artifact.find("'users'").expect("users key present");
    assert!(orders_pos < users_pos, "roots order [1, 0] must place orders before users");
}
