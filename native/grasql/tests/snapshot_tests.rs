//! Snapshot coverage of one representative artifact per dialect family,
//! pinning the exact rendered shape so an accidental change in hook wiring
//! shows up as a diff instead of silently changing behavior.
use grasql::{compile, fixtures, DialectName};

#[test]
fn postgres_simple_select_snapshot() {
    let out = compile(&fixtures::simple_select(), DialectName::Postgres, "snap").unwrap();
    insta::assert_snapshot!(out.artifact);
}

#[test]
fn mongo_simple_select_snapshot() {
    let out = compile(&fixtures::simple_select(), DialectName::MongoDb, "snap").unwrap();
    let pretty = serde_json::to_string_pretty(&serde_json::from_str::<serde_json::Value>(&out.artifact).unwrap()).unwrap();
    insta::assert_snapshot!(pretty);
}

#[test]
fn mssql_cursor_query_snapshot() {
    let out = compile(&fixtures::one_to_many_with_cursor(), DialectName::MsSql, "snap").unwrap();
    insta::assert_snapshot!(out.artifact);
}
