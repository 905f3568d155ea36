//! spec.md §8 Scenario B (document-store) plus the MongoDB DSL's bit-exact
//! key names and ordering guarantees from §4.4.
use grasql::{compile, fixtures, DialectName, SkipType};
use serde_json::Value;

#[test]
fn single_root_query_carries_operation_and_field_name() {
    let qcode = fixtures::simple_select();
    let out = compile(&qcode, DialectName::MongoDb, "seed").unwrap();
    let doc: Value = serde_json::from_str(&out.artifact).unwrap();
    assert_eq!(doc["operation"], "aggregate");
    assert_eq!(doc["collection"], "users");
    assert_eq!(doc["field_name"], "users");
    assert!(doc["pipeline"].is_array());
}

#[test]
fn multi_root_preserves_roots_order_as_an_array() {
    let mut qcode = fixtures::simple_select();
    let mut second = qcode.selects[0].clone();
    second.id = 1;
    second.table = grasql::TableName::from("orders");
    second.field_name = "orders".to_string();
    qcode.selects.push(second);
    qcode.roots = vec![1, 0];

    let out = compile(&qcode, DialectName::MongoDb, "seed").unwrap();
    let doc: Value = serde_json::from_str(&out.artifact).unwrap();
    assert_eq!(doc["operation"], "multi_aggregate");
    let queries = doc["queries"].as_array().unwrap();
    assert_eq!(queries.len(), 2);
    assert_eq!(queries[0]["field_name"], "orders");
    assert_eq!(queries[1]["field_name"], "users");
}

#[test]
fn skipped_root_renders_null_operation() {
    let mut qcode = fixtures::simple_select();
    qcode.selects[0].skip_render = SkipType::Blocked;
    let out = compile(&qcode, DialectName::MongoDb, "seed").unwrap();
    let doc: Value = serde_json::from_str(&out.artifact).unwrap();
    assert_eq!(doc["operation"], "null");
    assert_eq!(doc["field_name"], "users");
    assert!(doc.get("pipeline").is_none());
}

#[test]
fn cursor_paging_select_projects_outbound_helper_fields() {
    let qcode = fixtures::one_to_many_with_cursor();
    let out = compile(&qcode, DialectName::MongoDb, "seed").unwrap();
    let doc: Value = serde_json::from_str(&out.artifact).unwrap();
    let project = doc["pipeline"]
        .as_array()
        .unwrap()
        .iter()
        .find(|s| s.get("$project").is_some())
        .expect("a $project stage");
    assert!(project["$project"].get("__cursor_created_at").is_some());
    assert!(project["$project"].get("__cursor_id").is_some());
}

#[test]
fn mutation_return_pipeline_mirrors_the_query_shape() {
    let mut qcode = fixtures::nested_insert_mutation();
    let select_qcode = fixtures::simple_select();
    qcode.selects = select_qcode.selects.clone();
    qcode.mutates[1].sel_id = Some(0);

    let out = compile(&qcode, DialectName::MongoDb, "seed").unwrap();
    let doc: Value = serde_json::from_str(&out.artifact).unwrap();
    assert_eq!(doc["operation"], "multi_mutation");
    let ops = doc["operations"].as_array().unwrap();
    let with_return = ops.iter().find(|o| o.get("return_pipeline").is_some());
    assert!(with_return.is_some());
}
