//! spec.md §8 Scenario C: a nested mutation whose dependency order must
//! follow FK location, not input/`parent_id` order, and must stay stable
//! across relational dialects. The child's FK column must thread the
//! parent's captured id, not discard it.
use grasql::{compile, fixtures, DialectName, LiteralValue, ParamValue};

#[test]
fn author_is_emitted_before_the_article_that_depends_on_it() {
    let qcode = fixtures::nested_insert_mutation();
    for dialect in [DialectName::Postgres, DialectName::MySql, DialectName::Sqlite] {
        let out = compile(&qcode, dialect, "seed").unwrap();
        let authors_pos = out.artifact.find("authors").expect("authors insert present");
        let articles_pos = out.artifact.find("articles").expect("articles insert present");
        assert!(authors_pos < articles_pos, "{dialect:?}: authors must precede articles");
    }
}

#[test]
fn both_mutation_statements_are_present_and_separated() {
    let qcode = fixtures::nested_insert_mutation();
    let out = compile(&qcode, DialectName::Postgres, "seed").unwrap();
    assert_eq!(out.artifact.matches("INSERT INTO").count(), 2);
    assert!(out.artifact.contains("; "));
}

/// The FK column (`articles.author_id`) has no entry in the caller's row
/// data; it must resolve to the author mutation's captured id, not to
/// `NULL`/`preset`. This is the gap the previous version of this test let
/// through: asserting ordering alone doesn't prove the value survives.
#[test]
fn the_fk_column_threads_the_captured_parent_id_instead_of_a_null_literal() {
    let qcode = fixtures::nested_insert_mutation();
    let cases = [
        (DialectName::Postgres, "lastval()"),
        (DialectName::MySql, "LAST_INSERT_ID()"),
        (DialectName::Sqlite, "last_insert_rowid()"),
    ];
    for (dialect, captured_id_expr) in cases {
        let out = compile(&qcode, dialect, "seed").unwrap();
        assert!(
            out.artifact.contains(captured_id_expr),
            "{dialect:?}: expected {captured_id_expr} in the articles insert, got {}",
            out.artifact
        );
        assert!(
            !out.params.iter().any(|p| p.value == ParamValue::Static(LiteralValue::Null)),
            "{dialect:?}: author_id must not fall back to a NULL literal param"
        );
    }
}

#[test]
fn mssql_captures_the_generated_author_id_into_a_table_variable() {
    let qcode = fixtures::nested_insert_mutation();
    let out = compile(&qcode, DialectName::MsSql, "seed").unwrap();
    assert!(out.artifact.contains("DECLARE @mutate_0 TABLE (id BIGINT)"));
    assert!(out.artifact.contains("INSERT INTO @mutate_0 SELECT SCOPE_IDENTITY()"));
    assert!(out.artifact.contains("(SELECT id FROM @mutate_0)"));
}

/// Both mutations' own caller-supplied field values (`name`, `title`) must
/// survive as bound parameters, not get silently dropped in favor of
/// `preset`/`NULL`.
#[test]
fn caller_supplied_row_data_is_bound_as_parameters_on_every_relational_dialect() {
    let qcode = fixtures::nested_insert_mutation();
    for dialect in [DialectName::Postgres, DialectName::MySql, DialectName::Sqlite, DialectName::MsSql] {
        let out = compile(&qcode, dialect, "seed").unwrap();
        let has_value = |want: &str| {
            out.params.iter().any(|p| {
                matches!(&p.value, ParamValue::Static(LiteralValue::Str(s)) if s == want)
            })
        };
        assert!(has_value("Ada"), "{dialect:?}: author name must be bound");
        assert!(has_value("Hello"), "{dialect:?}: article title must be bound");
    }
}

#[test]
fn mongo_threads_the_author_id_through_fk_values_instead_of_a_literal() {
    let qcode = fixtures::nested_insert_mutation();
    let out = compile(&qcode, DialectName::MongoDb, "seed").unwrap();
    let doc: serde_json::Value = serde_json::from_str(&out.artifact).unwrap();
    assert_eq!(doc["operation"], "multi_mutation");
    let stages = doc["operations"].as_array().expect("multi_mutation carries an operations list");
    assert_eq!(stages.len(), 2);

    let author = &stages[0];
    assert_eq!(author["collection"], "authors");
    assert_eq!(author["document"]["name"], "Ada");

    let article = &stages[1];
    assert_eq!(article["collection"], "articles");
    assert_eq!(article["document"]["title"], "Hello");
    assert!(
        article["document"].get("author_id").is_none(),
        "author_id must not be written as a literal field; it is only known once authors runs"
    );
    assert_eq!(article["fk_values"]["author_id"]["depends_on"], 0);
}
