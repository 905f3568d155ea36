//! spec.md §8 Scenario A: one root with a 1:N child, cursor-paged. Exercises
//! the generic walker across the three dialects that share it, plus MSSQL's
//! full-custom path wired to carry the same cursor CTE/seek-predicate/helper
//! fields through `compile_full_query`.
use grasql::{compile, fixtures, DialectName};

#[test]
fn postgres_emits_cursor_cte_and_split_part() {
    let qcode = fixtures::one_to_many_with_cursor();
    let out = compile(&qcode, DialectName::Postgres, "seed").unwrap();
    assert!(out.artifact.starts_with("WITH __cursor_seek_1"));
    assert!(out.artifact.contains("split_part"));
    assert!(out.artifact.contains("__cursor_created_at"));
    assert!(out.artifact.contains("__cursor_id"));
    assert_eq!(out.cursors.len(), 1);
    assert_eq!(out.cursors[0].sel_id, 1);
}

#[test]
fn mysql_emits_substring_index_chain() {
    let qcode = fixtures::one_to_many_with_cursor();
    let out = compile(&qcode, DialectName::MySql, "seed").unwrap();
    assert!(out.artifact.contains("SUBSTRING_INDEX"));
}

#[test]
fn sqlite_emits_substr_instr_chain() {
    let qcode = fixtures::one_to_many_with_cursor();
    let out = compile(&qcode, DialectName::Sqlite, "seed").unwrap();
    assert!(out.artifact.contains("substr("));
    assert!(out.artifact.contains("instr("));
}

#[test]
fn mssql_full_custom_path_also_wires_cursor_support() {
    let qcode = fixtures::one_to_many_with_cursor();
    let out = compile(&qcode, DialectName::MsSql, "seed").unwrap();
    assert!(out.artifact.starts_with("WITH __cursor_seek_1"));
    assert!(out.artifact.contains("CHARINDEX"));
    assert!(out.artifact.contains("__cursor_created_at"));
}

#[test]
fn cursor_seek_predicate_is_absent_without_a_resume_token() {
    let mut qcode = fixtures::one_to_many_with_cursor();
    qcode.selects[1].paging.cursor_value = None;
    let out = compile(&qcode, DialectName::Postgres, "seed").unwrap();
    // No inbound token means no seek predicate should gate the WHERE clause,
    // even though the select still pages by cursor (first page of results).
    assert!(!out.artifact.contains(" > __cursor_seek_1."));
}

#[test]
fn filtered_select_parameterizes_the_literal_on_every_relational_dialect() {
    let qcode = fixtures::filtered_select();
    for dialect in [DialectName::Postgres, DialectName::MySql, DialectName::Sqlite] {
        let out = compile(&qcode, dialect, "seed").unwrap();
        assert_eq!(out.params.len(), 1);
        assert!(out.artifact.contains("products"));
    }
}

#[test]
fn recursive_relationship_emits_with_recursive_on_every_relational_dialect() {
    let qcode = fixtures::recursive_select();
    for dialect in [DialectName::Postgres, DialectName::MySql, DialectName::Sqlite] {
        let out = compile(&qcode, dialect, "seed").unwrap();
        assert!(out.artifact.contains("WITH RECURSIVE __rec_1"));
        assert!(out.artifact.contains("UNION ALL"));
        assert!(out.artifact.contains("__depth"));
        assert!(out.artifact.contains("<= 5"));
    }
}
