//! Sample `QCode` trees for this crate's own tests, benches, and downstream
//! integration tests (feature `test-utils`). Mirrors spec.md §8's three
//! scenarios at a reduced scale.
use std::collections::BTreeSet;

use crate::schema::{ColName, DBTable, TableName};
use crate::types::{
    ColRef, Exp, ExpLeft, ExpRight, Field, InputNode, InputValue, LiteralValue, Mutate,
    MutateColumn, MutateKind, NullsOrder, Op, OperationType, OrderDirection, OrderExpr, Paging,
    QCode, RecursiveDirection, RecursiveInfo, RelKind, Relationship, Select, SkipType,
};

fn field(name: &str) -> Field {
    Field {
        col: ColName::from(name),
        field_name: name.to_string(),
        skip: SkipType::None,
        skip_var: None,
    }
}

/// A flat, single-root select with no relationships — the simplest
/// shape the compiler ever sees.
pub fn simple_select() -> QCode {
    let sel = Select {
        id: 0,
        parent_id: None,
        table: TableName::from("users"),
        field_name: "users".to_string(),
        fields: vec![field("id"), field("name")],
        children: vec![],
        where_: None,
        order_by: vec![],
        paging: Paging::default(),
        rel: Relationship::default(),
        joins: vec![],
        singular: false,
        typename: false,
        skip_render: SkipType::None,
    };
    QCode {
        ty: OperationType::Query,
        name: Some("Users".to_string()),
        typename: None,
        action_var: None,
        roots: vec![0],
        selects: vec![sel],
        mutates: vec![],
    }
}

/// One root (`posts`) with a one-to-many child (`comments`), cursor-paged
/// on `(created_at DESC, id DESC)` — spec.md §8 Scenario A's shape.
pub fn one_to_many_with_cursor() -> QCode {
    let comments = Select {
        id: 1,
        parent_id: Some(0),
        table: TableName::from("comments"),
        field_name: "comments".to_string(),
        fields: vec![field("id"), field("body")],
        children: vec![],
        where_: None,
        order_by: vec![
            OrderExpr {
                col: ColName::from("created_at"),
                dir: OrderDirection::Desc,
                nulls: NullsOrder::Default,
                var_list: None,
                col_type: Some(crate::schema::ColType::Timestamp),
            },
            OrderExpr {
                col: ColName::from("id"),
                dir: OrderDirection::Desc,
                nulls: NullsOrder::Default,
                var_list: None,
                col_type: Some(crate::schema::ColType::Int),
            },
        ],
        paging: Paging {
            limit: Some(20),
            offset: None,
            cursor: true,
            cursor_value: Some("gj-abc123d5:1:2024-01-01T00:00:00Z:42".to_string()),
        },
        rel: Relationship {
            kind: RelKind::OneToMany,
            left: ColRef {
                table: TableName::from("posts"),
                col: ColName::from("id"),
                array: false,
                primary_key: true,
                foreign_key: false,
            },
            right: ColRef {
                table: TableName::from("comments"),
                col: ColName::from("post_id"),
                array: false,
                primary_key: false,
                foreign_key: true,
            },
            poly: None,
            recursive: None,
        },
        joins: vec![],
        singular: false,
        typename: false,
        skip_render: SkipType::None,
    };
    let posts = Select {
        id: 0,
        parent_id: None,
        table: TableName::from("posts"),
        field_name: "posts".to_string(),
        fields: vec![field("id"), field("title")],
        children: vec![1],
        where_: None,
        order_by: vec![],
        paging: Paging::default(),
        rel: Relationship::default(),
        joins: vec![],
        singular: false,
        typename: false,
        skip_render: SkipType::None,
    };
    QCode {
        ty: OperationType::Query,
        name: Some("PostsWithComments".to_string()),
        typename: None,
        action_var: None,
        roots: vec![0],
        selects: vec![posts, comments],
        mutates: vec![],
    }
}

/// A root select with a `WHERE price > $var` predicate, for dialects that
/// need an expression tree to walk.
pub fn filtered_select() -> QCode {
    let mut qcode = simple_select();
    qcode.selects[0].table = TableName::from("products");
    qcode.selects[0].field_name = "products".to_string();
    qcode.selects[0].fields = vec![field("id"), field("price")];
    qcode.selects[0].where_ = Some(Exp {
        op: Op::Greater,
        left: Some(ExpLeft {
            table: TableName::from("products"),
            col: ColName::from("price"),
            json_path: vec![],
            parent_select: None,
        }),
        right: Some(ExpRight::Literal(LiteralValue::Float(9.99))),
        children: vec![],
        joins: vec![],
        geo: None,
    });
    qcode
}

/// One root (`employees`) with a recursive child (`reports`) walking the
/// manager chain down from each employee — spec.md §4.2's recursive-CTE
/// relationship, direction `Children`, capped at 5 levels.
pub fn recursive_select() -> QCode {
    let reports = Select {
        id: 1,
        parent_id: Some(0),
        table: TableName::from("employees"),
        field_name: "reports".to_string(),
        fields: vec![field("id"), field("name")],
        children: vec![],
        where_: None,
        order_by: vec![],
        paging: Paging::default(),
        rel: Relationship {
            kind: RelKind::Recursive,
            left: ColRef {
                table: TableName::from("employees"),
                col: ColName::from("id"),
                array: false,
                primary_key: true,
                foreign_key: false,
            },
            right: ColRef {
                table: TableName::from("employees"),
                col: ColName::from("manager_id"),
                array: false,
                primary_key: false,
                foreign_key: true,
            },
            poly: None,
            recursive: Some(RecursiveInfo {
                direction: RecursiveDirection::Children,
                connect_from: ColName::from("id"),
                connect_to: ColName::from("manager_id"),
                max_depth: Some(5),
            }),
        },
        joins: vec![],
        singular: false,
        typename: false,
        skip_render: SkipType::None,
    };
    let employees = Select {
        id: 0,
        parent_id: None,
        table: TableName::from("employees"),
        field_name: "employees".to_string(),
        fields: vec![field("id"), field("name")],
        children: vec![1],
        where_: None,
        order_by: vec![],
        paging: Paging::default(),
        rel: Relationship::default(),
        joins: vec![],
        singular: false,
        typename: false,
        skip_render: SkipType::None,
    };
    QCode {
        ty: OperationType::Query,
        name: Some("EmployeesWithReports".to_string()),
        typename: None,
        action_var: None,
        roots: vec![0],
        selects: vec![employees, reports],
        mutates: vec![],
    }
}

fn table(name: &str) -> DBTable {
    DBTable {
        schema: None,
        name: TableName::from(name),
        columns: vec![],
        primary_col: Some(ColName::from("id")),
        full_text: vec![],
        orig_name: None,
        orig_schema: None,
    }
}

/// Nested mutation: insert an `author` then an `article` whose `author_id`
/// depends on the author's generated id — spec.md §8 Scenario C's shape,
/// with the FK living on the child (`articles.author_id`).
pub fn nested_insert_mutation() -> QCode {
    let author = Mutate {
        id: 0,
        parent_id: None,
        ti: table("authors"),
        rel: Relationship::default(),
        cols: vec![MutateColumn {
            col: ColName::from("name"),
            preset: None,
            field_name: "name".to_string(),
        }],
        data: InputNode::Object(vec![(
            "name".to_string(),
            InputValue::Literal(LiteralValue::Str("Ada".to_string())),
        )]),
        where_: None,
        depends_on: BTreeSet::new(),
        path: vec![crate::types::PathSegment::Key("author".to_string())],
        sel_id: None,
        is_json: false,
        array: false,
        kind: MutateKind::Insert,
    };
    let mut article_depends = BTreeSet::new();
    article_depends.insert(0);
    let article = Mutate {
        id: 1,
        parent_id: Some(0),
        ti: table("articles"),
        rel: Relationship {
            kind: RelKind::OneToMany,
            left: ColRef {
                table: TableName::from("authors"),
                col: ColName::from("id"),
                array: false,
                primary_key: true,
                foreign_key: false,
            },
            right: ColRef {
                table: TableName::from("articles"),
                col: ColName::from("author_id"),
                array: false,
                primary_key: false,
                foreign_key: true,
            },
            poly: None,
            recursive: None,
        },
        cols: vec![
            MutateColumn {
                col: ColName::from("title"),
                preset: None,
                field_name: "title".to_string(),
            },
            MutateColumn {
                col: ColName::from("author_id"),
                preset: None,
                field_name: "author_id".to_string(),
            },
        ],
        data: InputNode::Object(vec![(
            "title".to_string(),
            InputValue::Literal(LiteralValue::Str("Hello".to_string())),
        )]),
        where_: None,
        depends_on: article_depends,
        path: vec![crate::types::PathSegment::Key("article".to_string())],
        sel_id: None,
        is_json: false,
        array: false,
        kind: MutateKind::Insert,
    };
    QCode {
        ty: OperationType::Mutation,
        name: Some("CreateArticle".to_string()),
        typename: None,
        action_var: None,
        roots: vec![],
        selects: vec![],
        mutates: vec![author, article],
    }
}
