//! End-to-end scenarios over single scopes and whole files.

use brrr_tidy::{Comment, DirectiveKind, Node};

use crate::common::{accounts_module, no_comments, render, reorganizer};

// =============================================================================
// Group Expansion
// =============================================================================

#[test]
fn test_grouped_import_expands_alphabetically() {
    let scope = Node::module(
        "M",
        1,
        5,
        vec![Node::grouped(DirectiveKind::Import, "Foo", &["Baz", "Bar"], 2)],
    );

    let outcome = reorganizer().run(scope, no_comments()).unwrap();

    assert_eq!(
        render(&outcome.tree.children),
        vec!["import Foo.Bar", "import Foo.Baz"]
    );
    assert_eq!(outcome.stats.groups_expanded, 1);
}

// =============================================================================
// Alias Lifting
// =============================================================================

#[test]
fn test_frequent_deep_name_is_lifted() {
    let scope = Node::module(
        "M",
        1,
        10,
        vec![
            Node::require("A.B.C", 2),
            Node::remote_call("A.B.C", "foo", vec![], 4),
            Node::remote_call("A.B.C", "bar", vec![], 5),
        ],
    );

    let outcome = reorganizer().run(scope, no_comments()).unwrap();

    assert_eq!(
        render(&outcome.tree.children),
        vec!["alias A.B.C", "require C", "C.foo()", "C.bar()"]
    );
    assert_eq!(outcome.stats.aliases_lifted, 1);
    assert_eq!(outcome.stats.references_rewritten, 3);
}

#[test]
fn test_single_use_is_not_lifted() {
    let scope = Node::module(
        "M",
        1,
        10,
        vec![
            Node::require("A.B.C", 2),
            Node::remote_call("X.Y", "foo", vec![], 4),
        ],
    );

    let outcome = reorganizer().run(scope, no_comments()).unwrap();

    assert_eq!(
        render(&outcome.tree.children),
        vec!["require A.B.C", "X.Y.foo()"]
    );
    assert_eq!(outcome.stats.aliases_lifted, 0);
}

// =============================================================================
// Markers
// =============================================================================

#[test]
fn test_skip_marker_leaves_scope_identical() {
    let scope = Node::module(
        "M",
        1,
        10,
        vec![
            Node::require("Z", 2),
            Node::grouped(DirectiveKind::Alias, "A", &["C", "B"], 3),
            Node::remote_call("A.B.C", "foo", vec![], 7),
            Node::remote_call("A.B.C", "bar", vec![], 8),
        ],
    );
    let comments = vec![Comment::new(6, "# brrr-tidy: skip")];

    let outcome = reorganizer().run(scope.clone(), comments.clone()).unwrap();

    assert_eq!(outcome.tree, scope);
    assert_eq!(outcome.tree.to_string(), scope.to_string());
    assert_eq!(outcome.comments, comments);
    assert_eq!(outcome.stats.scopes_skipped, 1);
    assert_eq!(outcome.stats.scopes_reorganized, 0);
}

#[test]
fn test_skip_marker_in_nested_module_only_skips_it() {
    let scope = Node::module(
        "Outer",
        1,
        20,
        vec![
            Node::import("B", 2),
            Node::import("A", 3),
            Node::module("Inner", 5, 10, vec![Node::import("D", 6), Node::import("C", 7)]),
        ],
    );
    let comments = vec![Comment::new(8, "# brrr-tidy: skip")];

    let outcome = reorganizer().run(scope, comments).unwrap();

    let body = &outcome.tree.children;
    assert_eq!(render(&body[..2]), vec!["import A", "import B"]);
    assert_eq!(render(&body[2].children), vec!["import D", "import C"]);
    assert_eq!(outcome.stats.scopes_reorganized, 1);
    assert_eq!(outcome.stats.scopes_skipped, 1);
}

// =============================================================================
// Deduplication
// =============================================================================

#[test]
fn test_exact_duplicates_collapse() {
    let scope = Node::module(
        "M",
        1,
        5,
        vec![Node::alias("A.A", 2), Node::alias("A.A", 3)],
    );

    let outcome = reorganizer().run(scope, no_comments()).unwrap();

    assert_eq!(render(&outcome.tree.children), vec!["alias A.A"]);
    assert_eq!(outcome.stats.duplicates_removed, 1);
}

#[test]
fn test_duplicate_through_group_expansion() {
    let scope = Node::module(
        "M",
        1,
        8,
        vec![
            Node::import("Foo.Bar", 2),
            Node::grouped(DirectiveKind::Import, "Foo", &["Bar", "Baz"], 3),
        ],
    );

    let outcome = reorganizer().run(scope, no_comments()).unwrap();

    assert_eq!(
        render(&outcome.tree.children),
        vec!["import Foo.Bar", "import Foo.Baz"]
    );
    assert_eq!(outcome.tree.children[0].line(), 2);
}

// =============================================================================
// Whole Module
// =============================================================================

#[test]
fn test_accounts_module() {
    let outcome = reorganizer().run(accounts_module(), no_comments()).unwrap();
    let body = &outcome.tree.children;

    assert_eq!(
        render(&body[..body.len() - 1]),
        vec![
            "@moduledoc \"Accounts\"",
            "@behaviour MyApp.Store",
            "use MyApp.Schema",
            "import Ecto.Query, only: [from: 2]",
            "import MyApp.Repo.Helpers",
            "alias MyApp.Accounts.Token",
            "alias MyApp.Accounts.User",
            "alias MyApp.Billing.Invoice",
            "alias MyApp.Repo",
            "require Logger",
            "Repo.all(User)",
            "Invoice.new(Token)",
            "Invoice.total()",
        ]
    );
    let inner = &body[body.len() - 1];
    assert_eq!(
        render(&inner.children),
        vec!["import A", "import B", "Logger.info(\"inner\")"]
    );

    assert_eq!(outcome.stats.scopes_visited, 2);
    assert_eq!(outcome.stats.scopes_reorganized, 2);
    assert_eq!(outcome.stats.groups_expanded, 1);
    assert_eq!(outcome.stats.aliases_lifted, 1);
    assert_eq!(outcome.stats.references_rewritten, 2);
}

#[test]
fn test_derive_follows_struct_definition() {
    let scope = Node::module(
        "MyApp.User",
        1,
        10,
        vec![
            Node::call("defstruct", vec![Node::ident("name", 2)], 2),
            Node::call("def", vec![Node::ident("new", 3)], 3),
            Node::attribute("derive", Some(Node::name("Jason.Encoder", 5)), 5),
            Node::alias("MyApp.Repo", 6),
        ],
    );

    let outcome = reorganizer().run(scope, no_comments()).unwrap();

    assert_eq!(
        render(&outcome.tree.children),
        vec![
            "alias MyApp.Repo",
            "defstruct(name)",
            "@derive Jason.Encoder",
            "def(new)",
        ]
    );
    let lines: Vec<usize> = outcome.tree.children.iter().map(Node::line).collect();
    assert_eq!(lines, vec![1, 2, 2, 3]);
}

#[test]
fn test_derive_move_leaves_other_lines_alone() {
    let scope = Node::module(
        "MyApp.User",
        1,
        8,
        vec![
            Node::alias("A.B", 2),
            Node::call("defstruct", vec![Node::ident("name", 4)], 4),
            Node::call("def", vec![Node::ident("new", 5)], 5),
            Node::attribute("derive", Some(Node::name("Inspect", 6)), 6),
        ],
    );

    let outcome = reorganizer().run(scope, no_comments()).unwrap();

    let body = &outcome.tree.children;
    assert_eq!(
        render(body),
        vec!["alias A.B", "defstruct(name)", "@derive Inspect", "def(new)"]
    );
    let lines: Vec<usize> = body.iter().map(Node::line).collect();
    assert_eq!(lines, vec![2, 4, 4, 5]);
    assert_eq!(outcome.stats.lines_shifted, 0);
}

#[test]
fn test_nested_marker_survives_outer_derive_move() {
    let scope = Node::module(
        "Outer",
        1,
        20,
        vec![
            Node::call("defstruct", vec![], 2),
            Node::call("def", vec![Node::ident("new", 3)], 3),
            Node::attribute("derive", Some(Node::name("Inspect", 5)), 5),
            Node::module("Inner", 8, 12, vec![Node::import("D", 9), Node::import("C", 10)]),
        ],
    );
    let comments = vec![Comment::new(11, "# brrr-tidy: keep-order")];

    let outcome = reorganizer().run(scope, comments).unwrap();

    let inner = &outcome.tree.children[3];
    assert_eq!(inner.line(), 8);
    assert_eq!(inner.meta.end_line, Some(12));
    assert_eq!(render(&inner.children), vec!["import D", "import C"]);
}
