//! Engine behavior: failure policies, post-processing steps, parallel runs
//! and configuration loaded from disk.

use std::fs;

use brrr_tidy::{
    discover_and_load_config, Comment, Control, FailurePolicy, Node, NodeKind, Reorganizer,
    Stage, Step, StepContext, TidyConfig, TidyError, Zipper, CONFIG_FILE_NAME,
};
use tempfile::TempDir;

use crate::common::{accounts_module, init_tracing, no_comments, render, reorganizer};

/// `alias A.B, as: "b"` cannot be bound.
fn broken_module(name: &str) -> Node {
    Node::module(
        name,
        1,
        6,
        vec![
            Node::import("Z", 2),
            Node::alias("A.B", 3).with_options(vec![("as", Node::literal("\"b\"", 3))]),
            Node::import("Y", 4),
        ],
    )
}

// =============================================================================
// Failure Policy
// =============================================================================

#[test]
fn test_skip_scope_policy_keeps_original_body() {
    let tree = Node::block(
        vec![
            broken_module("Broken"),
            Node::module("Fine", 10, 14, vec![Node::import("B", 11), Node::import("A", 12)]),
        ],
        1,
    );

    let outcome = reorganizer().run(tree.clone(), no_comments()).unwrap();

    assert_eq!(outcome.tree.children[0], tree.children[0]);
    assert_eq!(render(&outcome.tree.children[1].children), vec!["import A", "import B"]);
    assert_eq!(outcome.stats.scopes_failed, 1);
    assert_eq!(outcome.stats.scopes_reorganized, 1);
}

#[test]
fn test_abort_policy_reports_stage_and_scope() {
    let reorganizer = reorganizer().with_policy(FailurePolicy::Abort);

    let err = reorganizer
        .run(broken_module("MyApp.Broken"), no_comments())
        .unwrap_err();

    assert_eq!(err.stage(), Some(Stage::Dealias));
    match err {
        TidyError::Stage { scope, line, source, .. } => {
            assert_eq!(scope, "MyApp.Broken");
            assert_eq!(line, 1);
            assert_eq!(source.line, 3);
        }
        other => panic!("unexpected error: {other}"),
    }
}

// =============================================================================
// Steps
// =============================================================================

/// Drops marker comments once every scope has been processed.
struct StripMarkers;

impl Step for StripMarkers {
    fn name(&self) -> &str {
        "strip-markers"
    }

    fn apply(&self, _zipper: &mut Zipper, ctx: &mut StepContext<'_>) -> brrr_tidy::Result<Control> {
        let markers = &ctx.config.markers;
        ctx.comments
            .retain(|c| !c.text.contains(&markers.skip_all) && !c.text.contains(&markers.keep_order));
        Ok(Control::Halt)
    }
}

/// Renames every local call to `legacy` into `current`.
struct RenameCall;

impl Step for RenameCall {
    fn name(&self) -> &str {
        "rename-call"
    }

    fn apply(&self, zipper: &mut Zipper, _ctx: &mut StepContext<'_>) -> brrr_tidy::Result<Control> {
        if zipper.node().kind == NodeKind::Call("legacy".into()) {
            zipper.node_mut().kind = NodeKind::Call("current".into());
            return Ok(Control::Skip);
        }
        Ok(Control::Continue)
    }
}

struct Reject;

impl Step for Reject {
    fn name(&self) -> &str {
        "reject"
    }

    fn apply(&self, zipper: &mut Zipper, _ctx: &mut StepContext<'_>) -> brrr_tidy::Result<Control> {
        Err(TidyError::Step {
            step: self.name().to_string(),
            detail: format!("refusing node at line {}", zipper.node().line()),
        })
    }
}

#[test]
fn test_steps_run_in_order_after_reorganization() {
    let scope = Node::module(
        "M",
        1,
        10,
        vec![
            Node::import("B", 2),
            Node::import("A", 3),
            Node::call("legacy", vec![], 5),
        ],
    );
    let comments = vec![
        Comment::new(4, "# brrr-tidy: keep-order"),
        Comment::new(6, "# regular comment"),
    ];

    let outcome = reorganizer()
        .with_step(StripMarkers)
        .with_step(RenameCall)
        .run(scope, comments)
        .unwrap();

    // the marker was still seen by the engine
    assert_eq!(render(&outcome.tree.children), vec!["import B", "import A", "current()"]);
    assert_eq!(outcome.comments, vec![Comment::new(6, "# regular comment")]);
}

#[test]
fn test_step_error_propagates() {
    let err = reorganizer()
        .with_step(Reject)
        .run(Node::module("M", 1, 2, vec![]), no_comments())
        .unwrap_err();

    assert!(matches!(err, TidyError::Step { ref step, .. } if step == "reject"));
    assert!(err.to_string().contains("refusing node at line 1"));
}

// =============================================================================
// Parallel Runs
// =============================================================================

#[test]
fn test_run_many_matches_sequential_runs() {
    let reorganizer = reorganizer();
    let inputs: Vec<(Node, Vec<Comment>)> = (0..8)
        .map(|i| {
            if i % 3 == 0 {
                (broken_module("Broken"), no_comments())
            } else {
                (accounts_module(), no_comments())
            }
        })
        .collect();

    let expected: Vec<_> = inputs
        .iter()
        .cloned()
        .map(|(tree, comments)| reorganizer.run(tree, comments).unwrap())
        .collect();
    let results = reorganizer.run_many(inputs);

    assert_eq!(results.len(), expected.len());
    for (result, expected) in results.into_iter().zip(expected) {
        assert_eq!(result.unwrap(), expected);
    }
}

// =============================================================================
// Configuration
// =============================================================================

#[test]
fn test_config_from_disk_changes_output() {
    init_tracing();
    let temp = TempDir::new().unwrap();
    fs::create_dir(temp.path().join(".git")).unwrap();
    let nested = temp.path().join("lib").join("my_app");
    fs::create_dir_all(&nested).unwrap();
    fs::write(
        temp.path().join(CONFIG_FILE_NAME),
        r#"
[directives]
order = ["alias", "require", "import"]
sort = "ascii"

[alias_lifting]
enabled = false
"#,
    )
    .unwrap();

    let (config, path) = discover_and_load_config(&nested).unwrap().unwrap();
    assert_eq!(path, temp.path().join(CONFIG_FILE_NAME));

    let scope = Node::module(
        "M",
        1,
        12,
        vec![
            Node::import("Foo.bar", 2),
            Node::import("Foo.Zed", 3),
            Node::require("A.B.C", 4),
            Node::alias("Foo.Qux", 5),
            Node::use_module("Base", 6),
            Node::remote_call("A.B.C", "foo", vec![], 8),
            Node::remote_call("A.B.C", "bar", vec![], 9),
        ],
    );

    let outcome = Reorganizer::new(config).unwrap().run(scope, no_comments()).unwrap();

    assert_eq!(
        render(&outcome.tree.children),
        vec![
            "alias Foo.Qux",
            "require A.B.C",
            "import Foo.Zed",
            "import Foo.bar",
            "use Base",
            "A.B.C.foo()",
            "A.B.C.bar()",
        ]
    );
}

#[test]
fn test_custom_markers() {
    let mut config = TidyConfig::default();
    config.markers.skip_all = "tidy:off".into();
    let scope = Node::module("M", 1, 5, vec![Node::import("B", 2), Node::import("A", 3)]);

    let outcome = Reorganizer::new(config)
        .unwrap()
        .run(scope.clone(), vec![Comment::new(4, "# tidy:off")])
        .unwrap();

    assert_eq!(outcome.tree, scope);
}
