//! Shared fixtures.

use brrr_tidy::{Comment, DirectiveKind, Node, Reorganizer, TidyConfig};
use tracing_subscriber::EnvFilter;

/// Route engine logs to the test harness. Safe to call from every test.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn reorganizer() -> Reorganizer {
    init_tracing();
    Reorganizer::new(TidyConfig::default()).expect("default config is valid")
}

pub fn render(nodes: &[Node]) -> Vec<String> {
    nodes.iter().map(|n| n.to_string()).collect()
}

/// A module with every declaration category, a grouped alias, an import
/// that relies on a later-sorted alias, a liftable deep name and a nested
/// module.
///
/// ```text
///  1 defmodule MyApp.Accounts do
///  2   @moduledoc "Accounts"
///  3   require Logger
///  4   alias MyApp.Repo
///  5   import Ecto.Query, only: [from: 2]
///  6   alias MyApp.Accounts.{
///  7     User,
///  8     Token}
///  9   use MyApp.Schema
/// 10   @behaviour MyApp.Store
/// 11   import Repo.Helpers
/// 13   Repo.all(User)
/// 15   MyApp.Billing.Invoice.new(Token)
/// 16   MyApp.Billing.Invoice.total()
/// 18   defmodule Inner do
/// 19     import B
/// 20     import A
/// 21     Logger.info("inner")
/// 24   end
/// 30 end
/// ```
pub fn accounts_module() -> Node {
    Node::module(
        "MyApp.Accounts",
        1,
        30,
        vec![
            Node::attribute("moduledoc", Some(Node::literal("\"Accounts\"", 2)), 2),
            Node::require("Logger", 3),
            Node::alias("MyApp.Repo", 4),
            Node::import("Ecto.Query", 5).with_options(vec![("only", Node::literal("[from: 2]", 5))]),
            Node::grouped(DirectiveKind::Alias, "MyApp.Accounts", &["User", "Token"], 6),
            Node::use_module("MyApp.Schema", 9),
            Node::attribute("behaviour", Some(Node::name("MyApp.Store", 10)), 10),
            Node::import("Repo.Helpers", 11),
            Node::remote_call("Repo", "all", vec![Node::name("User", 13)], 13),
            Node::remote_call("MyApp.Billing.Invoice", "new", vec![Node::name("Token", 15)], 15),
            Node::remote_call("MyApp.Billing.Invoice", "total", vec![], 16),
            Node::module(
                "Inner",
                18,
                24,
                vec![
                    Node::import("B", 19),
                    Node::import("A", 20),
                    Node::remote_call("Logger", "info", vec![Node::literal("\"inner\"", 21)], 21),
                ],
            ),
        ],
    )
}

pub fn no_comments() -> Vec<Comment> {
    Vec::new()
}
