//! Alias binding environment.
//!
//! Maps short names to the full paths bound by `alias` declarations, folded
//! left to right so later aliases shadow earlier ones. Used to dealias
//! declarations that sorting moves above the alias they depend on.

use std::collections::{HashMap, HashSet};

use crate::config::DirectivesConfig;
use crate::error::ShapeError;
use crate::tree::{DirectiveKind, Node, NodeKind, QualifiedName};

use super::classify::{expand_group, group_paths, is_grouped, is_well_formed, Category};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AliasEnv {
    bindings: HashMap<String, QualifiedName>,
}

impl AliasEnv {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold the alias declarations of `declarations` into the environment,
    /// in sequence order.
    pub fn define(mut self, declarations: &[Node]) -> Result<Self, ShapeError> {
        for node in declarations {
            self.define_one(node)?;
        }
        Ok(self)
    }

    /// Fold a single node; anything other than an alias is ignored.
    pub fn define_one(&mut self, node: &Node) -> Result<(), ShapeError> {
        if node.directive_kind() != Some(DirectiveKind::Alias) {
            return Ok(());
        }
        let target = node
            .target()
            .ok_or_else(|| ShapeError::new(node, "alias without a target"))?;
        match &target.kind {
            NodeKind::Name(path) => {
                let as_name = match node.option("as") {
                    Some(value) => match value.qualified_name() {
                        Some(short) if short.len() == 1 && short.is_literal() => {
                            short.last().map(str::to_string)
                        }
                        _ => return Err(ShapeError::new(node, "alias `as:` option is not a plain name")),
                    },
                    None => None,
                };
                self.bind(path, as_name);
            }
            NodeKind::Group => {
                for path in group_paths(target)? {
                    self.bind(&path, None);
                }
            }
            _ => return Err(ShapeError::new(node, "alias target is not a qualified name")),
        }
        Ok(())
    }

    fn bind(&mut self, path: &QualifiedName, as_name: Option<String>) {
        let full = self.expand_name(path).unwrap_or_else(|| path.clone());
        let short = match as_name {
            Some(short) => short,
            None => match full.last() {
                Some(last) => last.to_string(),
                None => return,
            },
        };
        self.bindings.insert(short, full);
    }

    pub fn get(&self, short: &str) -> Option<&QualifiedName> {
        self.bindings.get(short)
    }

    pub fn contains(&self, short: &str) -> bool {
        self.bindings.contains_key(short)
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &QualifiedName)> {
        self.bindings.iter()
    }

    /// Full path for `name` if its root is bound to something else.
    pub fn expand_name(&self, name: &QualifiedName) -> Option<QualifiedName> {
        let root = name.first()?;
        let bound = self.bindings.get(root)?;
        if bound.len() == 1 && bound.first() == Some(root) {
            return None;
        }
        Some(name.with_root(bound))
    }

    /// Whether any reference inside `node` goes through a binding.
    pub fn references_bound(&self, node: &Node) -> bool {
        match &node.kind {
            NodeKind::Name(name) => self.expand_name(name).is_some(),
            NodeKind::Pair(key) if key == "as" => false,
            NodeKind::Module(_) => false,
            _ => node.children.iter().any(|c| self.references_bound(c)),
        }
    }

    /// Rewrite every bound reference in `node` to its full path, expanding a
    /// grouped declaration first. Idempotent: full paths have no bound root.
    pub fn expand_references(&self, node: &Node) -> Result<Vec<Node>, ShapeError> {
        let nodes = if is_grouped(node) {
            expand_group(node)?
        } else {
            vec![node.clone()]
        };
        Ok(nodes.into_iter().map(|n| self.rewrite(n)).collect())
    }

    fn rewrite(&self, mut node: Node) -> Node {
        match &node.kind {
            NodeKind::Name(name) => {
                if let Some(full) = self.expand_name(name) {
                    node.kind = NodeKind::Name(full);
                }
                return node;
            }
            // definition positions
            NodeKind::Pair(key) if key == "as" => return node,
            NodeKind::Module(_) => return node,
            _ => {}
        }
        node.children = std::mem::take(&mut node.children)
            .into_iter()
            .map(|c| self.rewrite(c))
            .collect();
        node
    }
}

/// Dealias declarations in categories ordered at or before `alias`, each with
/// the environment in force at its own source position. Sorting may move
/// such declarations above the alias they relied on.
pub fn dealias_body(body: Vec<Node>, directives: &DirectivesConfig) -> Result<Vec<Node>, ShapeError> {
    let alias_rank = directives.rank(Category::Alias);
    let mut env = AliasEnv::new();
    let mut seen = HashSet::new();
    let mut out = Vec::with_capacity(body.len());

    for node in body {
        let category = Category::of(&node);
        if category == Category::Other || !is_well_formed(&node) {
            out.push(node);
            continue;
        }
        // an exact repeat is a duplicate for the sorter, not a new binding
        if !seen.insert(node.to_string()) {
            out.push(node);
            continue;
        }
        let nodes = if directives.rank(category) <= alias_rank && env.references_bound(&node) {
            env.expand_references(&node)?
        } else {
            vec![node]
        };
        for n in &nodes {
            env.define_one(n)?;
        }
        out.extend(nodes);
    }

    Ok(out)
}
