//! Declaration classifier and group expander.
//!
//! Splits a module body into per-category buckets of declarations and the
//! remaining "other content". Grouped declarations (`alias Foo.{Bar, Baz}`)
//! expand into one declaration per target.

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::error::ShapeError;
use crate::tree::{DirectiveKind, Meta, Node, NodeKind, QualifiedName};

/// Declaration category. Ordering between categories is configured; this
/// enum's own order is only the canonical fallback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    /// `@moduledoc`, `@shortdoc`.
    Doc,
    /// `@behaviour`.
    Behaviour,
    /// `use`.
    #[serde(alias = "use")]
    Capability,
    Import,
    Alias,
    Require,
    /// Everything that is not a declaration.
    Other,
}

impl Category {
    /// Every category that holds declarations, in canonical order.
    pub const DECLARATIONS: [Category; 6] = [
        Category::Doc,
        Category::Behaviour,
        Category::Capability,
        Category::Import,
        Category::Alias,
        Category::Require,
    ];

    pub fn canonical_index(self) -> usize {
        self as usize
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Category::Doc => "doc",
            Category::Behaviour => "behaviour",
            Category::Capability => "capability",
            Category::Import => "import",
            Category::Alias => "alias",
            Category::Require => "require",
            Category::Other => "other",
        }
    }

    /// Category of a node by its shape alone. Well-formedness is checked
    /// separately by [`is_well_formed`].
    pub fn of(node: &Node) -> Category {
        match &node.kind {
            NodeKind::Directive(DirectiveKind::Alias) => Category::Alias,
            NodeKind::Directive(DirectiveKind::Import) => Category::Import,
            NodeKind::Directive(DirectiveKind::Require) => Category::Require,
            NodeKind::Directive(DirectiveKind::Use) => Category::Capability,
            NodeKind::Attribute(name) => match name.as_str() {
                "moduledoc" | "shortdoc" => Category::Doc,
                "behaviour" => Category::Behaviour,
                _ => Category::Other,
            },
            _ => Category::Other,
        }
    }
}

// ---------------------------------------------------------------------------
// Shape checks
// ---------------------------------------------------------------------------

/// Target paths of a well-formed group (`prefix` joined with each target).
pub fn group_paths(group: &Node) -> Result<Vec<QualifiedName>, ShapeError> {
    let Some((prefix, targets)) = group.children.split_first() else {
        return Err(ShapeError::new(group, "group without a prefix"));
    };
    let prefix = prefix
        .qualified_name()
        .ok_or_else(|| ShapeError::new(group, "group prefix is not a qualified name"))?;
    targets
        .iter()
        .map(|target| match target.qualified_name() {
            Some(name) if name.is_literal() => Ok(prefix.join(name)),
            _ => Err(ShapeError::new(target, "group target is not a literal qualified name")),
        })
        .collect()
}

/// Whether a declaration-category node has the structure later stages rely on.
pub fn is_well_formed(node: &Node) -> bool {
    match &node.kind {
        NodeKind::Directive(_) => {
            let target_ok = match node.target() {
                Some(target) => match target.kind {
                    NodeKind::Name(ref name) => !name.is_empty(),
                    NodeKind::Group => group_paths(target).is_ok(),
                    _ => false,
                },
                None => false,
            };
            let options_ok = match node.children.len() {
                1 => true,
                2 => node.children[1].kind == NodeKind::Keywords,
                _ => false,
            };
            target_ok && options_ok
        }
        NodeKind::Attribute(_) => true,
        _ => false,
    }
}

pub fn is_grouped(node: &Node) -> bool {
    node.target().is_some_and(|t| t.kind == NodeKind::Group)
}

/// `alias Foo`: binds `Foo` to itself.
pub fn is_degenerate_alias(node: &Node) -> bool {
    node.directive_kind() == Some(DirectiveKind::Alias)
        && node.children.len() == 1
        && node
            .target()
            .and_then(Node::qualified_name)
            .is_some_and(|name| name.len() == 1 && name.is_literal())
}

// ---------------------------------------------------------------------------
// Expansion
// ---------------------------------------------------------------------------

/// Expand a grouped declaration into one declaration per target.
///
/// Expanded declarations take their target's line so reading order is kept.
/// Only the last one inherits the group's trailing metadata; a single target
/// inherits the group's metadata whole. Options are copied onto each.
pub fn expand_group(node: &Node) -> Result<Vec<Node>, ShapeError> {
    let kind = node
        .directive_kind()
        .ok_or_else(|| ShapeError::new(node, "only directives can be expanded"))?;
    let group = node
        .target()
        .filter(|t| t.kind == NodeKind::Group)
        .ok_or_else(|| ShapeError::new(node, "directive target is not a group"))?;
    let paths = group_paths(group)?;
    let options = node.children.get(1);
    let count = paths.len();

    let expanded = paths
        .into_iter()
        .zip(group.children.iter().skip(1))
        .enumerate()
        .map(|(i, (path, target))| {
            let meta = if count == 1 {
                node.meta
            } else if i + 1 == count {
                Meta {
                    line: target.line(),
                    ..node.meta
                }
            } else {
                Meta::at(target.line())
            };
            let mut children = vec![Node::from_name(path, meta.line)];
            children.extend(options.cloned());
            Node::new(NodeKind::Directive(kind), meta, children)
        })
        .collect();
    Ok(expanded)
}

/// Expand every well-formed grouped declaration in `body`, returning the new
/// body and how many groups were expanded.
pub fn expand_declarations(body: Vec<Node>) -> Result<(Vec<Node>, usize), ShapeError> {
    let mut out = Vec::with_capacity(body.len());
    let mut expanded = 0;
    for node in body {
        if Category::of(&node) != Category::Other && is_well_formed(&node) && is_grouped(&node) {
            out.extend(expand_group(&node)?);
            expanded += 1;
        } else {
            out.push(node);
        }
    }
    Ok((out, expanded))
}

// ---------------------------------------------------------------------------
// Classification
// ---------------------------------------------------------------------------

/// A module body split into declaration buckets and other content.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Classified {
    /// Declarations per category, in document order.
    pub buckets: BTreeMap<Category, Vec<Node>>,
    /// Non-declaration nodes, in document order.
    pub content: Vec<Node>,
}

/// Split `body` into buckets. Malformed declarations become content;
/// degenerate aliases are dropped; doc attributes are deduplicated by name
/// with the first occurrence kept.
pub fn classify(body: Vec<Node>) -> Classified {
    let mut classified = Classified::default();
    let mut seen_docs: HashSet<String> = HashSet::new();

    for node in body {
        let category = Category::of(&node);
        if category == Category::Other || !is_well_formed(&node) {
            classified.content.push(node);
            continue;
        }
        if is_degenerate_alias(&node) {
            continue;
        }
        if category == Category::Doc {
            let name = node.attribute_name().unwrap_or_default().to_string();
            if !seen_docs.insert(name) {
                continue;
            }
        }
        classified.buckets.entry(category).or_default().push(node);
    }

    classified
}

/// Move every `@derive` to immediately after the nearest struct definition
/// preceding it. A derive with no struct definition before it stays put.
///
/// A moved derive takes the line of the node it now follows, so the content
/// stays in line order and nothing else has to shift.
pub fn place_derives(content: Vec<Node>) -> Vec<Node> {
    let mut out: Vec<Node> = Vec::with_capacity(content.len());
    let mut attach_at: Option<usize> = None;

    for mut node in content {
        if node.is_derive() {
            if let Some(at) = attach_at {
                if let Some(anchor) = at.checked_sub(1).and_then(|i| out.get(i)).map(Node::line) {
                    if node.line() > anchor {
                        node.shift_lines_up(node.line() - anchor);
                    }
                }
                out.insert(at, node);
                attach_at = Some(at + 1);
                continue;
            }
            out.push(node);
        } else if node.is_struct_definition() {
            out.push(node);
            attach_at = Some(out.len());
        } else {
            out.push(node);
        }
    }

    out
}
