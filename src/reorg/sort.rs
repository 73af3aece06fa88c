//! Category sorter.
//!
//! Orders the declarations of one category by a rendered sort key and drops
//! duplicates. Keys are case-folded in `default` mode; ties always fall back
//! to the case-sensitive rendering.

use crate::config::SortMode;
use crate::error::ShapeError;
use crate::tree::{Node, NodeKind};

/// Comparison key of a declaration. Field order is comparison order.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct SortKey {
    pub key: String,
    pub tie_break: String,
}

fn fold(text: String, mode: SortMode) -> String {
    match mode {
        SortMode::Default => text.to_lowercase(),
        SortMode::Ascii => text,
    }
}

/// Sort key of a declaration.
///
/// A still-grouped declaration is keyed as `"<directive> <prefix>.<first>"`
/// where `<first>` is its alphabetically first target, not the raw group text.
pub fn sort_key(node: &Node, mode: SortMode) -> Result<SortKey, ShapeError> {
    let tie_break = node.to_string();
    let text = match node.target() {
        Some(target) if target.kind == NodeKind::Group => {
            let kind = node
                .directive_kind()
                .ok_or_else(|| ShapeError::new(node, "group outside a directive"))?;
            let (prefix, targets) = target
                .children
                .split_first()
                .ok_or_else(|| ShapeError::new(node, "group without a prefix"))?;
            let first = targets
                .iter()
                .map(|t| t.to_string())
                .min_by(|a, b| {
                    fold(a.clone(), mode)
                        .cmp(&fold(b.clone(), mode))
                        .then_with(|| a.cmp(b))
                })
                .ok_or_else(|| ShapeError::new(node, "group without targets"))?;
            format!("{} {}.{}", kind.as_str(), prefix, first)
        }
        Some(_) => tie_break.clone(),
        None if matches!(node.kind, NodeKind::Directive(_)) => {
            return Err(ShapeError::new(node, "directive without a target"));
        }
        None => tie_break.clone(),
    };
    Ok(SortKey {
        key: fold(text, mode),
        tie_break,
    })
}

/// Alphabetize the targets inside a grouped declaration.
pub fn alphabetize_group(mut node: Node, mode: SortMode) -> Node {
    if let Some(target) = node.children.first_mut() {
        if target.kind == NodeKind::Group && target.children.len() > 2 {
            let mut targets = target.children.split_off(1);
            targets.sort_by_cached_key(|t| {
                let text = t.to_string();
                (fold(text.clone(), mode), text)
            });
            target.children.extend(targets);
        }
    }
    node
}

/// Sort one category's declarations and remove duplicates. Two declarations
/// are duplicates iff their keys are identical; the first one is kept.
/// Returns the sorted declarations and the number removed.
pub fn sort_declarations(nodes: Vec<Node>, mode: SortMode) -> Result<(Vec<Node>, usize), ShapeError> {
    let mut keyed = nodes
        .into_iter()
        .map(|n| Ok((sort_key(&n, mode)?, n)))
        .collect::<Result<Vec<_>, ShapeError>>()?;

    // stable: equal keys keep document order, so dedup keeps the first
    keyed.sort_by(|a, b| a.0.cmp(&b.0));
    let before = keyed.len();
    keyed.dedup_by(|later, earlier| later.0 == earlier.0);
    let removed = before - keyed.len();

    Ok((keyed.into_iter().map(|(_, n)| n).collect(), removed))
}

/// Keep document order and drop exact repeats of an earlier declaration.
pub fn dedup_in_place(nodes: Vec<Node>) -> (Vec<Node>, usize) {
    let before = nodes.len();
    let mut seen = std::collections::HashSet::new();
    let kept: Vec<Node> = nodes
        .into_iter()
        .filter(|n| seen.insert(n.to_string()))
        .collect();
    let removed = before - kept.len();
    (kept, removed)
}
