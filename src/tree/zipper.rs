//! Tree cursor over [`Node`] trees.
//!
//! An explicit zipper: the focused node plus a stack of breadcrumbs holding
//! each ancestor's kind, metadata and the siblings to the left and right of
//! the path. Moves are O(1) per step, so reaching any node costs
//! O(path length). Zipping back up rebuilds only the ancestors on the path.

use super::node::{Meta, Node, NodeKind};

/// Signal returned by a traversal visitor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    /// Descend into the focused node's children.
    Continue,
    /// Do not descend; move on to the next sibling (or an ancestor's sibling).
    Skip,
    /// Stop the traversal.
    Halt,
}

#[derive(Debug, Clone)]
struct Crumb {
    kind: NodeKind,
    meta: Meta,
    left: Vec<Node>,
    /// Right siblings in reverse order so the nearest one pops first.
    right_rev: Vec<Node>,
}

#[derive(Debug, Clone)]
pub struct Zipper {
    focus: Node,
    crumbs: Vec<Crumb>,
}

impl Zipper {
    pub fn new(root: Node) -> Self {
        Self {
            focus: root,
            crumbs: Vec::new(),
        }
    }

    pub fn node(&self) -> &Node {
        &self.focus
    }

    pub fn node_mut(&mut self) -> &mut Node {
        &mut self.focus
    }

    /// Replace the focused node, returning the old one.
    pub fn replace(&mut self, node: Node) -> Node {
        std::mem::replace(&mut self.focus, node)
    }

    pub fn depth(&self) -> usize {
        self.crumbs.len()
    }

    pub fn is_root(&self) -> bool {
        self.crumbs.is_empty()
    }

    /// Move to the first child. Returns false (and stays put) on a leaf.
    pub fn down(&mut self) -> bool {
        if self.focus.children.is_empty() {
            return false;
        }
        let mut right_rev = std::mem::take(&mut self.focus.children);
        right_rev.reverse();
        let Some(first) = right_rev.pop() else {
            return false;
        };
        let parent = std::mem::replace(&mut self.focus, first);
        self.crumbs.push(Crumb {
            kind: parent.kind,
            meta: parent.meta,
            left: Vec::new(),
            right_rev,
        });
        true
    }

    /// Move to the parent, rebuilding it. Returns false at the root.
    pub fn up(&mut self) -> bool {
        let Some(crumb) = self.crumbs.pop() else {
            return false;
        };
        let Crumb {
            kind,
            meta,
            mut left,
            mut right_rev,
        } = crumb;
        right_rev.reverse();
        let focus = std::mem::replace(
            &mut self.focus,
            Node::new(kind, meta, Vec::new()),
        );
        left.push(focus);
        left.extend(right_rev);
        self.focus.children = left;
        true
    }

    pub fn right(&mut self) -> bool {
        let Some(crumb) = self.crumbs.last_mut() else {
            return false;
        };
        let Some(next) = crumb.right_rev.pop() else {
            return false;
        };
        let current = std::mem::replace(&mut self.focus, next);
        crumb.left.push(current);
        true
    }

    pub fn left(&mut self) -> bool {
        let Some(crumb) = self.crumbs.last_mut() else {
            return false;
        };
        let Some(prev) = crumb.left.pop() else {
            return false;
        };
        let current = std::mem::replace(&mut self.focus, prev);
        crumb.right_rev.push(current);
        true
    }

    /// Pre-order successor. Returns false when the traversal is exhausted; the
    /// zipper is then back at the root.
    pub fn next(&mut self) -> bool {
        if self.down() {
            return true;
        }
        self.skip()
    }

    /// Pre-order successor that does not enter the focused subtree.
    pub fn skip(&mut self) -> bool {
        loop {
            if self.right() {
                return true;
            }
            if !self.up() {
                return false;
            }
        }
    }

    /// Zip all the way up and return the root.
    pub fn into_root(mut self) -> Node {
        while self.up() {}
        self.focus
    }

    /// Depth-first traversal. `visit` sees every reachable node once and
    /// decides whether to descend, skip the subtree, or stop.
    pub fn traverse<E>(
        mut self,
        mut visit: impl FnMut(&mut Zipper) -> Result<Control, E>,
    ) -> Result<Node, E> {
        loop {
            let moved = match visit(&mut self)? {
                Control::Continue => self.next(),
                Control::Skip => self.skip(),
                Control::Halt => false,
            };
            if !moved {
                break;
            }
        }
        Ok(self.into_root())
    }
}
