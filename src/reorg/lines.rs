//! Line reconciliation.
//!
//! Reordering can leave a node carrying a larger line than the node now
//! after it. Comment attachment downstream flushes every comment whose line
//! is at or before the current node, so such inversions misplace comments.
//! [`reconcile`] restores a non-decreasing sequence, moving as few nodes as
//! possible.

use crate::tree::Node;

/// Lines kept free below the ceiling when a node has to move, so it does not
/// land on a trailing single-line comment.
pub const LINE_MARGIN: usize = 2;

/// Walk `nodes` backwards and pull every node whose line exceeds the running
/// ceiling up below it, together with its subtree. The ceiling starts at
/// `ceiling` (the first line of whatever follows `nodes`, or `usize::MAX`)
/// and then tracks each node's final line.
///
/// The first node of a run lands `LINE_MARGIN` lines below the ceiling, never
/// above line 1 and never past the ceiling itself. Later nodes of the same run
/// share that line, so a run does not cascade towards the top of the file.
/// Nodes already at or below the ceiling are never touched.
///
/// Returns how many nodes were moved.
pub fn reconcile(nodes: &mut [Node], ceiling: usize) -> usize {
    let mut ceiling = ceiling;
    let mut in_run = false;
    let mut shifted = 0;

    for node in nodes.iter_mut().rev() {
        if node.line() > ceiling {
            let target = if in_run {
                ceiling
            } else {
                ceiling.saturating_sub(LINE_MARGIN).max(1).min(ceiling)
            };
            node.shift_lines_up(node.line() - target);
            shifted += 1;
            in_run = true;
        } else {
            in_run = false;
        }
        ceiling = node.line();
    }

    shifted
}

/// Whether lines never decrease along `nodes`.
pub fn is_monotonic(nodes: &[Node]) -> bool {
    nodes.windows(2).all(|pair| pair[0].line() <= pair[1].line())
}
