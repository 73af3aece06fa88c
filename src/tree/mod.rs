//! Tree model and cursor.

pub mod node;
pub mod zipper;

pub use node::{Comment, DirectiveKind, Meta, Node, NodeKind, QualifiedName, Segment};
pub use zipper::{Control, Zipper};
